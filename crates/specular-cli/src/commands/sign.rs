use chrono::Utc;
use clap::{Args, ValueEnum};
use specular_approval::{build_approval_message, ApprovalRecord, SignatureScheme};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Copy, ValueEnum)]
pub enum SchemeArg {
    Ssh,
    Gpg,
}

#[derive(Args)]
pub struct SignArgs {
    /// Bundle digest being approved (the archive's own SHA-256, as printed
    /// by `specular build`), e.g. "sha256:...".
    #[arg(long)]
    digest: String,
    /// Approval role, e.g. "release-manager".
    #[arg(long)]
    role: String,
    /// Approving user's identity.
    #[arg(long)]
    user: String,
    #[arg(long, value_enum)]
    scheme: SchemeArg,
    /// Private key file (OpenSSH private key, or armored GPG secret key for --scheme gpg).
    #[arg(long)]
    key: PathBuf,
    #[arg(long)]
    comment: Option<String>,
    /// Where to write the resulting approvals/*.yaml file.
    #[arg(long)]
    out: PathBuf,
}

pub fn run(args: SignArgs) -> anyhow::Result<()> {
    let timestamp = Utc::now();
    let message = build_approval_message(&args.digest, &args.role, &args.user, timestamp, args.comment.as_deref());

    let key_material = std::fs::read_to_string(&args.key)?;
    let (scheme, signature, key_id) = match args.scheme {
        SchemeArg::Ssh => {
            let sig = specular_approval::ssh::sign(message.as_bytes(), &key_material)?;
            let key_id = specular_approval::ssh::key_id(&key_material).unwrap_or_default();
            (SignatureScheme::from_str("ssh")?, sig, key_id)
        }
        SchemeArg::Gpg => {
            anyhow::bail!("signing with a local gpg secret key is not wired up; use `gpg --armor --detach-sign` and assemble the approval record by hand");
        }
    };

    let record = ApprovalRecord {
        role: args.role,
        user: args.user,
        timestamp,
        comment: args.comment,
        scheme,
        key_id,
        signature,
    };

    let yaml = serde_yaml::to_string(&record)?;
    std::fs::write(&args.out, yaml)?;
    println!("wrote approval to {}", args.out.display());
    Ok(())
}
