use clap::Args;
use specular_attestation::{generate, AttestationMode, SLSA_PROVENANCE_PREDICATE_TYPE};
use specular_core::bundle::{ExtractLimits, ValidationMode, Validator};
use specular_core::digest::digest_file;
use std::path::PathBuf;

#[derive(Args)]
pub struct AttestArgs {
    /// Built, unsigned-attestation bundle whose manifest is attested.
    bundle: PathBuf,
    /// PEM-encoded P-256 private key used to sign the statement.
    #[arg(long)]
    key: PathBuf,
    #[arg(long)]
    key_id: String,
    /// Where to write attestations/attestation.yaml.
    #[arg(long)]
    out: PathBuf,
}

pub fn run(args: AttestArgs) -> anyhow::Result<()> {
    let (result, _guard) = Validator::verify(&args.bundle, ExtractLimits::default(), ValidationMode::Aggregate, None, None);
    let manifest = result
        .manifest
        .ok_or_else(|| anyhow::anyhow!("could not read a manifest from {}", args.bundle.display()))?;
    let bundle_digest = digest_file(&args.bundle)?;

    let private_key_pem = std::fs::read_to_string(&args.key)?;
    let predicate = serde_json::json!({ "builder": "specular-cli" });
    let record = generate(
        &manifest,
        &bundle_digest,
        SLSA_PROVENANCE_PREDICATE_TYPE,
        predicate,
        &args.key_id,
        &private_key_pem,
        AttestationMode::Keyed,
    )?;

    let yaml = serde_yaml::to_string(&record)?;
    std::fs::write(&args.out, yaml)?;
    println!("wrote attestation to {}", args.out.display());
    Ok(())
}
