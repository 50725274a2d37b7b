use clap::Args;
use specular_approval::QuorumChecker;
use specular_approval::TrustStore;
use specular_attestation::AttestationVerifier;
use specular_core::bundle::{ExtractLimits, ValidationMode, Validator};
use std::path::PathBuf;

#[derive(Args)]
pub struct VerifyArgs {
    /// Bundle to verify.
    bundle: PathBuf,
    /// Trust store describing which keys may approve which roles.
    #[arg(long)]
    trust_store: Option<PathBuf>,
    /// PEM-encoded P-256 public key used to verify the attestation.
    #[arg(long)]
    attestation_key: Option<PathBuf>,
    /// Stop on the first error instead of collecting every finding.
    #[arg(long)]
    strict: bool,
}

pub fn run(args: VerifyArgs) -> anyhow::Result<()> {
    let trust = match &args.trust_store {
        Some(path) => TrustStore::load(path)?,
        None => TrustStore::default(),
    };
    let approval_checker = QuorumChecker::new(trust);

    let attestation_checker = match &args.attestation_key {
        Some(path) => Some(AttestationVerifier {
            public_key_pem: std::fs::read_to_string(path)?,
            ttl: chrono::Duration::days(365),
        }),
        None => None,
    };

    let mode = if args.strict {
        ValidationMode::Strict
    } else {
        ValidationMode::Aggregate
    };

    let (result, _guard) = Validator::verify(
        &args.bundle,
        ExtractLimits::default(),
        mode,
        Some(&approval_checker),
        attestation_checker.as_ref().map(|a| a as &dyn specular_core::bundle::validator::AttestationChecker),
    );

    println!("checksum_valid={} approvals_valid={} attestation_valid={}",
        result.checksum_valid, result.approvals_valid, result.attestation_valid);
    for error in &result.errors {
        eprintln!("error: {error}");
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("bundle failed verification with {} error(s)", result.errors.len());
    }
}
