use clap::Args;
use specular_registry::{Reference, RegistryClient};
use std::path::PathBuf;

#[derive(Args)]
pub struct PushArgs {
    bundle: PathBuf,
    /// e.g. "ghcr.io/acme/payments-policy:1.0.0".
    reference: String,
    #[arg(long, env = "SPECULAR_REGISTRY_USER")]
    username: Option<String>,
    #[arg(long, env = "SPECULAR_REGISTRY_PASSWORD")]
    password: Option<String>,
}

pub async fn run(args: PushArgs) -> anyhow::Result<()> {
    let reference = Reference::parse(&args.reference)?;
    let bundle_bytes = std::fs::read(&args.bundle)?;

    let client = match (args.username, args.password) {
        (Some(u), Some(p)) => RegistryClient::with_credentials(u, p),
        _ => RegistryClient::new(),
    };

    let digest = client.push(&reference, bundle_bytes).await?;
    println!("pushed {reference} ({digest})");
    Ok(())
}
