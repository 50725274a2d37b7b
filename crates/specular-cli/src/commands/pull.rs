use clap::Args;
use specular_registry::{Reference, RegistryClient};
use std::path::PathBuf;

#[derive(Args)]
pub struct PullArgs {
    reference: String,
    #[arg(long)]
    out: PathBuf,
    #[arg(long, env = "SPECULAR_REGISTRY_USER")]
    username: Option<String>,
    #[arg(long, env = "SPECULAR_REGISTRY_PASSWORD")]
    password: Option<String>,
}

pub async fn run(args: PullArgs) -> anyhow::Result<()> {
    let reference = Reference::parse(&args.reference)?;

    let client = match (args.username, args.password) {
        (Some(u), Some(p)) => RegistryClient::with_credentials(u, p),
        _ => RegistryClient::new(),
    };

    let bytes = client.pull(&reference).await?;
    std::fs::write(&args.out, &bytes)?;
    println!("pulled {reference} -> {}", args.out.display());
    Ok(())
}
