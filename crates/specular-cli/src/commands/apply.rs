use clap::Args;
use specular_approval::QuorumChecker;
use specular_approval::TrustStore;
use specular_core::apply::{apply_bundle, ApplyOptions};
use std::path::PathBuf;

#[derive(Args)]
pub struct ApplyArgs {
    bundle: PathBuf,
    target: PathBuf,
    #[arg(long)]
    trust_store: Option<PathBuf>,
    #[arg(long)]
    exclude: Vec<String>,
    /// Show planned changes without touching the target tree.
    #[arg(long)]
    dry_run: bool,
}

pub fn run(args: ApplyArgs) -> anyhow::Result<()> {
    let trust = match &args.trust_store {
        Some(path) => TrustStore::load(path)?,
        None => TrustStore::default(),
    };
    let approval_checker = QuorumChecker::new(trust);

    let options = ApplyOptions {
        exclude: args.exclude,
        dry_run: args.dry_run,
    };

    let actions = apply_bundle(&args.bundle, &args.target, &options, Some(&approval_checker), None)?;
    for action in actions {
        println!("{action}");
    }
    Ok(())
}
