use clap::Args;
use specular_core::bundle::builder::{BuildInput, BuildOptions, Builder};
use std::path::PathBuf;

#[derive(Args)]
pub struct BuildArgs {
    /// Directory containing spec.yaml, spec.lock.json, routing.yaml, and policies/.
    #[arg(long)]
    source: PathBuf,
    /// Output bundle path.
    #[arg(long)]
    out: PathBuf,
    /// Bundle id, e.g. "acme/payments-policy".
    #[arg(long)]
    id: String,
    /// Bundle version.
    #[arg(long)]
    version: String,
    /// Required approval roles, repeatable.
    #[arg(long = "require-approval")]
    required_approvals: Vec<String>,
}

pub fn run(args: BuildArgs) -> anyhow::Result<()> {
    let input = BuildInput {
        source_dir: args.source,
        additional_files: vec![],
    };
    let options = BuildOptions {
        id: args.id,
        version: args.version,
        required_approvals: args.required_approvals,
        ..Default::default()
    };
    let built = Builder::build(&input, &options, &args.out)?;
    println!(
        "built {} (bundle digest {}, manifest digest {})",
        args.out.display(),
        built.bundle_digest,
        built.manifest_digest
    );
    Ok(())
}
