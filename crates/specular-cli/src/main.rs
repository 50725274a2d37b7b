//! `specular`: build, verify, sign, attest, diff, apply, push, and pull
//! Specular governance bundles.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "specular", version, about = "Specular bundle governance toolchain")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Assemble a bundle from a source tree.
    Build(commands::build::BuildArgs),
    /// Verify a bundle's integrity, approvals, and attestation.
    Verify(commands::verify::VerifyArgs),
    /// Sign a bundle with an approval.
    Sign(commands::sign::SignArgs),
    /// Attach a provenance attestation to a bundle.
    Attest(commands::attest::AttestArgs),
    /// Show the structural diff between two bundles.
    Diff(commands::diff::DiffArgs),
    /// Apply a verified bundle's files onto a target tree.
    Apply(commands::apply::ApplyArgs),
    /// Push a bundle to an OCI registry.
    Push(commands::push::PushArgs),
    /// Pull a bundle from an OCI registry.
    Pull(commands::pull::PullArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Build(args) => commands::build::run(args),
        Commands::Verify(args) => commands::verify::run(args),
        Commands::Sign(args) => commands::sign::run(args),
        Commands::Attest(args) => commands::attest::run(args),
        Commands::Diff(args) => commands::diff::run(args),
        Commands::Apply(args) => commands::apply::run(args),
        Commands::Push(args) => commands::push::run(args).await,
        Commands::Pull(args) => commands::pull::run(args).await,
    }
}
