use clap::Args;
use specular_core::bundle::{ExtractLimits, ValidationMode, Validator};
use specular_core::diff::diff_manifests;
use std::path::PathBuf;

#[derive(Args)]
pub struct DiffArgs {
    before: PathBuf,
    after: PathBuf,
    /// Emit the diff as JSON instead of a human-readable summary.
    #[arg(long)]
    json: bool,
}

pub fn run(args: DiffArgs) -> anyhow::Result<()> {
    let (before_result, _g1) = Validator::verify(&args.before, ExtractLimits::default(), ValidationMode::Aggregate, None, None);
    let (after_result, _g2) = Validator::verify(&args.after, ExtractLimits::default(), ValidationMode::Aggregate, None, None);

    let before = before_result
        .manifest
        .ok_or_else(|| anyhow::anyhow!("could not read a manifest from {}", args.before.display()))?;
    let after = after_result
        .manifest
        .ok_or_else(|| anyhow::anyhow!("could not read a manifest from {}", args.after.display()))?;

    let diff = diff_manifests(&before, &after);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&diff)?);
        return Ok(());
    }

    for entry in &diff.added {
        println!("+ {}", entry.path);
    }
    for entry in &diff.removed {
        println!("- {}", entry.path);
    }
    for entry in &diff.modified {
        println!("~ {} ({} -> {})", entry.path, &entry.before_sha256[..8.min(entry.before_sha256.len())], &entry.after_sha256[..8.min(entry.after_sha256.len())]);
    }
    for change in &diff.metadata_changes {
        println!("metadata {}: {:?} -> {:?}", change.key, change.before, change.after);
    }
    if diff.is_empty() {
        println!("no structural changes");
    }
    Ok(())
}
