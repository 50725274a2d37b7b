//! Apply engine (C9): verify-first, whitelist-copy of a bundle into a target tree.

use crate::bundle::validator::{ApprovalChecker, AttestationChecker, ValidationMode, Validator};
use crate::bundle::ExtractLimits;
use crate::error::{ErrorKind, Result, SpecularError};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// One planned filesystem change, in dry-run or real application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyAction {
    Create(String),
    Update(String),
    Skip(String),
}

impl std::fmt::Display for ApplyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApplyAction::Create(p) => write!(f, "[CREATE] {p}"),
            ApplyAction::Update(p) => write!(f, "[UPDATE] {p}"),
            ApplyAction::Skip(p) => write!(f, "[SKIP] {p}"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub exclude: Vec<String>,
    pub dry_run: bool,
}

fn build_excludes(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| SpecularError::new(ErrorKind::InvalidBundle, format!("bad exclude pattern '{pattern}': {e}")))?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| SpecularError::new(ErrorKind::InvalidBundle, e.to_string()))
}

/// Verify `bundle_path`, then plan (and optionally perform) copying its
/// files into `target_dir`, skipping anything matched by `exclude`.
///
/// Verification always runs first and in [`ValidationMode::Strict`]: a
/// bundle that fails integrity or approval checks is never applied, even
/// partially.
pub fn apply_bundle(
    bundle_path: &Path,
    target_dir: &Path,
    options: &ApplyOptions,
    approval_checker: Option<&dyn ApprovalChecker>,
    attestation_checker: Option<&dyn AttestationChecker>,
) -> Result<Vec<ApplyAction>> {
    let (result, extract_dir) = Validator::verify(
        bundle_path,
        ExtractLimits::default(),
        ValidationMode::Strict,
        approval_checker,
        attestation_checker,
    );
    if !result.valid {
        let first = result
            .errors
            .into_iter()
            .next()
            .unwrap_or_else(|| SpecularError::new(ErrorKind::InvalidBundle, "bundle failed verification"));
        return Err(first);
    }
    let manifest = result
        .manifest
        .ok_or_else(|| SpecularError::new(ErrorKind::InvalidBundle, "verification produced no manifest"))?;

    let excludes = build_excludes(&options.exclude)?;

    let mut actions = Vec::new();
    for entry in &manifest.files {
        if excludes.is_match(&entry.path) {
            actions.push(ApplyAction::Skip(entry.path.clone()));
            continue;
        }
        let dest_path = resolve_target_path(target_dir, &entry.path)?;
        let action = if dest_path.exists() {
            ApplyAction::Update(entry.path.clone())
        } else {
            ApplyAction::Create(entry.path.clone())
        };

        if !options.dry_run {
            if let Some(parent) = dest_path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(extract_dir.path().join(&entry.path), &dest_path)?;
            info!(path = %entry.path, "applied bundle file");
        }
        actions.push(action);
    }

    actions.sort_by(|a, b| apply_action_path(a).cmp(apply_action_path(b)));
    Ok(actions)
}

fn apply_action_path(action: &ApplyAction) -> &str {
    match action {
        ApplyAction::Create(p) | ApplyAction::Update(p) | ApplyAction::Skip(p) => p,
    }
}

/// Join `rel` onto `target_dir`, rejecting anything that would escape it.
///
/// The manifest's own file paths were already validated at build/extract
/// time, but the apply boundary is security-relevant independently of that:
/// this guards against a manifest that was hand-edited after signing but
/// before a deliberately permissive verifier accepted it.
fn resolve_target_path(target_dir: &Path, rel: &str) -> Result<PathBuf> {
    let rel_path = Path::new(rel);
    if rel_path.is_absolute() || rel_path.components().any(|c| matches!(c, std::path::Component::ParentDir)) {
        return Err(SpecularError::new(
            ErrorKind::InvalidBundle,
            format!("manifest path '{rel}' is unsafe to apply"),
        ));
    }
    Ok(target_dir.join(rel_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::builder::{BuildInput, BuildOptions, Builder as BundleBuilder};
    use tempfile::tempdir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let full = dir.join(rel);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, contents).unwrap();
    }

    #[test]
    fn dry_run_enumerates_creates() {
        let source = tempdir().unwrap();
        write(source.path(), "spec.yaml", "product: demo\n");
        write(source.path(), "spec.lock.json", "{}\n");
        write(source.path(), "routing.yaml", "routes: []\n");

        let input = BuildInput {
            source_dir: source.path().to_path_buf(),
            additional_files: vec![],
        };
        let options = BuildOptions {
            id: "acme/demo".to_string(),
            version: "1.0.0".to_string(),
            ..Default::default()
        };
        let bundle_path = source.path().join("out.bundle");
        BundleBuilder::build(&input, &options, &bundle_path).unwrap();

        let target = tempdir().unwrap();
        let actions = apply_bundle(
            &bundle_path,
            target.path(),
            &ApplyOptions {
                exclude: vec![],
                dry_run: true,
            },
            None,
            None,
        )
        .unwrap();
        assert!(actions.iter().all(|a| matches!(a, ApplyAction::Create(_))));
        assert!(!target.path().join("spec.yaml").exists());
    }

    #[test]
    fn exclude_glob_skips_matching_files() {
        let source = tempdir().unwrap();
        write(source.path(), "spec.yaml", "product: demo\n");
        write(source.path(), "spec.lock.json", "{}\n");
        write(source.path(), "routing.yaml", "routes: []\n");
        write(source.path(), "policies/policy_1.yaml", "rule: allow\n");

        let input = BuildInput {
            source_dir: source.path().to_path_buf(),
            additional_files: vec![],
        };
        let options = BuildOptions {
            id: "acme/demo".to_string(),
            version: "1.0.0".to_string(),
            ..Default::default()
        };
        let bundle_path = source.path().join("out.bundle");
        BundleBuilder::build(&input, &options, &bundle_path).unwrap();

        let target = tempdir().unwrap();
        let actions = apply_bundle(
            &bundle_path,
            target.path(),
            &ApplyOptions {
                exclude: vec!["policies/**".to_string()],
                dry_run: false,
            },
            None,
            None,
        )
        .unwrap();
        assert!(actions.contains(&ApplyAction::Skip("policies/policy_1.yaml".to_string())));
        assert!(target.path().join("spec.yaml").exists());
        assert!(!target.path().join("policies/policy_1.yaml").exists());
    }
}
