//! Bundle builder (C4): deterministic archive assembly from a source tree.

use crate::bundle::limits::ExtractLimits;
use crate::bundle::{
    extract_archive, ArchiveWriter, APPROVALS_DIR, ATTESTATION_PATH, CHECKSUMS_PATH, MANIFEST_PATH,
    POLICIES_DIR, ROUTING_PATH, SPEC_LOCK_PATH, SPEC_PATH,
};
use crate::digest::{canonical_manifest_bytes, digest_bytes, digest_file};
use crate::error::{ErrorKind, Result, SpecularError};
use crate::manifest::{FileEntry, GovernanceLevel, IntegrityDescriptor, Manifest, SCHEMA_V1};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// The files and metadata a bundle is assembled from.
///
/// `source_dir` must contain `spec.yaml`, `spec.lock.json`, and `routing.yaml`
/// at its root, a `policies/` directory of `policy_*.yaml` files, and may
/// contain additional files, pre-collected `approvals/*.yaml`, and a single
/// `attestations/attestation.yaml`.
pub struct BuildInput {
    pub source_dir: PathBuf,
    pub additional_files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub id: String,
    pub version: String,
    pub governance_level: Option<GovernanceLevel>,
    pub required_approvals: Vec<String>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub tags: Vec<String>,
    pub dependencies: Vec<String>,
    pub metadata: BTreeMap<String, String>,
}

/// The two digests a freshly built bundle carries.
///
/// `manifest_digest` (`integrity.digest`) is the root of trust for the file
/// checksums (I3) and is stable across the approval/attestation repack
/// lifecycle. `bundle_digest` is the SHA-256 of the archive file itself --
/// the value approvals and attestations are signed against (glossary:
/// "Bundle digest"). Repacking to add an approval or attestation changes the
/// archive bytes and therefore `bundle_digest`, which is why both signing
/// operations must be handed the digest observed immediately before their
/// own repack, not one recomputed afterward.
#[derive(Debug, Clone)]
pub struct BuiltBundle {
    pub manifest_digest: String,
    pub bundle_digest: String,
}

/// Assembles bundles from a source tree in the exact order the format requires.
pub struct Builder;

impl Builder {
    /// Build a bundle at `dest_path`, writing to a temp file in the same
    /// directory first and renaming into place only on full success, so a
    /// failed build never leaves a partial or corrupt bundle at `dest_path`.
    pub fn build(input: &BuildInput, options: &BuildOptions, dest_path: &Path) -> Result<BuiltBundle> {
        let required = [SPEC_PATH, SPEC_LOCK_PATH, ROUTING_PATH];
        for name in required {
            if !input.source_dir.join(name).is_file() {
                return Err(SpecularError::new(
                    ErrorKind::MissingFile,
                    format!("required file '{name}' not found under {}", input.source_dir.display()),
                ));
            }
        }

        let mut relative_paths = vec![
            SPEC_PATH.to_string(),
            SPEC_LOCK_PATH.to_string(),
            ROUTING_PATH.to_string(),
        ];
        relative_paths.extend(collect_sorted_dir(&input.source_dir, POLICIES_DIR)?);
        for extra in &input.additional_files {
            let rel = extra
                .strip_prefix(&input.source_dir)
                .map_err(|_| {
                    SpecularError::new(
                        ErrorKind::InvalidManifest,
                        format!("additional file {} is not under the source tree", extra.display()),
                    )
                })?
                .to_string_lossy()
                .replace('\\', "/");
            relative_paths.push(rel);
        }
        relative_paths.extend(collect_sorted_dir(&input.source_dir, APPROVALS_DIR)?);
        let has_attestation = input.source_dir.join(ATTESTATION_PATH).is_file();
        if has_attestation {
            relative_paths.push(ATTESTATION_PATH.to_string());
        }

        // Parallel checksum pass: independent per file, order-insensitive.
        let hashed: Vec<Result<FileEntry>> = relative_paths
            .par_iter()
            .map(|rel| {
                let full = input.source_dir.join(rel);
                let metadata = fs::metadata(&full)?;
                let sha256 = digest_file(&full)
                    .map_err(|e| SpecularError::new(ErrorKind::CorruptedBundle, e.to_string()))?;
                Ok(FileEntry {
                    path: rel.clone(),
                    size: metadata.len(),
                    sha256,
                    mode: file_mode(&metadata),
                    content_type: None,
                })
            })
            .collect();

        let mut files = Vec::with_capacity(hashed.len());
        for entry in hashed {
            files.push(entry?);
        }

        let manifest = Manifest {
            schema: SCHEMA_V1.to_string(),
            id: options.id.clone(),
            version: options.version.clone(),
            created_at: Utc::now(),
            integrity: IntegrityDescriptor::placeholder(),
            files,
            governance_level: options.governance_level,
            required_approvals: options.required_approvals.clone(),
            metadata: options.metadata.clone(),
            description: options.description.clone(),
            authors: options.authors.clone(),
            tags: options.tags.clone(),
            dependencies: options.dependencies.clone(),
        };
        manifest.validate()?;

        let canonical = canonical_manifest_bytes(&manifest)
            .map_err(|e| SpecularError::new(ErrorKind::InvalidManifest, e.to_string()))?;
        let manifest_digest = digest_bytes(&canonical);
        let mut manifest = manifest;
        manifest.integrity.manifest_digest = manifest_digest.clone();
        manifest.integrity.digest = format!("sha256:{manifest_digest}");

        let manifest_bytes = serde_yaml::to_vec(&manifest)
            .map_err(|e| SpecularError::new(ErrorKind::InvalidManifest, e.to_string()))?;

        let checksums_bytes = render_checksums(&manifest);

        let parent = dest_path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;
        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = ArchiveWriter::new(temp.reopen()?);
            writer.add_entry(MANIFEST_PATH, &manifest_bytes, 0o640)?;
            for rel in &relative_paths {
                let full = input.source_dir.join(rel);
                let data = fs::read(&full)?;
                let mode = file_mode(&fs::metadata(&full)?).unwrap_or(0o600);
                writer.add_entry(rel, &data, mode)?;
            }
            writer.add_entry(CHECKSUMS_PATH, &checksums_bytes, 0o640)?;
            writer.finish()?;
        }
        temp.persist(dest_path)
            .map_err(|e| SpecularError::new(ErrorKind::CorruptedBundle, e.error.to_string()))?;

        let bundle_digest = digest_file(dest_path)
            .map_err(|e| SpecularError::new(ErrorKind::CorruptedBundle, e.to_string()))?;

        Ok(BuiltBundle {
            manifest_digest: manifest.integrity.digest.clone(),
            bundle_digest,
        })
    }

    /// Insert `bytes` at `rel_path` (an `approvals/*.yaml` or
    /// `attestations/attestation.yaml` entry) into an already-built bundle
    /// and re-archive it in place.
    ///
    /// The manifest and `checksums.txt` are carried over byte-for-byte --
    /// approvals and attestations are explicitly exempt from the file
    /// inventory (I1) -- so this never touches the integrity digest.
    /// Returns the new bundle digest, computed after the repack.
    pub fn repack_with_file(bundle_path: &Path, rel_path: &str, bytes: &[u8], mode: u32) -> Result<String> {
        let scratch = tempfile::tempdir()?;
        let file = fs::File::open(bundle_path)?;
        extract_archive(file, scratch.path(), ExtractLimits::default())?;

        let target = scratch.path().join(rel_path);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, bytes)?;

        let mut relative_paths: Vec<String> = Vec::new();
        relative_paths.extend(collect_sorted_dir(scratch.path(), POLICIES_DIR)?);
        for entry in walk_additional_files(scratch.path())? {
            relative_paths.push(entry);
        }
        relative_paths.extend(collect_sorted_dir(scratch.path(), APPROVALS_DIR)?);
        if scratch.path().join(ATTESTATION_PATH).is_file() {
            relative_paths.push(ATTESTATION_PATH.to_string());
        }

        let manifest_bytes = fs::read(scratch.path().join(MANIFEST_PATH))?;
        let checksums_bytes = fs::read(scratch.path().join(CHECKSUMS_PATH))?;

        let parent = bundle_path.parent().unwrap_or_else(|| Path::new("."));
        let temp = NamedTempFile::new_in(parent)?;
        {
            let mut writer = ArchiveWriter::new(temp.reopen()?);
            writer.add_entry(MANIFEST_PATH, &manifest_bytes, 0o640)?;
            for rel in &relative_paths {
                let full = scratch.path().join(rel);
                let data = fs::read(&full)?;
                let entry_mode = if rel == rel_path { mode } else { file_mode(&fs::metadata(&full)?).unwrap_or(0o600) };
                writer.add_entry(rel, &data, entry_mode)?;
            }
            writer.add_entry(CHECKSUMS_PATH, &checksums_bytes, 0o640)?;
            writer.finish()?;
        }
        temp.persist(bundle_path)
            .map_err(|e| SpecularError::new(ErrorKind::CorruptedBundle, e.error.to_string()))?;

        digest_file(bundle_path).map_err(|e| SpecularError::new(ErrorKind::CorruptedBundle, e.to_string()))
    }
}

/// The non-reserved, non-policy top-level files carried over verbatim during
/// a repack: `spec.yaml`, `spec.lock.json`, `routing.yaml`, and any
/// additional files the original build included.
fn walk_additional_files(extracted_root: &Path) -> Result<Vec<String>> {
    let mut names = vec![
        SPEC_PATH.to_string(),
        SPEC_LOCK_PATH.to_string(),
        ROUTING_PATH.to_string(),
    ];
    let reserved = [
        MANIFEST_PATH,
        CHECKSUMS_PATH,
        SPEC_PATH,
        SPEC_LOCK_PATH,
        ROUTING_PATH,
    ];
    for entry in fs::read_dir(extracted_root)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if reserved.contains(&name.as_str()) {
            continue;
        }
        names.push(name);
    }
    Ok(names)
}

/// `checksums.txt`: one `sha256  path` line per file entry, sorted by path.
fn render_checksums(manifest: &Manifest) -> Vec<u8> {
    let mut entries: Vec<&FileEntry> = manifest.files.iter().collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    let mut out = String::new();
    for entry in entries {
        let hash = entry.sha256.trim_start_matches("sha256:");
        out.push_str(hash);
        out.push_str("  ");
        out.push_str(&entry.path);
        out.push('\n');
    }
    out.into_bytes()
}

fn collect_sorted_dir(source_dir: &Path, rel_dir: &str) -> Result<Vec<String>> {
    let dir = source_dir.join(rel_dir);
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            names.push(format!("{rel_dir}/{}", entry.file_name().to_string_lossy()));
        }
    }
    names.sort();
    Ok(names)
}

#[cfg(unix)]
fn file_mode(metadata: &fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn file_mode(_metadata: &fs::Metadata) -> Option<u32> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, rel: &str, contents: &str) {
        let full = dir.join(rel);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, contents).unwrap();
    }

    #[test]
    fn builds_a_bundle_with_required_files() {
        let source = tempdir().unwrap();
        write(source.path(), SPEC_PATH, "product: demo\n");
        write(source.path(), SPEC_LOCK_PATH, "{}\n");
        write(source.path(), ROUTING_PATH, "routes: []\n");
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
        let dest = source.path().join("out.bundle");
        let built = Builder::build(&input, &options, &dest).unwrap();
        assert!(built.manifest_digest.starts_with("sha256:"));
        assert!(built.bundle_digest.starts_with("sha256:"));
        assert_ne!(built.manifest_digest, built.bundle_digest);
        assert!(dest.is_file());
    }

    #[test]
    fn repack_preserves_manifest_digest_but_changes_bundle_digest() {
        let source = tempdir().unwrap();
        write(source.path(), SPEC_PATH, "product: demo\n");
        write(source.path(), SPEC_LOCK_PATH, "{}\n");
        write(source.path(), ROUTING_PATH, "routes: []\n");
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
        let dest = source.path().join("out.bundle");
        let built = Builder::build(&input, &options, &dest).unwrap();

        let new_digest = Builder::repack_with_file(
            &dest,
            "approvals/security.yaml",
            b"role: security\n",
            0o600,
        )
        .unwrap();
        assert_ne!(new_digest, built.bundle_digest);

        let check_dir = tempdir().unwrap();
        let entries = extract_archive(
            fs::File::open(&dest).unwrap(),
            check_dir.path(),
            ExtractLimits::default(),
        )
        .unwrap();
        assert!(entries.iter().any(|e| e.path == "approvals/security.yaml"));
        assert!(check_dir.path().join("manifest.yaml").is_file());
    }

    #[test]
    fn fails_when_required_file_missing() {
        let source = tempdir().unwrap();
        write(source.path(), SPEC_PATH, "product: demo\n");
        let input = BuildInput {
            source_dir: source.path().to_path_buf(),
            additional_files: vec![],
        };
        let options = BuildOptions {
            id: "acme/demo".to_string(),
            version: "1.0.0".to_string(),
            ..Default::default()
        };
        let dest = source.path().join("out.bundle");
        let err = Builder::build(&input, &options, &dest).unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingFile);
    }
}
