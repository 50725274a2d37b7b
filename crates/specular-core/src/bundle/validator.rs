//! Bundle validator (C5): extract -> manifest -> checksums -> approvals -> attestation.

use crate::bundle::{extract_archive, ExtractLimits, ATTESTATION_PATH, CHECKSUMS_PATH, MANIFEST_PATH};
use crate::digest::{canonical_manifest_bytes, digest_bytes, digest_file};
use crate::error::{ErrorKind, SpecularError};
use crate::manifest::Manifest;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// How strictly [`Validator::verify`] treats accumulated findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Stop and return on the first error.
    Strict,
    /// Run every check and collect all findings before returning.
    Aggregate,
}

/// Caller-supplied approval quorum check, implemented by `specular-approval`.
///
/// Kept as a trait so `specular-core` never depends on signature-scheme
/// crates; the validator only needs a yes/no plus the failures to report.
pub trait ApprovalChecker {
    fn check(
        &self,
        manifest: &Manifest,
        bundle_digest: &str,
        approval_files: &BTreeMap<String, Vec<u8>>,
    ) -> Result<(), Vec<SpecularError>>;
}

/// Caller-supplied attestation check, implemented by `specular-attestation`.
///
/// `bundle_digest` is the SHA-256 of the archive file itself (the value
/// attestation subjects are bound to, I5) -- not the manifest's integrity
/// digest.
pub trait AttestationChecker {
    fn check(&self, manifest: &Manifest, bundle_digest: &str, attestation_bytes: Option<&[u8]>) -> Result<(), Vec<SpecularError>>;
}

/// Aggregate outcome of [`Validator::verify`].
#[derive(Debug)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<SpecularError>,
    pub checksum_valid: bool,
    pub approvals_valid: bool,
    pub attestation_valid: bool,
    pub manifest: Option<Manifest>,
}

impl ValidationResult {
    fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            checksum_valid: false,
            approvals_valid: false,
            attestation_valid: false,
            manifest: None,
        }
    }

    fn push(&mut self, err: SpecularError) {
        self.valid = false;
        self.errors.push(err);
    }
}

pub struct Validator;

impl Validator {
    /// Run the full verification pipeline against a bundle file.
    ///
    /// `approval_checker`/`attestation_checker` are optional: omitting one
    /// skips that stage and leaves the corresponding `*_valid` flag `false`,
    /// which is the correct behavior for callers that only need integrity
    /// verification (e.g. `diff` and `apply` before quorum is established).
    pub fn verify(
        bundle_path: &Path,
        limits: ExtractLimits,
        mode: ValidationMode,
        approval_checker: Option<&dyn ApprovalChecker>,
        attestation_checker: Option<&dyn AttestationChecker>,
    ) -> (ValidationResult, TempDir) {
        let mut result = ValidationResult::new();
        let extract_dir = tempfile::tempdir().expect("creating extraction scratch directory");

        let bundle_digest = match digest_file(bundle_path) {
            Ok(d) => d,
            Err(e) => {
                result.push(SpecularError::new(
                    ErrorKind::CorruptedBundle,
                    format!("hashing bundle: {e}"),
                ));
                return (result, extract_dir);
            }
        };

        let file = match fs::File::open(bundle_path) {
            Ok(f) => f,
            Err(e) => {
                result.push(SpecularError::new(
                    ErrorKind::CorruptedBundle,
                    format!("opening bundle: {e}"),
                ));
                return (result, extract_dir);
            }
        };

        if let Err(e) = extract_archive(file, extract_dir.path(), limits) {
            result.push(e);
            return (result, extract_dir);
        }

        let manifest_path = extract_dir.path().join(MANIFEST_PATH);
        let manifest: Manifest = match fs::read(&manifest_path).ok().and_then(|bytes| serde_yaml::from_slice(&bytes).ok()) {
            Some(m) => m,
            None => {
                result.push(SpecularError::new(
                    ErrorKind::InvalidManifest,
                    "manifest.yaml missing or not parseable",
                ));
                return (result, extract_dir);
            }
        };

        if let Err(e) = manifest.validate() {
            result.push(e);
            if mode == ValidationMode::Strict {
                return (result, extract_dir);
            }
        }

        let canonical = match canonical_manifest_bytes(&manifest) {
            Ok(bytes) => bytes,
            Err(e) => {
                result.push(SpecularError::new(ErrorKind::InvalidManifest, e.to_string()));
                return (result, extract_dir);
            }
        };
        let recomputed_digest = digest_bytes(&canonical);
        if recomputed_digest != manifest.integrity.manifest_digest {
            result.push(SpecularError::new(
                ErrorKind::DigestMismatch,
                format!(
                    "manifest digest mismatch: recorded {}, recomputed {recomputed_digest}",
                    manifest.integrity.manifest_digest
                ),
            ));
            if mode == ValidationMode::Strict {
                return (result, extract_dir);
            }
        }

        // Checksums: every manifest file entry must match both checksums.txt and the bytes on disk.
        let checksums_path = extract_dir.path().join(CHECKSUMS_PATH);
        let recorded: BTreeMap<String, String> = fs::read_to_string(&checksums_path)
            .ok()
            .map(|content| parse_checksums(&content))
            .unwrap_or_default();

        let mut checksum_ok = true;
        for entry in &manifest.files {
            let full = extract_dir.path().join(&entry.path);
            if !full.is_file() {
                result.push(SpecularError::new(
                    ErrorKind::MissingFile,
                    format!("file '{}' listed in manifest is missing from the archive", entry.path),
                ));
                checksum_ok = false;
                if mode == ValidationMode::Strict {
                    return (result, extract_dir);
                }
                continue;
            }
            let expected = entry.sha256.trim_start_matches("sha256:");
            match recorded.get(&entry.path) {
                Some(listed) if listed == expected => {}
                _ => {
                    result.push(SpecularError::new(
                        ErrorKind::ChecksumMismatch,
                        format!("'{}' is not recorded correctly in checksums.txt", entry.path),
                    ));
                    checksum_ok = false;
                    if mode == ValidationMode::Strict {
                        return (result, extract_dir);
                    }
                }
            }
            match digest_file(&full) {
                Ok(actual) if actual.trim_start_matches("sha256:") == expected => {}
                Ok(actual) => {
                    result.push(SpecularError::new(
                        ErrorKind::ChecksumMismatch,
                        format!("'{}' sha256 {actual} does not match manifest {}", entry.path, entry.sha256),
                    ));
                    checksum_ok = false;
                    if mode == ValidationMode::Strict {
                        return (result, extract_dir);
                    }
                }
                Err(e) => {
                    result.push(SpecularError::new(ErrorKind::CorruptedBundle, e.to_string()));
                    checksum_ok = false;
                    if mode == ValidationMode::Strict {
                        return (result, extract_dir);
                    }
                }
            }
        }
        result.checksum_valid = checksum_ok;

        if let Some(checker) = approval_checker {
            let approval_files = collect_dir(extract_dir.path(), "approvals");
            match checker.check(&manifest, &bundle_digest, &approval_files) {
                Ok(()) => result.approvals_valid = true,
                Err(errs) => {
                    for e in errs {
                        result.push(e);
                    }
                    if mode == ValidationMode::Strict {
                        result.manifest = Some(manifest);
                        return (result, extract_dir);
                    }
                }
            }
        }

        if let Some(checker) = attestation_checker {
            let attestation_bytes = fs::read(extract_dir.path().join(ATTESTATION_PATH)).ok();
            match checker.check(&manifest, &bundle_digest, attestation_bytes.as_deref()) {
                Ok(()) => result.attestation_valid = true,
                Err(errs) => {
                    for e in errs {
                        result.push(e);
                    }
                }
            }
        }

        result.manifest = Some(manifest);
        (result, extract_dir)
    }
}

fn parse_checksums(content: &str) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some((hash, path)) = line.split_once("  ") {
            out.insert(path.to_string(), hash.to_string());
        }
    }
    out
}

fn collect_dir(root: &Path, rel: &str) -> BTreeMap<String, Vec<u8>> {
    let mut out = BTreeMap::new();
    let dir = root.join(rel);
    let Ok(entries) = fs::read_dir(&dir) else {
        return out;
    };
    for entry in entries.flatten() {
        if entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            if let Ok(bytes) = fs::read(entry.path()) {
                out.insert(format!("{rel}/{}", entry.file_name().to_string_lossy()), bytes);
            }
        }
    }
    out
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
    fn verifies_a_freshly_built_bundle() {
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
        let dest = source.path().join("out.bundle");
        BundleBuilder::build(&input, &options, &dest).unwrap();

        let (result, _guard) = Validator::verify(&dest, ExtractLimits::default(), ValidationMode::Aggregate, None, None);
        assert!(result.valid, "{:?}", result.errors);
        assert!(result.checksum_valid);
    }

    #[test]
    fn rejects_bundle_with_tampered_file() {
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
        let dest = source.path().join("out.bundle");
        BundleBuilder::build(&input, &options, &dest).unwrap();

        // Flip a byte well past the gzip header to corrupt the stream deterministically.
        let mut bytes = fs::read(&dest).unwrap();
        let tail = bytes.len() - 1;
        bytes[tail] ^= 0xFF;
        fs::write(&dest, &bytes).unwrap();

        let (result, _guard) = Validator::verify(&dest, ExtractLimits::default(), ValidationMode::Strict, None, None);
        assert!(!result.valid);
    }
}
