//! Stable byte-level representations and content digests.
//!
//! The manifest digest is the root of trust for every checksum in a bundle;
//! any encoder non-determinism here breaks verification downstream.

use crate::manifest::Manifest;
use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// SHA-256 of `bytes`, lowercase hex, unprefixed.
pub fn digest_bytes(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Streaming SHA-256 of a file, returned as `"sha256:" + hex`.
pub fn digest_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("reading {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

/// SHA-256 of an arbitrary reader, returned as `"sha256:" + hex`.
pub fn digest_reader<R: Read>(mut reader: R) -> Result<String> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut buf).context("streaming digest")?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("sha256:{}", hex::encode(hasher.finalize())))
}

/// Canonical YAML serialization of `manifest`, with the integrity digest
/// fields cleared before hashing.
///
/// `serde_yaml` emits struct fields in declaration order (not alphabetised),
/// which is deterministic across runs as long as the struct definition does
/// not change -- that field order is itself part of the contract.
pub fn canonical_manifest_bytes(manifest: &Manifest) -> Result<Vec<u8>> {
    let mut cleared = manifest.clone();
    cleared.integrity.digest = String::new();
    cleared.integrity.manifest_digest = String::new();
    serde_yaml::to_vec(&cleared).context("serializing canonical manifest")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_bytes_is_stable() {
        let a = digest_bytes(b"hello");
        let b = digest_bytes(b"hello");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn digest_bytes_differs_on_tamper() {
        assert_ne!(digest_bytes(b"hello"), digest_bytes(b"hellp"));
    }
}
