//! Bundle manifest model (C3): metadata, file inventory, integrity descriptor.

use crate::error::{ErrorKind, Result, SpecularError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The only schema identifier this implementation understands.
pub const SCHEMA_V1: &str = "specular.bundle/v1";

/// Governance level tag, `L1`..`L4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GovernanceLevel {
    L1,
    L2,
    L3,
    L4,
}

/// A single file recorded in the manifest's inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub size: u64,
    pub sha256: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// Algorithm + digest binding the manifest to its own content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntegrityDescriptor {
    pub algorithm: String,
    /// `"sha256:" + hex`, computed over the canonical manifest with this
    /// field cleared.
    pub digest: String,
    /// The same value as `digest`, without the algorithm prefix.
    pub manifest_digest: String,
}

impl IntegrityDescriptor {
    pub fn placeholder() -> Self {
        Self {
            algorithm: "sha256".to_string(),
            digest: String::new(),
            manifest_digest: String::new(),
        }
    }
}

/// Bundle metadata, file inventory, and integrity descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub schema: String,
    pub id: String,
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub integrity: IntegrityDescriptor,
    pub files: Vec<FileEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub governance_level: Option<GovernanceLevel>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_approvals: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,
}

impl Manifest {
    /// Validate presence/non-emptiness of the required fields (I1, I6).
    pub fn validate(&self) -> Result<()> {
        if self.schema != SCHEMA_V1 {
            return Err(SpecularError::new(
                ErrorKind::InvalidManifest,
                format!("unsupported schema '{}', expected '{}'", self.schema, SCHEMA_V1),
            )
            .with_suggestion("rebuild the bundle with a compatible Specular toolchain"));
        }
        if self.id.trim().is_empty() {
            return Err(SpecularError::new(
                ErrorKind::InvalidManifest,
                "manifest id is empty",
            ));
        }
        if self.version.trim().is_empty() {
            return Err(SpecularError::new(
                ErrorKind::InvalidManifest,
                "manifest version is empty",
            ));
        }
        if self.integrity.digest.is_empty() || self.integrity.manifest_digest.is_empty() {
            return Err(SpecularError::new(
                ErrorKind::InvalidManifest,
                "manifest integrity descriptor is empty",
            ));
        }
        if self.files.is_empty() {
            return Err(SpecularError::new(
                ErrorKind::InvalidManifest,
                "manifest file inventory is empty",
            ));
        }
        Ok(())
    }

    /// Look up a recorded file entry by in-archive path.
    pub fn file(&self, path: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Whether `path` is present in the file inventory.
    pub fn contains(&self, path: &str) -> bool {
        self.file(path).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Manifest {
        Manifest {
            schema: SCHEMA_V1.to_string(),
            id: "owner/name".to_string(),
            version: "1.0.0".to_string(),
            created_at: Utc::now(),
            integrity: IntegrityDescriptor {
                algorithm: "sha256".to_string(),
                digest: "sha256:deadbeef".to_string(),
                manifest_digest: "deadbeef".to_string(),
            },
            files: vec![FileEntry {
                path: "spec.yaml".to_string(),
                size: 10,
                sha256: "abc".to_string(),
                mode: None,
                content_type: None,
            }],
            governance_level: None,
            required_approvals: vec![],
            metadata: BTreeMap::new(),
            description: None,
            authors: vec![],
            tags: vec![],
            dependencies: vec![],
        }
    }

    #[test]
    fn validate_accepts_well_formed_manifest() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn validate_rejects_unknown_schema() {
        let mut m = sample();
        m.schema = "specular.bundle/v2".to_string();
        let err = m.validate().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidManifest);
    }

    #[test]
    fn validate_rejects_empty_files() {
        let mut m = sample();
        m.files.clear();
        assert!(m.validate().is_err());
    }

    #[test]
    fn lookup_by_path() {
        let m = sample();
        assert!(m.contains("spec.yaml"));
        assert!(!m.contains("missing.yaml"));
    }
}
