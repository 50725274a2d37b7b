//! Structural diff engine (C8): compares two manifests, never archive bytes.

use crate::manifest::{FileEntry, Manifest};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize)]
pub struct ModifiedFile {
    pub path: String,
    pub before_sha256: String,
    pub after_sha256: String,
    pub before_size: u64,
    pub after_size: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetadataChange {
    pub key: String,
    pub before: Option<String>,
    pub after: Option<String>,
}

/// A structural diff between two bundle manifests.
///
/// Every field is sorted by path/key so output is stable across runs and
/// across serialization formats.
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub added: Vec<FileEntry>,
    pub removed: Vec<FileEntry>,
    pub modified: Vec<ModifiedFile>,
    pub unchanged_count: usize,
    pub metadata_changes: Vec<MetadataChange>,
    pub version_before: String,
    pub version_after: String,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.modified.is_empty()
            && self.metadata_changes.is_empty()
    }
}

/// Compute the structural diff of `before` -> `after`.
///
/// This operates entirely on the two manifests' file inventories and
/// metadata maps; it never opens, extracts, or reads archive bytes, so it is
/// safe to run before either bundle has been integrity-verified.
pub fn diff_manifests(before: &Manifest, after: &Manifest) -> DiffResult {
    let before_index: BTreeMap<&str, &FileEntry> =
        before.files.iter().map(|f| (f.path.as_str(), f)).collect();
    let after_index: BTreeMap<&str, &FileEntry> =
        after.files.iter().map(|f| (f.path.as_str(), f)).collect();

    let mut added = Vec::new();
    let mut modified = Vec::new();
    let mut unchanged_count = 0;

    for (path, after_entry) in &after_index {
        match before_index.get(path) {
            None => added.push((*after_entry).clone()),
            Some(before_entry) => {
                if before_entry.sha256 != after_entry.sha256 {
                    modified.push(ModifiedFile {
                        path: path.to_string(),
                        before_sha256: before_entry.sha256.clone(),
                        after_sha256: after_entry.sha256.clone(),
                        before_size: before_entry.size,
                        after_size: after_entry.size,
                    });
                } else {
                    unchanged_count += 1;
                }
            }
        }
    }

    let mut removed: Vec<FileEntry> = before_index
        .iter()
        .filter(|(path, _)| !after_index.contains_key(*path))
        .map(|(_, entry)| (*entry).clone())
        .collect();

    added.sort_by(|a, b| a.path.cmp(&b.path));
    removed.sort_by(|a, b| a.path.cmp(&b.path));
    modified.sort_by(|a, b| a.path.cmp(&b.path));

    let metadata_changes = diff_metadata(&before.metadata, &after.metadata);

    DiffResult {
        added,
        removed,
        modified,
        unchanged_count,
        metadata_changes,
        version_before: before.version.clone(),
        version_after: after.version.clone(),
    }
}

fn diff_metadata(
    before: &std::collections::BTreeMap<String, String>,
    after: &std::collections::BTreeMap<String, String>,
) -> Vec<MetadataChange> {
    let mut keys: Vec<&String> = before.keys().chain(after.keys()).collect();
    keys.sort();
    keys.dedup();

    let mut changes = Vec::new();
    for key in keys {
        let b = before.get(key).cloned();
        let a = after.get(key).cloned();
        if b != a {
            changes.push(MetadataChange {
                key: key.clone(),
                before: b,
                after: a,
            });
        }
    }
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::IntegrityDescriptor;
    use chrono::Utc;

    fn manifest(files: Vec<FileEntry>, metadata: std::collections::BTreeMap<String, String>) -> Manifest {
        Manifest {
            schema: crate::manifest::SCHEMA_V1.to_string(),
            id: "acme/demo".to_string(),
            version: "1.0.0".to_string(),
            created_at: Utc::now(),
            integrity: IntegrityDescriptor::placeholder(),
            files,
            governance_level: None,
            required_approvals: vec![],
            metadata,
            description: None,
            authors: vec![],
            tags: vec![],
            dependencies: vec![],
        }
    }

    fn entry(path: &str, sha256: &str) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            size: 10,
            sha256: sha256.to_string(),
            mode: None,
            content_type: None,
        }
    }

    #[test]
    fn detects_additions_removals_and_modifications() {
        let before = manifest(
            vec![entry("spec.yaml", "aaa"), entry("routing.yaml", "bbb")],
            Default::default(),
        );
        let after = manifest(
            vec![entry("spec.yaml", "zzz"), entry("policies/policy_1.yaml", "ccc")],
            Default::default(),
        );
        let diff = diff_manifests(&before, &after);
        assert_eq!(diff.added.len(), 1);
        assert_eq!(diff.added[0].path, "policies/policy_1.yaml");
        assert_eq!(diff.removed.len(), 1);
        assert_eq!(diff.removed[0].path, "routing.yaml");
        assert_eq!(diff.modified.len(), 1);
        assert_eq!(diff.modified[0].path, "spec.yaml");
    }

    #[test]
    fn empty_diff_for_identical_manifests() {
        let m = manifest(vec![entry("spec.yaml", "aaa")], Default::default());
        let diff = diff_manifests(&m, &m);
        assert!(diff.is_empty());
        assert_eq!(diff.unchanged_count, 1);
    }
}
