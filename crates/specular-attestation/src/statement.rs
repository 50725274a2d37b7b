//! In-toto v1 statement envelope.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATEMENT_TYPE: &str = "https://in-toto.io/Statement/v1";
pub const SLSA_PROVENANCE_PREDICATE_TYPE: &str = "https://slsa.dev/provenance/v1";

/// One attested artifact, identified by digest (never by mutable name alone).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub name: String,
    pub digest: BTreeMap<String, String>,
}

/// An in-toto v1 Statement: a typed subject list plus an opaque predicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    #[serde(rename = "_type")]
    pub statement_type: String,
    pub subject: Vec<Subject>,
    #[serde(rename = "predicateType")]
    pub predicate_type: String,
    pub predicate: serde_json::Value,
}

impl Statement {
    /// `bundle_digest` is the SHA-256 of the archive file itself (I5), not
    /// the manifest's integrity digest.
    pub fn new(bundle_id: &str, bundle_digest: &str, predicate_type: &str, predicate: serde_json::Value) -> Self {
        let mut digest = BTreeMap::new();
        digest.insert("sha256".to_string(), bundle_digest.trim_start_matches("sha256:").to_string());
        Self {
            statement_type: STATEMENT_TYPE.to_string(),
            subject: vec![Subject {
                name: bundle_id.to_string(),
                digest,
            }],
            predicate_type: predicate_type.to_string(),
            predicate,
        }
    }

    /// Canonical JSON bytes this statement is signed over.
    pub fn canonical_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Whether the statement's subject digest matches `bundle_digest` (I5).
    pub fn binds_digest(&self, bundle_digest: &str) -> bool {
        let expected = bundle_digest.trim_start_matches("sha256:");
        self.subject
            .iter()
            .any(|s| s.digest.get("sha256").map(|d| d.as_str()) == Some(expected))
    }
}
