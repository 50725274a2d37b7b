//! Approval records: parsing, per-record verification, and role quorum.

use crate::message::build_approval_message;
use crate::scheme::SignatureScheme;
use crate::trust::TrustStore;
use crate::{gpg, ssh};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use specular_core::bundle::validator::ApprovalChecker;
use specular_core::manifest::Manifest;
use specular_core::{ErrorKind, Result, SpecularError};
use std::collections::{BTreeMap, BTreeSet};

/// How long after signing an approval remains valid.
pub const DEFAULT_APPROVAL_TTL_DAYS: i64 = 90;

/// One `approvals/*.yaml` file's contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub role: String,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub scheme: SignatureScheme,
    pub key_id: String,
    pub signature: String,
}

impl ApprovalRecord {
    /// Verify this record's signature covers `bundle_digest` and was made by
    /// a key the trust store accepts for this role, and is not expired.
    pub fn verify(&self, bundle_digest: &str, trust: &TrustStore, ttl: Duration) -> Result<()> {
        if Utc::now() - self.timestamp > ttl {
            return Err(SpecularError::new(
                ErrorKind::ApprovalExpired,
                format!("approval by '{}' for role '{}' expired", self.user, self.role),
            ));
        }

        let trusted = trust.find(&self.user, &self.role).ok_or_else(|| {
            SpecularError::new(
                ErrorKind::MissingApproval,
                format!("no trusted key for user '{}' in role '{}'", self.user, self.role),
            )
        })?;
        if trusted.scheme != self.scheme {
            return Err(SpecularError::new(
                ErrorKind::UnsupportedSignatureType,
                format!(
                    "approval declares scheme '{}' but trusted key for '{}' uses '{}'",
                    self.scheme, self.user, trusted.scheme
                ),
            ));
        }

        let message = build_approval_message(
            bundle_digest,
            &self.role,
            &self.user,
            self.timestamp,
            self.comment.as_deref(),
        );

        match self.scheme {
            SignatureScheme::Ssh => ssh::verify(message.as_bytes(), &trusted.key_material, &self.signature),
            SignatureScheme::Gpg => gpg::verify(message.as_bytes(), &trusted.key_material, &self.signature),
            SignatureScheme::X509 | SignatureScheme::Cosign => Err(SpecularError::new(
                ErrorKind::UnsupportedSignatureType,
                format!("'{}' approval verification is not implemented", self.scheme),
            )),
        }
    }
}

/// Parse every `approvals/*.yaml` blob collected from an extracted bundle.
pub fn parse_approvals(files: &BTreeMap<String, Vec<u8>>) -> Result<Vec<ApprovalRecord>> {
    let mut records = Vec::new();
    for (name, bytes) in files {
        let record: ApprovalRecord = serde_yaml::from_slice(bytes).map_err(|e| {
            SpecularError::new(ErrorKind::InvalidManifest, format!("parsing approval '{name}': {e}"))
        })?;
        records.push(record);
    }
    Ok(records)
}

/// Verify that every role the manifest requires has at least one valid,
/// unexpired approval from a trusted key (I4).
pub struct QuorumChecker {
    pub trust: TrustStore,
    pub ttl: Duration,
}

impl QuorumChecker {
    pub fn new(trust: TrustStore) -> Self {
        Self {
            trust,
            ttl: Duration::days(DEFAULT_APPROVAL_TTL_DAYS),
        }
    }
}

impl ApprovalChecker for QuorumChecker {
    fn check(
        &self,
        manifest: &Manifest,
        bundle_digest: &str,
        approval_files: &BTreeMap<String, Vec<u8>>,
    ) -> std::result::Result<(), Vec<SpecularError>> {
        let records = match parse_approvals(approval_files) {
            Ok(r) => r,
            Err(e) => return Err(vec![e]),
        };

        let mut errors = Vec::new();
        let mut satisfied_roles: BTreeSet<String> = BTreeSet::new();
        for record in &records {
            match record.verify(bundle_digest, &self.trust, self.ttl) {
                Ok(()) => {
                    satisfied_roles.insert(record.role.clone());
                }
                Err(e) => errors.push(e),
            }
        }

        for required_role in &manifest.required_approvals {
            if !satisfied_roles.contains(required_role) {
                errors.push(SpecularError::new(
                    ErrorKind::MissingApproval,
                    format!("role '{required_role}' has no valid approval"),
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_role_is_reported() {
        let manifest = specular_core::manifest::Manifest {
            schema: specular_core::SCHEMA_V1.to_string(),
            id: "acme/demo".to_string(),
            version: "1.0.0".to_string(),
            created_at: Utc::now(),
            integrity: specular_core::IntegrityDescriptor {
                algorithm: "sha256".to_string(),
                digest: "sha256:abc".to_string(),
                manifest_digest: "abc".to_string(),
            },
            files: vec![],
            governance_level: None,
            required_approvals: vec!["release-manager".to_string()],
            metadata: Default::default(),
            description: None,
            authors: vec![],
            tags: vec![],
            dependencies: vec![],
        };
        let checker = QuorumChecker::new(TrustStore::default());
        let result = checker.check(&manifest, "sha256:deadbeef", &BTreeMap::new());
        assert!(result.is_err());
    }
}
