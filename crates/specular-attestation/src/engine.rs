//! Attestation generation and verification (C7).

use crate::signing;
use crate::statement::Statement;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use specular_core::bundle::validator::AttestationChecker;
use specular_core::manifest::Manifest;
use specular_core::{ErrorKind, Result, SpecularError};

/// How an attestation's signature is produced. Only `Keyed` is implemented;
/// the others are named because the spec calls them out as explicit,
/// reportable gaps rather than silently falling back to `Keyed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttestationMode {
    Keyed,
    Keyless,
    RekorTransparency,
}

/// `attestations/attestation.yaml`'s contents: a signed in-toto statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttestationRecord {
    pub statement: Statement,
    pub key_id: String,
    pub signature: String,
    pub created_at: DateTime<Utc>,
}

/// Produce a signed attestation for `manifest`, binding the subject digest
/// to the archive file's own SHA-256 (I5) -- `bundle_digest`, not the
/// manifest's integrity digest.
pub fn generate(
    manifest: &Manifest,
    bundle_digest: &str,
    predicate_type: &str,
    predicate: serde_json::Value,
    key_id: &str,
    private_key_pem: &str,
    mode: AttestationMode,
) -> Result<AttestationRecord> {
    match mode {
        AttestationMode::Keyless => {
            return Err(SpecularError::new(
                ErrorKind::KeylessNotImplemented,
                "keyless (Fulcio-based) attestation signing is not supported",
            ));
        }
        AttestationMode::RekorTransparency => {
            return Err(SpecularError::new(
                ErrorKind::RekorNotImplemented,
                "Rekor transparency log submission is not supported",
            ));
        }
        AttestationMode::Keyed => {}
    }

    let statement = Statement::new(&manifest.id, bundle_digest, predicate_type, predicate);
    let bytes = statement
        .canonical_bytes()
        .map_err(|e| SpecularError::new(ErrorKind::AttestationFailed, e.to_string()))?;
    let signature = signing::sign(&bytes, private_key_pem)?;

    Ok(AttestationRecord {
        statement,
        key_id: key_id.to_string(),
        signature,
        created_at: Utc::now(),
    })
}

/// Verifies attestations at bundle-validation time.
pub struct AttestationVerifier {
    pub public_key_pem: String,
    pub ttl: Duration,
}

impl AttestationChecker for AttestationVerifier {
    fn check(
        &self,
        manifest: &Manifest,
        bundle_digest: &str,
        attestation_bytes: Option<&[u8]>,
    ) -> std::result::Result<(), Vec<SpecularError>> {
        let bytes = match attestation_bytes {
            Some(b) => b,
            None => {
                return Err(vec![SpecularError::new(
                    ErrorKind::AttestationFailed,
                    "bundle has no attestations/attestation.yaml",
                )]);
            }
        };

        let record: AttestationRecord = match serde_yaml::from_slice(bytes) {
            Ok(r) => r,
            Err(e) => {
                return Err(vec![SpecularError::new(
                    ErrorKind::AttestationFailed,
                    format!("parsing attestation: {e}"),
                )])
            }
        };

        let mut errors = Vec::new();

        if Utc::now() - record.created_at > self.ttl {
            errors.push(SpecularError::new(
                ErrorKind::AttestationFailed,
                "attestation is older than the configured TTL",
            ));
        }

        if !record.statement.binds_digest(bundle_digest) {
            errors.push(SpecularError::new(
                ErrorKind::DigestMismatch,
                "attestation subject digest does not match the bundle's archive digest",
            ));
        }

        match record
            .statement
            .canonical_bytes()
            .map_err(|e| SpecularError::new(ErrorKind::AttestationFailed, e.to_string()))
            .and_then(|bytes| signing::verify(&bytes, &self.public_key_pem, &record.signature))
        {
            Ok(()) => {}
            Err(e) => errors.push(e),
        }

        let _ = manifest;
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
    use p256::ecdsa::SigningKey;
    use p256::pkcs8::{EncodePrivateKey, EncodePublicKey};
    use specular_core::manifest::IntegrityDescriptor;

    fn sample_manifest() -> Manifest {
        Manifest {
            schema: specular_core::SCHEMA_V1.to_string(),
            id: "acme/demo".to_string(),
            version: "1.0.0".to_string(),
            created_at: Utc::now(),
            integrity: IntegrityDescriptor {
                algorithm: "sha256".to_string(),
                digest: "sha256:abc123".to_string(),
                manifest_digest: "abc123".to_string(),
            },
            files: vec![],
            governance_level: None,
            required_approvals: vec![],
            metadata: Default::default(),
            description: None,
            authors: vec![],
            tags: vec![],
            dependencies: vec![],
        }
    }

    #[test]
    fn keyless_mode_is_an_explicit_failure() {
        let manifest = sample_manifest();
        let err = generate(
            &manifest,
            "sha256:deadbeef",
            crate::statement::SLSA_PROVENANCE_PREDICATE_TYPE,
            serde_json::json!({}),
            "key-1",
            "not used",
            AttestationMode::Keyless,
        )
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::KeylessNotImplemented);
    }

    #[test]
    fn generate_and_verify_roundtrip() {
        let signing_key = SigningKey::from_bytes(&[7u8; 32].into()).unwrap();
        let private_pem = signing_key.to_pkcs8_pem(Default::default()).unwrap().to_string();
        let public_pem = signing_key
            .verifying_key()
            .to_public_key_pem(Default::default())
            .unwrap();

        let manifest = sample_manifest();
        let bundle_digest = "sha256:eeff00112233445566778899aabbccddeeff00112233445566778899aabbccd";
        let record = generate(
            &manifest,
            bundle_digest,
            crate::statement::SLSA_PROVENANCE_PREDICATE_TYPE,
            serde_json::json!({"builder": "specular-ci"}),
            "key-1",
            &private_pem,
            AttestationMode::Keyed,
        )
        .unwrap();

        let verifier = AttestationVerifier {
            public_key_pem: public_pem,
            ttl: Duration::days(365),
        };
        let bytes = serde_yaml::to_vec(&record).unwrap();
        assert!(verifier.check(&manifest, bundle_digest, Some(&bytes)).is_ok());
    }
}
