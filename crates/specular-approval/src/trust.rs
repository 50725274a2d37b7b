//! Key trust store: which keys are trusted to approve, for which roles.

use crate::scheme::SignatureScheme;
use serde::{Deserialize, Serialize};
use specular_core::{ErrorKind, Result, SpecularError};
use std::path::Path;

/// A single trusted signer entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustedKey {
    pub user: String,
    pub role: String,
    pub scheme: SignatureScheme,
    /// OpenSSH public key text, or an armored GPG public key block.
    pub key_material: String,
}

/// The set of keys a verifier will accept approvals from.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustStore {
    pub keys: Vec<TrustedKey>,
}

impl TrustStore {
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        serde_yaml::from_slice(&bytes)
            .map_err(|e| SpecularError::new(ErrorKind::InvalidManifest, format!("parsing trust store: {e}")))
    }

    /// Find a trusted key for `user` acting in `role`.
    pub fn find(&self, user: &str, role: &str) -> Option<&TrustedKey> {
        self.keys.iter().find(|k| k.user == user && k.role == role)
    }

    /// Whether any trusted key exists for `role`, independent of user --
    /// used to distinguish "nobody is trusted for this role" from "this
    /// particular user/key pair isn't trusted".
    pub fn has_role(&self, role: &str) -> bool {
        self.keys.iter().any(|k| k.role == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_key_by_user_and_role() {
        let store = TrustStore {
            keys: vec![TrustedKey {
                user: "alice".to_string(),
                role: "release-manager".to_string(),
                scheme: SignatureScheme::Ssh,
                key_material: "ssh-ed25519 AAAA...".to_string(),
            }],
        };
        assert!(store.find("alice", "release-manager").is_some());
        assert!(store.find("bob", "release-manager").is_none());
    }
}
