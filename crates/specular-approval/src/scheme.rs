//! Supported approval signature schemes.

use serde::{Deserialize, Serialize};
use specular_core::{ErrorKind, SpecularError};
use std::str::FromStr;

/// A signature scheme named in an approval record's `scheme` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureScheme {
    Ssh,
    Gpg,
    X509,
    Cosign,
}

impl FromStr for SignatureScheme {
    type Err = SpecularError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ssh" => Ok(Self::Ssh),
            "gpg" => Ok(Self::Gpg),
            "x509" => Ok(Self::X509),
            "cosign" => Ok(Self::Cosign),
            other => Err(SpecularError::new(
                ErrorKind::UnsupportedSignatureType,
                format!("unsupported signature scheme '{other}'"),
            )),
        }
    }
}

impl std::fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Ssh => "ssh",
            Self::Gpg => "gpg",
            Self::X509 => "x509",
            Self::Cosign => "cosign",
        };
        write!(f, "{name}")
    }
}
