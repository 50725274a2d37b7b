//! Error taxonomy shared by the bundle build/verify pipeline.
//!
//! Operational errors (I/O, parse failures that abort an operation outright)
//! are distinct from validation findings, which accumulate into a
//! [`crate::bundle::validator::ValidationResult`] instead of aborting the call.

use std::fmt;

/// Stable error kind, used as an identifier rather than a display string.
///
/// String rendering happens at the CLI boundary; callers should match on
/// `ErrorKind` rather than parse `Display` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    InvalidManifest,
    MissingFile,
    ChecksumMismatch,
    CorruptedBundle,
    InvalidSignature,
    SignatureVerifyFailed,
    ApprovalExpired,
    MissingApproval,
    AttestationFailed,
    DigestMismatch,
    UnsupportedSignatureType,
    KeylessNotImplemented,
    RekorNotImplemented,
    InvalidReference,
    Authentication,
    Permission,
    NotFound,
    Network,
    InvalidBundle,
    Unknown,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A user-visible error: short message, actionable suggestion, optional cause chain.
#[derive(Debug, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct SpecularError {
    pub kind: ErrorKind,
    pub message: String,
    pub suggestion: Option<String>,
    #[source]
    pub source: Option<anyhow::Error>,
}

impl SpecularError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl From<std::io::Error> for SpecularError {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: ErrorKind::CorruptedBundle,
            message: err.to_string(),
            suggestion: Some("check the archive was not truncated or corrupted in transit".into()),
            source: Some(err.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SpecularError>;
