//! The exact, byte-stable text every approval signature is computed over.

use chrono::{DateTime, Utc};

/// Build the canonical approval message (§4.6).
///
/// The `Comment:` line is present only when `comment` is `Some`; its absence
/// changes the signed bytes, so callers must not pass `Some("")` meaning "no
/// comment" -- that produces a different, still-valid message with an empty
/// comment recorded.
pub fn build_approval_message(
    bundle_digest: &str,
    role: &str,
    user: &str,
    timestamp: DateTime<Utc>,
    comment: Option<&str>,
) -> String {
    // RFC 3339 UTC, whole seconds, `Z` suffix -- `to_rfc3339()` would emit
    // a `+00:00` offset and (depending on the value) fractional seconds,
    // either of which would make the signed message non-reproducible
    // across toolchains (spec's own guidance on this point).
    let mut message = format!(
        "SPECULAR BUNDLE APPROVAL\nBundle Digest: {bundle_digest}\nRole: {role}\nUser: {user}\nTimestamp: {}\n",
        timestamp.format("%Y-%m-%dT%H:%M:%SZ")
    );
    if let Some(comment) = comment {
        message.push_str(&format!("Comment: {comment}\n"));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn message_without_comment_has_no_comment_line() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let message = build_approval_message("sha256:abc", "release-manager", "alice", ts, None);
        assert!(!message.contains("Comment:"));
        assert!(message.starts_with("SPECULAR BUNDLE APPROVAL\n"));
    }

    #[test]
    fn message_with_comment_appends_comment_line_last() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let message = build_approval_message("sha256:abc", "release-manager", "alice", ts, Some("looks good"));
        assert!(message.ends_with("Comment: looks good\n"));
    }

    #[test]
    fn matches_the_canonical_example_byte_for_byte() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let message = build_approval_message(
            "sha256:abc123",
            "pm",
            "alice@example.com",
            ts,
            Some("Looks good"),
        );
        assert_eq!(
            message,
            "SPECULAR BUNDLE APPROVAL\n\
             Bundle Digest: sha256:abc123\n\
             Role: pm\n\
             User: alice@example.com\n\
             Timestamp: 2024-01-01T12:00:00Z\n\
             Comment: Looks good\n"
        );
    }

    #[test]
    fn message_is_deterministic() {
        let ts = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let a = build_approval_message("sha256:abc", "role", "user", ts, Some("c"));
        let b = build_approval_message("sha256:abc", "role", "user", ts, Some("c"));
        assert_eq!(a, b);
    }
}
