//! GPG approval signatures, shelled out to the system `gpg` binary.
//!
//! There is no pure-Rust OpenPGP implementation in the teacher's dependency
//! stack, and pulling one in for a single verify path would be its own
//! supply-chain surface; every verification runs against an ephemeral,
//! throwaway keyring so a process never accumulates trust across calls.

use specular_core::{ErrorKind, Result, SpecularError};
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Verify a detached, armored GPG signature over `message` was produced by
/// `public_key_armored`.
pub fn verify(message: &[u8], public_key_armored: &str, signature_armored: &str) -> Result<()> {
    let gnupg_home = TempDir::new()
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("creating ephemeral GNUPGHOME: {e}")))?;

    import_key(gnupg_home.path(), public_key_armored)?;

    let mut message_file = tempfile::NamedTempFile::new()
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, e.to_string()))?;
    message_file
        .write_all(message)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, e.to_string()))?;

    let mut sig_file = tempfile::NamedTempFile::new()
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, e.to_string()))?;
    sig_file
        .write_all(signature_armored.as_bytes())
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, e.to_string()))?;

    let output = Command::new("gpg")
        .env("GNUPGHOME", gnupg_home.path())
        .args(["--batch", "--status-fd", "1", "--verify"])
        .arg(sig_file.path())
        .arg(message_file.path())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("invoking gpg: {e}")))?;

    let status = String::from_utf8_lossy(&output.stdout);
    if output.status.success() && status.contains("[GNUPG:] GOODSIG") {
        Ok(())
    } else {
        Err(SpecularError::new(
            ErrorKind::SignatureVerifyFailed,
            format!("gpg verification failed: {}", String::from_utf8_lossy(&output.stderr)),
        ))
    }
}

fn import_key(gnupg_home: &std::path::Path, public_key_armored: &str) -> Result<()> {
    let mut key_file = tempfile::NamedTempFile::new()
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, e.to_string()))?;
    key_file
        .write_all(public_key_armored.as_bytes())
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, e.to_string()))?;

    let output = Command::new("gpg")
        .env("GNUPGHOME", gnupg_home)
        .args(["--batch", "--import"])
        .arg(key_file.path())
        .output()
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("invoking gpg --import: {e}")))?;

    if !output.status.success() {
        return Err(SpecularError::new(
            ErrorKind::InvalidSignature,
            format!("importing GPG key failed: {}", String::from_utf8_lossy(&output.stderr)),
        ));
    }
    Ok(())
}
