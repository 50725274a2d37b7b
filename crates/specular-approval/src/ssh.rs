//! SSH-key approval signatures, using the SSHSIG envelope (the same format
//! `ssh-keygen -Y sign` produces).

use base64::{engine::general_purpose::STANDARD, Engine};
use specular_core::{ErrorKind, Result, SpecularError};
use ssh_key::{HashAlg, PrivateKey, PublicKey, SshSig};

/// Namespace string binding a signature to this protocol, so an approval
/// signature can never be replayed as a valid signature for another purpose.
const NAMESPACE: &str = "specular-bundle-approval";

/// Sign `message` with an OpenSSH-format private key, returning a base64
/// SSHSIG blob suitable for an approval record's `signature` field.
pub fn sign(message: &[u8], private_key_pem: &str) -> Result<String> {
    let key = PrivateKey::from_openssh(private_key_pem)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("parsing SSH private key: {e}")))?;
    let sig = SshSig::sign(&key, NAMESPACE, HashAlg::Sha512, message)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("signing with SSH key: {e}")))?;
    let encoded = sig
        .to_pem(Default::default())
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, e.to_string()))?;
    Ok(STANDARD.encode(encoded))
}

/// Verify a base64 SSHSIG blob against `message` and an OpenSSH-format
/// public key. A mismatched namespace, tampered message, or wrong key all
/// surface as `SignatureVerifyFailed`, not a panic.
pub fn verify(message: &[u8], public_key_openssh: &str, signature_b64: &str) -> Result<()> {
    let public_key = PublicKey::from_openssh(public_key_openssh)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("parsing SSH public key: {e}")))?;
    let pem = STANDARD
        .decode(signature_b64)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("decoding signature base64: {e}")))?;
    let pem = String::from_utf8(pem)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, e.to_string()))?;
    let sig = SshSig::from_pem(pem)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("parsing SSHSIG envelope: {e}")))?;

    sig.verify(NAMESPACE, message, &public_key)
        .map_err(|e| SpecularError::new(ErrorKind::SignatureVerifyFailed, e.to_string()))
}

/// Derive a stable key identifier (the SSH key fingerprint) for trust lookups.
pub fn key_id(public_key_openssh: &str) -> Result<String> {
    let public_key = PublicKey::from_openssh(public_key_openssh)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("parsing SSH public key: {e}")))?;
    Ok(public_key.fingerprint(HashAlg::Sha256).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_garbage_signature() {
        let err = verify(b"hello", "not a valid key", "not base64 !!!").unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidSignature);
    }
}
