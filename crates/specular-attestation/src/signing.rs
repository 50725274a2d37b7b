//! ECDSA P-256 signing and verification over canonical statement bytes.

use base64::{engine::general_purpose::STANDARD, Engine};
use p256::ecdsa::signature::{Signer, Verifier};
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey};
use specular_core::{ErrorKind, Result, SpecularError};

/// Sign `message` with a PKCS#8 PEM-encoded P-256 private key, returning a
/// base64-encoded DER signature.
pub fn sign(message: &[u8], private_key_pem: &str) -> Result<String> {
    let signing_key = SigningKey::from_pkcs8_pem(private_key_pem)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("parsing P-256 private key: {e}")))?;
    let signature: Signature = signing_key.sign(message);
    Ok(STANDARD.encode(signature.to_der().as_bytes()))
}

/// Verify a base64 DER signature against `message` and a PEM public key.
pub fn verify(message: &[u8], public_key_pem: &str, signature_b64: &str) -> Result<()> {
    let verifying_key = VerifyingKey::from_public_key_pem(public_key_pem)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("parsing P-256 public key: {e}")))?;
    let der = STANDARD
        .decode(signature_b64)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("decoding signature base64: {e}")))?;
    let signature = Signature::from_der(&der)
        .map_err(|e| SpecularError::new(ErrorKind::InvalidSignature, format!("parsing DER signature: {e}")))?;

    verifying_key
        .verify(message, &signature)
        .map_err(|e| SpecularError::new(ErrorKind::SignatureVerifyFailed, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::EncodePrivateKey;

    fn generate_key_pem() -> String {
        let signing_key = SigningKey::random(&mut rand_for_tests());
        signing_key
            .to_pkcs8_pem(Default::default())
            .unwrap()
            .to_string()
    }

    // p256's `rand_core` version is pinned by the crate itself; a thin local
    // RNG avoids pulling a second `rand` major version into tests only.
    fn rand_for_tests() -> impl rand_core::CryptoRngCore {
        rand_core::OsRng
    }

    #[test]
    fn signs_and_verifies_roundtrip() {
        let pem = generate_key_pem();
        let signing_key = SigningKey::from_pkcs8_pem(&pem).unwrap();
        let public_pem = signing_key
            .verifying_key()
            .to_public_key_pem(Default::default())
            .unwrap();

        let message = b"in-toto statement bytes";
        let sig = sign(message, &pem).unwrap();
        verify(message, &public_pem, &sig).unwrap();
    }

    #[test]
    fn rejects_tampered_message() {
        let pem = generate_key_pem();
        let signing_key = SigningKey::from_pkcs8_pem(&pem).unwrap();
        let public_pem = signing_key
            .verifying_key()
            .to_public_key_pem(Default::default())
            .unwrap();

        let sig = sign(b"original", &pem).unwrap();
        let err = verify(b"tampered", &public_pem, &sig).unwrap_err();
        assert_eq!(err.kind, ErrorKind::SignatureVerifyFailed);
    }
}
