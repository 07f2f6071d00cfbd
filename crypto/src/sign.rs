//! Message signing and verification, dispatched on the key's scheme.

use ledgerdesk_types::{PrivateSignatureKey, PublicSignatureKey, Signature, SignatureScheme};

use crate::error::CryptoError;

/// Sign a message with a private key.
///
/// secp256k1 signatures are ECDSA over SHA-256 in 64-byte `r || s` form;
/// Ed25519 signatures are the standard 64-byte encoding.
pub fn sign_message(message: &[u8], key: &PrivateSignatureKey) -> Result<Signature, CryptoError> {
    match key.scheme() {
        SignatureScheme::Secp256k1 => {
            use k256::ecdsa::signature::Signer;

            let signing_key = k256::ecdsa::SigningKey::from_slice(key.secret_bytes())
                .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
            let sig: k256::ecdsa::Signature = signing_key
                .try_sign(message)
                .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;
            Ok(Signature(sig.to_bytes().to_vec()))
        }
        SignatureScheme::Ed25519 => {
            use ed25519_dalek::Signer;

            let signing_key = ed25519_dalek::SigningKey::from_bytes(key.secret_bytes());
            Ok(Signature(signing_key.sign(message).to_bytes().to_vec()))
        }
        scheme @ SignatureScheme::MlDsa65 => Err(CryptoError::UnsupportedScheme(scheme)),
    }
}

/// Verify a signature against a message and public key.
///
/// Returns `false` for malformed keys or signatures.
pub fn verify_signature(message: &[u8], signature: &Signature, key: &PublicSignatureKey) -> bool {
    match key.scheme {
        SignatureScheme::Secp256k1 => {
            use k256::ecdsa::signature::Verifier;

            let Ok(verifying_key) = k256::ecdsa::VerifyingKey::from_sec1_bytes(&key.bytes) else {
                return false;
            };
            let Ok(sig) = k256::ecdsa::Signature::from_slice(signature.as_bytes()) else {
                return false;
            };
            verifying_key.verify(message, &sig).is_ok()
        }
        SignatureScheme::Ed25519 => {
            use ed25519_dalek::Verifier;

            let Ok(key_bytes) = <[u8; 32]>::try_from(key.bytes.as_slice()) else {
                return false;
            };
            let Ok(verifying_key) = ed25519_dalek::VerifyingKey::from_bytes(&key_bytes) else {
                return false;
            };
            let Ok(sig) = ed25519_dalek::Signature::from_slice(signature.as_bytes()) else {
                return false;
            };
            verifying_key.verify(message, &sig).is_ok()
        }
        SignatureScheme::MlDsa65 => false,
    }
}
