//! Deterministic keypair derivation from a wallet seed.
//!
//! For each scheme with a derivation rule, HMAC-SHA512 is applied with the
//! scheme's derivation path as key and the decoded seed as message. The first
//! 32 bytes of the output are the secret key. secp256k1 rejects secrets that
//! are zero or not below the curve order; in that case a big-endian counter is
//! appended to the message and the MAC recomputed.

use hmac::{Hmac, Mac};
use ledgerdesk_types::{KeyPair, PrivateSignatureKey, PublicSignatureKey, SignatureScheme};
use sha2::Sha512;
use zeroize::Zeroize;

use crate::error::CryptoError;
use crate::seed::decode_seed;

type HmacSha512 = Hmac<Sha512>;

const MAX_SECP256K1_ATTEMPTS: u32 = 16;

/// Derivation path for the default account of a scheme, if the scheme has one.
pub fn derivation_path(scheme: SignatureScheme) -> Option<&'static str> {
    match scheme {
        SignatureScheme::Secp256k1 => Some("m/44'/2026'/0'/0/0/secp256k1"),
        SignatureScheme::Ed25519 => Some("m/44'/2026'/0'/0/0/ed25519"),
        SignatureScheme::MlDsa65 => None,
    }
}

/// Derive the default-account keypair for `scheme` from an encoded seed.
///
/// Pure in `(encoded_seed, scheme)`.
pub fn derive_keypair(encoded_seed: &str, scheme: SignatureScheme) -> Result<KeyPair, CryptoError> {
    let path = derivation_path(scheme).ok_or(CryptoError::UnsupportedScheme(scheme))?;
    let seed = decode_seed(encoded_seed)?;

    match scheme {
        SignatureScheme::Ed25519 => {
            let mut secret = child_secret(path, seed.as_bytes(), 0)?;
            let signing_key = ed25519_dalek::SigningKey::from_bytes(&secret);
            let public = signing_key.verifying_key().to_bytes().to_vec();
            let private = PrivateSignatureKey::new(scheme, secret);
            secret.zeroize();
            Ok(KeyPair {
                public: PublicSignatureKey {
                    scheme,
                    bytes: public,
                },
                private,
            })
        }
        SignatureScheme::Secp256k1 => {
            for counter in 0..MAX_SECP256K1_ATTEMPTS {
                let mut secret = child_secret(path, seed.as_bytes(), counter)?;
                let Ok(signing_key) = k256::ecdsa::SigningKey::from_slice(&secret) else {
                    secret.zeroize();
                    continue;
                };
                let public = signing_key.verifying_key().to_sec1_bytes().to_vec();
                let private = PrivateSignatureKey::new(scheme, secret);
                secret.zeroize();
                return Ok(KeyPair {
                    public: PublicSignatureKey {
                        scheme,
                        bytes: public,
                    },
                    private,
                });
            }
            Err(CryptoError::DerivationFailed(
                "no valid secp256k1 scalar within attempt budget".into(),
            ))
        }
        SignatureScheme::MlDsa65 => Err(CryptoError::UnsupportedScheme(scheme)),
    }
}

fn child_secret(path: &str, seed: &[u8], counter: u32) -> Result<[u8; 32], CryptoError> {
    let mut mac = HmacSha512::new_from_slice(path.as_bytes())
        .map_err(|e| CryptoError::DerivationFailed(e.to_string()))?;
    mac.update(seed);
    if counter > 0 {
        mac.update(&counter.to_be_bytes());
    }
    let output = mac.finalize().into_bytes();

    let mut secret = [0u8; 32];
    secret.copy_from_slice(&output[..32]);
    Ok(secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> String {
        "42".repeat(32)
    }

    #[test]
    fn same_seed_same_scheme_same_keys() {
        let a = derive_keypair(&seed(), SignatureScheme::Secp256k1).unwrap();
        let b = derive_keypair(&seed(), SignatureScheme::Secp256k1).unwrap();
        assert_eq!(a.public, b.public);
        assert_eq!(a.private.secret_bytes(), b.private.secret_bytes());
    }

    #[test]
    fn schemes_derive_independent_keys() {
        let secp = derive_keypair(&seed(), SignatureScheme::Secp256k1).unwrap();
        let ed = derive_keypair(&seed(), SignatureScheme::Ed25519).unwrap();
        assert_ne!(secp.private.secret_bytes(), ed.private.secret_bytes());
        assert_eq!(secp.public.bytes.len(), 33);
        assert_eq!(ed.public.bytes.len(), 32);
    }

    #[test]
    fn different_seeds_different_keys() {
        let a = derive_keypair(&"01".repeat(32), SignatureScheme::Ed25519).unwrap();
        let b = derive_keypair(&"02".repeat(32), SignatureScheme::Ed25519).unwrap();
        assert_ne!(a.public, b.public);
    }

    #[test]
    fn unsupported_scheme_rejected() {
        assert_eq!(
            derive_keypair(&seed(), SignatureScheme::MlDsa65).err(),
            Some(CryptoError::UnsupportedScheme(SignatureScheme::MlDsa65))
        );
    }

    #[test]
    fn scheme_checked_before_seed() {
        // An unsupported scheme fails the same way regardless of the seed.
        assert_eq!(
            derive_keypair("???", SignatureScheme::MlDsa65).err(),
            Some(CryptoError::UnsupportedScheme(SignatureScheme::MlDsa65))
        );
    }

    #[test]
    fn bad_seed_rejected() {
        assert!(matches!(
            derive_keypair("zz", SignatureScheme::Secp256k1),
            Err(CryptoError::InvalidSeedEncoding(_))
        ));
    }

    #[test]
    fn keys_carry_their_scheme() {
        let kp = derive_keypair(&seed(), SignatureScheme::Ed25519).unwrap();
        assert_eq!(kp.scheme(), SignatureScheme::Ed25519);
        assert_eq!(kp.private.scheme(), SignatureScheme::Ed25519);
    }
}
