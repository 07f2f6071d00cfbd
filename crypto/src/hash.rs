//! Blake2b hashing for microblocks and account ids.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use ledgerdesk_types::{AccountId, PublicSignatureKey};

type Blake2b256 = Blake2b<U32>;

/// Compute a 256-bit Blake2b hash of arbitrary data.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Hash multiple byte slices in sequence (avoids concatenation allocation).
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Account id a ledger assigns to a public key: Blake2b over scheme id and key bytes.
///
/// Remote ledgers remain the authority (see `ChainProvider::get_account_id_by_public_key`);
/// this is the derivation used by local test ledgers.
pub fn account_id_from_public_key(key: &PublicSignatureKey) -> AccountId {
    AccountId::new(blake2b_256_multi(&[&[key.scheme.id()], &key.bytes]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerdesk_types::SignatureScheme;

    #[test]
    fn blake2b_deterministic() {
        assert_eq!(blake2b_256(b"hello"), blake2b_256(b"hello"));
        assert_ne!(blake2b_256(b"hello"), blake2b_256(b"world"));
    }

    #[test]
    fn blake2b_multi_equivalent() {
        let single = blake2b_256(b"helloworld");
        let multi = blake2b_256_multi(&[b"hello", b"world"]);
        assert_eq!(single, multi);
    }

    #[test]
    fn account_id_depends_on_scheme() {
        let bytes = vec![3u8; 32];
        let a = account_id_from_public_key(&PublicSignatureKey {
            scheme: SignatureScheme::Ed25519,
            bytes: bytes.clone(),
        });
        let b = account_id_from_public_key(&PublicSignatureKey {
            scheme: SignatureScheme::Secp256k1,
            bytes,
        });
        assert_ne!(a, b);
    }
}
