//! Signature key containers.
//!
//! These are plain data. Derivation, signing and verification live in
//! `ledgerdesk-crypto`.

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::scheme::SignatureScheme;

/// A public signature key tagged with its scheme.
///
/// `bytes` is the scheme's canonical encoding (33-byte compressed SEC1 point
/// for secp256k1, 32 bytes for Ed25519).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicSignatureKey {
    pub scheme: SignatureScheme,
    #[serde(with = "hex_bytes")]
    pub bytes: Vec<u8>,
}

impl PublicSignatureKey {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

/// A private signature key (32-byte secret scalar / seed).
///
/// This type intentionally does not implement `Debug`, `Serialize`, or `Clone`
/// to prevent accidental exposure. Key bytes are zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct PrivateSignatureKey {
    #[zeroize(skip)]
    scheme: SignatureScheme,
    bytes: [u8; 32],
}

impl PrivateSignatureKey {
    pub fn new(scheme: SignatureScheme, bytes: [u8; 32]) -> Self {
        Self { scheme, bytes }
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }
}

/// A detached signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(#[serde(with = "hex_bytes")] pub Vec<u8>);

impl Signature {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// A signing key pair for one scheme.
pub struct KeyPair {
    pub public: PublicSignatureKey,
    pub private: PrivateSignatureKey,
}

impl KeyPair {
    pub fn scheme(&self) -> SignatureScheme {
        self.public.scheme
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s.trim()).map_err(serde::de::Error::custom)
    }
}
