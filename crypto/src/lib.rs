//! Cryptographic primitives for ledgerdesk.
//!
//! - **Seed encoding**: wallet seeds as hex or BIP39 phrases
//! - **Key derivation**: deterministic keypairs per signature scheme (HMAC-SHA512)
//! - **secp256k1** (ECDSA) and **Ed25519** signing and verification
//! - **Blake2b** for microblock hashing and account id derivation

pub mod derive;
pub mod error;
pub mod hash;
pub mod seed;
pub mod sign;

pub use derive::{derivation_path, derive_keypair};
pub use error::CryptoError;
pub use hash::{account_id_from_public_key, blake2b_256, blake2b_256_multi};
pub use seed::{decode_seed, generate_mnemonic, generate_seed, WalletSeed};
pub use sign::{sign_message, verify_signature};
