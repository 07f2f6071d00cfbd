//! Wallet seed encoding.
//!
//! A stored seed is either a hex string (32–64 bytes, optional `0x` prefix)
//! or a BIP39 mnemonic phrase. A phrase is expanded to its 64-byte BIP39
//! seed (PBKDF2-HMAC-SHA512, empty passphrase) before derivation.

use bip39::Mnemonic;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::CryptoError;

const MIN_SEED_LEN: usize = 32;
const MAX_SEED_LEN: usize = 64;

/// Decoded seed bytes. Zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct WalletSeed(Vec<u8>);

impl WalletSeed {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Decode an encoded seed into raw seed bytes.
pub fn decode_seed(encoded: &str) -> Result<WalletSeed, CryptoError> {
    let trimmed = encoded.trim();
    if trimmed.is_empty() {
        return Err(CryptoError::InvalidSeedEncoding("empty seed".into()));
    }

    if trimmed.contains(char::is_whitespace) {
        let mnemonic = Mnemonic::parse_normalized(trimmed)
            .map_err(|e| CryptoError::InvalidSeedEncoding(format!("mnemonic: {e}")))?;
        return Ok(WalletSeed(mnemonic.to_seed_normalized("").to_vec()));
    }

    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(hex_part)
        .map_err(|e| CryptoError::InvalidSeedEncoding(format!("hex: {e}")))?;
    if !(MIN_SEED_LEN..=MAX_SEED_LEN).contains(&bytes.len()) {
        return Err(CryptoError::InvalidSeedEncoding(format!(
            "seed must be {MIN_SEED_LEN}..={MAX_SEED_LEN} bytes, got {}",
            bytes.len()
        )));
    }
    Ok(WalletSeed(bytes))
}

/// Generate a fresh 32-byte seed, hex encoded.
pub fn generate_seed() -> Result<String, CryptoError> {
    let mut seed = [0u8; 32];
    getrandom::getrandom(&mut seed).map_err(|e| CryptoError::Entropy(e.to_string()))?;
    let encoded = hex::encode(seed);
    seed.zeroize();
    Ok(encoded)
}

/// Generate a new 24-word BIP39 mnemonic from 256-bit entropy.
pub fn generate_mnemonic() -> Result<String, CryptoError> {
    let mut entropy = [0u8; 32];
    getrandom::getrandom(&mut entropy).map_err(|e| CryptoError::Entropy(e.to_string()))?;
    let mnemonic = Mnemonic::from_entropy(&entropy)
        .map_err(|e| CryptoError::DerivationFailed(e.to_string()))?;
    entropy.zeroize();
    Ok(mnemonic.to_string())
}
