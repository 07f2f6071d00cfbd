use ledgerdesk_types::SignatureScheme;
use thiserror::Error;

/// Errors arising from seed decoding, derivation and signing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid seed encoding: {0}")]
    InvalidSeedEncoding(String),

    #[error("no derivation rule for signature scheme {0}")]
    UnsupportedScheme(SignatureScheme),

    #[error("key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("entropy source unavailable: {0}")]
    Entropy(String),
}
