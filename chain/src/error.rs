use ledgerdesk_crypto::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChainError {
    /// The node could not be reached or the transport failed.
    #[error("request failed: {0}")]
    Network(String),

    /// The node answered with an error.
    #[error("node error: {0}")]
    Rpc(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unknown fee calculation formula version {0}")]
    UnknownFeeFormula(u32),

    #[error("microblock encoding failed: {0}")]
    Encoding(String),

    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl From<serde_json::Error> for ChainError {
    fn from(e: serde_json::Error) -> Self {
        ChainError::Encoding(e.to_string())
    }
}
