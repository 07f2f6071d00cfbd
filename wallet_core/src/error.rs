use ledgerdesk_chain::ChainError;
use ledgerdesk_crypto::CryptoError;
use ledgerdesk_store::StoreError;
use ledgerdesk_types::SignatureScheme;
use thiserror::Error;

/// Terminal outcome of a wallet operation.
#[derive(Debug, Error)]
pub enum WalletError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("already published: {0}")]
    AlreadyPublished(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("invalid seed encoding: {0}")]
    InvalidSeedEncoding(String),

    #[error("unsupported signature scheme: {0}")]
    UnsupportedScheme(SignatureScheme),

    #[error("signing failed: {0}")]
    SigningFailed(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("history cursor is not defined")]
    CursorUndefined,

    #[error("operation already in flight: {0}")]
    OperationInFlight(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("chain error: {0}")]
    Chain(String),

    #[error("operator error: {0}")]
    Operator(String),
}

/// Copyable category of a [`WalletError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyPublished,
    PreconditionFailed,
    InvalidSeedEncoding,
    UnsupportedScheme,
    SigningFailed,
    Network,
    CursorUndefined,
    OperationInFlight,
    Storage,
    Chain,
    Operator,
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AlreadyPublished(_) => ErrorKind::AlreadyPublished,
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::InvalidSeedEncoding(_) => ErrorKind::InvalidSeedEncoding,
            Self::UnsupportedScheme(_) => ErrorKind::UnsupportedScheme,
            Self::SigningFailed(_) => ErrorKind::SigningFailed,
            Self::Network(_) => ErrorKind::Network,
            Self::CursorUndefined => ErrorKind::CursorUndefined,
            Self::OperationInFlight(_) => ErrorKind::OperationInFlight,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Chain(_) => ErrorKind::Chain,
            Self::Operator(_) => ErrorKind::Operator,
        }
    }
}

impl From<CryptoError> for WalletError {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::InvalidSeedEncoding(msg) => WalletError::InvalidSeedEncoding(msg),
            CryptoError::UnsupportedScheme(scheme) => WalletError::UnsupportedScheme(scheme),
            CryptoError::SigningFailed(msg) => WalletError::SigningFailed(msg),
            other => WalletError::SigningFailed(other.to_string()),
        }
    }
}

impl From<ChainError> for WalletError {
    fn from(e: ChainError) -> Self {
        match e {
            ChainError::Network(_) | ChainError::Rpc(_) | ChainError::InvalidResponse(_) => {
                WalletError::Network(e.to_string())
            }
            ChainError::NotFound(msg) => WalletError::NotFound(msg),
            ChainError::Crypto(inner) => inner.into(),
            ChainError::UnknownFeeFormula(_) | ChainError::Encoding(_) => {
                WalletError::Chain(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crypto_errors_keep_their_category() {
        let e: WalletError = CryptoError::UnsupportedScheme(SignatureScheme::MlDsa65).into();
        assert_eq!(e.kind(), ErrorKind::UnsupportedScheme);
        let e: WalletError = CryptoError::InvalidSeedEncoding("zz".into()).into();
        assert_eq!(e.kind(), ErrorKind::InvalidSeedEncoding);
    }

    #[test]
    fn chain_errors_map_to_network_or_chain() {
        let e: WalletError = ChainError::Network("refused".into()).into();
        assert_eq!(e.kind(), ErrorKind::Network);
        assert!(e.to_string().contains("refused"));
        let e: WalletError = ChainError::UnknownFeeFormula(7).into();
        assert_eq!(e.kind(), ErrorKind::Chain);
        let e: WalletError = ChainError::Crypto(CryptoError::SigningFailed("bad".into())).into();
        assert_eq!(e.kind(), ErrorKind::SigningFailed);
    }
}
