//! Parsing errors for the shared types.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid hex identifier: {0}")]
    InvalidHex(String),

    #[error("identifier must be {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("unknown signature scheme: {0}")]
    UnknownScheme(String),
}
