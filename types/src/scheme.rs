//! Signature scheme identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Signature schemes understood by the ledger.
///
/// The numeric id is part of the signed microblock payload and feeds the fee
/// formula, so it must stay stable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureScheme {
    #[default]
    Secp256k1,
    Ed25519,
    #[serde(rename = "ml-dsa-65")]
    MlDsa65,
}

impl SignatureScheme {
    pub fn id(&self) -> u8 {
        match self {
            Self::Secp256k1 => 1,
            Self::Ed25519 => 2,
            Self::MlDsa65 => 3,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Secp256k1),
            2 => Some(Self::Ed25519),
            3 => Some(Self::MlDsa65),
            _ => None,
        }
    }

    /// Size in bytes of a signature produced by this scheme.
    pub fn signature_size(&self) -> usize {
        match self {
            Self::Secp256k1 | Self::Ed25519 => 64,
            Self::MlDsa65 => 3309,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Secp256k1 => "secp256k1",
            Self::Ed25519 => "ed25519",
            Self::MlDsa65 => "ml-dsa-65",
        }
    }
}

impl fmt::Display for SignatureScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignatureScheme {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "secp256k1" => Ok(Self::Secp256k1),
            "ed25519" => Ok(Self::Ed25519),
            "ml-dsa-65" | "mldsa65" => Ok(Self::MlDsa65),
            other => Err(TypesError::UnknownScheme(other.to_string())),
        }
    }
}
