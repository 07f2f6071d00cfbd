//! Fundamental types for ledgerdesk.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! hex-encoded chain identifiers, signature scheme ids, key material containers,
//! and the locally persisted entity hierarchy (wallet → organization → node/application).

pub mod entity;
pub mod error;
pub mod hash;
pub mod keys;
pub mod scheme;
pub mod time;

pub use entity::{
    next_id, Application, NewApplication, NewNode, NewOrganization, NewWallet, Node, NodePatch,
    Organization, Wallet,
};
pub use error::TypesError;
pub use hash::{AccountId, Hash};
pub use keys::{KeyPair, PrivateSignatureKey, PublicSignatureKey, Signature};
pub use scheme::SignatureScheme;
pub use time::Timestamp;
