//! Storage for ledgerdesk.
//!
//! The durable backend is an opaque string-keyed document store holding JSON
//! values ([`KeyValueStore`]). Everything else in the workspace depends only
//! on that trait:
//! - [`LocalEntityStore`] keeps the wallet hierarchy under the `organizations` key
//! - [`CredentialVault`] keeps session-scoped operator tokens under `operator-auth`

pub mod entity_store;
pub mod error;
pub mod kv;
pub mod vault;

pub use entity_store::{LocalEntityStore, ORGANIZATIONS_KEY, WALLET_SEQUENCE_KEY};
pub use error::StoreError;
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use vault::{AuthenticatedOperator, Credential, CredentialVault, OPERATOR_AUTH_KEY};
