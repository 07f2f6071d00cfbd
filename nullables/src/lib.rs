//! Nullable infrastructure for deterministic testing.
//!
//! The ledger and the key-value store are reached through traits. This crate
//! provides in-memory implementations that:
//! - Return scripted values
//! - Record what was asked of them
//! - Never touch the filesystem or network
//!
//! Usage: hand these to `LedgerLifecycle` and `LocalEntityStore` in tests.

pub mod chain;
pub mod store;

pub use chain::{NullChainProvider, NullProviderFactory};
pub use store::NullKvStore;
