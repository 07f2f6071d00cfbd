//! Ledger-facing building blocks for ledgerdesk.
//!
//! - [`Section`]: typed payload fragments
//! - [`Microblock`] / [`SealedMicroblock`]: assembly, fee binding and sealing
//! - [`FeeFormulaRegistry`]: protocol-versioned fee strategies
//! - [`ChainProvider`]: the remote ledger capability, with a JSON-RPC adapter

pub mod error;
pub mod fees;
pub mod microblock;
pub mod provider;
pub mod rpc;
pub mod section;

pub use error::ChainError;
pub use fees::{FeeFormula, FeeFormulaRegistry, LinearFeeFormula, PagedFeeFormula};
pub use microblock::{Microblock, MicroblockHeader, SealedMicroblock, VirtualBlockchainKind};
pub use provider::{
    AccountState, ChainProvider, HistoryEntry, NodeStatus, ProtocolState, ProviderFactory,
    VirtualBlockchainState,
};
pub use rpc::{RpcChainProvider, RpcProviderFactory, RpcTimeouts};
pub use section::Section;
