//! The remote ledger seam.
//!
//! Everything the orchestrator needs from a ledger node goes through
//! [`ChainProvider`]. Timeouts and retries belong to the implementation.

use async_trait::async_trait;
use ledgerdesk_types::{AccountId, Hash, PublicSignatureKey, Timestamp};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::ChainError;
use crate::microblock::{SealedMicroblock, VirtualBlockchainKind};

/// Balances and history head of an account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountState {
    pub height: u64,
    /// Total balance, including staked and locked amounts.
    pub balance: u64,
    #[serde(default)]
    pub staked: u64,
    #[serde(default)]
    pub locked: u64,
    /// Most recent history entry; absent for an account with no history.
    #[serde(default)]
    pub last_history_hash: Option<Hash>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Identifier of this entry; used as a pager cursor.
    pub history_hash: Hash,
    /// The entry before this one, if any.
    #[serde(default)]
    pub previous_history_hash: Option<Hash>,
    pub height: u64,
    pub timestamp: Timestamp,
    /// Transaction type as reported by the ledger (`transfer`, `fees`, `stake`, ...).
    pub kind: String,
    /// Signed amount: positive for credits, negative for debits.
    pub amount: i64,
    #[serde(default)]
    pub linked_account: Option<AccountId>,
    /// Microblock that produced the entry.
    pub microblock_hash: Hash,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolState {
    pub protocol_version: u32,
    pub fees_calculation_version: u32,
}

impl Default for ProtocolState {
    fn default() -> Self {
        Self {
            protocol_version: 1,
            fees_calculation_version: 1,
        }
    }
}

/// What a validator node reports about itself.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStatus {
    pub moniker: String,
    pub latest_block_height: u64,
    /// e.g. `tendermint/PubKeyEd25519`.
    pub cometbft_public_key_type: String,
    /// Base64 key as published by the node.
    pub cometbft_public_key: String,
}

/// Current shape of a chain: its genesis id and head.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualBlockchainState {
    pub id: Hash,
    pub kind: VirtualBlockchainKind,
    pub height: u64,
    pub head: Hash,
}

#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn get_account_id_by_public_key(
        &self,
        public_key: &PublicSignatureKey,
    ) -> Result<AccountId, ChainError>;

    async fn get_account_state(&self, account_id: &AccountId) -> Result<AccountState, ChainError>;

    /// Up to `limit` entries, walking backward from `from_hash` inclusive.
    async fn get_account_history(
        &self,
        account_id: &AccountId,
        from_hash: &Hash,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, ChainError>;

    async fn get_protocol_state(&self) -> Result<ProtocolState, ChainError>;

    /// Query a validator node directly at its own RPC endpoint.
    async fn get_node_status(&self, rpc_endpoint: &str) -> Result<NodeStatus, ChainError>;

    async fn get_validator_node_id_by_cometbft_public_key(
        &self,
        public_key: &str,
    ) -> Result<Hash, ChainError>;

    async fn load_organization_virtual_blockchain(
        &self,
        vb_id: &Hash,
    ) -> Result<VirtualBlockchainState, ChainError>;

    async fn load_account_virtual_blockchain(
        &self,
        account_id: &AccountId,
    ) -> Result<VirtualBlockchainState, ChainError>;

    /// Returns the content hash of the accepted microblock.
    async fn publish_microblock(&self, microblock: &SealedMicroblock) -> Result<Hash, ChainError>;
}

/// Builds a provider for a wallet's node endpoint.
pub trait ProviderFactory: Send + Sync {
    fn create(&self, node_endpoint: &str) -> Result<Arc<dyn ChainProvider>, ChainError>;
}
