//! JSON-RPC [`ChainProvider`] backed by `reqwest`.
//!
//! Ledger queries are posted to the wallet's node endpoint as
//! `{"action": ..., ...params}` and answered with `{"result": ...}` or
//! `{"error": "..."}`. Validator status is read from the node's own
//! CometBFT `/status` endpoint.

use async_trait::async_trait;
use ledgerdesk_types::{AccountId, Hash, PublicSignatureKey};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::error::ChainError;
use crate::microblock::SealedMicroblock;
use crate::provider::{
    AccountState, ChainProvider, HistoryEntry, NodeStatus, ProtocolState, ProviderFactory,
    VirtualBlockchainState,
};

/// Request and connect timeouts applied to every provider call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RpcTimeouts {
    pub request: Duration,
    pub connect: Duration,
}

impl Default for RpcTimeouts {
    fn default() -> Self {
        Self {
            request: Duration::from_secs(30),
            connect: Duration::from_secs(10),
        }
    }
}

#[derive(Clone)]
pub struct RpcChainProvider {
    http: reqwest::Client,
    node_url: String,
}

impl RpcChainProvider {
    pub fn new(node_url: impl Into<String>, timeouts: RpcTimeouts) -> Result<Self, ChainError> {
        let http = reqwest::Client::builder()
            .timeout(timeouts.request)
            .connect_timeout(timeouts.connect)
            .build()
            .map_err(|e| ChainError::Network(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            node_url: node_url.into(),
        })
    }

    pub fn node_url(&self) -> &str {
        &self.node_url
    }

    async fn rpc_call(
        &self,
        action: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ChainError> {
        let mut body = params;
        body.as_object_mut()
            .ok_or_else(|| ChainError::Encoding("params must be a JSON object".into()))?
            .insert("action".to_string(), serde_json::json!(action));

        tracing::trace!(action, node = %self.node_url, "rpc call");
        let response = self
            .http
            .post(&self.node_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChainError::Network(format!("{action}: {e}")))?;

        if !response.status().is_success() {
            return Err(ChainError::Network(format!(
                "{action}: node returned HTTP {}",
                response.status()
            )));
        }

        let mut json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("{action}: {e}")))?;

        if let Some(err) = json.get("error").and_then(|e| e.as_str()) {
            return Err(if err.contains("not found") {
                ChainError::NotFound(format!("{action}: {err}"))
            } else {
                ChainError::Rpc(format!("{action}: {err}"))
            });
        }

        if let Some(result) = json.get_mut("result") {
            return Ok(result.take());
        }
        Ok(json)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        action: &str,
        params: serde_json::Value,
    ) -> Result<T, ChainError> {
        let result = self.rpc_call(action, params).await?;
        serde_json::from_value(result)
            .map_err(|e| ChainError::InvalidResponse(format!("{action}: {e}")))
    }
}

#[derive(Deserialize)]
struct AccountIdResult {
    account_id: AccountId,
}

#[derive(Deserialize)]
struct HistoryResult {
    #[serde(default)]
    entries: Vec<HistoryEntry>,
}

#[derive(Deserialize)]
struct ValidatorNodeResult {
    validator_node_id: Hash,
}

#[derive(Deserialize)]
struct PublishResult {
    hash: Hash,
}

// CometBFT `/status` response, reduced to the fields we read.
#[derive(Deserialize)]
struct CometStatusEnvelope {
    result: CometStatus,
}

#[derive(Deserialize)]
struct CometStatus {
    node_info: CometNodeInfo,
    sync_info: CometSyncInfo,
    validator_info: CometValidatorInfo,
}

#[derive(Deserialize)]
struct CometNodeInfo {
    moniker: String,
}

#[derive(Deserialize)]
struct CometSyncInfo {
    latest_block_height: String,
}

#[derive(Deserialize)]
struct CometValidatorInfo {
    pub_key: CometPubKey,
}

#[derive(Deserialize)]
struct CometPubKey {
    #[serde(rename = "type")]
    key_type: String,
    value: String,
}

impl TryFrom<CometStatus> for NodeStatus {
    type Error = ChainError;

    fn try_from(status: CometStatus) -> Result<Self, ChainError> {
        let latest_block_height = status
            .sync_info
            .latest_block_height
            .parse()
            .map_err(|e| ChainError::InvalidResponse(format!("latest_block_height: {e}")))?;
        Ok(NodeStatus {
            moniker: status.node_info.moniker,
            latest_block_height,
            cometbft_public_key_type: status.validator_info.pub_key.key_type,
            cometbft_public_key: status.validator_info.pub_key.value,
        })
    }
}

#[async_trait]
impl ChainProvider for RpcChainProvider {
    async fn get_account_id_by_public_key(
        &self,
        public_key: &PublicSignatureKey,
    ) -> Result<AccountId, ChainError> {
        let result: AccountIdResult = self
            .call(
                "account_by_public_key",
                serde_json::json!({
                    "scheme": public_key.scheme.id(),
                    "public_key": public_key.to_hex(),
                }),
            )
            .await?;
        Ok(result.account_id)
    }

    async fn get_account_state(&self, account_id: &AccountId) -> Result<AccountState, ChainError> {
        self.call(
            "account_state",
            serde_json::json!({ "account_id": account_id }),
        )
        .await
    }

    async fn get_account_history(
        &self,
        account_id: &AccountId,
        from_hash: &Hash,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, ChainError> {
        let result: HistoryResult = self
            .call(
                "account_history",
                serde_json::json!({
                    "account_id": account_id,
                    "last_history_hash": from_hash,
                    "limit": limit,
                }),
            )
            .await?;
        Ok(result.entries)
    }

    async fn get_protocol_state(&self) -> Result<ProtocolState, ChainError> {
        self.call("protocol_state", serde_json::json!({})).await
    }

    async fn get_node_status(&self, rpc_endpoint: &str) -> Result<NodeStatus, ChainError> {
        let url = format!("{}/status", rpc_endpoint.trim_end_matches('/'));
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChainError::Network(format!("{url}: {e}")))?;
        if !response.status().is_success() {
            return Err(ChainError::Network(format!(
                "{url}: node returned HTTP {}",
                response.status()
            )));
        }
        let envelope: CometStatusEnvelope = response
            .json()
            .await
            .map_err(|e| ChainError::InvalidResponse(format!("{url}: {e}")))?;
        envelope.result.try_into()
    }

    async fn get_validator_node_id_by_cometbft_public_key(
        &self,
        public_key: &str,
    ) -> Result<Hash, ChainError> {
        let result: ValidatorNodeResult = self
            .call(
                "validator_node_by_cometbft_public_key",
                serde_json::json!({ "public_key": public_key }),
            )
            .await?;
        Ok(result.validator_node_id)
    }

    async fn load_organization_virtual_blockchain(
        &self,
        vb_id: &Hash,
    ) -> Result<VirtualBlockchainState, ChainError> {
        self.call(
            "virtual_blockchain_state",
            serde_json::json!({ "kind": "organization", "id": vb_id }),
        )
        .await
    }

    async fn load_account_virtual_blockchain(
        &self,
        account_id: &AccountId,
    ) -> Result<VirtualBlockchainState, ChainError> {
        self.call(
            "virtual_blockchain_state",
            serde_json::json!({ "kind": "account", "id": account_id }),
        )
        .await
    }

    async fn publish_microblock(&self, microblock: &SealedMicroblock) -> Result<Hash, ChainError> {
        let result: PublishResult = self
            .call(
                "publish_microblock",
                serde_json::json!({ "microblock": microblock }),
            )
            .await?;
        if result.hash != microblock.hash() {
            tracing::warn!(
                local = %microblock.hash(),
                remote = %result.hash,
                "node reported a different microblock hash"
            );
        }
        Ok(result.hash)
    }
}

/// Creates an [`RpcChainProvider`] per wallet endpoint.
#[derive(Clone, Debug, Default)]
pub struct RpcProviderFactory {
    timeouts: RpcTimeouts,
}

impl RpcProviderFactory {
    pub fn new(timeouts: RpcTimeouts) -> Self {
        Self { timeouts }
    }
}

impl ProviderFactory for RpcProviderFactory {
    fn create(&self, node_endpoint: &str) -> Result<Arc<dyn ChainProvider>, ChainError> {
        Ok(Arc::new(RpcChainProvider::new(node_endpoint, self.timeouts)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_keeps_node_url() {
        let provider = RpcChainProvider::new("http://127.0.0.1:26657", RpcTimeouts::default()).unwrap();
        assert_eq!(provider.node_url(), "http://127.0.0.1:26657");
    }

    #[test]
    fn comet_status_maps_to_node_status() {
        let raw = serde_json::json!({
            "result": {
                "node_info": { "moniker": "val-1", "network": "testnet" },
                "sync_info": { "latest_block_height": "4821", "catching_up": false },
                "validator_info": {
                    "address": "ABCD",
                    "pub_key": { "type": "tendermint/PubKeyEd25519", "value": "c2VjcmV0LWtleQ==" },
                    "voting_power": "10"
                }
            }
        });
        let envelope: CometStatusEnvelope = serde_json::from_value(raw).unwrap();
        let status = NodeStatus::try_from(envelope.result).unwrap();
        assert_eq!(status.moniker, "val-1");
        assert_eq!(status.latest_block_height, 4821);
        assert_eq!(status.cometbft_public_key_type, "tendermint/PubKeyEd25519");
        assert_eq!(status.cometbft_public_key, "c2VjcmV0LWtleQ==");
    }

    #[test]
    fn bad_block_height_is_invalid_response() {
        let status = CometStatus {
            node_info: CometNodeInfo {
                moniker: "x".into(),
            },
            sync_info: CometSyncInfo {
                latest_block_height: "tall".into(),
            },
            validator_info: CometValidatorInfo {
                pub_key: CometPubKey {
                    key_type: "t".into(),
                    value: "v".into(),
                },
            },
        };
        assert!(matches!(
            NodeStatus::try_from(status),
            Err(ChainError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_node_is_network_error() {
        let provider = RpcChainProvider::new(
            "http://127.0.0.1:1",
            RpcTimeouts {
                request: Duration::from_millis(500),
                connect: Duration::from_millis(200),
            },
        )
        .unwrap();
        let result = provider.get_protocol_state().await;
        assert!(matches!(result, Err(ChainError::Network(_))));
    }
}
