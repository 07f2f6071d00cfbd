//! Nullable ledger: an in-memory `ChainProvider` that records every call.
//!
//! Accounts are derived from public keys, publication returns the sealed
//! hash and advances the in-memory chains, and claimed validator keys become
//! resolvable. Anything else (node status, account state, history, protocol
//! state) is scripted by the test.

use async_trait::async_trait;
use ledgerdesk_chain::{
    AccountState, ChainError, ChainProvider, HistoryEntry, NodeStatus, ProtocolState,
    ProviderFactory, SealedMicroblock, Section, VirtualBlockchainKind, VirtualBlockchainState,
};
use ledgerdesk_crypto::account_id_from_public_key;
use ledgerdesk_types::{AccountId, Hash, PublicSignatureKey};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
struct Ledger {
    protocol: ProtocolState,
    node_status: HashMap<String, NodeStatus>,
    validators: HashMap<String, Hash>,
    account_states: HashMap<AccountId, AccountState>,
    /// Per account, newest first.
    history: HashMap<AccountId, Vec<HistoryEntry>>,
    chains: HashMap<Hash, VirtualBlockchainState>,
    account_chains: HashMap<AccountId, VirtualBlockchainState>,
    unknown_accounts: HashSet<AccountId>,
}

/// A test ledger that never touches the network.
pub struct NullChainProvider {
    calls: Mutex<Vec<&'static str>>,
    published: Mutex<Vec<SealedMicroblock>>,
    failures: Mutex<HashSet<&'static str>>,
    held: Mutex<HashSet<&'static str>>,
    gate: Semaphore,
    ledger: Mutex<Ledger>,
}

impl Default for NullChainProvider {
    fn default() -> Self {
        Self {
            calls: Mutex::default(),
            published: Mutex::default(),
            failures: Mutex::default(),
            held: Mutex::default(),
            gate: Semaphore::new(0),
            ledger: Mutex::default(),
        }
    }
}

impl NullChainProvider {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Scripting ──────────────────────────────────────────────────────

    pub fn set_protocol_state(&self, protocol: ProtocolState) {
        lock(&self.ledger).protocol = protocol;
    }

    /// Status returned for a node's RPC endpoint. Unscripted endpoints are
    /// unreachable.
    pub fn set_node_status(&self, rpc_endpoint: impl Into<String>, status: NodeStatus) {
        lock(&self.ledger)
            .node_status
            .insert(rpc_endpoint.into(), status);
    }

    /// Make a consensus key resolvable without a claim.
    pub fn declare_validator(&self, public_key: impl Into<String>, validator_node_id: Hash) {
        lock(&self.ledger)
            .validators
            .insert(public_key.into(), validator_node_id);
    }

    pub fn forget_validator(&self, public_key: &str) {
        lock(&self.ledger).validators.remove(public_key);
    }

    pub fn set_account_state(&self, account_id: AccountId, state: AccountState) {
        lock(&self.ledger).account_states.insert(account_id, state);
    }

    /// History for an account, newest entry first.
    pub fn set_history(&self, account_id: AccountId, entries: Vec<HistoryEntry>) {
        lock(&self.ledger).history.insert(account_id, entries);
    }

    /// The account derived from `public_key` is unknown to the ledger.
    pub fn hide_account(&self, public_key: &PublicSignatureKey) {
        lock(&self.ledger)
            .unknown_accounts
            .insert(account_id_from_public_key(public_key));
    }

    /// Every subsequent call to `method` fails with a network error.
    pub fn fail_on(&self, method: &'static str) {
        lock(&self.failures).insert(method);
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    /// Calls to `method` park after being recorded until [`Self::release`]
    /// admits them, one permit per call.
    pub fn hold_on(&self, method: &'static str) {
        lock(&self.held).insert(method);
    }

    pub fn release(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    // ── Inspection ─────────────────────────────────────────────────────

    /// Method names in call order.
    pub fn calls(&self) -> Vec<&'static str> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.calls).iter().filter(|c| **c == method).count()
    }

    pub fn published(&self) -> Vec<SealedMicroblock> {
        lock(&self.published).clone()
    }

    pub fn chain(&self, vb_id: &Hash) -> Option<VirtualBlockchainState> {
        lock(&self.ledger).chains.get(vb_id).cloned()
    }

    pub fn reset_calls(&self) {
        lock(&self.calls).clear();
    }

    async fn enter(&self, method: &'static str) -> Result<(), ChainError> {
        lock(&self.calls).push(method);
        let held = lock(&self.held).contains(method);
        if held {
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|e| ChainError::Network(format!("{method}: {e}")))?;
            permit.forget();
        }
        if lock(&self.failures).contains(method) {
            return Err(ChainError::Network(format!("{method}: injected failure")));
        }
        Ok(())
    }

    fn apply(&self, microblock: &SealedMicroblock) {
        let hash = microblock.hash();
        let header = microblock.header();
        let mut ledger = lock(&self.ledger);

        match header.previous_hash {
            None => {
                let state = VirtualBlockchainState {
                    id: hash,
                    kind: header.kind,
                    height: header.height,
                    head: hash,
                };
                ledger.chains.insert(hash, state);
            }
            Some(previous) => {
                if let Some(chain) = ledger.chains.values_mut().find(|c| c.head == previous) {
                    chain.head = hash;
                    chain.height = header.height;
                }
                if let Some(chain) = ledger
                    .account_chains
                    .values_mut()
                    .find(|c| c.head == previous)
                {
                    chain.head = hash;
                    chain.height = header.height;
                }
            }
        }

        if header.kind == VirtualBlockchainKind::ValidatorNode {
            for section in microblock.sections() {
                if let Section::ValidatorNodeCometbftPublicKeyDeclaration { public_key, .. } = section {
                    ledger.validators.insert(public_key.clone(), hash);
                }
            }
        }
    }
}

#[async_trait]
impl ChainProvider for NullChainProvider {
    async fn get_account_id_by_public_key(
        &self,
        public_key: &PublicSignatureKey,
    ) -> Result<AccountId, ChainError> {
        self.enter("get_account_id_by_public_key").await?;
        let account_id = account_id_from_public_key(public_key);
        if lock(&self.ledger).unknown_accounts.contains(&account_id) {
            return Err(ChainError::NotFound(format!("account for key {}", public_key.to_hex())));
        }
        Ok(account_id)
    }

    async fn get_account_state(&self, account_id: &AccountId) -> Result<AccountState, ChainError> {
        self.enter("get_account_state").await?;
        lock(&self.ledger)
            .account_states
            .get(account_id)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("account {account_id}")))
    }

    async fn get_account_history(
        &self,
        account_id: &AccountId,
        from_hash: &Hash,
        limit: u32,
    ) -> Result<Vec<HistoryEntry>, ChainError> {
        self.enter("get_account_history").await?;
        let ledger = lock(&self.ledger);
        let entries = ledger
            .history
            .get(account_id)
            .ok_or_else(|| ChainError::NotFound(format!("history of {account_id}")))?;
        let start = entries
            .iter()
            .position(|e| e.history_hash == *from_hash)
            .ok_or_else(|| ChainError::NotFound(format!("history entry {from_hash}")))?;
        Ok(entries
            .iter()
            .skip(start)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn get_protocol_state(&self) -> Result<ProtocolState, ChainError> {
        self.enter("get_protocol_state").await?;
        Ok(lock(&self.ledger).protocol.clone())
    }

    async fn get_node_status(&self, rpc_endpoint: &str) -> Result<NodeStatus, ChainError> {
        self.enter("get_node_status").await?;
        lock(&self.ledger)
            .node_status
            .get(rpc_endpoint)
            .cloned()
            .ok_or_else(|| ChainError::Network(format!("{rpc_endpoint}: unreachable")))
    }

    async fn get_validator_node_id_by_cometbft_public_key(
        &self,
        public_key: &str,
    ) -> Result<Hash, ChainError> {
        self.enter("get_validator_node_id_by_cometbft_public_key").await?;
        lock(&self.ledger)
            .validators
            .get(public_key)
            .copied()
            .ok_or_else(|| ChainError::NotFound(format!("validator with key {public_key}")))
    }

    async fn load_organization_virtual_blockchain(
        &self,
        vb_id: &Hash,
    ) -> Result<VirtualBlockchainState, ChainError> {
        self.enter("load_organization_virtual_blockchain").await?;
        lock(&self.ledger)
            .chains
            .get(vb_id)
            .filter(|c| c.kind == VirtualBlockchainKind::Organization)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(format!("organization chain {vb_id}")))
    }

    /// Accounts not seen before start with a one-block chain whose id is the
    /// account id.
    async fn load_account_virtual_blockchain(
        &self,
        account_id: &AccountId,
    ) -> Result<VirtualBlockchainState, ChainError> {
        self.enter("load_account_virtual_blockchain").await?;
        let mut ledger = lock(&self.ledger);
        let state = ledger
            .account_chains
            .entry(*account_id)
            .or_insert_with(|| VirtualBlockchainState {
                id: *account_id.as_hash(),
                kind: VirtualBlockchainKind::Account,
                height: 1,
                head: *account_id.as_hash(),
            });
        Ok(state.clone())
    }

    async fn publish_microblock(&self, microblock: &SealedMicroblock) -> Result<Hash, ChainError> {
        self.enter("publish_microblock").await?;
        self.apply(microblock);
        lock(&self.published).push(microblock.clone());
        Ok(microblock.hash())
    }
}

/// Hands out one shared [`NullChainProvider`] for every endpoint.
pub struct NullProviderFactory {
    provider: Arc<NullChainProvider>,
    endpoints: Mutex<Vec<String>>,
}

impl NullProviderFactory {
    pub fn new(provider: Arc<NullChainProvider>) -> Self {
        Self {
            provider,
            endpoints: Mutex::new(Vec::new()),
        }
    }

    pub fn provider(&self) -> &Arc<NullChainProvider> {
        &self.provider
    }

    /// Endpoints providers were requested for, in order.
    pub fn endpoints(&self) -> Vec<String> {
        lock(&self.endpoints).clone()
    }
}

impl ProviderFactory for NullProviderFactory {
    fn create(&self, node_endpoint: &str) -> Result<Arc<dyn ChainProvider>, ChainError> {
        lock(&self.endpoints).push(node_endpoint.to_string());
        Ok(self.provider.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerdesk_chain::Microblock;
    use ledgerdesk_crypto::derive_keypair;
    use ledgerdesk_types::SignatureScheme;

    fn keys() -> ledgerdesk_types::KeyPair {
        derive_keypair(&"55".repeat(32), SignatureScheme::Secp256k1).unwrap()
    }

    #[tokio::test]
    async fn records_calls_and_injects_failures() {
        let provider = NullChainProvider::new();
        provider.get_protocol_state().await.unwrap();
        provider.fail_on("get_protocol_state");
        assert!(matches!(
            provider.get_protocol_state().await,
            Err(ChainError::Network(_))
        ));
        assert_eq!(provider.call_count("get_protocol_state"), 2);
    }

    #[tokio::test]
    async fn published_genesis_becomes_a_chain() {
        let provider = NullChainProvider::new();
        let keys = keys();
        let account = provider.get_account_id_by_public_key(&keys.public).await.unwrap();
        let mut mb = Microblock::genesis(VirtualBlockchainKind::Organization);
        mb.add_section(Section::OrganizationCreation { account_id: account });
        let sealed = mb.seal(&keys.private, account).unwrap();

        let hash = provider.publish_microblock(&sealed).await.unwrap();
        assert_eq!(hash, sealed.hash());
        let chain = provider.load_organization_virtual_blockchain(&hash).await.unwrap();
        assert_eq!((chain.id, chain.head, chain.height), (hash, hash, 1));

        let next = Microblock::after(&chain).seal(&keys.private, account).unwrap();
        let head = provider.publish_microblock(&next).await.unwrap();
        let chain = provider.chain(&hash).unwrap();
        assert_eq!((chain.id, chain.head, chain.height), (hash, head, 2));
    }

    #[tokio::test]
    async fn hidden_account_is_not_found() {
        let provider = NullChainProvider::new();
        let keys = keys();
        provider.hide_account(&keys.public);
        assert!(matches!(
            provider.get_account_id_by_public_key(&keys.public).await,
            Err(ChainError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn held_calls_wait_for_release() {
        let provider = NullChainProvider::new();
        provider.hold_on("get_protocol_state");
        let (state, _) = tokio::join!(provider.get_protocol_state(), async {
            while provider.call_count("get_protocol_state") == 0 {
                tokio::task::yield_now().await;
            }
            provider.release(1);
        });
        assert_eq!(state.unwrap(), ProtocolState::default());
    }

    #[test]
    fn factory_shares_provider_and_records_endpoints() {
        let provider = Arc::new(NullChainProvider::new());
        let factory = NullProviderFactory::new(Arc::clone(&provider));
        factory.create("http://a").unwrap();
        factory.create("http://b").unwrap();
        assert_eq!(factory.endpoints(), vec!["http://a", "http://b"]);
    }
}
