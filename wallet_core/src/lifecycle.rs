//! Publication lifecycle of organizations and validator nodes, and staking.
//!
//! Every chain-mutating operation follows the same path: check preconditions
//! against the local store, derive the wallet's keys, price the microblock
//! with the protocol's current fee formula, seal, publish, and only then
//! record the resulting chain id locally. A failure at any step leaves the
//! local hierarchy untouched.
//!
//! Organization: `Unpublished -> Published` (sets `vb_id`).
//! Node: `Unclaimed -> Claimed` (sets `vb_id`, requires a published organization).
//! Stake / unstake: no local state; require a published organization and a
//! claimed node that the ledger resolves by its consensus key.

use ledgerdesk_chain::{
    AccountState, ChainError, ChainProvider, FeeFormulaRegistry, Microblock, ProviderFactory,
    Section, VirtualBlockchainKind,
};
use ledgerdesk_crypto::derive_keypair;
use ledgerdesk_store::LocalEntityStore;
use ledgerdesk_types::{
    AccountId, Hash, KeyPair, Node, NodePatch, Organization, SignatureScheme, Wallet,
};
use std::sync::Arc;

use crate::breakdown::AccountBreakdown;
use crate::error::WalletError;
use crate::pager::{HistoryPager, DEFAULT_PAGE_SIZE};
use crate::single_flight::{EntityKey, FlightGuard, OperationKind, SingleFlight};

/// Public description published on an organization's chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OrganizationDescription {
    pub name: String,
    pub city: String,
    pub country_code: String,
    pub website: String,
}

impl OrganizationDescription {
    fn into_section(self) -> Section {
        Section::OrganizationDescription {
            name: self.name,
            city: self.city,
            country_code: self.country_code,
            website: self.website,
        }
    }
}

pub struct LedgerLifecycle {
    store: Arc<LocalEntityStore>,
    providers: Arc<dyn ProviderFactory>,
    fees: FeeFormulaRegistry,
    scheme: SignatureScheme,
    history_page_size: u32,
    flights: SingleFlight,
}

impl LedgerLifecycle {
    pub fn new(store: Arc<LocalEntityStore>, providers: Arc<dyn ProviderFactory>) -> Self {
        Self {
            store,
            providers,
            fees: FeeFormulaRegistry::default(),
            scheme: SignatureScheme::default(),
            history_page_size: DEFAULT_PAGE_SIZE,
            flights: SingleFlight::new(),
        }
    }

    pub fn with_signature_scheme(mut self, scheme: SignatureScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn with_fee_formulas(mut self, fees: FeeFormulaRegistry) -> Self {
        self.fees = fees;
        self
    }

    pub fn with_history_page_size(mut self, size: u32) -> Self {
        self.history_page_size = size.max(1);
        self
    }

    pub fn store(&self) -> &Arc<LocalEntityStore> {
        &self.store
    }

    pub fn signature_scheme(&self) -> SignatureScheme {
        self.scheme
    }

    pub fn is_in_flight(&self, kind: OperationKind, key: EntityKey) -> bool {
        self.flights.is_in_flight(kind, key)
    }

    // ── Organizations ──────────────────────────────────────────────────

    /// Create the organization's chain and record its id.
    ///
    /// Fails `AlreadyPublished` if the organization already has a chain id;
    /// use [`Self::update_organization_description`] for a published one.
    pub async fn publish_organization(
        &self,
        wallet_id: u64,
        org_id: u64,
        description: OrganizationDescription,
    ) -> Result<Hash, WalletError> {
        let key = EntityKey::Organization { wallet_id, org_id };
        let _guard = self.begin(OperationKind::PublishOrganization, key)?;
        tracing::debug!(wallet_id, org_id, "publishing organization");
        let result = self.publish_organization_inner(wallet_id, org_id, description).await;
        log_outcome("publish organization", key, &result);
        result
    }

    async fn publish_organization_inner(
        &self,
        wallet_id: u64,
        org_id: u64,
        description: OrganizationDescription,
    ) -> Result<Hash, WalletError> {
        let (wallet, org) = self.organization(wallet_id, org_id).await?;
        if let Some(vb_id) = org.vb_id {
            return Err(WalletError::AlreadyPublished(format!(
                "organization \"{}\" is already published with id {vb_id}",
                org.name
            )));
        }

        let keys = self.key_pair(&wallet)?;
        let provider = self.provider(&wallet)?;
        let account_id = provider.get_account_id_by_public_key(&keys.public).await?;

        let mut mb = Microblock::genesis(VirtualBlockchainKind::Organization);
        mb.add_sections([
            Section::OrganizationCreation { account_id },
            description.into_section(),
        ]);
        let vb_id = self
            .seal_and_publish(provider.as_ref(), mb, &keys, account_id)
            .await?;

        if !self.store.set_organization_vb_id(wallet_id, org_id, vb_id).await? {
            tracing::error!(wallet_id, org_id, vb_id = %vb_id, "organization removed during publication, chain id not recorded");
            return Err(WalletError::NotFound(format!(
                "organization {org_id} in wallet {wallet_id}"
            )));
        }
        Ok(vb_id)
    }

    /// Append a new description to a published organization's chain.
    /// Returns the new head; the stored chain id does not change.
    pub async fn update_organization_description(
        &self,
        wallet_id: u64,
        org_id: u64,
        description: OrganizationDescription,
    ) -> Result<Hash, WalletError> {
        let key = EntityKey::Organization { wallet_id, org_id };
        let _guard = self.begin(OperationKind::UpdateOrganization, key)?;
        tracing::debug!(wallet_id, org_id, "updating organization description");
        let result = self.update_organization_inner(wallet_id, org_id, description).await;
        log_outcome("update organization", key, &result);
        result
    }

    async fn update_organization_inner(
        &self,
        wallet_id: u64,
        org_id: u64,
        description: OrganizationDescription,
    ) -> Result<Hash, WalletError> {
        let (wallet, org) = self.organization(wallet_id, org_id).await?;
        let vb_id = org.vb_id.ok_or_else(|| {
            WalletError::PreconditionFailed(format!("organization {org_id} is not published"))
        })?;

        let keys = self.key_pair(&wallet)?;
        let provider = self.provider(&wallet)?;
        let account_id = provider.get_account_id_by_public_key(&keys.public).await?;
        let chain = provider.load_organization_virtual_blockchain(&vb_id).await?;

        let mut mb = Microblock::after(&chain);
        mb.add_section(description.into_section());
        self.seal_and_publish(provider.as_ref(), mb, &keys, account_id)
            .await
    }

    // ── Validator nodes ────────────────────────────────────────────────

    /// Create the node's validator chain under its organization and record
    /// its id. The organization must be published; no network call is made
    /// otherwise.
    pub async fn claim_node(
        &self,
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
    ) -> Result<Hash, WalletError> {
        let key = EntityKey::Node {
            wallet_id,
            org_id,
            node_id,
        };
        let _guard = self.begin(OperationKind::ClaimNode, key)?;
        tracing::debug!(wallet_id, org_id, node_id, "claiming node");
        let result = self.claim_node_inner(wallet_id, org_id, node_id).await;
        log_outcome("claim node", key, &result);
        result
    }

    async fn claim_node_inner(
        &self,
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
    ) -> Result<Hash, WalletError> {
        let (wallet, org) = self.organization(wallet_id, org_id).await?;
        let org_vb_id = org.vb_id.ok_or_else(|| {
            WalletError::PreconditionFailed(format!(
                "organization {org_id} must be published before claiming node {node_id}"
            ))
        })?;
        let node = find_node(&org, node_id)?;
        if let Some(vb_id) = node.vb_id {
            return Err(WalletError::AlreadyPublished(format!(
                "node \"{}\" is already claimed with id {vb_id}",
                node.name
            )));
        }

        let keys = self.key_pair(&wallet)?;
        let provider = self.provider(&wallet)?;
        let account_id = provider.get_account_id_by_public_key(&keys.public).await?;
        let status = provider.get_node_status(&node.rpc_endpoint).await?;
        tracing::debug!(node_id, moniker = %status.moniker, height = status.latest_block_height, "node status fetched");

        let mut mb = Microblock::genesis(VirtualBlockchainKind::ValidatorNode);
        mb.add_sections([
            Section::ValidatorNodeCreation {
                organization_id: org_vb_id,
            },
            Section::ValidatorNodeRpcEndpoint {
                rpc_endpoint: node.rpc_endpoint.clone(),
            },
            Section::ValidatorNodeCometbftPublicKeyDeclaration {
                public_key_type: status.cometbft_public_key_type,
                public_key: status.cometbft_public_key,
            },
        ]);
        let vb_id = self
            .seal_and_publish(provider.as_ref(), mb, &keys, account_id)
            .await?;

        let patch = NodePatch {
            vb_id: Some(vb_id),
            ..Default::default()
        };
        if self
            .store
            .update_node(wallet_id, org_id, node_id, patch)
            .await?
            .is_none()
        {
            tracing::error!(wallet_id, org_id, node_id, vb_id = %vb_id, "node removed during claim, chain id not recorded");
            return Err(WalletError::NotFound(format!(
                "node {node_id} in organization {org_id}"
            )));
        }
        Ok(vb_id)
    }

    // ── Staking ────────────────────────────────────────────────────────

    /// Stake `amount` from the wallet's account on a claimed node.
    /// Returns the hash of the published account microblock.
    pub async fn stake_on_node(
        &self,
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
        amount: u64,
    ) -> Result<Hash, WalletError> {
        self.staking(OperationKind::Stake, wallet_id, org_id, node_id, amount)
            .await
    }

    pub async fn unstake_from_node(
        &self,
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
        amount: u64,
    ) -> Result<Hash, WalletError> {
        self.staking(OperationKind::Unstake, wallet_id, org_id, node_id, amount)
            .await
    }

    async fn staking(
        &self,
        kind: OperationKind,
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
        amount: u64,
    ) -> Result<Hash, WalletError> {
        let key = EntityKey::Node {
            wallet_id,
            org_id,
            node_id,
        };
        let _guard = self.begin(kind, key)?;
        // Stake and unstake both extend the account chain, whatever the node.
        let _account_guard =
            self.begin(OperationKind::AppendAccountChain, EntityKey::Account { wallet_id })?;
        tracing::debug!(wallet_id, org_id, node_id, amount, ?kind, "staking operation");
        let result = self
            .staking_inner(kind, wallet_id, org_id, node_id, amount)
            .await;
        let label = if kind == OperationKind::Stake { "stake" } else { "unstake" };
        log_outcome(label, key, &result);
        result
    }

    async fn staking_inner(
        &self,
        kind: OperationKind,
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
        amount: u64,
    ) -> Result<Hash, WalletError> {
        let (wallet, org) = self.organization(wallet_id, org_id).await?;
        if !org.is_published() {
            return Err(WalletError::PreconditionFailed(format!(
                "organization {org_id} is not published"
            )));
        }
        let node = find_node(&org, node_id)?;
        let validator_node_id = node.vb_id.ok_or_else(|| {
            WalletError::PreconditionFailed(format!("node {node_id} is not claimed"))
        })?;
        if amount == 0 {
            return Err(WalletError::PreconditionFailed(
                "amount must be positive".into(),
            ));
        }

        let provider = self.provider(&wallet)?;
        let status = provider.get_node_status(&node.rpc_endpoint).await?;
        if !is_declared_validator_node(provider.as_ref(), &status.cometbft_public_key).await {
            return Err(WalletError::PreconditionFailed(format!(
                "node {node_id} is not declared as a validator on the ledger"
            )));
        }

        let keys = self.key_pair(&wallet)?;
        let account_id = provider.get_account_id_by_public_key(&keys.public).await?;
        let account_chain = provider.load_account_virtual_blockchain(&account_id).await?;

        let section = match kind {
            OperationKind::Unstake => Section::AccountUnstake {
                validator_node_id,
                amount,
            },
            _ => Section::AccountStake {
                validator_node_id,
                amount,
            },
        };
        let mut mb = Microblock::after(&account_chain);
        mb.add_section(section);
        self.seal_and_publish(provider.as_ref(), mb, &keys, account_id)
            .await
    }

    // ── Account queries ────────────────────────────────────────────────

    pub async fn account_id(&self, wallet_id: u64) -> Result<AccountId, WalletError> {
        let wallet = self.wallet(wallet_id).await?;
        let keys = self.key_pair(&wallet)?;
        let provider = self.provider(&wallet)?;
        Ok(provider.get_account_id_by_public_key(&keys.public).await?)
    }

    pub async fn account_state(&self, wallet_id: u64) -> Result<AccountState, WalletError> {
        let wallet = self.wallet(wallet_id).await?;
        let keys = self.key_pair(&wallet)?;
        let provider = self.provider(&wallet)?;
        let account_id = provider.get_account_id_by_public_key(&keys.public).await?;
        Ok(provider.get_account_state(&account_id).await?)
    }

    /// Whether the ledger knows the wallet's account. Any failure, including
    /// an unreachable node, reads as `false`.
    pub async fn is_account_found(&self, wallet_id: u64) -> bool {
        match self.account_id(wallet_id).await {
            Ok(account_id) => {
                tracing::debug!(wallet_id, account = %account_id, "account found");
                true
            }
            Err(e) => {
                tracing::debug!(wallet_id, error = %e, "account not found");
                false
            }
        }
    }

    pub async fn account_breakdown(&self, wallet_id: u64) -> Result<AccountBreakdown, WalletError> {
        Ok(AccountBreakdown::from_state(
            &self.account_state(wallet_id).await?,
        ))
    }

    /// A pager positioned at the account's most recent history entry.
    pub async fn history_pager(&self, wallet_id: u64) -> Result<HistoryPager, WalletError> {
        let wallet = self.wallet(wallet_id).await?;
        let keys = self.key_pair(&wallet)?;
        let provider = self.provider(&wallet)?;
        let account_id = provider.get_account_id_by_public_key(&keys.public).await?;
        // An account the ledger holds no state for has no history to page.
        let cursor = match provider.get_account_state(&account_id).await {
            Ok(state) => state.last_history_hash,
            Err(ChainError::NotFound(msg)) => {
                tracing::debug!(wallet_id, account = %account_id, %msg, "no account state");
                None
            }
            Err(e) => return Err(e.into()),
        };
        let mut pager = HistoryPager::new(provider, account_id, cursor);
        pager.set_limit(self.history_page_size);
        Ok(pager)
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn begin(&self, kind: OperationKind, key: EntityKey) -> Result<FlightGuard, WalletError> {
        self.flights.try_begin(kind, key).ok_or_else(|| {
            tracing::warn!(?kind, entity = %key, "operation already in flight");
            WalletError::OperationInFlight(format!("{kind:?} on {key}"))
        })
    }

    async fn wallet(&self, wallet_id: u64) -> Result<Wallet, WalletError> {
        self.store
            .get_wallet(wallet_id)
            .await?
            .ok_or_else(|| WalletError::NotFound(format!("wallet {wallet_id}")))
    }

    async fn organization(
        &self,
        wallet_id: u64,
        org_id: u64,
    ) -> Result<(Wallet, Organization), WalletError> {
        let wallet = self.wallet(wallet_id).await?;
        let org = wallet.organization(org_id).cloned().ok_or_else(|| {
            WalletError::NotFound(format!("organization {org_id} in wallet {wallet_id}"))
        })?;
        Ok((wallet, org))
    }

    fn key_pair(&self, wallet: &Wallet) -> Result<KeyPair, WalletError> {
        Ok(derive_keypair(&wallet.seed, self.scheme)?)
    }

    fn provider(&self, wallet: &Wallet) -> Result<Arc<dyn ChainProvider>, WalletError> {
        Ok(self.providers.create(&wallet.node_endpoint)?)
    }

    /// Price `mb` with the protocol's current fee formula, seal it for
    /// `fees_payer` and publish it. Returns the published hash.
    async fn seal_and_publish(
        &self,
        provider: &dyn ChainProvider,
        mut mb: Microblock,
        keys: &KeyPair,
        fees_payer: AccountId,
    ) -> Result<Hash, WalletError> {
        let protocol = provider.get_protocol_state().await?;
        let gas = self
            .fees
            .compute_fees(protocol.fees_calculation_version, keys.scheme(), &mb)?;
        mb.set_gas(gas);
        let sealed = mb.seal(&keys.private, fees_payer)?;
        let hash = provider.publish_microblock(&sealed).await?;
        tracing::debug!(hash = %hash, gas, fee_version = protocol.fees_calculation_version, "microblock published");
        Ok(hash)
    }
}

/// Whether the ledger resolves a validator node by its consensus key. Any
/// provider error reads as "not declared".
pub async fn is_declared_validator_node(provider: &dyn ChainProvider, public_key: &str) -> bool {
    match provider
        .get_validator_node_id_by_cometbft_public_key(public_key)
        .await
    {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(error = %e, "validator node lookup failed");
            false
        }
    }
}

fn find_node(org: &Organization, node_id: u64) -> Result<Node, WalletError> {
    org.node(node_id).cloned().ok_or_else(|| {
        WalletError::NotFound(format!("node {node_id} in organization {}", org.id))
    })
}

fn log_outcome(operation: &str, key: EntityKey, result: &Result<Hash, WalletError>) {
    match result {
        Ok(hash) => tracing::info!(entity = %key, hash = %hash, "{operation} succeeded"),
        Err(e) => tracing::warn!(entity = %key, kind = ?e.kind(), error = %e, "{operation} failed"),
    }
}
