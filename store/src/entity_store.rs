//! Local entity store: the persisted wallet → organization → node/application tree.
//!
//! The whole hierarchy lives in one JSON document. Every mutation reads the
//! current collection, builds the next collection, and writes it back
//! wholesale, so a failed write leaves the stored document untouched. An
//! async mutex serializes these cycles within one store instance; two
//! processes sharing a backend still race with last-write-wins.
//!
//! Mutations addressed at an absent wallet or organization are no-ops that
//! report `None`/`false`. Deciding whether that is an error belongs to the
//! caller.

use ledgerdesk_types::entity::next_id;
use ledgerdesk_types::{
    Application, Hash, NewApplication, NewNode, NewOrganization, NewWallet, Node, NodePatch,
    Organization, Wallet,
};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{KeyValueStore, StoreError};

/// Key under which the wallet hierarchy is stored.
pub const ORGANIZATIONS_KEY: &str = "organizations";

/// Key holding the highest wallet id ever issued.
pub const WALLET_SEQUENCE_KEY: &str = "wallet-sequence";

pub struct LocalEntityStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl LocalEntityStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Mutex::new(()),
        }
    }

    /// The full hierarchy; empty if the store was never initialized.
    pub async fn load(&self) -> Result<Vec<Wallet>, StoreError> {
        match self.kv.get(ORGANIZATIONS_KEY).await? {
            None | Some(serde_json::Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StoreError::Corruption(format!("{ORGANIZATIONS_KEY}: {e}"))),
        }
    }

    async fn persist(&self, wallets: &[Wallet]) -> Result<(), StoreError> {
        let value = serde_json::to_value(wallets)?;
        self.kv.set(ORGANIZATIONS_KEY, value).await
    }

    /// Run one read-modify-write cycle. `apply` returns the next collection
    /// (or `None` to skip the write) together with the caller's result.
    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&[Wallet]) -> (Option<Vec<Wallet>>, T),
    ) -> Result<T, StoreError> {
        let _guard = self.write_lock.lock().await;
        let current = self.load().await?;
        let (next, result) = apply(&current);
        if let Some(next) = next {
            self.persist(&next).await?;
        }
        Ok(result)
    }

    async fn wallet_sequence(&self) -> Result<u64, StoreError> {
        match self.kv.get(WALLET_SEQUENCE_KEY).await? {
            None | Some(serde_json::Value::Null) => Ok(0),
            Some(value) => value.as_u64().ok_or_else(|| {
                StoreError::Corruption(format!("{WALLET_SEQUENCE_KEY}: expected an integer"))
            }),
        }
    }

    /// Add a wallet; the store assigns the next wallet id.
    ///
    /// The sequence is advanced before the collection is written, so a failed
    /// write can leave a gap in wallet ids but never a reused id.
    pub async fn add_wallet(&self, wallet: NewWallet) -> Result<Wallet, StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut wallets = self.load().await?;
        let id = next_id(wallets.iter().map(|w| w.id), self.wallet_sequence().await?);
        self.kv
            .set(WALLET_SEQUENCE_KEY, serde_json::Value::from(id))
            .await?;
        let stored = wallet.into_wallet(id);
        wallets.push(stored.clone());
        self.persist(&wallets).await?;
        tracing::info!(wallet_id = stored.id, name = %stored.name, "wallet added");
        Ok(stored)
    }

    /// Remove a wallet and everything it owns. Returns whether it existed.
    pub async fn remove_wallet(&self, wallet_id: u64) -> Result<bool, StoreError> {
        self.mutate(|wallets| {
            if !wallets.iter().any(|w| w.id == wallet_id) {
                return (None, false);
            }
            let next = wallets.iter().filter(|w| w.id != wallet_id).cloned().collect();
            (Some(next), true)
        })
        .await
    }

    /// Drop the whole hierarchy. The wallet sequence is kept so ids issued
    /// before the clear are not handed out again.
    pub async fn clear(&self) -> Result<(), StoreError> {
        self.mutate(|_| (Some(Vec::new()), ())).await
    }

    pub async fn get_wallet(&self, wallet_id: u64) -> Result<Option<Wallet>, StoreError> {
        Ok(self.load().await?.into_iter().find(|w| w.id == wallet_id))
    }

    pub async fn get_organization(
        &self,
        wallet_id: u64,
        org_id: u64,
    ) -> Result<Option<Organization>, StoreError> {
        Ok(self
            .get_wallet(wallet_id)
            .await?
            .and_then(|w| w.organization(org_id).cloned()))
    }

    pub async fn get_node(
        &self,
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
    ) -> Result<Option<Node>, StoreError> {
        Ok(self
            .get_organization(wallet_id, org_id)
            .await?
            .and_then(|o| o.node(node_id).cloned()))
    }

    /// Add an organization to a wallet. `None` if the wallet is absent.
    pub async fn add_organization(
        &self,
        wallet_id: u64,
        organization: NewOrganization,
    ) -> Result<Option<Organization>, StoreError> {
        self.mutate(|wallets| {
            let mut next = wallets.to_vec();
            let Some(wallet) = next.iter_mut().find(|w| w.id == wallet_id) else {
                return (None, None);
            };
            let id = next_id(
                wallet.organizations.iter().map(|o| o.id),
                wallet.last_organization_id,
            );
            let stored = organization.into_organization(id);
            wallet.last_organization_id = id;
            wallet.organizations.push(stored.clone());
            (Some(next), Some(stored))
        })
        .await
    }

    /// Remove an organization together with its nodes and applications.
    pub async fn remove_organization(&self, wallet_id: u64, org_id: u64) -> Result<bool, StoreError> {
        self.mutate(|wallets| {
            let mut next = wallets.to_vec();
            let Some(wallet) = next.iter_mut().find(|w| w.id == wallet_id) else {
                return (None, false);
            };
            let before = wallet.organizations.len();
            wallet.organizations.retain(|o| o.id != org_id);
            if wallet.organizations.len() == before {
                return (None, false);
            }
            (Some(next), true)
        })
        .await
    }

    /// Record the organization's chain id. Overwrites unconditionally; the
    /// orchestrator guarantees it is only called once per organization.
    pub async fn set_organization_vb_id(
        &self,
        wallet_id: u64,
        org_id: u64,
        vb_id: Hash,
    ) -> Result<bool, StoreError> {
        self.update_organization(wallet_id, org_id, |org| org.vb_id = Some(vb_id))
            .await
    }

    /// Apply a partial update to a node. Returns the updated node.
    ///
    /// Setting a `vb_id` under an unpublished organization is rejected.
    pub async fn update_node(
        &self,
        wallet_id: u64,
        org_id: u64,
        node_id: u64,
        patch: NodePatch,
    ) -> Result<Option<Node>, StoreError> {
        self.mutate(|wallets| {
            let mut next = wallets.to_vec();
            let Some(org) = find_org_mut(&mut next, wallet_id, org_id) else {
                return (None, Ok(None));
            };
            if patch.vb_id.is_some() && !org.is_published() {
                return (None, Err(claimed_under_unpublished(org_id)));
            }
            let Some(node) = org.nodes.iter_mut().find(|n| n.id == node_id) else {
                return (None, Ok(None));
            };
            *node = patch.apply(node);
            let updated = node.clone();
            (Some(next), Ok(Some(updated)))
        })
        .await?
    }

    /// Add a single node to an organization.
    pub async fn add_node(
        &self,
        wallet_id: u64,
        org_id: u64,
        node: NewNode,
    ) -> Result<Option<Node>, StoreError> {
        Ok(self
            .import_nodes(wallet_id, org_id, vec![node])
            .await?
            .into_iter()
            .next())
    }

    /// Bulk-add nodes, assigning consecutive ids after the organization's
    /// current maximum. Empty if the wallet or organization is absent.
    ///
    /// Nodes that already carry a `vb_id` are only accepted under a published
    /// organization; otherwise nothing is imported.
    pub async fn import_nodes(
        &self,
        wallet_id: u64,
        org_id: u64,
        nodes: Vec<NewNode>,
    ) -> Result<Vec<Node>, StoreError> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        self.mutate(|wallets| {
            let mut next = wallets.to_vec();
            let Some(org) = find_org_mut(&mut next, wallet_id, org_id) else {
                return (None, Ok(Vec::new()));
            };
            if !org.is_published() && nodes.iter().any(|n| n.vb_id.is_some()) {
                return (None, Err(claimed_under_unpublished(org_id)));
            }
            let first = next_id(org.nodes.iter().map(|n| n.id), org.last_node_id);
            let imported: Vec<Node> = nodes
                .into_iter()
                .zip(first..)
                .map(|(node, id)| node.into_node(id))
                .collect();
            if let Some(last) = imported.last() {
                org.last_node_id = last.id;
            }
            org.nodes.extend(imported.iter().cloned());
            (Some(next), Ok(imported))
        })
        .await?
    }

    pub async fn delete_node(&self, wallet_id: u64, org_id: u64, node_id: u64) -> Result<bool, StoreError> {
        self.mutate(|wallets| {
            let mut next = wallets.to_vec();
            let Some(org) = find_org_mut(&mut next, wallet_id, org_id) else {
                return (None, false);
            };
            let before = org.nodes.len();
            org.nodes.retain(|n| n.id != node_id);
            if org.nodes.len() == before {
                return (None, false);
            }
            (Some(next), true)
        })
        .await
    }

    /// Whether any node under the organization carries `candidate` as its
    /// chain id. The comparison ignores case and surrounding whitespace; a
    /// candidate that is not a valid identifier matches nothing.
    pub async fn is_node_declared(
        &self,
        wallet_id: u64,
        org_id: u64,
        candidate: &str,
    ) -> Result<bool, StoreError> {
        let Some(wallet) = self.get_wallet(wallet_id).await? else {
            tracing::warn!(wallet_id, "is_node_declared: wallet not found");
            return Ok(false);
        };
        let Some(org) = wallet.organization(org_id) else {
            tracing::warn!(wallet_id, org_id, "is_node_declared: organization not found");
            return Ok(false);
        };
        let Ok(candidate) = Hash::from_hex(candidate) else {
            return Ok(false);
        };
        Ok(org.nodes.iter().any(|n| n.vb_id == Some(candidate)))
    }

    pub async fn add_application(
        &self,
        wallet_id: u64,
        org_id: u64,
        application: NewApplication,
    ) -> Result<Option<Application>, StoreError> {
        self.mutate(|wallets| {
            let mut next = wallets.to_vec();
            let Some(org) = find_org_mut(&mut next, wallet_id, org_id) else {
                return (None, None);
            };
            let id = next_id(org.applications.iter().map(|a| a.id), org.last_application_id);
            let stored = application.into_application(id);
            org.last_application_id = id;
            org.applications.push(stored.clone());
            (Some(next), Some(stored))
        })
        .await
    }

    pub async fn set_application_vb_id(
        &self,
        wallet_id: u64,
        org_id: u64,
        app_id: u64,
        vb_id: Hash,
    ) -> Result<bool, StoreError> {
        self.mutate(|wallets| {
            let mut next = wallets.to_vec();
            let Some(app) = find_org_mut(&mut next, wallet_id, org_id)
                .and_then(|org| org.applications.iter_mut().find(|a| a.id == app_id))
            else {
                return (None, false);
            };
            app.vb_id = Some(vb_id);
            (Some(next), true)
        })
        .await
    }

    pub async fn delete_application(
        &self,
        wallet_id: u64,
        org_id: u64,
        app_id: u64,
    ) -> Result<bool, StoreError> {
        self.mutate(|wallets| {
            let mut next = wallets.to_vec();
            let Some(org) = find_org_mut(&mut next, wallet_id, org_id) else {
                return (None, false);
            };
            let before = org.applications.len();
            org.applications.retain(|a| a.id != app_id);
            if org.applications.len() == before {
                return (None, false);
            }
            (Some(next), true)
        })
        .await
    }

    async fn update_organization(
        &self,
        wallet_id: u64,
        org_id: u64,
        update: impl FnOnce(&mut Organization),
    ) -> Result<bool, StoreError> {
        self.mutate(|wallets| {
            let mut next = wallets.to_vec();
            let Some(org) = find_org_mut(&mut next, wallet_id, org_id) else {
                return (None, false);
            };
            update(org);
            (Some(next), true)
        })
        .await
    }
}

fn claimed_under_unpublished(org_id: u64) -> StoreError {
    StoreError::Rejected(format!(
        "organization {org_id} is not published, so its nodes cannot be claimed"
    ))
}

fn find_org_mut(wallets: &mut [Wallet], wallet_id: u64, org_id: u64) -> Option<&mut Organization> {
    wallets
        .iter_mut()
        .find(|w| w.id == wallet_id)?
        .organizations
        .iter_mut()
        .find(|o| o.id == org_id)
}
