//! Locally persisted entity hierarchy: wallet → organization → node / application.
//!
//! Field names serialize in camelCase so the persisted document stays
//! readable by other clients of the same store (`vbId`, `rpcEndpoint`, ...).
//!
//! Local ids are scoped to their parent and are distinct from remote chain
//! identifiers (`vb_id`). Never compare one with the other.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::hash::Hash;

/// Next local id for a scope: one past the larger of the highest live id and
/// the scope's high-water mark, so ids of deleted entities are never reissued.
pub fn next_id(ids: impl IntoIterator<Item = u64>, high_water: u64) -> u64 {
    ids.into_iter().max().unwrap_or(0).max(high_water) + 1
}

/// A wallet: the root of signing authority for everything beneath it.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: u64,
    pub name: String,
    /// Encoded seed (hex or BIP39 phrase). Never leaves the local store.
    pub seed: String,
    pub node_endpoint: String,
    #[serde(default)]
    pub organizations: Vec<Organization>,
    /// Highest organization id ever issued in this wallet.
    #[serde(default)]
    pub last_organization_id: u64,
}

impl Wallet {
    pub fn organization(&self, org_id: u64) -> Option<&Organization> {
        self.organizations.iter().find(|o| o.id == org_id)
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("seed", &"<redacted>")
            .field("node_endpoint", &self.node_endpoint)
            .field("organizations", &self.organizations)
            .field("last_organization_id", &self.last_organization_id)
            .finish()
    }
}

/// Wallet fields supplied by the caller; the store assigns the id.
#[derive(Clone, PartialEq, Eq)]
pub struct NewWallet {
    pub name: String,
    pub seed: String,
    pub node_endpoint: String,
}

impl NewWallet {
    pub fn into_wallet(self, id: u64) -> Wallet {
        Wallet {
            id,
            name: self.name,
            seed: self.seed,
            node_endpoint: self.node_endpoint,
            organizations: Vec::new(),
            last_organization_id: 0,
        }
    }
}

impl fmt::Debug for NewWallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewWallet")
            .field("name", &self.name)
            .field("node_endpoint", &self.node_endpoint)
            .finish_non_exhaustive()
    }
}

/// An organization owned by exactly one wallet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    pub id: u64,
    pub name: String,
    /// Genesis hash of the organization's chain. Set once, on publication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vb_id: Option<Hash>,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub applications: Vec<Application>,
    #[serde(default)]
    pub last_node_id: u64,
    #[serde(default)]
    pub last_application_id: u64,
}

impl Organization {
    pub fn is_published(&self) -> bool {
        self.vb_id.is_some()
    }

    pub fn node(&self, node_id: u64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == node_id)
    }

    pub fn application(&self, app_id: u64) -> Option<&Application> {
        self.applications.iter().find(|a| a.id == app_id)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewOrganization {
    pub name: String,
}

impl NewOrganization {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn into_organization(self, id: u64) -> Organization {
        Organization {
            id,
            name: self.name,
            vb_id: None,
            nodes: Vec::new(),
            applications: Vec::new(),
            last_node_id: 0,
            last_application_id: 0,
        }
    }
}

/// A validator node declared under an organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: u64,
    pub name: String,
    pub rpc_endpoint: String,
    /// Genesis hash of the validator node's chain. Set once, on claim.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vb_id: Option<Hash>,
}

impl Node {
    pub fn is_claimed(&self) -> bool {
        self.vb_id.is_some()
    }
}

/// Node fields supplied by the caller. Imported nodes may already carry a
/// remote id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewNode {
    pub name: String,
    pub rpc_endpoint: String,
    pub vb_id: Option<Hash>,
}

impl NewNode {
    pub fn new(name: impl Into<String>, rpc_endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rpc_endpoint: rpc_endpoint.into(),
            vb_id: None,
        }
    }

    pub fn into_node(self, id: u64) -> Node {
        Node {
            id,
            name: self.name,
            rpc_endpoint: self.rpc_endpoint,
            vb_id: self.vb_id,
        }
    }
}

/// Partial update for a node. `None` fields are left unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodePatch {
    pub name: Option<String>,
    pub rpc_endpoint: Option<String>,
    pub vb_id: Option<Hash>,
}

impl NodePatch {
    pub fn apply(&self, node: &Node) -> Node {
        Node {
            id: node.id,
            name: self.name.clone().unwrap_or_else(|| node.name.clone()),
            rpc_endpoint: self
                .rpc_endpoint
                .clone()
                .unwrap_or_else(|| node.rpc_endpoint.clone()),
            vb_id: self.vb_id.or(node.vb_id),
        }
    }
}

/// An application owned by an organization.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vb_id: Option<Hash>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewApplication {
    pub name: String,
    pub vb_id: Option<Hash>,
}

impl NewApplication {
    pub fn into_application(self, id: u64) -> Application {
        Application {
            id,
            name: self.name,
            vb_id: self.vb_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_starts_at_one() {
        assert_eq!(next_id(Vec::<u64>::new(), 0), 1);
    }

    #[test]
    fn next_id_uses_highest_live_id() {
        assert_eq!(next_id([1, 3], 0), 4);
    }

    #[test]
    fn next_id_respects_high_water_mark() {
        // id 3 was issued then deleted.
        assert_eq!(next_id([1, 2], 3), 4);
        assert_eq!(next_id(Vec::<u64>::new(), 3), 4);
    }

    #[test]
    fn node_patch_keeps_unset_fields() {
        let node = NewNode::new("val-1", "http://10.0.0.1:26657").into_node(3);
        let patched = NodePatch {
            name: Some("validator-one".into()),
            ..Default::default()
        }
        .apply(&node);
        assert_eq!(patched.id, 3);
        assert_eq!(patched.name, "validator-one");
        assert_eq!(patched.rpc_endpoint, node.rpc_endpoint);
        assert_eq!(patched.vb_id, None);
    }

    #[test]
    fn wallet_debug_hides_seed() {
        let wallet = NewWallet {
            name: "main".into(),
            seed: "deadbeef".into(),
            node_endpoint: "http://localhost:26657".into(),
        }
        .into_wallet(1);
        let rendered = format!("{wallet:?}");
        assert!(!rendered.contains("deadbeef"));
    }

    #[test]
    fn persisted_shape_uses_camel_case() {
        let mut org = NewOrganization::new("Acme").into_organization(1);
        org.vb_id = Some(Hash::new([0xab; 32]));
        let json = serde_json::to_value(&org).unwrap();
        assert_eq!(json["vbId"], "ab".repeat(32));
        assert!(json.get("vb_id").is_none());

        let unpublished = NewOrganization::new("Beta").into_organization(2);
        let json = serde_json::to_value(&unpublished).unwrap();
        assert!(json.get("vbId").is_none());
    }
}
