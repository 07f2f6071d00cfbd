//! Typed payload fragments carried inside a microblock.
//!
//! Sections serialize with an explicit `type` tag so the order and kind of
//! every fragment is part of the signed payload.

use ledgerdesk_types::{AccountId, Hash};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Section {
    /// Public description of an organization. Appended at genesis and on
    /// every later description update.
    #[serde(rename_all = "camelCase")]
    OrganizationDescription {
        name: String,
        city: String,
        country_code: String,
        website: String,
    },

    /// Opens an organization chain owned by `account_id`.
    #[serde(rename_all = "camelCase")]
    OrganizationCreation { account_id: AccountId },

    /// Opens a validator node chain under a published organization.
    #[serde(rename_all = "camelCase")]
    ValidatorNodeCreation { organization_id: Hash },

    #[serde(rename_all = "camelCase")]
    ValidatorNodeRpcEndpoint { rpc_endpoint: String },

    /// The consensus key the node reports on its status endpoint.
    #[serde(rename_all = "camelCase")]
    ValidatorNodeCometbftPublicKeyDeclaration {
        public_key_type: String,
        public_key: String,
    },

    #[serde(rename_all = "camelCase")]
    AccountStake { validator_node_id: Hash, amount: u64 },

    #[serde(rename_all = "camelCase")]
    AccountUnstake { validator_node_id: Hash, amount: u64 },
}

impl Section {
    /// Stable label used in logs.
    pub fn label(&self) -> &'static str {
        match self {
            Self::OrganizationDescription { .. } => "organization-description",
            Self::OrganizationCreation { .. } => "organization-creation",
            Self::ValidatorNodeCreation { .. } => "validator-node-creation",
            Self::ValidatorNodeRpcEndpoint { .. } => "validator-node-rpc-endpoint",
            Self::ValidatorNodeCometbftPublicKeyDeclaration { .. } => {
                "validator-node-cometbft-public-key-declaration"
            }
            Self::AccountStake { .. } => "account-stake",
            Self::AccountUnstake { .. } => "account-unstake",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialized_tag_matches_label() {
        let sections = [
            Section::OrganizationDescription {
                name: "Acme".into(),
                city: "Paris".into(),
                country_code: "FR".into(),
                website: "https://acme.example".into(),
            },
            Section::OrganizationCreation {
                account_id: AccountId::new([1; 32]),
            },
            Section::AccountUnstake {
                validator_node_id: Hash::new([2; 32]),
                amount: 5,
            },
        ];
        for section in sections {
            let json = serde_json::to_value(&section).unwrap();
            assert_eq!(json["type"], section.label());
        }
    }

    #[test]
    fn fields_are_camel_case() {
        let json = serde_json::to_value(Section::AccountStake {
            validator_node_id: Hash::new([3; 32]),
            amount: 100,
        })
        .unwrap();
        assert_eq!(json["validatorNodeId"], "03".repeat(32));
        assert_eq!(json["amount"], 100);
    }
}
