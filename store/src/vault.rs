//! Session-scoped operator credentials.
//!
//! Tokens are kept in a session document under [`OPERATOR_AUTH_KEY`]. The
//! backing store is expected to live no longer than the user session
//! (`CredentialVault::in_memory`); the vault is never pointed at the durable
//! entity store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{KeyValueStore, MemoryStore, StoreError};

/// Key under which authenticated operators are stored.
pub const OPERATOR_AUTH_KEY: &str = "operator-auth";

/// A bearer token issued by an operator to one wallet.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    pub wallet_id: u64,
    pub auth_token: String,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("wallet_id", &self.wallet_id)
            .field("auth_token", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedOperator {
    pub operator_id: u64,
    pub credentials: Vec<Credential>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OperatorAuthDocument {
    #[serde(default)]
    authenticated_operators: Vec<AuthenticatedOperator>,
}

pub struct CredentialVault {
    session: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl CredentialVault {
    pub fn new(session: Arc<dyn KeyValueStore>) -> Self {
        Self {
            session,
            write_lock: Mutex::new(()),
        }
    }

    /// A vault whose state dies with the process.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    async fn document(&self) -> Result<OperatorAuthDocument, StoreError> {
        match self.session.get(OPERATOR_AUTH_KEY).await? {
            None | Some(serde_json::Value::Null) => Ok(OperatorAuthDocument::default()),
            Some(value) => serde_json::from_value(value)
                .map_err(|e| StoreError::Corruption(format!("{OPERATOR_AUTH_KEY}: {e}"))),
        }
    }

    async fn save(&self, document: &OperatorAuthDocument) -> Result<(), StoreError> {
        self.session
            .set(OPERATOR_AUTH_KEY, serde_json::to_value(document)?)
            .await
    }

    pub async fn authenticated_operators(&self) -> Result<Vec<AuthenticatedOperator>, StoreError> {
        Ok(self.document().await?.authenticated_operators)
    }

    pub async fn is_authenticated(&self, operator_id: u64) -> Result<bool, StoreError> {
        Ok(self
            .document()
            .await?
            .authenticated_operators
            .iter()
            .any(|op| op.operator_id == operator_id))
    }

    /// Append a credential for `(operator_id, wallet_id)`. Existing
    /// credentials for the same wallet are kept.
    pub async fn add_credential(
        &self,
        operator_id: u64,
        wallet_id: u64,
        auth_token: impl Into<String>,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.document().await?;
        let credential = Credential {
            wallet_id,
            auth_token: auth_token.into(),
        };
        match document
            .authenticated_operators
            .iter_mut()
            .find(|op| op.operator_id == operator_id)
        {
            Some(operator) => operator.credentials.push(credential),
            None => document.authenticated_operators.push(AuthenticatedOperator {
                operator_id,
                credentials: vec![credential],
            }),
        }
        self.save(&document).await?;
        tracing::debug!(operator_id, wallet_id, "operator credential added");
        Ok(())
    }

    /// Forget every credential held for an operator.
    pub async fn disconnect(&self, operator_id: u64) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut document = self.document().await?;
        document
            .authenticated_operators
            .retain(|op| op.operator_id != operator_id);
        self.save(&document).await?;
        tracing::debug!(operator_id, "disconnected from operator");
        Ok(())
    }

    /// The token of the wallet that authenticated first with this operator.
    ///
    /// This is not a per-wallet lookup: with credentials for wallets 1 then 2,
    /// wallet 1's token is returned. Use [`Self::get_token_for_wallet`] when
    /// the wallet matters.
    pub async fn get_valid_token(&self, operator_id: u64) -> Result<Option<String>, StoreError> {
        let document = self.document().await?;
        let Some(operator) = document
            .authenticated_operators
            .iter()
            .find(|op| op.operator_id == operator_id)
        else {
            return Ok(None);
        };
        let Some(first_wallet) = operator.credentials.first().map(|c| c.wallet_id) else {
            return Ok(None);
        };
        Ok(operator
            .credentials
            .iter()
            .find(|c| c.wallet_id == first_wallet)
            .map(|c| c.auth_token.clone()))
    }

    /// The most recent token issued by `operator_id` to `wallet_id`.
    pub async fn get_token_for_wallet(
        &self,
        operator_id: u64,
        wallet_id: u64,
    ) -> Result<Option<String>, StoreError> {
        let document = self.document().await?;
        Ok(document
            .authenticated_operators
            .iter()
            .find(|op| op.operator_id == operator_id)
            .and_then(|op| op.credentials.iter().rev().find(|c| c.wallet_id == wallet_id))
            .map(|c| c.auth_token.clone()))
    }

    /// End of session: drop everything.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.session.delete(OPERATOR_AUTH_KEY).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_operator_is_not_authenticated() {
        let vault = CredentialVault::in_memory();
        assert!(!vault.is_authenticated(1).await.unwrap());
        assert_eq!(vault.get_valid_token(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn valid_token_is_first_wallets_token() {
        let vault = CredentialVault::in_memory();
        vault.add_credential(7, 1, "t1").await.unwrap();
        vault.add_credential(7, 2, "t2").await.unwrap();
        assert!(vault.is_authenticated(7).await.unwrap());
        // First-credential semantics, not a lookup for the latest wallet.
        assert_eq!(vault.get_valid_token(7).await.unwrap().as_deref(), Some("t1"));
    }

    #[tokio::test]
    async fn per_wallet_lookup_returns_latest_token() {
        let vault = CredentialVault::in_memory();
        vault.add_credential(7, 1, "t1").await.unwrap();
        vault.add_credential(7, 2, "t2").await.unwrap();
        vault.add_credential(7, 2, "t2-refreshed").await.unwrap();
        assert_eq!(
            vault.get_token_for_wallet(7, 2).await.unwrap().as_deref(),
            Some("t2-refreshed")
        );
        assert_eq!(vault.get_token_for_wallet(7, 3).await.unwrap(), None);
        let ops = vault.authenticated_operators().await.unwrap();
        assert_eq!(ops[0].credentials.len(), 3);
    }

    #[tokio::test]
    async fn disconnect_drops_only_that_operator() {
        let vault = CredentialVault::in_memory();
        vault.add_credential(1, 1, "a").await.unwrap();
        vault.add_credential(2, 1, "b").await.unwrap();
        vault.disconnect(1).await.unwrap();
        assert!(!vault.is_authenticated(1).await.unwrap());
        assert!(vault.is_authenticated(2).await.unwrap());
    }

    #[tokio::test]
    async fn clear_ends_session() {
        let vault = CredentialVault::in_memory();
        vault.add_credential(1, 1, "a").await.unwrap();
        vault.clear().await.unwrap();
        assert!(vault.authenticated_operators().await.unwrap().is_empty());
    }

    #[test]
    fn credential_debug_hides_token() {
        let c = Credential {
            wallet_id: 1,
            auth_token: "secret-token".into(),
        };
        assert!(!format!("{c:?}").contains("secret-token"));
    }
}
