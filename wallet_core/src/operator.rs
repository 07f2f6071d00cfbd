//! HTTP client for an operator's admin API (`{endpoint}/admin/api/v1`).
//!
//! Setup and login calls are anonymous. Every other call carries the bearer
//! token held in the [`CredentialVault`] for this operator, and fails with
//! `PreconditionFailed` before any request when no token is held.

use ledgerdesk_crypto::sign_message;
use ledgerdesk_store::CredentialVault;
use ledgerdesk_types::KeyPair;
use reqwest::{Method, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::WalletError;

const ADMIN_API_PATH: &str = "admin/api/v1";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorUser {
    pub public_key: String,
    pub pseudo: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorChallenge {
    pub challenge: String,
    pub mac: String,
    pub expires_at: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorChallengeResponse {
    #[serde(flatten)]
    pub challenge: OperatorChallenge,
    pub signature: String,
    pub public_key: String,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorWallet {
    pub rpc_endpoint: String,
    pub name: String,
    pub seed: String,
}

impl std::fmt::Debug for OperatorWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperatorWallet")
            .field("rpc_endpoint", &self.rpc_endpoint)
            .field("name", &self.name)
            .field("seed", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorApplication {
    pub vb_id: String,
    pub wallet_rpc_endpoint: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorApiKey {
    pub id: u64,
    pub name: String,
    pub api_key: String,
    pub application_vb_id: String,
    pub created_at: String,
    pub active_until: Option<String>,
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewApiKey {
    pub name: String,
    pub application_vb_id: String,
    pub active_until: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetupStatus {
    is_initialized: bool,
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

pub struct OperatorClient {
    http: reqwest::Client,
    base_url: Url,
    operator_id: u64,
    /// Sign requests with this wallet's token instead of the first one issued.
    wallet_id: Option<u64>,
    vault: Arc<CredentialVault>,
}

impl OperatorClient {
    /// `endpoint` is the operator's HTTP root, e.g. `https://operator.example`.
    pub fn new(
        operator_id: u64,
        endpoint: &str,
        vault: Arc<CredentialVault>,
    ) -> Result<Self, WalletError> {
        let base_url = Url::parse(endpoint)
            .map_err(|e| WalletError::Operator(format!("invalid endpoint {endpoint}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(WalletError::Operator(format!(
                "invalid endpoint {endpoint}: not a base URL"
            )));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WalletError::Operator(format!("failed to create HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url,
            operator_id,
            wallet_id: None,
            vault,
        })
    }

    pub fn for_wallet(mut self, wallet_id: u64) -> Self {
        self.wallet_id = Some(wallet_id);
        self
    }

    pub fn operator_id(&self) -> u64 {
        self.operator_id
    }

    /// Admin API URL for `segments`, each percent-encoded as one path segment.
    pub fn url(&self, segments: &[&str]) -> Result<Url, WalletError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| WalletError::Operator("endpoint is not a base URL".into()))?;
            path.pop_if_empty();
            path.extend(ADMIN_API_PATH.split('/'));
            path.extend(segments);
        }
        Ok(url)
    }

    async fn bearer_token(&self) -> Result<String, WalletError> {
        let token = match self.wallet_id {
            Some(wallet_id) => {
                self.vault
                    .get_token_for_wallet(self.operator_id, wallet_id)
                    .await?
            }
            None => self.vault.get_valid_token(self.operator_id).await?,
        };
        token.ok_or_else(|| WalletError::PreconditionFailed("not authenticated".into()))
    }

    async fn authorized(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, WalletError> {
        let token = self.bearer_token().await?;
        Ok(self
            .http
            .request(method, self.url(segments)?)
            .bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, WalletError> {
        let response = request
            .send()
            .await
            .map_err(|e| WalletError::Network(format!("operator {}: {e}", self.operator_id)))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalletError::Operator(format!(
                "operator {} returned HTTP {status}: {body}",
                self.operator_id
            )));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, WalletError> {
        self.send(request)
            .await?
            .json()
            .await
            .map_err(|e| WalletError::Operator(format!("invalid operator response: {e}")))
    }

    // ── Setup and login ────────────────────────────────────────────────

    pub async fn is_initialized(&self) -> Result<bool, WalletError> {
        let request = self.http.get(self.url(&["setup", "status"])?);
        let status: SetupStatus = self.send_json(request).await?;
        Ok(status.is_initialized)
    }

    /// Create the first administrator of a fresh operator.
    pub async fn setup(&self, admin: &OperatorUser) -> Result<(), WalletError> {
        let request = self.http.post(self.url(&["setup"])?).json(admin);
        self.send(request).await?;
        tracing::info!(operator_id = self.operator_id, pseudo = %admin.pseudo, "operator initialized");
        Ok(())
    }

    pub async fn challenge(&self) -> Result<OperatorChallenge, WalletError> {
        let request = self.http.post(self.url(&["login", "wallet", "challenge"])?);
        self.send_json(request).await
    }

    /// Exchange a signed challenge for a token and store it for `wallet_id`.
    pub async fn verify(
        &self,
        wallet_id: u64,
        response: &OperatorChallengeResponse,
    ) -> Result<(), WalletError> {
        let request = self
            .http
            .post(self.url(&["login", "wallet", "verify"])?)
            .json(response);
        let TokenResponse { token } = self.send_json(request).await?;
        self.vault
            .add_credential(self.operator_id, wallet_id, token)
            .await?;
        tracing::info!(operator_id = self.operator_id, wallet_id, "authenticated with operator");
        Ok(())
    }

    /// Challenge, sign with the wallet's keys, verify.
    pub async fn login(&self, wallet_id: u64, keys: &KeyPair) -> Result<(), WalletError> {
        let challenge = self.challenge().await?;
        let response = sign_challenge(challenge, keys)?;
        self.verify(wallet_id, &response).await
    }

    pub async fn disconnect(&self) -> Result<(), WalletError> {
        Ok(self.vault.disconnect(self.operator_id).await?)
    }

    // ── Users ──────────────────────────────────────────────────────────

    pub async fn list_users(&self) -> Result<Vec<OperatorUser>, WalletError> {
        let request = self.authorized(Method::GET, &["user"]).await?;
        self.send_json(request).await
    }

    pub async fn create_user(&self, user: &OperatorUser) -> Result<OperatorUser, WalletError> {
        let request = self.authorized(Method::POST, &["user"]).await?.json(user);
        self.send_json(request).await
    }

    pub async fn delete_user(&self, public_key: &str) -> Result<(), WalletError> {
        let request = self.authorized(Method::DELETE, &["user", public_key]).await?;
        self.send(request).await?;
        Ok(())
    }

    // ── Wallets ────────────────────────────────────────────────────────

    pub async fn list_wallets(&self) -> Result<Vec<OperatorWallet>, WalletError> {
        let request = self.authorized(Method::GET, &["wallet"]).await?;
        self.send_json(request).await
    }

    pub async fn create_wallet(&self, wallet: &OperatorWallet) -> Result<OperatorWallet, WalletError> {
        let request = self.authorized(Method::POST, &["wallet"]).await?.json(wallet);
        self.send_json(request).await
    }

    pub async fn delete_wallet(&self, rpc_endpoint: &str) -> Result<(), WalletError> {
        let request = self
            .authorized(Method::DELETE, &["wallet", rpc_endpoint])
            .await?;
        self.send(request).await?;
        Ok(())
    }

    // ── Applications ───────────────────────────────────────────────────

    pub async fn list_applications(&self) -> Result<Vec<OperatorApplication>, WalletError> {
        let request = self.authorized(Method::GET, &["application"]).await?;
        self.send_json(request).await
    }

    pub async fn create_application(
        &self,
        application: &OperatorApplication,
    ) -> Result<OperatorApplication, WalletError> {
        let request = self
            .authorized(Method::POST, &["application"])
            .await?
            .json(application);
        self.send_json(request).await
    }

    pub async fn delete_application(&self, vb_id: &str) -> Result<(), WalletError> {
        let request = self
            .authorized(Method::DELETE, &["application", vb_id])
            .await?;
        self.send(request).await?;
        Ok(())
    }

    // ── API keys ───────────────────────────────────────────────────────

    pub async fn list_api_keys(&self) -> Result<Vec<OperatorApiKey>, WalletError> {
        let request = self.authorized(Method::GET, &["apiKey"]).await?;
        self.send_json(request).await
    }

    pub async fn create_api_key(&self, api_key: &NewApiKey) -> Result<OperatorApiKey, WalletError> {
        let request = self
            .authorized(Method::POST, &["apiKey"])
            .await?
            .json(api_key);
        self.send_json(request).await
    }

    pub async fn toggle_api_key(&self, id: u64, is_active: bool) -> Result<(), WalletError> {
        let id = id.to_string();
        let request = self
            .authorized(Method::PATCH, &["apiKey", &id, "toggle"])
            .await?
            .json(&serde_json::json!({ "isActive": is_active }));
        self.send(request).await?;
        Ok(())
    }

    pub async fn delete_api_key(&self, id: u64) -> Result<(), WalletError> {
        let id = id.to_string();
        let request = self.authorized(Method::DELETE, &["apiKey", &id]).await?;
        self.send(request).await?;
        Ok(())
    }
}

/// Sign the challenge string with the wallet's keys. Signature and public
/// key are hex encoded.
pub fn sign_challenge(
    challenge: OperatorChallenge,
    keys: &KeyPair,
) -> Result<OperatorChallengeResponse, WalletError> {
    let signature = sign_message(challenge.challenge.as_bytes(), &keys.private)?;
    Ok(OperatorChallengeResponse {
        challenge,
        signature: hex::encode(signature.as_bytes()),
        public_key: keys.public.to_hex(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerdesk_crypto::{derive_keypair, verify_signature};
    use ledgerdesk_types::{Signature, SignatureScheme};

    fn client(vault: Arc<CredentialVault>) -> OperatorClient {
        // Nothing listens on port 1; tests here must fail before any request.
        OperatorClient::new(3, "http://127.0.0.1:1", vault).unwrap()
    }

    #[test]
    fn urls_are_rooted_at_admin_api() {
        let client = client(Arc::new(CredentialVault::in_memory()));
        assert_eq!(
            client.url(&["setup", "status"]).unwrap().as_str(),
            "http://127.0.0.1:1/admin/api/v1/setup/status"
        );
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        let client = client(Arc::new(CredentialVault::in_memory()));
        let url = client
            .url(&["wallet", "http://node:26657/rpc"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://127.0.0.1:1/admin/api/v1/wallet/http:%2F%2Fnode:26657%2Frpc"
        );
    }

    #[test]
    fn trailing_slash_on_endpoint_is_ignored() {
        let client = OperatorClient::new(1, "https://op.example/", Arc::new(CredentialVault::in_memory())).unwrap();
        assert_eq!(
            client.url(&["user"]).unwrap().as_str(),
            "https://op.example/admin/api/v1/user"
        );
    }

    #[test]
    fn invalid_endpoint_rejected() {
        assert!(OperatorClient::new(1, "not a url", Arc::new(CredentialVault::in_memory())).is_err());
    }

    #[tokio::test]
    async fn authenticated_calls_require_a_token() {
        let client = client(Arc::new(CredentialVault::in_memory()));
        let err = client.list_users().await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PreconditionFailed);
        assert!(err.to_string().contains("not authenticated"));
        let err = client.delete_api_key(4).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::PreconditionFailed);
    }

    #[tokio::test]
    async fn token_from_vault_is_used() {
        let vault = Arc::new(CredentialVault::in_memory());
        vault.add_credential(3, 1, "t1").await.unwrap();
        let client = client(Arc::clone(&vault));
        assert_eq!(client.bearer_token().await.unwrap(), "t1");
        client.disconnect().await.unwrap();
        assert!(client.bearer_token().await.is_err());
    }

    #[tokio::test]
    async fn wallet_scoped_client_uses_its_own_token() {
        let vault = Arc::new(CredentialVault::in_memory());
        vault.add_credential(3, 1, "t1").await.unwrap();
        vault.add_credential(3, 2, "t2").await.unwrap();
        assert_eq!(client(Arc::clone(&vault)).bearer_token().await.unwrap(), "t1");
        let scoped = client(Arc::clone(&vault)).for_wallet(2);
        assert_eq!(scoped.bearer_token().await.unwrap(), "t2");
        let unknown = client(vault).for_wallet(9);
        assert!(unknown.bearer_token().await.is_err());
    }

    #[test]
    fn signed_challenge_verifies() {
        let keys = derive_keypair(&"21".repeat(32), SignatureScheme::Secp256k1).unwrap();
        let challenge = OperatorChallenge {
            challenge: "c-123".into(),
            mac: "m".into(),
            expires_at: "2030-01-01T00:00:00Z".into(),
        };
        let response = sign_challenge(challenge, &keys).unwrap();
        let signature = Signature(hex::decode(&response.signature).unwrap());
        assert!(verify_signature(b"c-123", &signature, &keys.public));
        assert_eq!(response.public_key, keys.public.to_hex());

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["challenge"], "c-123");
        assert_eq!(json["expiresAt"], "2030-01-01T00:00:00Z");
    }
}
