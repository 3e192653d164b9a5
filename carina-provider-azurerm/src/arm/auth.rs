//! Access tokens for the management plane

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;

use super::ArmError;

/// Tokens are refreshed this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);

/// Source of bearer tokens
pub enum TokenCredential {
    /// A token obtained elsewhere (e.g. `az account get-access-token`)
    Static(String),
    /// OAuth2 client credentials flow for a service principal
    ClientSecret(ClientSecretCredential),
}

impl TokenCredential {
    pub fn from_token(token: impl Into<String>) -> Self {
        TokenCredential::Static(token.into())
    }

    pub async fn token(&self) -> Result<String, ArmError> {
        match self {
            TokenCredential::Static(token) => Ok(token.clone()),
            TokenCredential::ClientSecret(credential) => credential.token().await,
        }
    }
}

impl std::fmt::Debug for TokenCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenCredential::Static(_) => f.write_str("TokenCredential::Static(***)"),
            TokenCredential::ClientSecret(c) => f
                .debug_struct("TokenCredential::ClientSecret")
                .field("tenant_id", &c.tenant_id)
                .field("client_id", &c.client_id)
                .finish(),
        }
    }
}

struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

pub struct ClientSecretCredential {
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    scope: String,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ClientSecretCredential {
    /// `resource` is the management endpoint the token is for
    pub fn new(
        authority: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        resource: &str,
    ) -> Self {
        Self {
            authority: authority.into(),
            tenant_id: tenant_id.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            scope: format!("{}/.default", resource.trim_end_matches('/')),
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority.trim_end_matches('/'),
            self.tenant_id
        )
    }

    pub async fn token(&self) -> Result<String, ArmError> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && Instant::now() < token.refresh_at
        {
            return Ok(token.access_token.clone());
        }

        log::debug!("requesting access token for client {}", self.client_id);
        let response = self
            .http
            .post(self.token_url())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("scope", self.scope.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ArmError::Auth(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ArmError::Auth(e.to_string()))?;
        if !status.is_success() {
            return Err(ArmError::Auth(format!(
                "token endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }

        let token: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ArmError::Auth(e.to_string()))?;
        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        });

        Ok(token.access_token)
    }
}
