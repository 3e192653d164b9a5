//! Provider settings: subscription, credentials and endpoints

use carina_core::config::ProviderConfig as ProviderBlock;
use carina_core::schema::validate_uuid;

use crate::arm::auth::ClientSecretCredential;
use crate::arm::http::DEFAULT_ENDPOINT;
use crate::arm::{HttpManagementClient, TokenCredential};

pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("subscription_id must be set (provider block or ARM_SUBSCRIPTION_ID)")]
    MissingSubscription,

    #[error("subscription_id: {0}")]
    InvalidSubscription(String),

    #[error(
        "no credentials configured: set access_token (ARM_ACCESS_TOKEN) or tenant_id, client_id and client_secret"
    )]
    MissingCredentials,

    #[error("client secret authentication requires {0}")]
    IncompleteClientSecret(&'static str),

    #[error("max_retries must be a non-negative integer")]
    InvalidMaxRetries,

    #[error("creating management client: {0}")]
    Client(String),
}

/// Settings of the `azurerm` provider
///
/// Values come from the `provider.azurerm` block of the configuration,
/// then command line / environment values override them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    pub subscription_id: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token: Option<String>,
    pub endpoint: Option<String>,
    pub authority: Option<String>,
    pub max_retries: Option<u32>,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let masked = |v: &Option<String>| v.as_ref().map(|_| "***");
        f.debug_struct("ProviderConfig")
            .field("subscription_id", &self.subscription_id)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &masked(&self.client_secret))
            .field("access_token", &masked(&self.access_token))
            .field("endpoint", &self.endpoint)
            .field("authority", &self.authority)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl ProviderConfig {
    /// Read settings from a `provider.azurerm` block
    pub fn from_block(block: &ProviderBlock) -> Result<Self, ConfigError> {
        let string = |key: &str| block.get_string(key).map(str::to_string);
        let max_retries = match block.attributes.get("max_retries") {
            None => None,
            Some(carina_core::resource::Value::Int(n)) => {
                Some(u32::try_from(*n).map_err(|_| ConfigError::InvalidMaxRetries)?)
            }
            Some(_) => return Err(ConfigError::InvalidMaxRetries),
        };

        Ok(Self {
            subscription_id: string("subscription_id"),
            tenant_id: string("tenant_id"),
            client_id: string("client_id"),
            client_secret: string("client_secret"),
            access_token: string("access_token"),
            endpoint: string("endpoint"),
            authority: string("authority"),
            max_retries,
        })
    }

    /// Overlay values that are set in `other`
    pub fn merge(mut self, other: ProviderConfig) -> Self {
        fn pick<T>(current: &mut Option<T>, new: Option<T>) {
            if new.is_some() {
                *current = new;
            }
        }
        pick(&mut self.subscription_id, other.subscription_id);
        pick(&mut self.tenant_id, other.tenant_id);
        pick(&mut self.client_id, other.client_id);
        pick(&mut self.client_secret, other.client_secret);
        pick(&mut self.access_token, other.access_token);
        pick(&mut self.endpoint, other.endpoint);
        pick(&mut self.authority, other.authority);
        pick(&mut self.max_retries, other.max_retries);
        self
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT)
    }

    pub fn authority(&self) -> &str {
        self.authority.as_deref().unwrap_or(DEFAULT_AUTHORITY)
    }

    /// The subscription, checked to be a UUID
    pub fn subscription(&self) -> Result<&str, ConfigError> {
        let subscription = self
            .subscription_id
            .as_deref()
            .ok_or(ConfigError::MissingSubscription)?;
        validate_uuid(subscription).map_err(ConfigError::InvalidSubscription)?;
        Ok(subscription)
    }

    /// Pick a credential: an access token wins over a client secret
    pub fn credential(&self) -> Result<TokenCredential, ConfigError> {
        if let Some(token) = &self.access_token {
            return Ok(TokenCredential::from_token(token.clone()));
        }

        let any_secret_setting =
            self.tenant_id.is_some() || self.client_id.is_some() || self.client_secret.is_some();
        if !any_secret_setting {
            return Err(ConfigError::MissingCredentials);
        }

        let tenant_id = self
            .tenant_id
            .clone()
            .ok_or(ConfigError::IncompleteClientSecret("tenant_id"))?;
        let client_id = self
            .client_id
            .clone()
            .ok_or(ConfigError::IncompleteClientSecret("client_id"))?;
        let client_secret = self
            .client_secret
            .clone()
            .ok_or(ConfigError::IncompleteClientSecret("client_secret"))?;

        Ok(TokenCredential::ClientSecret(ClientSecretCredential::new(
            self.authority(),
            tenant_id,
            client_id,
            client_secret,
            self.endpoint(),
        )))
    }

    /// Build the HTTP management client these settings describe
    pub fn http_client(&self) -> Result<HttpManagementClient, ConfigError> {
        let client = HttpManagementClient::new(self.endpoint(), self.credential()?)
            .map_err(|e| ConfigError::Client(e.to_string()))?;
        Ok(match self.max_retries {
            Some(max_retries) => client.with_max_retries(max_retries),
            None => client,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carina_core::resource::Value;
    use std::collections::HashMap;

    const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";

    fn block(attrs: &[(&str, Value)]) -> ProviderBlock {
        ProviderBlock {
            name: "azurerm".to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }

    #[test]
    fn reads_provider_block() {
        let config = ProviderConfig::from_block(&block(&[
            ("subscription_id", Value::String(SUBSCRIPTION.to_string())),
            ("access_token", Value::String("token".to_string())),
            ("max_retries", Value::Int(5)),
        ]))
        .unwrap();

        assert_eq!(config.subscription().unwrap(), SUBSCRIPTION);
        assert_eq!(config.max_retries, Some(5));
        assert_eq!(config.endpoint(), DEFAULT_ENDPOINT);
        assert!(matches!(config.credential().unwrap(), TokenCredential::Static(_)));
    }

    #[test]
    fn negative_retries_are_rejected() {
        let err = ProviderConfig::from_block(&block(&[("max_retries", Value::Int(-1))])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidMaxRetries);
    }

    #[test]
    fn command_line_values_override_block() {
        let from_file = ProviderConfig {
            subscription_id: Some("file".to_string()),
            endpoint: Some("https://file".to_string()),
            ..Default::default()
        };
        let from_cli = ProviderConfig {
            subscription_id: Some(SUBSCRIPTION.to_string()),
            ..Default::default()
        };

        let merged = from_file.merge(from_cli);
        assert_eq!(merged.subscription_id.as_deref(), Some(SUBSCRIPTION));
        assert_eq!(merged.endpoint(), "https://file");
    }

    #[test]
    fn subscription_must_be_a_uuid() {
        let config = ProviderConfig {
            subscription_id: Some("my-subscription".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.subscription(),
            Err(ConfigError::InvalidSubscription(_))
        ));
        assert_eq!(
            ProviderConfig::default().subscription(),
            Err(ConfigError::MissingSubscription)
        );
    }

    #[test]
    fn client_secret_requires_all_parts() {
        let config = ProviderConfig {
            tenant_id: Some("tenant".to_string()),
            client_id: Some("app".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            config.credential(),
            Err(ConfigError::IncompleteClientSecret("client_secret"))
        ));
        assert!(matches!(
            ProviderConfig::default().credential(),
            Err(ConfigError::MissingCredentials)
        ));
    }

    #[test]
    fn debug_masks_secrets() {
        let config = ProviderConfig {
            client_secret: Some("hunter2".to_string()),
            ..Default::default()
        };
        let shown = format!("{:?}", config);
        assert!(!shown.contains("hunter2"));
        assert!(shown.contains("***"));
    }
}
