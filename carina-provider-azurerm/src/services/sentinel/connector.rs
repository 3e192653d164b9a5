//! Shared handler for Sentinel data connectors
//!
//! All connector resources follow the same lifecycle against
//! `Microsoft.SecurityInsights/dataConnectors`; a `ConnectorKind` supplies
//! the kind-specific settings and how they map onto the typed payload.

use std::marker::PhantomData;

use async_trait::async_trait;
use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::schema::{AttributeSchema, types};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::arm::securityinsights::{
    DataConnector, DataConnectorKind, KnownDataConnector, assert_data_connector_kind,
};
use crate::framework::{Clients, ResourceMetaData, TypedResource, already_exists, arm_error};
use crate::ids::{
    DataConnectorId, IdValidator, ResourceId, WorkspaceId, id_validator, validate_workspace_id,
};

pub trait ConnectorKind: Send + Sync + 'static {
    /// Arguments beyond `name` and `log_analytics_workspace_id`
    type Settings: Serialize + DeserializeOwned + Send + Sync;

    const KIND: DataConnectorKind;

    const RESOURCE_TYPE: &'static str;

    /// Connectors without updatable settings are replaced instead
    const UPDATABLE: bool = false;

    fn arguments() -> Vec<AttributeSchema>;

    fn validate(_settings: &Self::Settings) -> Result<(), String> {
        Ok(())
    }

    fn build(settings: &Self::Settings, clients: &Clients) -> ProviderResult<KnownDataConnector>;

    /// Settings of a connector of this kind, `None` for any other kind
    fn flatten(connector: KnownDataConnector) -> Option<Self::Settings>;
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "S: Serialize", deserialize = "S: DeserializeOwned"))]
pub struct ConnectorModel<S> {
    pub name: String,
    pub log_analytics_workspace_id: String,
    #[serde(flatten)]
    pub settings: S,
}

/// Tenant to connect: the configured one, else the provider's
pub fn tenant_or_default(configured: &Option<String>, clients: &Clients) -> ProviderResult<String> {
    configured
        .clone()
        .or_else(|| clients.tenant_id.clone())
        .ok_or_else(|| {
            ProviderError::validation(
                "`tenant_id` must be set when the provider credentials do not name a tenant",
            )
        })
}

pub fn subscription_or_default(configured: &Option<String>, clients: &Clients) -> String {
    configured
        .clone()
        .unwrap_or_else(|| clients.subscription_id.clone())
}

fn parse_id(metadata: &ResourceMetaData) -> ProviderResult<DataConnectorId> {
    DataConnectorId::parse(metadata.id()?).map_err(|e| ProviderError::validation(e.to_string()))
}

fn mismatch(err: impl std::fmt::Display) -> ProviderError {
    ProviderError::validation(err.to_string())
}

pub struct DataConnectorResource<C> {
    kind: PhantomData<fn() -> C>,
}

impl<C> DataConnectorResource<C> {
    pub fn new() -> Self {
        Self { kind: PhantomData }
    }
}

impl<C> Default for DataConnectorResource<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ConnectorKind> DataConnectorResource<C> {
    fn decode(metadata: &ResourceMetaData) -> ProviderResult<ConnectorModel<C::Settings>> {
        let model: ConnectorModel<C::Settings> = metadata.decode()?;
        C::validate(&model.settings).map_err(ProviderError::validation)?;
        Ok(model)
    }
}

#[async_trait]
impl<C: ConnectorKind> TypedResource for DataConnectorResource<C> {
    fn resource_type(&self) -> &'static str {
        C::RESOURCE_TYPE
    }

    fn arguments(&self) -> Vec<AttributeSchema> {
        let mut arguments = vec![
            AttributeSchema::new("name", types::non_empty_string())
                .required()
                .force_new(),
            AttributeSchema::new(
                "log_analytics_workspace_id",
                types::string_with("WorkspaceId", validate_workspace_id),
            )
            .required()
            .force_new(),
        ];
        arguments.extend(C::arguments());
        arguments
    }

    fn attributes(&self) -> Vec<AttributeSchema> {
        Vec::new()
    }

    fn id_validation(&self) -> IdValidator {
        id_validator::<DataConnectorId>()
    }

    async fn create(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let model = Self::decode(metadata)?;
        let workspace = WorkspaceId::parse(&model.log_analytics_workspace_id).map_err(|e| {
            ProviderError::validation(format!("parsing log_analytics_workspace_id: {}", e))
        })?;
        let id = DataConnectorId::new(
            workspace.subscription_id,
            workspace.resource_group_name,
            workspace.workspace_name,
            model.name.clone(),
        );

        let client = metadata.client.data_connectors();
        match client.get(&id).await {
            Ok(_) => return Err(already_exists(&id)),
            Err(e) if e.was_not_found() => {}
            Err(e) => {
                return Err(arm_error(
                    format!("checking for presence of existing {}", id),
                    e,
                ));
            }
        }

        let connector = C::build(&model.settings, &metadata.client)?;
        client
            .create_or_update(&id, &DataConnector::from(connector))
            .await
            .map_err(|e| arm_error(format!("creating {}", id), e))?;

        metadata.set_id(&id);
        Ok(())
    }

    async fn read(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = parse_id(metadata)?;
        let connector = match metadata.client.data_connectors().get(&id).await {
            Ok(connector) => connector,
            Err(e) if e.was_not_found() => {
                metadata.mark_as_gone();
                return Ok(());
            }
            Err(e) => return Err(arm_error(format!("retrieving {}", id), e)),
        };

        assert_data_connector_kind(&connector, C::KIND).map_err(mismatch)?;
        let reason = connector.decode_error().unwrap_or("unexpected payload").to_string();
        let settings = match connector {
            DataConnector::Known(known) => C::flatten(known),
            DataConnector::Other(_) => None,
        }
        .ok_or_else(|| ProviderError::new(format!("decoding {}: {}", id, reason)))?;

        metadata.encode(&ConnectorModel {
            name: id.data_connector_id.clone(),
            log_analytics_workspace_id: id.workspace_id().to_string(),
            settings,
        })
    }

    async fn update(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        if !C::UPDATABLE {
            return Err(ProviderError::new(format!(
                "{} does not support in-place update",
                C::RESOURCE_TYPE
            )));
        }

        let id = parse_id(metadata)?;
        let model = Self::decode(metadata)?;

        let client = metadata.client.data_connectors();
        let existing = client
            .get(&id)
            .await
            .map_err(|e| arm_error(format!("retrieving {}", id), e))?;
        assert_data_connector_kind(&existing, C::KIND).map_err(mismatch)?;

        let mut connector = C::build(&model.settings, &metadata.client)?;
        connector.set_etag(existing.etag().map(str::to_string));
        client
            .create_or_update(&id, &DataConnector::from(connector))
            .await
            .map_err(|e| arm_error(format!("updating {}", id), e))?;
        Ok(())
    }

    async fn delete(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = parse_id(metadata)?;
        metadata
            .client
            .data_connectors()
            .delete(&id)
            .await
            .map_err(|e| arm_error(format!("deleting {}", id), e))
    }

    async fn import(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = parse_id(metadata)?;
        let connector = metadata
            .client
            .data_connectors()
            .get(&id)
            .await
            .map_err(|e| arm_error(format!("retrieving Sentinel Data Connector {}", id), e))?;

        assert_data_connector_kind(&connector, C::KIND).map_err(mismatch)
    }
}
