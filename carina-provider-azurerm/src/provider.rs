//! The `azurerm` provider: dispatches core operations to typed handlers

use std::collections::HashMap;
use std::sync::Arc;

use carina_core::provider::{BoxFuture, Provider, ProviderError, ProviderResult};
use carina_core::resource::{Resource, ResourceId, State, Value};
use carina_core::schema::{AttributeSchema, ResourceSchema};

use crate::config::{ConfigError, ProviderConfig};
use crate::framework::{
    Clients, Registry, ResourceData, ResourceMetaData, TypedDataSource, TypedResource,
    with_timeout,
};
use crate::services;

pub const PROVIDER_NAME: &str = "azurerm";

pub struct AzureRmProvider {
    registry: Registry,
    clients: Clients,
}

/// Fill in schema defaults for arguments the configuration leaves out
fn with_defaults(
    resource_type: &str,
    arguments: &[AttributeSchema],
    mut attributes: HashMap<String, Value>,
) -> HashMap<String, Value> {
    ResourceSchema::new(resource_type)
        .attributes(arguments.iter().cloned())
        .apply_defaults(&mut attributes);
    attributes
}

/// Keep write-only values the API never returns
fn carry_sensitive(
    arguments: &[AttributeSchema],
    desired: &HashMap<String, Value>,
    mut state: State,
) -> State {
    for argument in arguments.iter().filter(|a| a.sensitive) {
        if let Some(value) = desired.get(&argument.name)
            && !state.attributes.contains_key(&argument.name)
        {
            state.attributes.insert(argument.name.clone(), value.clone());
        }
    }
    state
}

impl AzureRmProvider {
    pub fn new(clients: Clients) -> Self {
        Self {
            registry: services::registry(),
            clients,
        }
    }

    /// Build a provider talking to Azure with the given settings
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let subscription_id = config.subscription()?.to_string();
        let client = config.http_client()?;
        let clients = Clients::new(Arc::new(client), subscription_id)
            .with_tenant_id(config.tenant_id.clone());
        Ok(Self::new(clients))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    fn resource_handler(&self, id: &ResourceId) -> ProviderResult<Arc<dyn TypedResource>> {
        self.registry.resource(&id.resource_type).ok_or_else(|| {
            ProviderError::validation(format!("Unknown resource type: {}", id.resource_type))
                .for_resource(id.clone())
        })
    }

    fn data_source_handler(&self, id: &ResourceId) -> ProviderResult<Arc<dyn TypedDataSource>> {
        self.registry.data_source(&id.resource_type).ok_or_else(|| {
            ProviderError::validation(format!("Unknown data source: {}", id.resource_type))
                .for_resource(id.clone())
        })
    }

    fn metadata(&self, resource_type: &'static str, data: ResourceData) -> ResourceMetaData {
        ResourceMetaData::new(self.clients.clone(), resource_type, data)
    }

    /// Read a resource by its ARM ID
    async fn refresh(
        &self,
        handler: &dyn TypedResource,
        id: &ResourceId,
        identifier: &str,
    ) -> ProviderResult<State> {
        let mut metadata = self.metadata(
            handler.resource_type(),
            ResourceData::default().with_id(identifier),
        );
        with_timeout(
            "read",
            handler.resource_type(),
            handler.timeouts().read,
            handler.read(&mut metadata),
        )
        .await?;
        Ok(metadata.into_state(id.clone()))
    }

    async fn read_resource(&self, id: &ResourceId, identifier: Option<&str>) -> ProviderResult<State> {
        let handler = self.resource_handler(id)?;
        let Some(identifier) = identifier else {
            return Ok(State::not_found(id.clone()));
        };
        log::debug!("reading {} ({})", id, identifier);
        self.refresh(handler.as_ref(), id, identifier).await
    }

    async fn create_resource(&self, resource: &Resource) -> ProviderResult<State> {
        let handler = self.resource_handler(&resource.id)?;
        let arguments = handler.arguments();
        let attributes = with_defaults(
            handler.resource_type(),
            &arguments,
            resource.attributes.clone(),
        );
        log::debug!("creating {}", resource.id);

        let mut metadata = self.metadata(handler.resource_type(), ResourceData::new(attributes));
        with_timeout(
            "create",
            handler.resource_type(),
            handler.timeouts().create,
            handler.create(&mut metadata),
        )
        .await?;

        let identifier = metadata.id()?.to_string();
        let state = self.refresh(handler.as_ref(), &resource.id, &identifier).await?;
        if !state.exists {
            return Err(ProviderError::new(format!(
                "{} was created but could not be read back",
                identifier
            )));
        }
        Ok(carry_sensitive(&arguments, &resource.attributes, state))
    }

    async fn update_resource(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> ProviderResult<State> {
        let handler = self.resource_handler(id)?;
        let arguments = handler.arguments();
        let attributes =
            with_defaults(handler.resource_type(), &arguments, to.attributes.clone());
        log::debug!("updating {} ({})", id, identifier);

        let data = ResourceData::new(attributes)
            .with_id(identifier)
            .with_prior(from.attributes.clone());
        let mut metadata = self.metadata(handler.resource_type(), data);
        with_timeout(
            "update",
            handler.resource_type(),
            handler.timeouts().update,
            handler.update(&mut metadata),
        )
        .await?;

        let state = self.refresh(handler.as_ref(), id, identifier).await?;
        Ok(carry_sensitive(&arguments, &to.attributes, state))
    }

    async fn delete_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<()> {
        let handler = self.resource_handler(id)?;
        log::debug!("deleting {} ({})", id, identifier);

        let mut metadata = self.metadata(
            handler.resource_type(),
            ResourceData::default().with_id(identifier),
        );
        with_timeout(
            "delete",
            handler.resource_type(),
            handler.timeouts().delete,
            handler.delete(&mut metadata),
        )
        .await
    }

    async fn import_resource(&self, id: &ResourceId, identifier: &str) -> ProviderResult<State> {
        let handler = self.resource_handler(id)?;
        (handler.id_validation())(identifier).map_err(ProviderError::validation)?;
        log::debug!("importing {} from {}", id, identifier);

        let mut metadata = self.metadata(
            handler.resource_type(),
            ResourceData::default().with_id(identifier),
        );
        with_timeout(
            "import",
            handler.resource_type(),
            handler.timeouts().read,
            handler.import(&mut metadata),
        )
        .await?;

        let state = self.refresh(handler.as_ref(), id, identifier).await?;
        if !state.exists {
            return Err(ProviderError::not_found(format!(
                "Cannot import non-existent remote object {}",
                identifier
            )));
        }
        Ok(state)
    }

    async fn read_data(&self, resource: &Resource) -> ProviderResult<State> {
        let handler = self.data_source_handler(&resource.id)?;
        log::debug!("reading data source {}", resource.id);

        let mut metadata = self.metadata(
            handler.resource_type(),
            ResourceData::new(resource.attributes.clone()),
        );
        with_timeout(
            "read",
            handler.resource_type(),
            handler.timeouts().read,
            handler.read(&mut metadata),
        )
        .await?;
        Ok(metadata.into_state(resource.id.clone()))
    }
}

impl Provider for AzureRmProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn schemas(&self) -> Vec<ResourceSchema> {
        self.registry.schemas()
    }

    fn read(
        &self,
        id: &ResourceId,
        identifier: Option<&str>,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.map(str::to_string);
        Box::pin(async move {
            self.read_resource(&id, identifier.as_deref())
                .await
                .map_err(|e| e.for_resource(id.clone()))
        })
    }

    fn create(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            self.create_resource(&resource)
                .await
                .map_err(|e| e.for_resource(resource.id.clone()))
        })
    }

    fn update(
        &self,
        id: &ResourceId,
        identifier: &str,
        from: &State,
        to: &Resource,
    ) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        let from = from.clone();
        let to = to.clone();
        Box::pin(async move {
            self.update_resource(&id, &identifier, &from, &to)
                .await
                .map_err(|e| e.for_resource(id.clone()))
        })
    }

    fn delete(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<()>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            self.delete_resource(&id, &identifier)
                .await
                .map_err(|e| e.for_resource(id.clone()))
        })
    }

    fn import(&self, id: &ResourceId, identifier: &str) -> BoxFuture<'_, ProviderResult<State>> {
        let id = id.clone();
        let identifier = identifier.to_string();
        Box::pin(async move {
            self.import_resource(&id, &identifier)
                .await
                .map_err(|e| e.for_resource(id.clone()))
        })
    }

    fn read_data_source(&self, resource: &Resource) -> BoxFuture<'_, ProviderResult<State>> {
        let resource = resource.clone();
        Box::pin(async move {
            self.read_data(&resource)
                .await
                .map_err(|e| e.for_resource(resource.id.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carina_core::schema::AttributeType;

    const TAXII: &str = "azurerm_sentinel_data_connector_threat_intelligence_taxii";

    #[test]
    fn defaults_fill_missing_arguments() {
        let arguments = vec![
            AttributeSchema::new("polling_frequency", AttributeType::String)
                .with_default(Value::String("OnceAnHour".to_string())),
        ];
        let attributes = with_defaults(TAXII, &arguments, HashMap::new());
        assert_eq!(
            attributes.get("polling_frequency"),
            Some(&Value::String("OnceAnHour".to_string()))
        );

        let set = HashMap::from([(
            "polling_frequency".to_string(),
            Value::String("OnceADay".to_string()),
        )]);
        assert_eq!(
            with_defaults(TAXII, &arguments, set.clone()),
            set
        );
    }

    #[test]
    fn sensitive_values_survive_refresh() {
        let arguments = vec![
            AttributeSchema::new("password", AttributeType::String)
                .optional()
                .sensitive(),
            AttributeSchema::new("user_name", AttributeType::String).optional(),
        ];
        let desired = HashMap::from([
            ("password".to_string(), Value::String("secret".to_string())),
            ("user_name".to_string(), Value::String("guest".to_string())),
        ]);
        let state = State::existing(ResourceId::new("t", "n"), HashMap::new());

        let state = carry_sensitive(&arguments, &desired, state);
        assert_eq!(
            state.attributes.get("password"),
            Some(&Value::String("secret".to_string()))
        );
        assert!(!state.attributes.contains_key("user_name"));
    }
}
