//! Typed resource framework
//!
//! A handler implements `TypedResource` (or `TypedDataSource`): it declares
//! its schema and implements each operation against a `ResourceMetaData`,
//! decoding the configuration into a serde model, calling the management
//! plane and encoding the result back into attributes. The provider wraps
//! every call with the handler's timeout.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carina_core::provider::{ErrorKind, ProviderError, ProviderResult};
use carina_core::resource::{ResourceId, State, Value};
use carina_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::arm::datafactory::CredentialsClient;
use crate::arm::dns::{RecordSetsClient, ZonesClient};
use crate::arm::securityinsights::DataConnectorsClient;
use crate::arm::{ArmError, SharedClient};
use crate::ids::IdValidator;

/// Management-plane clients plus the account the provider runs as
#[derive(Clone)]
pub struct Clients {
    pub client: SharedClient,
    pub subscription_id: String,
    /// Tenant of the configured credentials, when known
    pub tenant_id: Option<String>,
}

impl Clients {
    pub fn new(client: SharedClient, subscription_id: impl Into<String>) -> Self {
        Self {
            client,
            subscription_id: subscription_id.into(),
            tenant_id: None,
        }
    }

    pub fn with_tenant_id(mut self, tenant_id: Option<String>) -> Self {
        self.tenant_id = tenant_id;
        self
    }

    pub fn zones(&self) -> ZonesClient {
        ZonesClient::new(self.client.clone())
    }

    pub fn record_sets(&self) -> RecordSetsClient {
        RecordSetsClient::new(self.client.clone())
    }

    pub fn data_connectors(&self) -> DataConnectorsClient {
        DataConnectorsClient::new(self.client.clone())
    }

    pub fn credentials(&self) -> CredentialsClient {
        CredentialsClient::new(self.client.clone())
    }
}

/// Attributes a handler works on
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    /// ARM ID, unset until the resource is created
    pub id: Option<String>,
    pub attributes: HashMap<String, Value>,
    /// Attributes recorded before this operation (updates only)
    pub prior: Option<HashMap<String, Value>>,
}

impl ResourceData {
    pub fn new(attributes: HashMap<String, Value>) -> Self {
        Self {
            id: None,
            attributes,
            prior: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_prior(mut self, prior: HashMap<String, Value>) -> Self {
        self.prior = Some(prior);
        self
    }
}

/// Everything an operation needs: clients and the resource's data
pub struct ResourceMetaData {
    pub client: Clients,
    pub resource_type: &'static str,
    pub data: ResourceData,
    gone: bool,
}

impl ResourceMetaData {
    pub fn new(client: Clients, resource_type: &'static str, data: ResourceData) -> Self {
        Self {
            client,
            resource_type,
            data,
            gone: false,
        }
    }

    /// Decode the current attributes into a model
    pub fn decode<M: DeserializeOwned>(&self) -> ProviderResult<M> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .data
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        serde_json::from_value(serde_json::Value::Object(object))
            .map_err(|e| ProviderError::validation(format!("decoding: {}", e)))
    }

    /// Replace the attributes with an encoded model; `None` fields are dropped
    pub fn encode<M: Serialize>(&mut self, model: &M) -> ProviderResult<()> {
        let json = serde_json::to_value(model)
            .map_err(|e| ProviderError::new(format!("encoding: {}", e)))?;
        match Value::from_json(&json) {
            Some(Value::Map(attributes)) => {
                self.data.attributes = attributes;
                Ok(())
            }
            _ => Err(ProviderError::new(format!(
                "encoding: expected {} model to be an object",
                self.resource_type
            ))),
        }
    }

    pub fn set_id(&mut self, id: impl fmt::Display) {
        self.data.id = Some(id.to_string());
    }

    pub fn id(&self) -> ProviderResult<&str> {
        self.data.id.as_deref().ok_or_else(|| {
            ProviderError::new(format!("{} has no ID yet", self.resource_type))
        })
    }

    /// The remote object no longer exists
    pub fn mark_as_gone(&mut self) {
        log::debug!(
            "{} {} no longer exists",
            self.resource_type,
            self.data.id.as_deref().unwrap_or("<unknown>")
        );
        self.gone = true;
    }

    pub fn is_gone(&self) -> bool {
        self.gone
    }

    /// Whether an attribute differs from its recorded value
    pub fn has_change(&self, name: &str) -> bool {
        match &self.data.prior {
            Some(prior) => prior.get(name) != self.data.attributes.get(name),
            None => self.data.attributes.contains_key(name),
        }
    }

    /// Value recorded before this operation
    pub fn prior(&self, name: &str) -> Option<&Value> {
        self.data.prior.as_ref().and_then(|p| p.get(name))
    }

    /// State after the operation, with the ARM ID as identifier and `id` attribute
    pub fn into_state(self, id: ResourceId) -> State {
        if self.is_gone() {
            return State::not_found(id);
        }
        let mut attributes = self.data.attributes;
        match self.data.id {
            Some(identifier) => {
                attributes.insert("id".to_string(), Value::String(identifier.clone()));
                State::existing(id, attributes).with_identifier(identifier)
            }
            None => State::existing(id, attributes),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub create: Duration,
    pub read: Duration,
    pub update: Duration,
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            create: Duration::from_secs(30 * 60),
            read: Duration::from_secs(5 * 60),
            update: Duration::from_secs(30 * 60),
            delete: Duration::from_secs(30 * 60),
        }
    }
}

/// A managed resource type
#[async_trait]
pub trait TypedResource: Send + Sync {
    fn resource_type(&self) -> &'static str;

    /// User-settable fields
    fn arguments(&self) -> Vec<AttributeSchema>;

    /// Fields computed by the API
    fn attributes(&self) -> Vec<AttributeSchema>;

    /// Check an ID given to `import`
    fn id_validation(&self) -> IdValidator;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    fn description(&self) -> Option<&'static str> {
        None
    }

    async fn create(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()>;

    /// Refresh attributes from the API; call `mark_as_gone` on a 404
    async fn read(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()>;

    async fn update(&self, _metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        Err(ProviderError::new(format!(
            "{} does not support in-place update",
            self.resource_type()
        )))
    }

    async fn delete(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()>;

    /// Extra checks before an import is read
    async fn import(&self, _metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        Ok(())
    }
}

/// A read-only lookup
#[async_trait]
pub trait TypedDataSource: Send + Sync {
    fn resource_type(&self) -> &'static str;

    fn arguments(&self) -> Vec<AttributeSchema>;

    fn attributes(&self) -> Vec<AttributeSchema>;

    fn timeouts(&self) -> Timeouts {
        Timeouts::default()
    }

    fn description(&self) -> Option<&'static str> {
        None
    }

    async fn read(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()>;
}

/// Run an operation, failing with a timeout error once `limit` passes
pub async fn with_timeout<T>(
    operation: &str,
    resource_type: &str,
    limit: Duration,
    future: impl Future<Output = ProviderResult<T>>,
) -> ProviderResult<T> {
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::new(format!(
            "{} of {} timed out after {:?}",
            operation, resource_type, limit
        ))
        .with_kind(ErrorKind::Timeout)),
    }
}

/// Wrap a management-plane error with context, keeping 404 / 409 as kinds
pub fn arm_error(context: impl fmt::Display, err: ArmError) -> ProviderError {
    let kind = if err.was_not_found() {
        ErrorKind::NotFound
    } else if err.was_conflict() {
        ErrorKind::Conflict
    } else {
        ErrorKind::Other
    };
    ProviderError::new(context.to_string())
        .with_kind(kind)
        .with_cause(err)
}

/// Error for a create that found the object already present
pub fn already_exists(id: impl fmt::Display) -> ProviderError {
    ProviderError::new(format!(
        "A resource with the ID {:?} already exists - import it into the state to manage it",
        id.to_string()
    ))
    .with_kind(ErrorKind::Conflict)
}

fn id_attribute() -> AttributeSchema {
    AttributeSchema::new("id", AttributeType::String)
        .computed()
        .with_description("Azure Resource Manager ID")
}

/// Every resource and data source the provider offers, by type name
#[derive(Default, Clone)]
pub struct Registry {
    resources: HashMap<&'static str, Arc<dyn TypedResource>>,
    data_sources: HashMap<&'static str, Arc<dyn TypedDataSource>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_resource(&mut self, resource: impl TypedResource + 'static) {
        let resource_type = resource.resource_type();
        if self
            .resources
            .insert(resource_type, Arc::new(resource))
            .is_some()
        {
            log::warn!("resource type {} registered twice", resource_type);
        }
    }

    pub fn register_data_source(&mut self, data_source: impl TypedDataSource + 'static) {
        let resource_type = data_source.resource_type();
        if self
            .data_sources
            .insert(resource_type, Arc::new(data_source))
            .is_some()
        {
            log::warn!("data source {} registered twice", resource_type);
        }
    }

    pub fn resource(&self, resource_type: &str) -> Option<Arc<dyn TypedResource>> {
        self.resources.get(resource_type).cloned()
    }

    pub fn data_source(&self, resource_type: &str) -> Option<Arc<dyn TypedDataSource>> {
        self.data_sources.get(resource_type).cloned()
    }

    pub fn resource_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.resources.keys().copied().collect();
        types.sort();
        types
    }

    pub fn data_source_types(&self) -> Vec<&'static str> {
        let mut types: Vec<&'static str> = self.data_sources.keys().copied().collect();
        types.sort();
        types
    }

    /// Combined schema (arguments and attributes) of every registered type
    pub fn schemas(&self) -> Vec<ResourceSchema> {
        let resources = self.resources.values().map(|r| {
            let schema = ResourceSchema::new(r.resource_type())
                .attributes(r.arguments())
                .attributes(r.attributes())
                .attribute(id_attribute());
            match r.description() {
                Some(d) => schema.with_description(d),
                None => schema,
            }
        });
        let data_sources = self.data_sources.values().map(|d| {
            let schema = ResourceSchema::new(d.resource_type())
                .attributes(d.arguments())
                .attributes(d.attributes())
                .attribute(id_attribute())
                .as_data_source();
            match d.description() {
                Some(desc) => schema.with_description(desc),
                None => schema,
            }
        });
        resources.chain(data_sources).collect()
    }
}
