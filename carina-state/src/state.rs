//! State file structures for persisting infrastructure state

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use carina_core::dependency::Bindings;
use carina_core::resource::{ResourceId, State, Value};

/// The main state file structure that persists to the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateFile {
    /// State file format version
    pub version: u32,
    /// Monotonically increasing number for each state modification
    pub serial: u64,
    /// Unique identifier for this state lineage (prevents accidental overwrites)
    pub lineage: String,
    /// Version of Carina that last modified this state
    pub carina_version: String,
    /// Managed resources in the order they were created
    pub resources: Vec<ResourceState>,
}

impl StateFile {
    /// Current state file format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a new empty state file
    pub fn new() -> Self {
        Self::with_lineage(uuid::Uuid::new_v4().to_string())
    }

    /// Create a new state file with a specific lineage
    pub fn with_lineage(lineage: String) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            serial: 0,
            lineage,
            carina_version: env!("CARGO_PKG_VERSION").to_string(),
            resources: Vec::new(),
        }
    }

    /// Increment serial and update carina version for a new state write
    pub fn increment_serial(&mut self) {
        self.serial += 1;
        self.carina_version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn find_resource(&self, id: &ResourceId) -> Option<&ResourceState> {
        self.resources.iter().find(|r| r.matches(id))
    }

    /// Add or update a resource, keeping its original position
    pub fn upsert_resource(&mut self, resource: ResourceState) {
        let id = resource.resource_id();
        match self.resources.iter_mut().find(|r| r.matches(&id)) {
            Some(existing) => *existing = resource,
            None => self.resources.push(resource),
        }
    }

    pub fn remove_resource(&mut self, id: &ResourceId) -> Option<ResourceState> {
        let pos = self.resources.iter().position(|r| r.matches(id))?;
        Some(self.resources.remove(pos))
    }

    /// Resources with a provider-side identifier, in creation order
    pub fn managed(&self) -> Vec<(ResourceId, String)> {
        self.resources
            .iter()
            .filter_map(|r| Some((r.resource_id(), r.identifier.clone()?)))
            .collect()
    }

    /// Recorded attribute values, keyed by binding name
    pub fn bindings(&self) -> Bindings {
        self.resources
            .iter()
            .map(|r| (r.resource_id().address(), r.to_state().attributes))
            .collect()
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new()
    }
}

/// State of a single managed resource
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceState {
    /// Resource type (e.g., "azurerm_dns_zone")
    pub resource_type: String,
    /// Resource name (the block name in configuration)
    pub name: String,
    /// Provider name (e.g., "azurerm")
    pub provider: String,
    /// Provider-side identifier (the Azure Resource Manager ID)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// All attributes of the resource as JSON values
    pub attributes: HashMap<String, serde_json::Value>,
    /// Whether this resource is protected from deletion
    #[serde(default)]
    pub protected: bool,
}

impl ResourceState {
    pub fn new(
        resource_type: impl Into<String>,
        name: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            resource_type: resource_type.into(),
            name: name.into(),
            provider: provider.into(),
            identifier: None,
            attributes: HashMap::new(),
            protected: false,
        }
    }

    /// Record the state a provider returned
    pub fn from_state(state: &State, provider: impl Into<String>) -> Self {
        let mut resource =
            Self::new(state.id.resource_type.clone(), state.id.name.clone(), provider);
        resource.identifier = state.identifier.clone();
        resource.attributes = state
            .attributes
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect();
        resource
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn with_protected(mut self, protected: bool) -> Self {
        self.protected = protected;
        self
    }

    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(self.resource_type.clone(), self.name.clone())
    }

    fn matches(&self, id: &ResourceId) -> bool {
        self.resource_type == id.resource_type && self.name == id.name
    }

    /// Convert back into the core representation
    pub fn to_state(&self) -> State {
        let attributes = self
            .attributes
            .iter()
            .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
            .collect();
        let state = State::existing(self.resource_id(), attributes);
        match &self.identifier {
            Some(identifier) => state.with_identifier(identifier.clone()),
            None => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ZONE_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000000/resourceGroups/dns/providers/Microsoft.Network/dnsZones/example.com";

    fn zone() -> ResourceState {
        ResourceState::new("azurerm_dns_zone", "main", "azurerm")
            .with_identifier(ZONE_ID)
            .with_attribute("name", json!("example.com"))
    }

    #[test]
    fn new_state_file_is_empty() {
        let state = StateFile::new();
        assert_eq!(state.version, StateFile::CURRENT_VERSION);
        assert_eq!(state.serial, 0);
        assert!(!state.lineage.is_empty());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn increment_serial() {
        let mut state = StateFile::new();
        state.increment_serial();
        state.increment_serial();
        assert_eq!(state.serial, 2);
    }

    #[test]
    fn upsert_replaces_in_place() {
        let mut state = StateFile::new();
        state.upsert_resource(zone());
        state.upsert_resource(ResourceState::new("azurerm_dns_a_record", "www", "azurerm"));
        state.upsert_resource(zone().with_attribute("name", json!("example.org")));

        assert_eq!(state.resources.len(), 2);
        assert_eq!(state.resources[0].attributes["name"], json!("example.org"));
    }

    #[test]
    fn remove_resource() {
        let mut state = StateFile::new();
        state.upsert_resource(zone());

        let id = ResourceId::new("azurerm_dns_zone", "main");
        assert!(state.remove_resource(&id).is_some());
        assert!(state.remove_resource(&id).is_none());
        assert!(state.resources.is_empty());
    }

    #[test]
    fn managed_skips_entries_without_identifier() {
        let mut state = StateFile::new();
        state.upsert_resource(zone());
        state.upsert_resource(ResourceState::new("azurerm_dns_a_record", "pending", "azurerm"));

        let managed = state.managed();
        assert_eq!(managed.len(), 1);
        assert_eq!(managed[0].1, ZONE_ID);
    }

    #[test]
    fn core_state_conversion_keeps_identifier() {
        let resource = zone().with_attribute("tags", json!({ "env": "prod" }));
        let core = resource.to_state();
        assert!(core.exists);
        assert_eq!(core.identifier.as_deref(), Some(ZONE_ID));

        let back = ResourceState::from_state(&core, "azurerm");
        assert_eq!(back.identifier.as_deref(), Some(ZONE_ID));
        assert_eq!(back.attributes["tags"], json!({ "env": "prod" }));
    }

    #[test]
    fn bindings_are_keyed_by_address() {
        let mut state = StateFile::new();
        state.upsert_resource(zone());
        let bindings = state.bindings();
        assert_eq!(
            bindings["azurerm_dns_zone.main"].get("name"),
            Some(&Value::String("example.com".to_string()))
        );
    }

    #[test]
    fn identifier_is_optional_when_reading_old_files() {
        let raw = json!({
            "version": 1,
            "serial": 3,
            "lineage": "abc",
            "carina_version": "0.1.0",
            "resources": [
                { "resource_type": "azurerm_dns_zone", "name": "main", "provider": "azurerm", "attributes": {} }
            ]
        });
        let state: StateFile = serde_json::from_value(raw).unwrap();
        assert!(state.resources[0].identifier.is_none());
        assert!(!state.resources[0].protected);
    }
}
