//! Shared handler for DNS record sets
//!
//! Every record type has the same lifecycle and differs only in its
//! payload (`records`, `record`, `target_resource_id`), so one generic
//! resource and data source are instantiated per `RecordKind`.

use std::collections::HashMap;
use std::marker::PhantomData;

use async_trait::async_trait;
use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::schema::{AttributeSchema, AttributeType, types};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::arm::dns::{RecordSet, RecordSetProperties};
use crate::framework::{
    ResourceMetaData, TypedDataSource, TypedResource, already_exists, arm_error,
};
use crate::ids::{
    DnsZoneId, IdValidator, RecordType, RecordTypeId, ResourceId, validate_dns_zone_id,
    validate_record_type_id,
};

/// Payload mapping of one DNS record type
pub trait RecordKind: Send + Sync + 'static {
    /// Type-specific fields; every field must tolerate being absent
    type Payload: Serialize + DeserializeOwned + Send + Sync;

    const RECORD_TYPE: RecordType;

    /// Shared by the resource and the data source
    const RESOURCE_TYPE: &'static str;

    /// Payload arguments of the resource
    fn arguments() -> Vec<AttributeSchema>;

    /// Checks serde and the schema cannot express (e.g. "exactly one of")
    fn validate(_payload: &Self::Payload) -> Result<(), String> {
        Ok(())
    }

    /// Write the payload into the record set, replacing what is there
    fn expand(payload: &Self::Payload, properties: &mut RecordSetProperties);

    fn flatten(properties: &RecordSetProperties) -> Self::Payload;
}

/// Fields common to every record type plus the type's payload
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound(serialize = "P: Serialize", deserialize = "P: DeserializeOwned"))]
pub struct DnsRecordModel<P> {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_zone_id: Option<String>,
    /// Data sources only: the zone by resource group and name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone_name: Option<String>,
    #[serde(default)]
    pub ttl: i64,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(flatten)]
    pub payload: P,
}

impl<P> DnsRecordModel<P> {
    /// Copy the shared fields of a record set
    fn refresh(&mut self, properties: &RecordSetProperties) {
        self.ttl = properties.ttl.unwrap_or_default();
        self.fqdn = properties.fqdn.clone();
        self.tags = properties.metadata.clone().unwrap_or_default();
    }
}

/// Turn a resource argument into a data source output
fn as_output(schema: AttributeSchema) -> AttributeSchema {
    AttributeSchema {
        required: false,
        optional: false,
        computed: true,
        force_new: false,
        default: None,
        ..schema
    }
}

fn shared_arguments() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("name", types::non_empty_string())
            .required()
            .force_new(),
        AttributeSchema::new(
            "dns_zone_id",
            types::string_with("DnsZoneId", validate_dns_zone_id),
        )
        .required()
        .force_new(),
        AttributeSchema::new("ttl", types::positive_int()).required(),
        AttributeSchema::new("tags", types::tags()).optional(),
    ]
}

fn fqdn_attribute() -> AttributeSchema {
    AttributeSchema::new("fqdn", AttributeType::String)
        .computed()
        .with_description("Fully qualified domain name of the record set")
}

pub struct DnsRecordResource<K> {
    kind: PhantomData<fn() -> K>,
}

impl<K> DnsRecordResource<K> {
    pub fn new() -> Self {
        Self { kind: PhantomData }
    }
}

impl<K> Default for DnsRecordResource<K> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K: RecordKind> TypedResource for DnsRecordResource<K> {
    fn resource_type(&self) -> &'static str {
        K::RESOURCE_TYPE
    }

    fn arguments(&self) -> Vec<AttributeSchema> {
        let mut arguments = shared_arguments();
        arguments.extend(K::arguments());
        arguments
    }

    fn attributes(&self) -> Vec<AttributeSchema> {
        vec![fqdn_attribute()]
    }

    fn id_validation(&self) -> IdValidator {
        validate_record_type_id(K::RECORD_TYPE)
    }

    async fn create(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let model: DnsRecordModel<K::Payload> = metadata.decode()?;
        K::validate(&model.payload).map_err(ProviderError::validation)?;

        let zone_reference = model.dns_zone_id.as_deref().unwrap_or_default();
        let zone_id = DnsZoneId::parse(zone_reference)
            .map_err(|e| ProviderError::validation(format!("parsing dns_zone_id: {}", e)))?;
        let id = RecordTypeId::new(
            zone_id.subscription_id,
            zone_id.resource_group_name,
            zone_id.dns_zone_name,
            K::RECORD_TYPE,
            model.name.clone(),
        );

        let client = metadata.client.record_sets();
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

        let mut properties = RecordSetProperties {
            ttl: Some(model.ttl),
            metadata: Some(model.tags.clone()),
            ..Default::default()
        };
        K::expand(&model.payload, &mut properties);

        let record_set = RecordSet {
            properties,
            ..Default::default()
        };
        client
            .create_or_update(&id, &record_set)
            .await
            .map_err(|e| arm_error(format!("creating {}", id), e))?;

        metadata.set_id(&id);
        Ok(())
    }

    async fn read(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = RecordTypeId::parse(metadata.id()?)
            .map_err(|e| ProviderError::validation(e.to_string()))?;

        let record_set = match metadata.client.record_sets().get(&id).await {
            Ok(record_set) => record_set,
            Err(e) if e.was_not_found() => {
                metadata.mark_as_gone();
                return Ok(());
            }
            Err(e) => return Err(arm_error(format!("retrieving {}", id), e)),
        };

        let mut model = DnsRecordModel {
            name: id.relative_record_set_name.clone(),
            dns_zone_id: Some(id.zone_id().to_string()),
            resource_group_name: None,
            zone_name: None,
            ttl: 0,
            tags: HashMap::new(),
            fqdn: None,
            payload: K::flatten(&record_set.properties),
        };
        model.refresh(&record_set.properties);

        metadata.encode(&model)
    }

    async fn update(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = RecordTypeId::parse(metadata.id()?)
            .map_err(|e| ProviderError::validation(e.to_string()))?;
        let model: DnsRecordModel<K::Payload> = metadata.decode()?;
        K::validate(&model.payload).map_err(ProviderError::validation)?;

        let client = metadata.client.record_sets();
        let mut existing = client
            .get(&id)
            .await
            .map_err(|e| arm_error(format!("retrieving {}", id), e))?;

        let properties = &mut existing.properties;
        properties.fqdn = None;
        properties.provisioning_state = None;
        if metadata.has_change("ttl") {
            properties.ttl = Some(model.ttl);
        }
        if metadata.has_change("tags") {
            properties.metadata = Some(model.tags.clone());
        }
        let payload_changed = K::arguments()
            .iter()
            .any(|argument| metadata.has_change(&argument.name));
        if payload_changed {
            K::expand(&model.payload, properties);
        }

        client
            .create_or_update(&id, &existing)
            .await
            .map_err(|e| arm_error(format!("updating {}", id), e))?;
        Ok(())
    }

    async fn delete(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = RecordTypeId::parse(metadata.id()?)
            .map_err(|e| ProviderError::validation(e.to_string()))?;
        metadata
            .client
            .record_sets()
            .delete(&id)
            .await
            .map_err(|e| arm_error(format!("deleting {}", id), e))
    }
}

pub struct DnsRecordDataSource<K> {
    kind: PhantomData<fn() -> K>,
}

impl<K> DnsRecordDataSource<K> {
    pub fn new() -> Self {
        Self { kind: PhantomData }
    }
}

impl<K> Default for DnsRecordDataSource<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Resource group and zone name of the zone a lookup targets
fn zone_for_lookup<P>(model: &DnsRecordModel<P>) -> ProviderResult<(String, String)> {
    match (&model.dns_zone_id, &model.resource_group_name, &model.zone_name) {
        (Some(zone_id), None, None) => {
            let zone_id = DnsZoneId::parse(zone_id)
                .map_err(|e| ProviderError::validation(format!("parsing dns_zone_id: {}", e)))?;
            Ok((zone_id.resource_group_name, zone_id.dns_zone_name))
        }
        (None, Some(resource_group_name), Some(zone_name)) => {
            Ok((resource_group_name.clone(), zone_name.clone()))
        }
        _ => Err(ProviderError::validation(
            "exactly one of `dns_zone_id` or `resource_group_name` + `zone_name` must be set",
        )),
    }
}

#[async_trait]
impl<K: RecordKind> TypedDataSource for DnsRecordDataSource<K> {
    fn resource_type(&self) -> &'static str {
        K::RESOURCE_TYPE
    }

    fn arguments(&self) -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new("name", types::non_empty_string()).required(),
            AttributeSchema::new(
                "dns_zone_id",
                types::string_with("DnsZoneId", validate_dns_zone_id),
            )
            .optional()
            .computed(),
            AttributeSchema::new("resource_group_name", types::non_empty_string())
                .optional()
                .computed(),
            AttributeSchema::new("zone_name", types::non_empty_string())
                .optional()
                .computed(),
        ]
    }

    fn attributes(&self) -> Vec<AttributeSchema> {
        let mut attributes = vec![
            AttributeSchema::new("ttl", AttributeType::Int).computed(),
            fqdn_attribute(),
            AttributeSchema::new("tags", types::tags()).computed(),
        ];
        attributes.extend(K::arguments().into_iter().map(as_output));
        attributes
    }

    async fn read(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let mut state: DnsRecordModel<K::Payload> = metadata.decode()?;
        let (resource_group_name, zone_name) = zone_for_lookup(&state)?;

        // Lookups always target the configured subscription
        let id = RecordTypeId::new(
            metadata.client.subscription_id.clone(),
            resource_group_name,
            zone_name,
            K::RECORD_TYPE,
            state.name.clone(),
        );

        let record_set = match metadata.client.record_sets().get(&id).await {
            Ok(record_set) => record_set,
            Err(e) if e.was_not_found() => {
                return Err(ProviderError::not_found(format!("{} was not found", id)));
            }
            Err(e) => return Err(arm_error(format!("retrieving {}", id), e)),
        };

        state.refresh(&record_set.properties);
        state.payload = K::flatten(&record_set.properties);
        state.dns_zone_id = Some(id.zone_id().to_string());
        state.resource_group_name = Some(id.resource_group_name.clone());
        state.zone_name = Some(id.dns_zone_name.clone());
        metadata.set_id(&id);

        metadata.encode(&state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Payload {
        #[serde(default)]
        records: Vec<String>,
    }

    #[test]
    fn model_flattens_payload() {
        let model: DnsRecordModel<Payload> = serde_json::from_value(serde_json::json!({
            "name": "www",
            "dns_zone_id": "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com",
            "ttl": 300,
            "records": ["10.0.0.1"]
        }))
        .unwrap();

        assert_eq!(model.payload.records, vec!["10.0.0.1"]);
        assert!(model.tags.is_empty());

        let encoded = serde_json::to_value(&model).unwrap();
        assert_eq!(encoded["records"], serde_json::json!(["10.0.0.1"]));
        assert!(encoded.get("zone_name").is_none());
    }

    #[test]
    fn lookup_requires_exactly_one_zone_form() {
        let mut model = DnsRecordModel {
            name: "www".to_string(),
            dns_zone_id: None,
            resource_group_name: Some("rg".to_string()),
            zone_name: Some("example.com".to_string()),
            ttl: 0,
            tags: HashMap::new(),
            fqdn: None,
            payload: Payload::default(),
        };
        assert_eq!(
            zone_for_lookup(&model).unwrap(),
            ("rg".to_string(), "example.com".to_string())
        );

        model.dns_zone_id = Some(
            "/subscriptions/abc/resourceGroups/other/providers/Microsoft.Network/dnsZones/x.com"
                .to_string(),
        );
        assert!(zone_for_lookup(&model).is_err());

        model.resource_group_name = None;
        model.zone_name = None;
        assert_eq!(
            zone_for_lookup(&model).unwrap(),
            ("other".to_string(), "x.com".to_string())
        );
    }

    #[test]
    fn outputs_drop_argument_flags() {
        let output = as_output(
            AttributeSchema::new("records", AttributeType::List(Box::new(AttributeType::String)))
                .required()
                .force_new(),
        );
        assert!(output.is_output());
        assert!(!output.force_new);
    }
}
