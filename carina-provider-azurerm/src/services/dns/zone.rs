//! `azurerm_dns_zone` resource and data source

use std::collections::HashMap;

use async_trait::async_trait;
use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::schema::{AttributeSchema, AttributeType, types};
use serde::{Deserialize, Serialize};

use crate::arm::dns::{ZONE_LOCATION, Zone};
use crate::framework::{
    ResourceMetaData, TypedDataSource, TypedResource, already_exists, arm_error,
};
use crate::ids::{DnsZoneId, IdValidator, ResourceId, id_validator};

pub const RESOURCE_TYPE: &str = "azurerm_dns_zone";

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ZoneModel {
    pub name: String,
    pub resource_group_name: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_number_of_record_sets: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub name_servers: Vec<String>,
}

impl ZoneModel {
    fn from_zone(id: &DnsZoneId, zone: Zone) -> Self {
        let properties = zone.properties.unwrap_or_default();
        Self {
            name: id.dns_zone_name.clone(),
            resource_group_name: id.resource_group_name.clone(),
            tags: zone.tags.unwrap_or_default(),
            number_of_record_sets: properties.number_of_record_sets,
            max_number_of_record_sets: properties.max_number_of_record_sets,
            name_servers: properties.name_servers.unwrap_or_default(),
        }
    }
}

fn computed_attributes() -> Vec<AttributeSchema> {
    vec![
        AttributeSchema::new("number_of_record_sets", AttributeType::Int).computed(),
        AttributeSchema::new("max_number_of_record_sets", AttributeType::Int).computed(),
        AttributeSchema::new(
            "name_servers",
            AttributeType::Set(Box::new(AttributeType::String)),
        )
        .computed()
        .with_description("Name servers Azure assigned to the zone"),
    ]
}

fn parse_id(metadata: &ResourceMetaData) -> ProviderResult<DnsZoneId> {
    DnsZoneId::parse(metadata.id()?).map_err(|e| ProviderError::validation(e.to_string()))
}

pub struct DnsZoneResource;

#[async_trait]
impl TypedResource for DnsZoneResource {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn arguments(&self) -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new("name", types::non_empty_string())
                .required()
                .force_new(),
            AttributeSchema::new("resource_group_name", types::non_empty_string())
                .required()
                .force_new(),
            AttributeSchema::new("tags", types::tags()).optional(),
        ]
    }

    fn attributes(&self) -> Vec<AttributeSchema> {
        computed_attributes()
    }

    fn id_validation(&self) -> IdValidator {
        id_validator::<DnsZoneId>()
    }

    fn description(&self) -> Option<&'static str> {
        Some("Public DNS zone")
    }

    async fn create(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let model: ZoneModel = metadata.decode()?;
        let id = DnsZoneId::new(
            metadata.client.subscription_id.clone(),
            model.resource_group_name,
            model.name,
        );

        let client = metadata.client.zones();
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

        let zone = Zone {
            location: ZONE_LOCATION.to_string(),
            tags: Some(model.tags),
            ..Default::default()
        };
        client
            .create_or_update(&id, &zone)
            .await
            .map_err(|e| arm_error(format!("creating {}", id), e))?;

        metadata.set_id(&id);
        Ok(())
    }

    async fn read(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = parse_id(metadata)?;
        let zone = match metadata.client.zones().get(&id).await {
            Ok(zone) => zone,
            Err(e) if e.was_not_found() => {
                metadata.mark_as_gone();
                return Ok(());
            }
            Err(e) => return Err(arm_error(format!("retrieving {}", id), e)),
        };

        metadata.encode(&ZoneModel::from_zone(&id, zone))
    }

    async fn update(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = parse_id(metadata)?;
        let model: ZoneModel = metadata.decode()?;

        if metadata.has_change("tags") {
            metadata
                .client
                .zones()
                .update_tags(&id, &model.tags)
                .await
                .map_err(|e| arm_error(format!("updating tags of {}", id), e))?;
        }
        Ok(())
    }

    async fn delete(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = parse_id(metadata)?;
        metadata
            .client
            .zones()
            .delete(&id)
            .await
            .map_err(|e| arm_error(format!("deleting {}", id), e))
    }
}

pub struct DnsZoneDataSource;

#[async_trait]
impl TypedDataSource for DnsZoneDataSource {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn arguments(&self) -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new("name", types::non_empty_string()).required(),
            AttributeSchema::new("resource_group_name", types::non_empty_string()).required(),
        ]
    }

    fn attributes(&self) -> Vec<AttributeSchema> {
        let mut attributes = vec![AttributeSchema::new("tags", types::tags()).computed()];
        attributes.extend(computed_attributes());
        attributes
    }

    async fn read(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let lookup: ZoneModel = metadata.decode()?;
        let id = DnsZoneId::new(
            metadata.client.subscription_id.clone(),
            lookup.resource_group_name,
            lookup.name,
        );

        let zone = match metadata.client.zones().get(&id).await {
            Ok(zone) => zone,
            Err(e) if e.was_not_found() => {
                return Err(ProviderError::not_found(format!("{} was not found", id)));
            }
            Err(e) => return Err(arm_error(format!("retrieving {}", id), e)),
        };

        metadata.set_id(&id);
        metadata.encode(&ZoneModel::from_zone(&id, zone))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arm::dns::ZoneProperties;

    #[test]
    fn model_from_zone_response() {
        let id = DnsZoneId::new("abc", "rg", "example.com");
        let zone = Zone {
            location: ZONE_LOCATION.to_string(),
            tags: Some(HashMap::from([("env".to_string(), "prod".to_string())])),
            properties: Some(ZoneProperties {
                number_of_record_sets: Some(2),
                max_number_of_record_sets: Some(10000),
                name_servers: Some(vec!["ns1-01.azure-dns.com.".to_string()]),
                zone_type: Some("Public".to_string()),
            }),
            ..Default::default()
        };

        let model = ZoneModel::from_zone(&id, zone);
        assert_eq!(model.name, "example.com");
        assert_eq!(model.resource_group_name, "rg");
        assert_eq!(model.number_of_record_sets, Some(2));
        assert_eq!(model.name_servers, vec!["ns1-01.azure-dns.com."]);
        assert_eq!(model.tags.get("env").map(String::as_str), Some("prod"));
    }

    #[test]
    fn zone_without_properties() {
        let model = ZoneModel::from_zone(&DnsZoneId::new("abc", "rg", "z.com"), Zone::default());
        assert_eq!(model.number_of_record_sets, None);
        assert!(model.name_servers.is_empty());
    }
}
