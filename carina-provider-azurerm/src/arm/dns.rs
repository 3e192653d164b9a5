//! `Microsoft.Network/dnsZones` models and clients

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{ArmError, SharedClient, to_body};
use crate::ids::{DnsZoneId, RecordTypeId};

pub const API_VERSION: &str = "2023-07-01-preview";

/// DNS zones are not regional
pub const ZONE_LOCATION: &str = "global";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<ZoneProperties>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_number_of_record_sets: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number_of_record_sets: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(default)]
    pub properties: RecordSetProperties,
}

/// Record set payload; only the array matching the set's type is populated
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordSetProperties {
    #[serde(rename = "TTL", skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(rename = "provisioningState", skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    #[serde(rename = "targetResource", skip_serializing_if = "Option::is_none")]
    pub target_resource: Option<SubResource>,
    #[serde(rename = "ARecords", skip_serializing_if = "Option::is_none")]
    pub a_records: Option<Vec<ARecord>>,
    #[serde(rename = "AAAARecords", skip_serializing_if = "Option::is_none")]
    pub aaaa_records: Option<Vec<AaaaRecord>>,
    #[serde(rename = "CNAMERecord", skip_serializing_if = "Option::is_none")]
    pub cname_record: Option<CnameRecord>,
    #[serde(rename = "MXRecords", skip_serializing_if = "Option::is_none")]
    pub mx_records: Option<Vec<MxRecord>>,
    #[serde(rename = "NSRecords", skip_serializing_if = "Option::is_none")]
    pub ns_records: Option<Vec<NsRecord>>,
    #[serde(rename = "PTRRecords", skip_serializing_if = "Option::is_none")]
    pub ptr_records: Option<Vec<PtrRecord>>,
    #[serde(rename = "SRVRecords", skip_serializing_if = "Option::is_none")]
    pub srv_records: Option<Vec<SrvRecord>>,
    #[serde(rename = "TXTRecords", skip_serializing_if = "Option::is_none")]
    pub txt_records: Option<Vec<TxtRecord>>,
    #[serde(rename = "caaRecords", skip_serializing_if = "Option::is_none")]
    pub caa_records: Option<Vec<CaaRecord>>,
    #[serde(rename = "DSRecords", skip_serializing_if = "Option::is_none")]
    pub ds_records: Option<Vec<DsRecord>>,
}

/// Reference to another ARM resource; the API sends `{}` when unset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SubResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ARecord {
    pub ipv4_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AaaaRecord {
    pub ipv6_address: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CnameRecord {
    pub cname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MxRecord {
    pub preference: i64,
    pub exchange: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NsRecord {
    pub nsdname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PtrRecord {
    pub ptrdname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrvRecord {
    pub priority: i64,
    pub weight: i64,
    pub port: i64,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxtRecord {
    pub value: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaaRecord {
    pub flags: i64,
    pub tag: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DsRecord {
    pub key_tag: i64,
    pub algorithm: i64,
    pub digest: Digest,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Digest {
    pub algorithm_type: i64,
    pub value: String,
}

#[derive(Clone)]
pub struct ZonesClient {
    client: SharedClient,
}

impl ZonesClient {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &DnsZoneId) -> Result<Zone, ArmError> {
        self.client.get(&id.to_string(), API_VERSION).await?.json()
    }

    pub async fn create_or_update(&self, id: &DnsZoneId, zone: &Zone) -> Result<Zone, ArmError> {
        self.client
            .put(&id.to_string(), API_VERSION, &to_body(zone)?)
            .await?
            .json()
    }

    /// Replace the zone's tags
    pub async fn update_tags(
        &self,
        id: &DnsZoneId,
        tags: &HashMap<String, String>,
    ) -> Result<Zone, ArmError> {
        let body = serde_json::json!({ "tags": tags });
        self.client
            .patch(&id.to_string(), API_VERSION, &body)
            .await?
            .json()
    }

    pub async fn delete(&self, id: &DnsZoneId) -> Result<(), ArmError> {
        self.client.delete(&id.to_string(), API_VERSION).await?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct RecordSetsClient {
    client: SharedClient,
}

impl RecordSetsClient {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &RecordTypeId) -> Result<RecordSet, ArmError> {
        self.client.get(&id.to_string(), API_VERSION).await?.json()
    }

    pub async fn create_or_update(
        &self,
        id: &RecordTypeId,
        record_set: &RecordSet,
    ) -> Result<RecordSet, ArmError> {
        self.client
            .put(&id.to_string(), API_VERSION, &to_body(record_set)?)
            .await?
            .json()
    }

    pub async fn delete(&self, id: &RecordTypeId) -> Result<(), ArmError> {
        self.client.delete(&id.to_string(), API_VERSION).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_set_uses_wire_names() {
        let record_set = RecordSet {
            properties: RecordSetProperties {
                ttl: Some(300),
                ds_records: Some(vec![DsRecord {
                    key_tag: 34365,
                    algorithm: 13,
                    digest: Digest {
                        algorithm_type: 2,
                        value: "ABCD".to_string(),
                    },
                }]),
                ..Default::default()
            },
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&record_set).unwrap(),
            json!({
                "properties": {
                    "TTL": 300,
                    "DSRecords": [{
                        "keyTag": 34365,
                        "algorithm": 13,
                        "digest": { "algorithmType": 2, "value": "ABCD" }
                    }]
                }
            })
        );
    }

    #[test]
    fn record_set_response_decodes() {
        let record_set: RecordSet = serde_json::from_value(json!({
            "id": "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.Network/dnszones/example.com/A/www",
            "name": "www",
            "type": "Microsoft.Network/dnszones/A",
            "etag": "etag-1",
            "properties": {
                "TTL": 3600,
                "fqdn": "www.example.com.",
                "provisioningState": "Succeeded",
                "ARecords": [{ "ipv4Address": "10.0.0.1" }],
                "targetResource": {}
            }
        }))
        .unwrap();

        assert_eq!(record_set.properties.ttl, Some(3600));
        assert_eq!(record_set.properties.target_resource, Some(SubResource::default()));
        assert_eq!(
            record_set.properties.a_records,
            Some(vec![ARecord {
                ipv4_address: "10.0.0.1".to_string()
            }])
        );
    }

    #[test]
    fn zone_omits_unset_fields() {
        let zone = Zone {
            location: ZONE_LOCATION.to_string(),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&zone).unwrap(), json!({ "location": "global" }));
    }
}
