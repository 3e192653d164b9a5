//! Payloads of the individual record types

use std::net::{Ipv4Addr, Ipv6Addr};

use carina_core::resource::Value;
use carina_core::schema::{AttributeSchema, AttributeType, types};
use serde::{Deserialize, Serialize};

use super::record::RecordKind;
use crate::arm::dns::{
    AaaaRecord, ARecord, CaaRecord, CnameRecord, Digest, DsRecord, MxRecord, NsRecord, PtrRecord,
    RecordSetProperties, SrvRecord, SubResource, TxtRecord,
};
use crate::ids::RecordType;

/// TXT values longer than this are split into several strings
const TXT_CHUNK_LENGTH: usize = 255;

fn validate_ipv4(value: &Value) -> Result<(), String> {
    match value {
        Value::String(s) => s
            .parse::<Ipv4Addr>()
            .map(|_| ())
            .map_err(|_| format!("{:?} is not a valid IPv4 address", s)),
        _ => Err("Expected string".to_string()),
    }
}

fn validate_ipv6(value: &Value) -> Result<(), String> {
    match value {
        Value::String(s) => s
            .parse::<Ipv6Addr>()
            .map(|_| ())
            .map_err(|_| format!("{:?} is not a valid IPv6 address", s)),
        _ => Err("Expected string".to_string()),
    }
}

fn validate_txt_value(value: &Value) -> Result<(), String> {
    match value {
        Value::String(s) if (1..=4096).contains(&s.chars().count()) => Ok(()),
        Value::String(_) => Err("expected length of value to be in the range (1 - 4096)".to_string()),
        _ => Err("Expected string".to_string()),
    }
}

fn string_set(item: AttributeType) -> AttributeType {
    AttributeType::Set(Box::new(item))
}

fn block_set(fields: Vec<AttributeSchema>) -> AttributeType {
    AttributeType::Set(Box::new(AttributeType::Block(fields)))
}

fn target_resource_id_argument() -> AttributeSchema {
    AttributeSchema::new("target_resource_id", types::non_empty_string())
        .optional()
        .with_description("Azure resource the record set points at (alias record)")
}

fn target_resource(id: &Option<String>) -> Option<SubResource> {
    id.as_ref().map(|id| SubResource { id: Some(id.clone()) })
}

fn flatten_target_resource(properties: &RecordSetProperties) -> Option<String> {
    properties
        .target_resource
        .as_ref()
        .and_then(|t| t.id.clone())
        .filter(|id| !id.is_empty())
}

/// Record sets addressed either by values or by an alias target
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AddressPayload {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub records: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_resource_id: Option<String>,
}

impl AddressPayload {
    fn validate(&self) -> Result<(), String> {
        if self.records.is_empty() != self.target_resource_id.is_some() {
            return Err("exactly one of `records` or `target_resource_id` must be set".to_string());
        }
        Ok(())
    }
}

/// Record sets holding a list of names
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct NamesPayload {
    #[serde(default)]
    pub records: Vec<String>,
}

/// Record sets holding a set of structured records
#[derive(Debug, Serialize, Deserialize)]
pub struct RecordBlocks<B> {
    #[serde(default = "Vec::new")]
    pub record: Vec<B>,
}

pub struct ARecordKind;

impl RecordKind for ARecordKind {
    type Payload = AddressPayload;
    const RECORD_TYPE: RecordType = RecordType::A;
    const RESOURCE_TYPE: &'static str = "azurerm_dns_a_record";

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new(
                "records",
                string_set(types::string_with("Ipv4Address", validate_ipv4)),
            )
            .optional(),
            target_resource_id_argument(),
        ]
    }

    fn validate(payload: &AddressPayload) -> Result<(), String> {
        payload.validate()
    }

    fn expand(payload: &AddressPayload, properties: &mut RecordSetProperties) {
        properties.a_records = (!payload.records.is_empty()).then(|| {
            payload
                .records
                .iter()
                .map(|ip| ARecord {
                    ipv4_address: ip.clone(),
                })
                .collect()
        });
        properties.target_resource = target_resource(&payload.target_resource_id);
    }

    fn flatten(properties: &RecordSetProperties) -> AddressPayload {
        AddressPayload {
            records: properties
                .a_records
                .iter()
                .flatten()
                .map(|r| r.ipv4_address.clone())
                .collect(),
            target_resource_id: flatten_target_resource(properties),
        }
    }
}

pub struct AaaaRecordKind;

impl RecordKind for AaaaRecordKind {
    type Payload = AddressPayload;
    const RECORD_TYPE: RecordType = RecordType::AAAA;
    const RESOURCE_TYPE: &'static str = "azurerm_dns_aaaa_record";

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new(
                "records",
                string_set(types::string_with("Ipv6Address", validate_ipv6)),
            )
            .optional(),
            target_resource_id_argument(),
        ]
    }

    fn validate(payload: &AddressPayload) -> Result<(), String> {
        payload.validate()
    }

    fn expand(payload: &AddressPayload, properties: &mut RecordSetProperties) {
        properties.aaaa_records = (!payload.records.is_empty()).then(|| {
            payload
                .records
                .iter()
                .map(|ip| AaaaRecord {
                    ipv6_address: ip.clone(),
                })
                .collect()
        });
        properties.target_resource = target_resource(&payload.target_resource_id);
    }

    fn flatten(properties: &RecordSetProperties) -> AddressPayload {
        AddressPayload {
            records: properties
                .aaaa_records
                .iter()
                .flatten()
                .map(|r| r.ipv6_address.clone())
                .collect(),
            target_resource_id: flatten_target_resource(properties),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CnamePayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_resource_id: Option<String>,
}

pub struct CnameRecordKind;

impl RecordKind for CnameRecordKind {
    type Payload = CnamePayload;
    const RECORD_TYPE: RecordType = RecordType::CNAME;
    const RESOURCE_TYPE: &'static str = "azurerm_dns_cname_record";

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new("record", types::non_empty_string()).optional(),
            target_resource_id_argument(),
        ]
    }

    fn validate(payload: &CnamePayload) -> Result<(), String> {
        if payload.record.is_some() == payload.target_resource_id.is_some() {
            return Err("exactly one of `record` or `target_resource_id` must be set".to_string());
        }
        Ok(())
    }

    fn expand(payload: &CnamePayload, properties: &mut RecordSetProperties) {
        properties.cname_record = payload.record.as_ref().map(|cname| CnameRecord {
            cname: cname.clone(),
        });
        properties.target_resource = target_resource(&payload.target_resource_id);
    }

    fn flatten(properties: &RecordSetProperties) -> CnamePayload {
        CnamePayload {
            record: properties.cname_record.as_ref().map(|r| r.cname.clone()),
            target_resource_id: flatten_target_resource(properties),
        }
    }
}

pub struct NsRecordKind;

impl RecordKind for NsRecordKind {
    type Payload = NamesPayload;
    const RECORD_TYPE: RecordType = RecordType::NS;
    const RESOURCE_TYPE: &'static str = "azurerm_dns_ns_record";

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new(
                "records",
                AttributeType::List(Box::new(types::non_empty_string())),
            )
            .required(),
        ]
    }

    fn expand(payload: &NamesPayload, properties: &mut RecordSetProperties) {
        properties.ns_records = Some(
            payload
                .records
                .iter()
                .map(|name| NsRecord {
                    nsdname: name.clone(),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties) -> NamesPayload {
        NamesPayload {
            records: properties
                .ns_records
                .iter()
                .flatten()
                .map(|r| r.nsdname.clone())
                .collect(),
        }
    }
}

pub struct PtrRecordKind;

impl RecordKind for PtrRecordKind {
    type Payload = NamesPayload;
    const RECORD_TYPE: RecordType = RecordType::PTR;
    const RESOURCE_TYPE: &'static str = "azurerm_dns_ptr_record";

    fn arguments() -> Vec<AttributeSchema> {
        vec![AttributeSchema::new("records", string_set(types::non_empty_string())).required()]
    }

    fn expand(payload: &NamesPayload, properties: &mut RecordSetProperties) {
        properties.ptr_records = Some(
            payload
                .records
                .iter()
                .map(|name| PtrRecord {
                    ptrdname: name.clone(),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties) -> NamesPayload {
        NamesPayload {
            records: properties
                .ptr_records
                .iter()
                .flatten()
                .map(|r| r.ptrdname.clone())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaaBlock {
    pub flags: i64,
    pub tag: String,
    pub value: String,
}

pub struct CaaRecordKind;

impl RecordKind for CaaRecordKind {
    type Payload = RecordBlocks<CaaBlock>;
    const RECORD_TYPE: RecordType = RecordType::CAA;
    const RESOURCE_TYPE: &'static str = "azurerm_dns_caa_record";

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new(
                "record",
                block_set(vec![
                    AttributeSchema::new(
                        "flags",
                        types::int_with("CaaFlags", types::validate_int_between::<0, 1>),
                    )
                    .required(),
                    AttributeSchema::new(
                        "tag",
                        AttributeType::Enum(vec![
                            "issue".to_string(),
                            "issuewild".to_string(),
                            "iodef".to_string(),
                        ]),
                    )
                    .required(),
                    AttributeSchema::new("value", types::non_empty_string()).required(),
                ]),
            )
            .required(),
        ]
    }

    fn expand(payload: &Self::Payload, properties: &mut RecordSetProperties) {
        properties.caa_records = Some(
            payload
                .record
                .iter()
                .map(|r| CaaRecord {
                    flags: r.flags,
                    tag: r.tag.clone(),
                    value: r.value.clone(),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties) -> Self::Payload {
        RecordBlocks {
            record: properties
                .caa_records
                .iter()
                .flatten()
                .map(|r| CaaBlock {
                    flags: r.flags,
                    tag: r.tag.clone(),
                    value: r.value.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DsBlock {
    pub algorithm: i64,
    pub key_tag: i64,
    pub digest_type: i64,
    pub digest_value: String,
}

pub struct DsRecordKind;

impl RecordKind for DsRecordKind {
    type Payload = RecordBlocks<DsBlock>;
    const RECORD_TYPE: RecordType = RecordType::DS;
    const RESOURCE_TYPE: &'static str = "azurerm_dns_ds_record";

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new(
                "record",
                block_set(vec![
                    AttributeSchema::new(
                        "algorithm",
                        types::int_with("DnssecAlgorithm", types::validate_int_between::<1, 255>),
                    )
                    .required(),
                    AttributeSchema::new(
                        "key_tag",
                        types::int_with("KeyTag", types::validate_int_between::<0, 65535>),
                    )
                    .required(),
                    AttributeSchema::new(
                        "digest_type",
                        types::int_with("DigestType", types::validate_int_between::<1, 255>),
                    )
                    .required(),
                    AttributeSchema::new("digest_value", types::non_empty_string()).required(),
                ]),
            )
            .required(),
        ]
    }

    fn expand(payload: &Self::Payload, properties: &mut RecordSetProperties) {
        properties.ds_records = Some(
            payload
                .record
                .iter()
                .map(|r| DsRecord {
                    key_tag: r.key_tag,
                    algorithm: r.algorithm,
                    digest: Digest {
                        algorithm_type: r.digest_type,
                        value: r.digest_value.clone(),
                    },
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties) -> Self::Payload {
        RecordBlocks {
            record: properties
                .ds_records
                .iter()
                .flatten()
                .map(|r| DsBlock {
                    algorithm: r.algorithm,
                    key_tag: r.key_tag,
                    digest_type: r.digest.algorithm_type,
                    digest_value: r.digest.value.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MxBlock {
    pub preference: i64,
    pub exchange: String,
}

pub struct MxRecordKind;

impl RecordKind for MxRecordKind {
    type Payload = RecordBlocks<MxBlock>;
    const RECORD_TYPE: RecordType = RecordType::MX;
    const RESOURCE_TYPE: &'static str = "azurerm_dns_mx_record";

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new(
                "record",
                block_set(vec![
                    AttributeSchema::new(
                        "preference",
                        types::int_with("Preference", types::validate_int_between::<0, 65535>),
                    )
                    .required(),
                    AttributeSchema::new("exchange", types::non_empty_string()).required(),
                ]),
            )
            .required(),
        ]
    }

    fn expand(payload: &Self::Payload, properties: &mut RecordSetProperties) {
        properties.mx_records = Some(
            payload
                .record
                .iter()
                .map(|r| MxRecord {
                    preference: r.preference,
                    exchange: r.exchange.clone(),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties) -> Self::Payload {
        RecordBlocks {
            record: properties
                .mx_records
                .iter()
                .flatten()
                .map(|r| MxBlock {
                    preference: r.preference,
                    exchange: r.exchange.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SrvBlock {
    pub priority: i64,
    pub weight: i64,
    pub port: i64,
    pub target: String,
}

pub struct SrvRecordKind;

impl RecordKind for SrvRecordKind {
    type Payload = RecordBlocks<SrvBlock>;
    const RECORD_TYPE: RecordType = RecordType::SRV;
    const RESOURCE_TYPE: &'static str = "azurerm_dns_srv_record";

    fn arguments() -> Vec<AttributeSchema> {
        let u16_field = |name: &str| {
            AttributeSchema::new(
                name,
                types::int_with("UInt16", types::validate_int_between::<0, 65535>),
            )
            .required()
        };
        vec![
            AttributeSchema::new(
                "record",
                block_set(vec![
                    u16_field("priority"),
                    u16_field("weight"),
                    u16_field("port"),
                    AttributeSchema::new("target", types::non_empty_string()).required(),
                ]),
            )
            .required(),
        ]
    }

    fn expand(payload: &Self::Payload, properties: &mut RecordSetProperties) {
        properties.srv_records = Some(
            payload
                .record
                .iter()
                .map(|r| SrvRecord {
                    priority: r.priority,
                    weight: r.weight,
                    port: r.port,
                    target: r.target.clone(),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties) -> Self::Payload {
        RecordBlocks {
            record: properties
                .srv_records
                .iter()
                .flatten()
                .map(|r| SrvBlock {
                    priority: r.priority,
                    weight: r.weight,
                    port: r.port,
                    target: r.target.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TxtBlock {
    pub value: String,
}

/// Split a TXT value into the 255-character strings DNS allows
fn chunk_txt_value(value: &str) -> Vec<String> {
    let chars: Vec<char> = value.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(TXT_CHUNK_LENGTH)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

pub struct TxtRecordKind;

impl RecordKind for TxtRecordKind {
    type Payload = RecordBlocks<TxtBlock>;
    const RECORD_TYPE: RecordType = RecordType::TXT;
    const RESOURCE_TYPE: &'static str = "azurerm_dns_txt_record";

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new(
                "record",
                block_set(vec![
                    AttributeSchema::new(
                        "value",
                        types::string_with("TxtValue", validate_txt_value),
                    )
                    .required(),
                ]),
            )
            .required(),
        ]
    }

    fn expand(payload: &Self::Payload, properties: &mut RecordSetProperties) {
        properties.txt_records = Some(
            payload
                .record
                .iter()
                .map(|r| TxtRecord {
                    value: chunk_txt_value(&r.value),
                })
                .collect(),
        );
    }

    fn flatten(properties: &RecordSetProperties) -> Self::Payload {
        RecordBlocks {
            record: properties
                .txt_records
                .iter()
                .flatten()
                .map(|r| TxtBlock {
                    value: r.value.concat(),
                })
                .collect(),
        }
    }
}
