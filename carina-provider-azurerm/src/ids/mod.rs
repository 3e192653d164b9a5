//! Azure Resource Manager identifiers
//!
//! Every ARM resource is addressed by a path such as
//! `/subscriptions/{id}/resourceGroups/{name}/providers/Microsoft.Network/dnsZones/{zone}`.
//! Each typed ID describes its path as a list of segments, so parsing and
//! formatting share one definition.

mod common;
mod datafactory;
mod dns;
mod sentinel;

use std::fmt;

pub use common::{ResourceGroupId, SubscriptionId, UserAssignedIdentityId};
pub use datafactory::{CredentialId, FactoryId};
pub use dns::{DnsZoneId, RecordType, RecordTypeId};
pub use sentinel::{DataConnectorId, WorkspaceId};

use carina_core::resource::Value;

/// One `/`-separated piece of an ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Fixed text, e.g. `resourceGroups`
    Static(&'static str),
    /// A value supplied by the user, e.g. the resource group name
    User(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdParseError {
    #[error("parsing {description} ID: the ID was empty\nexpected an ID of the form {expected}")]
    Empty {
        description: &'static str,
        expected: String,
    },

    #[error(
        "parsing {description} ID {input:?}: expected {wanted} segments, got {got}\nexpected an ID of the form {expected}"
    )]
    SegmentCount {
        description: &'static str,
        input: String,
        wanted: usize,
        got: usize,
        expected: String,
    },

    #[error(
        "parsing {description} ID {input:?}: expected segment {position} to be {wanted:?}, got {found:?}\nexpected an ID of the form {expected}"
    )]
    StaticSegment {
        description: &'static str,
        input: String,
        position: usize,
        wanted: &'static str,
        found: String,
        expected: String,
    },

    #[error("parsing {description} ID {input:?}: the segment {name:?} was empty\nexpected an ID of the form {expected}")]
    EmptyValue {
        description: &'static str,
        input: String,
        name: &'static str,
        expected: String,
    },

    #[error("parsing {description} ID {input:?}: {message}")]
    InvalidValue {
        description: &'static str,
        input: String,
        message: String,
    },
}

/// User-supplied values of a parsed ID, in segment order
#[derive(Debug)]
pub struct Parsed {
    input: String,
    description: &'static str,
    values: Vec<(&'static str, String)>,
}

impl Parsed {
    /// Take the value of the named user segment
    ///
    /// Every name in the segment list is present after a successful parse.
    pub fn take(&mut self, name: &str) -> String {
        self.values
            .iter_mut()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| std::mem::take(v))
            .unwrap_or_default()
    }

    pub fn invalid(&self, message: impl Into<String>) -> IdParseError {
        IdParseError::InvalidValue {
            description: self.description,
            input: self.input.clone(),
            message: message.into(),
        }
    }
}

/// Render a segment list as `/subscriptions/{subscriptionId}/...`
pub fn expected_shape(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|s| match s {
            Segment::Static(text) => format!("/{}", text),
            Segment::User(name) => format!("/{{{}}}", name),
        })
        .collect()
}

/// Split an ID into its user values, checking it against `segments`
///
/// With `insensitively` the static segments match regardless of case,
/// which is how IDs returned by the API must be read.
pub fn parse_segments(
    segments: &[Segment],
    description: &'static str,
    input: &str,
    insensitively: bool,
) -> Result<Parsed, IdParseError> {
    let expected = expected_shape(segments);
    if input.trim().is_empty() {
        return Err(IdParseError::Empty {
            description,
            expected,
        });
    }

    let parts: Vec<&str> = input
        .strip_prefix('/')
        .unwrap_or(input)
        .trim_end_matches('/')
        .split('/')
        .collect();
    if parts.len() != segments.len() {
        return Err(IdParseError::SegmentCount {
            description,
            input: input.to_string(),
            wanted: segments.len(),
            got: parts.len(),
            expected,
        });
    }

    let mut values = Vec::new();
    for (position, (segment, part)) in segments.iter().zip(&parts).enumerate() {
        match segment {
            Segment::Static(text) => {
                let matches = if insensitively {
                    text.eq_ignore_ascii_case(part)
                } else {
                    text == part
                };
                if !matches {
                    return Err(IdParseError::StaticSegment {
                        description,
                        input: input.to_string(),
                        position,
                        wanted: text,
                        found: part.to_string(),
                        expected,
                    });
                }
            }
            Segment::User(name) => {
                if part.is_empty() {
                    return Err(IdParseError::EmptyValue {
                        description,
                        input: input.to_string(),
                        name,
                        expected,
                    });
                }
                values.push((*name, part.to_string()));
            }
        }
    }

    Ok(Parsed {
        input: input.to_string(),
        description,
        values,
    })
}

/// A typed ARM identifier
///
/// `Display` renders the canonical form, and parsing that form again
/// yields the same ID.
pub trait ResourceId: Sized + fmt::Display {
    /// Human readable name used in errors, e.g. "Dns Zone"
    const DESCRIPTION: &'static str;

    fn segments() -> &'static [Segment];

    fn from_parsed(parsed: Parsed) -> Result<Self, IdParseError>;

    fn parse(input: &str) -> Result<Self, IdParseError> {
        Self::from_parsed(parse_segments(
            Self::segments(),
            Self::DESCRIPTION,
            input,
            false,
        )?)
    }

    fn parse_insensitively(input: &str) -> Result<Self, IdParseError> {
        Self::from_parsed(parse_segments(
            Self::segments(),
            Self::DESCRIPTION,
            input,
            true,
        )?)
    }
}

/// Validator for an import ID
pub type IdValidator = Box<dyn Fn(&str) -> Result<(), String> + Send + Sync>;

/// Accept only IDs that parse as `T`
pub fn id_validator<T: ResourceId>() -> IdValidator {
    Box::new(|input| T::parse(input).map(|_| ()).map_err(|e| e.to_string()))
}

/// Schema validator body shared by the `validate_*_id` functions
fn validate_value<T: ResourceId>(value: &Value) -> Result<(), String> {
    match value {
        Value::String(s) => T::parse(s).map(|_| ()).map_err(|e| e.to_string()),
        _ => Err("Expected string".to_string()),
    }
}

pub fn validate_dns_zone_id(value: &Value) -> Result<(), String> {
    validate_value::<DnsZoneId>(value)
}

pub fn validate_workspace_id(value: &Value) -> Result<(), String> {
    validate_value::<WorkspaceId>(value)
}

pub fn validate_data_connector_id(value: &Value) -> Result<(), String> {
    validate_value::<DataConnectorId>(value)
}

pub fn validate_factory_id(value: &Value) -> Result<(), String> {
    validate_value::<FactoryId>(value)
}

pub fn validate_credential_id(value: &Value) -> Result<(), String> {
    validate_value::<CredentialId>(value)
}

pub fn validate_user_assigned_identity_id(value: &Value) -> Result<(), String> {
    validate_value::<UserAssignedIdentityId>(value)
}

/// Accept only record set IDs of the given record type
pub fn validate_record_type_id(record_type: RecordType) -> IdValidator {
    Box::new(move |input| {
        let id = RecordTypeId::parse(input).map_err(|e| e.to_string())?;
        if id.record_type != record_type {
            return Err(format!(
                "expected a {} record ID, got a {} record ID",
                record_type, id.record_type
            ));
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEGMENTS: &[Segment] = &[
        Segment::Static("subscriptions"),
        Segment::User("subscriptionId"),
        Segment::Static("resourceGroups"),
        Segment::User("resourceGroupName"),
    ];

    #[test]
    fn parse_extracts_user_values() {
        let mut parsed =
            parse_segments(SEGMENTS, "Resource Group", "/subscriptions/abc/resourceGroups/rg", false)
                .unwrap();
        assert_eq!(parsed.take("subscriptionId"), "abc");
        assert_eq!(parsed.take("resourceGroupName"), "rg");
    }

    #[test]
    fn empty_input_is_rejected() {
        let err = parse_segments(SEGMENTS, "Resource Group", "", false).unwrap_err();
        assert!(matches!(err, IdParseError::Empty { .. }));
        assert!(
            err.to_string()
                .contains("/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}")
        );
    }

    #[test]
    fn wrong_segment_count_is_rejected() {
        let err = parse_segments(SEGMENTS, "Resource Group", "/subscriptions/abc", false).unwrap_err();
        assert!(matches!(
            err,
            IdParseError::SegmentCount { wanted: 4, got: 2, .. }
        ));
    }

    #[test]
    fn static_segments_respect_case_sensitivity() {
        let input = "/subscriptions/abc/resourcegroups/rg";
        let err = parse_segments(SEGMENTS, "Resource Group", input, false).unwrap_err();
        assert!(matches!(
            err,
            IdParseError::StaticSegment { position: 2, wanted: "resourceGroups", .. }
        ));
        assert!(parse_segments(SEGMENTS, "Resource Group", input, true).is_ok());
    }

    #[test]
    fn empty_user_value_is_rejected() {
        let err =
            parse_segments(SEGMENTS, "Resource Group", "/subscriptions//resourceGroups/rg", false)
                .unwrap_err();
        assert!(matches!(
            err,
            IdParseError::EmptyValue { name: "subscriptionId", .. }
        ));
    }

    #[test]
    fn value_validators_reject_other_id_types() {
        let zone = Value::String(
            "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com"
                .to_string(),
        );
        assert!(validate_dns_zone_id(&zone).is_ok());
        assert!(validate_workspace_id(&zone).is_err());
        assert!(validate_dns_zone_id(&Value::Int(1)).is_err());
    }

    #[test]
    fn child_id_validators_need_the_full_path() {
        let workspace = "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.OperationalInsights/workspaces/ws";
        let connector = format!(
            "{}/providers/Microsoft.SecurityInsights/dataConnectors/aad",
            workspace
        );
        assert!(validate_data_connector_id(&Value::String(connector)).is_ok());
        assert!(validate_data_connector_id(&Value::String(workspace.to_string())).is_err());

        let factory = "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.DataFactory/factories/etl";
        let credential = format!("{}/credentials/uami", factory);
        assert!(validate_credential_id(&Value::String(credential)).is_ok());
        assert!(validate_credential_id(&Value::String(factory.to_string())).is_err());
    }

    #[test]
    fn record_type_validator_checks_type() {
        let validate = validate_record_type_id(RecordType::DS);
        let base = "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com";
        assert!(validate(&format!("{}/DS/www", base)).is_ok());
        let err = validate(&format!("{}/A/www", base)).unwrap_err();
        assert_eq!(err, "expected a DS record ID, got a A record ID");
    }
}
