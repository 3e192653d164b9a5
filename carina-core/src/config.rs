//! Config - Load configuration files
//!
//! Configuration is JSON shaped like this:
//!
//! ```json
//! {
//!   "provider": { "azurerm": { "subscription_id": "..." } },
//!   "backend": { "type": "local", "path": "carina.state.json" },
//!   "resource": { "azurerm_dns_zone": { "main": { "name": "example.com" } } },
//!   "data": { "azurerm_dns_zone": { "existing": { "name": "example.org" } } }
//! }
//! ```
//!
//! Strings of the form `${type.name.attr}` or `${data.type.name.attr}` are
//! references to another block's attribute, and `${env.NAME}` is replaced
//! with the environment variable `NAME` while loading.

use std::collections::HashMap;
use std::path::Path;

use crate::resource::{Resource, Value};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration at '{path}': {message}")]
    Invalid { path: String, message: String },

    #[error("Invalid reference '{0}': expected ${{type.name.attribute}}")]
    InvalidReference(String),

    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),
}

/// Provider configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderConfig {
    pub name: String,
    pub attributes: HashMap<String, Value>,
}

impl ProviderConfig {
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Backend configuration for state storage
#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    /// Backend type (e.g., "local")
    pub backend_type: String,
    /// Backend-specific attributes
    pub attributes: HashMap<String, Value>,
}

/// Parse result
#[derive(Debug, Clone, Default)]
pub struct ParsedFile {
    pub providers: Vec<ProviderConfig>,
    /// Resources and data sources, in file order (type, then name)
    pub resources: Vec<Resource>,
    /// Backend configuration for state storage
    pub backend: Option<BackendConfig>,
}

impl ParsedFile {
    pub fn provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Managed resources only
    pub fn managed_resources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(|r| !r.is_data_source())
    }

    /// Data sources only
    pub fn data_sources(&self) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(|r| r.is_data_source())
    }
}

/// Load a configuration file
pub fn load(path: impl AsRef<Path>) -> Result<ParsedFile, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse(&content)
}

/// Parse configuration text
pub fn parse(input: &str) -> Result<ParsedFile, ConfigError> {
    let root: serde_json::Value = serde_json::from_str(input)?;
    let root = as_object(&root, "")?;

    let mut parsed = ParsedFile::default();

    for (key, value) in root {
        match key.as_str() {
            "provider" => {
                for (name, body) in as_object(value, "provider")? {
                    let path = format!("provider.{}", name);
                    parsed.providers.push(ProviderConfig {
                        name: name.clone(),
                        attributes: parse_attributes(body, &path)?,
                    });
                }
            }
            "backend" => {
                let mut attributes = parse_attributes(value, "backend")?;
                let backend_type = match attributes.remove("type") {
                    Some(Value::String(t)) => t,
                    _ => {
                        return Err(ConfigError::Invalid {
                            path: "backend".to_string(),
                            message: "missing string attribute 'type'".to_string(),
                        });
                    }
                };
                parsed.backend = Some(BackendConfig {
                    backend_type,
                    attributes,
                });
            }
            "resource" | "data" => {
                let read_only = key == "data";
                for (resource_type, blocks) in as_object(value, key)? {
                    let type_path = format!("{}.{}", key, resource_type);
                    for (name, body) in as_object(blocks, &type_path)? {
                        let path = format!("{}.{}", type_path, name);
                        let mut resource =
                            Resource::new(resource_type.clone(), name.clone()).with_read_only(read_only);
                        resource.attributes = parse_attributes(body, &path)?;
                        parsed.resources.push(resource);
                    }
                }
            }
            other => {
                return Err(ConfigError::Invalid {
                    path: other.to_string(),
                    message: "unknown top-level block".to_string(),
                });
            }
        }
    }

    Ok(parsed)
}

fn as_object<'a>(
    value: &'a serde_json::Value,
    path: &str,
) -> Result<&'a serde_json::Map<String, serde_json::Value>, ConfigError> {
    value.as_object().ok_or_else(|| ConfigError::Invalid {
        path: if path.is_empty() { "<root>".to_string() } else { path.to_string() },
        message: "expected an object".to_string(),
    })
}

fn parse_attributes(
    value: &serde_json::Value,
    path: &str,
) -> Result<HashMap<String, Value>, ConfigError> {
    let mut attributes = HashMap::new();
    for (key, v) in as_object(value, path)? {
        if let Some(v) = parse_value(v, &format!("{}.{}", path, key))? {
            attributes.insert(key.clone(), v);
        }
    }
    Ok(attributes)
}

fn parse_value(value: &serde_json::Value, path: &str) -> Result<Option<Value>, ConfigError> {
    let parsed = match value {
        serde_json::Value::Null => None,
        serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
        serde_json::Value::Number(n) => {
            // Attribute numbers are integers
            let i = n.as_i64().ok_or_else(|| ConfigError::Invalid {
                path: path.to_string(),
                message: format!("expected an integer, got {}", n),
            })?;
            Some(Value::Int(i))
        }
        serde_json::Value::String(s) => Some(parse_string(s)?),
        serde_json::Value::Array(items) => {
            let mut list = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                if let Some(v) = parse_value(item, &format!("{}[{}]", path, index))? {
                    list.push(v);
                }
            }
            Some(Value::List(list))
        }
        serde_json::Value::Object(map) => {
            let mut out = HashMap::new();
            for (k, v) in map {
                if let Some(v) = parse_value(v, &format!("{}.{}", path, k))? {
                    out.insert(k.clone(), v);
                }
            }
            Some(Value::Map(out))
        }
    };
    Ok(parsed)
}

fn parse_string(s: &str) -> Result<Value, ConfigError> {
    let Some(inner) = s.strip_prefix("${").and_then(|s| s.strip_suffix('}')) else {
        return Ok(Value::String(s.to_string()));
    };

    if let Some(var) = inner.strip_prefix("env.") {
        return std::env::var(var)
            .map(Value::String)
            .map_err(|_| ConfigError::EnvVarNotSet(var.to_string()));
    }

    let parts: Vec<&str> = inner.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidReference(s.to_string()));
    }
    match parts.as_slice() {
        ["data", resource_type, name, attr] => Ok(Value::ResourceRef(
            format!("data.{}.{}", resource_type, name),
            attr.to_string(),
        )),
        [resource_type, name, attr] if *resource_type != "data" => Ok(Value::ResourceRef(
            format!("{}.{}", resource_type, name),
            attr.to_string(),
        )),
        _ => Err(ConfigError::InvalidReference(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "provider": { "azurerm": { "subscription_id": "00000000-0000-0000-0000-000000000000" } },
        "backend": { "type": "local", "path": "state.json" },
        "data": {
            "azurerm_dns_zone": { "existing": { "name": "example.org", "resource_group_name": "dns" } }
        },
        "resource": {
            "azurerm_dns_a_record": {
                "www": {
                    "name": "www",
                    "dns_zone_id": "${data.azurerm_dns_zone.existing.id}",
                    "ttl": 300,
                    "records": ["10.0.0.1", null],
                    "target_resource_id": null
                }
            }
        }
    }"#;

    #[test]
    fn parse_full_file() {
        let parsed = parse(SAMPLE).unwrap();

        let provider = parsed.provider("azurerm").unwrap();
        assert_eq!(
            provider.get_string("subscription_id"),
            Some("00000000-0000-0000-0000-000000000000")
        );

        let backend = parsed.backend.as_ref().unwrap();
        assert_eq!(backend.backend_type, "local");
        assert_eq!(
            backend.attributes.get("path"),
            Some(&Value::String("state.json".to_string()))
        );

        assert_eq!(parsed.data_sources().count(), 1);
        let record = parsed.managed_resources().next().unwrap();
        assert_eq!(record.id.to_string(), "azurerm_dns_a_record.www");
        assert_eq!(
            record.attributes.get("dns_zone_id"),
            Some(&Value::ResourceRef(
                "data.azurerm_dns_zone.existing".to_string(),
                "id".to_string()
            ))
        );
        assert_eq!(record.attributes.get("ttl"), Some(&Value::Int(300)));
        assert_eq!(
            record.attributes.get("records"),
            Some(&Value::List(vec![Value::String("10.0.0.1".to_string())]))
        );
        assert!(!record.attributes.contains_key("target_resource_id"));
    }

    #[test]
    fn managed_resource_reference() {
        assert_eq!(
            parse_string("${azurerm_dns_zone.main.id}").unwrap(),
            Value::ResourceRef("azurerm_dns_zone.main".to_string(), "id".to_string())
        );
        assert_eq!(
            parse_string("plain ${text").unwrap(),
            Value::String("plain ${text".to_string())
        );
    }

    #[test]
    fn malformed_reference_is_rejected() {
        assert!(matches!(
            parse_string("${azurerm_dns_zone.main}"),
            Err(ConfigError::InvalidReference(_))
        ));
        assert!(matches!(
            parse_string("${data.azurerm_dns_zone.main}"),
            Err(ConfigError::InvalidReference(_))
        ));
    }

    #[test]
    fn missing_env_var_is_reported() {
        let err = parse_string("${env.CARINA_TEST_SURELY_UNSET_VARIABLE}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Environment variable not set: CARINA_TEST_SURELY_UNSET_VARIABLE"
        );
    }

    #[test]
    fn unknown_top_level_block_is_rejected() {
        let err = parse(r#"{ "module": {} }"#).unwrap_err();
        assert!(err.to_string().contains("unknown top-level block"));
    }

    #[test]
    fn fractional_numbers_are_rejected() {
        let err = parse(r#"{ "resource": { "azurerm_dns_a_record": { "www": { "ttl": 300.9 } } } }"#)
            .unwrap_err();
        let ConfigError::Invalid { path, message } = err else {
            panic!("expected an invalid configuration error, got {:?}", err);
        };
        assert_eq!(path, "resource.azurerm_dns_a_record.www.ttl");
        assert!(message.starts_with("expected an integer"));
    }

    #[test]
    fn out_of_range_numbers_are_rejected() {
        let err = parse(
            r#"{ "resource": { "azurerm_dns_mx_record": { "mx": { "record": [{ "preference": 1e30 }] } } } }"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid { ref path, .. } if path == "resource.azurerm_dns_mx_record.mx.record[0].preference"
        ));
    }

    #[test]
    fn backend_requires_type() {
        assert!(parse(r#"{ "backend": { "path": "x" } }"#).is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("main.json");
        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load(&path).unwrap().resources.len(), 2);
    }
}
