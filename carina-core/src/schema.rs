//! Schema - Define type schemas for resources
//!
//! Providers define schemas for each resource type and data source,
//! enabling type validation before any API call is made. A schema lists
//! both the arguments a user may set and the attributes the provider
//! computes from the remote API.

use std::collections::HashMap;
use std::fmt;

use crate::resource::{Resource, Value};

/// Attribute type
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// String
    String,
    /// Integer
    Int,
    /// Boolean
    Bool,
    /// Enum (list of allowed values)
    Enum(Vec<String>),
    /// Custom type (with validation function)
    Custom {
        name: String,
        base: Box<AttributeType>,
        validate: fn(&Value) -> Result<(), String>,
    },
    /// Ordered list
    List(Box<AttributeType>),
    /// Unordered collection, compared without regard to order
    Set(Box<AttributeType>),
    /// Map
    Map(Box<AttributeType>),
    /// Nested object with its own attribute schemas
    Block(Vec<AttributeSchema>),
}

impl AttributeType {
    /// Check if a value conforms to this type
    pub fn validate(&self, value: &Value) -> Result<(), TypeError> {
        match (self, value) {
            // References are resolved at apply time, their type is checked then
            (_, Value::ResourceRef(_, _)) => Ok(()),
            (AttributeType::String, Value::String(_)) => Ok(()),
            (AttributeType::Int, Value::Int(_)) => Ok(()),
            (AttributeType::Bool, Value::Bool(_)) => Ok(()),

            (AttributeType::Enum(variants), Value::String(s)) => {
                if variants.iter().any(|v| v == s) {
                    Ok(())
                } else {
                    Err(TypeError::InvalidEnumVariant {
                        value: s.clone(),
                        expected: variants.clone(),
                    })
                }
            }

            (AttributeType::Custom { base, validate, .. }, v) => {
                base.validate(v)?;
                validate(v).map_err(|msg| TypeError::ValidationFailed { message: msg })
            }

            (AttributeType::List(inner) | AttributeType::Set(inner), Value::List(items)) => {
                for (i, item) in items.iter().enumerate() {
                    inner.validate(item).map_err(|e| TypeError::ListItemError {
                        index: i,
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Map(inner), Value::Map(map)) => {
                for (k, v) in map {
                    inner.validate(v).map_err(|e| TypeError::MapValueError {
                        key: k.clone(),
                        inner: Box::new(e),
                    })?;
                }
                Ok(())
            }

            (AttributeType::Block(fields), Value::Map(map)) => {
                for field in fields {
                    if field.required && !map.contains_key(&field.name) {
                        return Err(TypeError::MissingRequired {
                            name: field.name.clone(),
                        });
                    }
                }
                for (k, v) in map {
                    let field = fields
                        .iter()
                        .find(|f| &f.name == k)
                        .ok_or_else(|| TypeError::UnknownAttribute { name: k.clone() })?;
                    field
                        .attr_type
                        .validate(v)
                        .map_err(|e| TypeError::MapValueError {
                            key: k.clone(),
                            inner: Box::new(e),
                        })?;
                }
                Ok(())
            }

            _ => Err(TypeError::TypeMismatch {
                expected: self.type_name(),
                got: value.type_name(),
            }),
        }
    }

    /// Returns true if values of this type compare without regard to order
    pub fn is_unordered(&self) -> bool {
        match self {
            AttributeType::Set(_) => true,
            AttributeType::Custom { base, .. } => base.is_unordered(),
            _ => false,
        }
    }

    fn type_name(&self) -> String {
        match self {
            AttributeType::String => "String".to_string(),
            AttributeType::Int => "Int".to_string(),
            AttributeType::Bool => "Bool".to_string(),
            AttributeType::Enum(variants) => format!("Enum({})", variants.join(" | ")),
            AttributeType::Custom { name, .. } => name.clone(),
            AttributeType::List(inner) => format!("List<{}>", inner.type_name()),
            AttributeType::Set(inner) => format!("Set<{}>", inner.type_name()),
            AttributeType::Map(inner) => format!("Map<{}>", inner.type_name()),
            AttributeType::Block(fields) => {
                let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
                format!("Block{{{}}}", names.join(", "))
            }
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Type error
#[derive(Debug, Clone, thiserror::Error)]
pub enum TypeError {
    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Invalid enum variant '{value}', expected one of: {}", expected.join(", "))]
    InvalidEnumVariant {
        value: String,
        expected: Vec<String>,
    },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("Required attribute '{name}' is missing")]
    MissingRequired { name: String },

    #[error("Unknown attribute '{name}'")]
    UnknownAttribute { name: String },

    #[error("Attribute '{name}' is computed and cannot be set")]
    ComputedAttribute { name: String },

    #[error("Attribute '{name}': {inner}")]
    AttributeError { name: String, inner: Box<TypeError> },

    #[error("List item at index {index}: {inner}")]
    ListItemError { index: usize, inner: Box<TypeError> },

    #[error("Map value for key '{key}': {inner}")]
    MapValueError { key: String, inner: Box<TypeError> },
}

impl Value {
    fn type_name(&self) -> String {
        match self {
            Value::String(_) => "String".to_string(),
            Value::Int(_) => "Int".to_string(),
            Value::Bool(_) => "Bool".to_string(),
            Value::List(_) => "List".to_string(),
            Value::Map(_) => "Map".to_string(),
            Value::ResourceRef(binding, attr) => format!("ResourceRef({}.{})", binding, attr),
        }
    }
}

/// Attribute schema
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    pub name: String,
    pub attr_type: AttributeType,
    pub required: bool,
    /// May be set by the user; combined with `computed` the provider fills it in otherwise
    pub optional: bool,
    /// Value is filled in by the provider
    pub computed: bool,
    /// Changing the value requires replacing the resource
    pub force_new: bool,
    /// Value is masked in plan output
    pub sensitive: bool,
    pub default: Option<Value>,
    pub description: Option<String>,
}

impl AttributeSchema {
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
            required: false,
            optional: false,
            computed: false,
            force_new: false,
            sensitive: false,
            default: None,
            description: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    pub fn force_new(mut self) -> Self {
        self.force_new = true;
        self
    }

    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// An output: computed and never set by the user
    pub fn is_output(&self) -> bool {
        self.computed && !self.required && !self.optional
    }
}

/// Resource schema
#[derive(Debug, Clone)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub attributes: HashMap<String, AttributeSchema>,
    pub description: Option<String>,
    /// Schema of a data source rather than a managed resource
    pub data_source: bool,
}

impl ResourceSchema {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            attributes: HashMap::new(),
            description: None,
            data_source: false,
        }
    }

    pub fn attribute(mut self, schema: AttributeSchema) -> Self {
        self.attributes.insert(schema.name.clone(), schema);
        self
    }

    pub fn attributes(mut self, schemas: impl IntoIterator<Item = AttributeSchema>) -> Self {
        for schema in schemas {
            self.attributes.insert(schema.name.clone(), schema);
        }
        self
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn as_data_source(mut self) -> Self {
        self.data_source = true;
        self
    }

    /// User-settable attributes, sorted by name
    pub fn arguments(&self) -> Vec<&AttributeSchema> {
        let mut args: Vec<&AttributeSchema> =
            self.attributes.values().filter(|a| !a.is_output()).collect();
        args.sort_by(|a, b| a.name.cmp(&b.name));
        args
    }

    /// Computed-only attributes, sorted by name
    pub fn outputs(&self) -> Vec<&AttributeSchema> {
        let mut outputs: Vec<&AttributeSchema> =
            self.attributes.values().filter(|a| a.is_output()).collect();
        outputs.sort_by(|a, b| a.name.cmp(&b.name));
        outputs
    }

    /// Validate resource attributes
    pub fn validate(&self, attributes: &HashMap<String, Value>) -> Result<(), Vec<TypeError>> {
        let mut errors = Vec::new();

        // Check required attributes
        let mut names: Vec<&String> = self.attributes.keys().collect();
        names.sort();
        for name in names {
            let schema = &self.attributes[name];
            if schema.required && !attributes.contains_key(name) && schema.default.is_none() {
                errors.push(TypeError::MissingRequired { name: name.clone() });
            }
        }

        // Type check each attribute
        let mut keys: Vec<&String> = attributes.keys().collect();
        keys.sort();
        for name in keys {
            let value = &attributes[name];
            match self.attributes.get(name) {
                None => errors.push(TypeError::UnknownAttribute { name: name.clone() }),
                Some(schema) if schema.is_output() => {
                    errors.push(TypeError::ComputedAttribute { name: name.clone() })
                }
                Some(schema) => {
                    if let Err(e) = schema.attr_type.validate(value) {
                        errors.push(TypeError::AttributeError {
                            name: name.clone(),
                            inner: Box::new(e),
                        });
                    }
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Fill in defaults for attributes the user did not set
    pub fn apply_defaults(&self, attributes: &mut HashMap<String, Value>) {
        for (name, schema) in &self.attributes {
            if let Some(default) = &schema.default
                && !attributes.contains_key(name)
            {
                attributes.insert(name.clone(), default.clone());
            }
        }
    }

    /// Names of force-new attributes whose desired value differs from the prior one
    pub fn force_new_changes(
        &self,
        prior: &HashMap<String, Value>,
        desired: &HashMap<String, Value>,
    ) -> Vec<String> {
        let mut changed: Vec<String> = self
            .attributes
            .values()
            .filter(|schema| schema.force_new)
            .filter(|schema| match (prior.get(&schema.name), desired.get(&schema.name)) {
                (Some(p), Some(d)) => !values_equal(&schema.attr_type, p, d),
                (None, Some(_)) => !schema.computed,
                (Some(_), None) => !schema.computed,
                (None, None) => false,
            })
            .map(|schema| schema.name.clone())
            .collect();
        changed.sort();
        changed
    }

    /// Returns true if the named attribute is marked sensitive
    pub fn is_sensitive(&self, name: &str) -> bool {
        self.attributes.get(name).is_some_and(|a| a.sensitive)
    }
}

/// Every schema a provider exposes, split into resources and data sources
///
/// A resource and a data source may share a type name (e.g. `azurerm_dns_zone`).
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    resources: HashMap<String, ResourceSchema>,
    data_sources: HashMap<String, ResourceSchema>,
}

impl SchemaSet {
    pub fn new(schemas: impl IntoIterator<Item = ResourceSchema>) -> Self {
        let mut set = Self::default();
        for schema in schemas {
            if schema.data_source {
                set.data_sources
                    .insert(schema.resource_type.clone(), schema);
            } else {
                set.resources.insert(schema.resource_type.clone(), schema);
            }
        }
        set
    }

    pub fn resource(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.resources.get(resource_type)
    }

    pub fn data_source(&self, resource_type: &str) -> Option<&ResourceSchema> {
        self.data_sources.get(resource_type)
    }

    /// Schema matching a declared resource or data source
    pub fn for_resource(&self, resource: &Resource) -> Option<&ResourceSchema> {
        if resource.read_only {
            self.data_source(&resource.id.resource_type)
        } else {
            self.resource(&resource.id.resource_type)
        }
    }

    /// All schemas sorted by type name, resources before data sources
    pub fn all(&self) -> Vec<&ResourceSchema> {
        let mut resources: Vec<&ResourceSchema> = self.resources.values().collect();
        resources.sort_by(|a, b| a.resource_type.cmp(&b.resource_type));
        let mut data_sources: Vec<&ResourceSchema> = self.data_sources.values().collect();
        data_sources.sort_by(|a, b| a.resource_type.cmp(&b.resource_type));
        resources.extend(data_sources);
        resources
    }

    /// Validate declared resources, returning one message per problem
    pub fn validate_resources(&self, resources: &[Resource]) -> Result<(), Vec<String>> {
        let mut all_errors = Vec::new();

        for resource in resources {
            let prefix = resource.binding();
            match self.for_resource(resource) {
                None => all_errors.push(format!(
                    "{}: unsupported {} type '{}'",
                    prefix,
                    if resource.read_only {
                        "data source"
                    } else {
                        "resource"
                    },
                    resource.id.resource_type
                )),
                Some(schema) => {
                    if let Err(errors) = schema.validate(&resource.attributes) {
                        for error in errors {
                            all_errors.push(format!("{}: {}", prefix, error));
                        }
                    }
                }
            }
        }

        if all_errors.is_empty() {
            Ok(())
        } else {
            Err(all_errors)
        }
    }
}

/// Compare two values under the ordering rules of the given type
pub fn values_equal(attr_type: &AttributeType, a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::List(xs), Value::List(ys)) if attr_type.is_unordered() => {
            // Multiset equality: duplicates must match in number too
            let count = |items: &[Value], v: &Value| items.iter().filter(|i| *i == v).count();
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|x| count(xs.as_slice(), x) == count(ys.as_slice(), x))
        }
        _ => a == b,
    }
}

/// Helper functions for common types
pub mod types {
    use super::*;

    /// Positive integer type
    pub fn positive_int() -> AttributeType {
        AttributeType::Custom {
            name: "PositiveInt".to_string(),
            base: Box::new(AttributeType::Int),
            validate: |value| {
                if let Value::Int(n) = value {
                    if *n > 0 {
                        Ok(())
                    } else {
                        Err("Value must be positive".to_string())
                    }
                } else {
                    Err("Expected integer".to_string())
                }
            },
        }
    }

    /// Non-empty string
    pub fn non_empty_string() -> AttributeType {
        AttributeType::Custom {
            name: "NonEmptyString".to_string(),
            base: Box::new(AttributeType::String),
            validate: |value| match value {
                Value::String(s) if s.trim().is_empty() => {
                    Err("Value must not be empty".to_string())
                }
                _ => Ok(()),
            },
        }
    }

    /// Integer constrained by a validator such as `validate_int_between::<0, 65535>`
    pub fn int_with(name: &str, validate: fn(&Value) -> Result<(), String>) -> AttributeType {
        AttributeType::Custom {
            name: name.to_string(),
            base: Box::new(AttributeType::Int),
            validate,
        }
    }

    /// String constrained by a custom validator
    pub fn string_with(name: &str, validate: fn(&Value) -> Result<(), String>) -> AttributeType {
        AttributeType::Custom {
            name: name.to_string(),
            base: Box::new(AttributeType::String),
            validate,
        }
    }

    /// Validator for an inclusive integer range
    pub fn validate_int_between<const MIN: i64, const MAX: i64>(
        value: &Value,
    ) -> Result<(), String> {
        match value {
            Value::Int(n) if (MIN..=MAX).contains(n) => Ok(()),
            Value::Int(n) => Err(format!(
                "expected value to be in the range ({} - {}), got {}",
                MIN, MAX, n
            )),
            _ => Err("Expected integer".to_string()),
        }
    }

    /// Tags: map of string to string
    pub fn tags() -> AttributeType {
        AttributeType::Map(Box::new(AttributeType::String))
    }

    /// UUID in its canonical hyphenated form
    pub fn uuid() -> AttributeType {
        string_with("Uuid", |value| {
            if let Value::String(s) = value {
                validate_uuid(s)
            } else {
                Err("Expected string".to_string())
            }
        })
    }
}

/// Validate a UUID in canonical hyphenated form (e.g., "00000000-0000-0000-0000-000000000000")
pub fn validate_uuid(s: &str) -> Result<(), String> {
    if s.len() != 36 || uuid::Uuid::try_parse(s).is_err() {
        return Err(format!("'{}' is not a valid UUID", s));
    }
    Ok(())
}
