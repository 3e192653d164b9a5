//! Dependency ordering and reference resolution
//!
//! Resources reference each other through `Value::ResourceRef`. Before a
//! plan is built the resources are ordered so that every resource comes
//! after the ones it references, and references are replaced with the
//! values known from state or from earlier apply results.

use std::collections::{HashMap, HashSet};

use crate::resource::{Resource, Value};

/// Attribute values known for each binding (e.g. "azurerm_dns_zone.main")
pub type Bindings = HashMap<String, HashMap<String, Value>>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DependencyError {
    #[error("Dependency cycle: {}", .0.join(" -> "))]
    Cycle(Vec<String>),

    #[error("{from} references unknown resource '{to}'")]
    UnknownReference { from: String, to: String },
}

/// Sort resources so that dependencies come first
///
/// The relative order of independent resources is preserved.
pub fn sort_resources(resources: &[Resource]) -> Result<Vec<Resource>, DependencyError> {
    let by_binding: HashMap<String, &Resource> =
        resources.iter().map(|r| (r.binding(), r)).collect();

    for resource in resources {
        for dep in resource.dependencies() {
            if !by_binding.contains_key(&dep) {
                return Err(DependencyError::UnknownReference {
                    from: resource.binding(),
                    to: dep,
                });
            }
        }
    }

    let mut sorted = Vec::with_capacity(resources.len());
    let mut visited: HashSet<String> = HashSet::new();
    let mut visiting: Vec<String> = Vec::new();

    fn visit(
        resource: &Resource,
        by_binding: &HashMap<String, &Resource>,
        visited: &mut HashSet<String>,
        visiting: &mut Vec<String>,
        sorted: &mut Vec<Resource>,
    ) -> Result<(), DependencyError> {
        let binding = resource.binding();
        if visited.contains(&binding) {
            return Ok(());
        }
        if let Some(pos) = visiting.iter().position(|b| b == &binding) {
            let mut cycle = visiting[pos..].to_vec();
            cycle.push(binding);
            return Err(DependencyError::Cycle(cycle));
        }

        visiting.push(binding.clone());
        for dep in resource.dependencies() {
            if let Some(dep_resource) = by_binding.get(&dep) {
                visit(dep_resource, by_binding, visited, visiting, sorted)?;
            }
        }
        visiting.pop();

        visited.insert(binding);
        sorted.push(resource.clone());
        Ok(())
    }

    for resource in resources {
        visit(
            resource,
            &by_binding,
            &mut visited,
            &mut visiting,
            &mut sorted,
        )?;
    }

    Ok(sorted)
}

/// Replace references with known values; unknown references are kept as-is
pub fn resolve_value(value: &Value, bindings: &Bindings) -> Value {
    match value {
        Value::ResourceRef(binding, attr) => {
            if let Some(attrs) = bindings.get(binding)
                && let Some(attr_value) = attrs.get(attr)
            {
                return resolve_value(attr_value, bindings);
            }
            value.clone()
        }
        Value::List(items) => Value::List(items.iter().map(|v| resolve_value(v, bindings)).collect()),
        Value::Map(map) => Value::Map(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve_value(v, bindings)))
                .collect(),
        ),
        _ => value.clone(),
    }
}

/// Resolve every attribute of a resource
pub fn resolve_resource(resource: &Resource, bindings: &Bindings) -> Resource {
    let mut resolved = resource.clone();
    for (key, value) in &resource.attributes {
        resolved
            .attributes
            .insert(key.clone(), resolve_value(value, bindings));
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone_ref(attr: &str) -> Value {
        Value::ResourceRef("azurerm_dns_zone.main".to_string(), attr.to_string())
    }

    #[test]
    fn dependencies_come_first() {
        let record = Resource::new("azurerm_dns_a_record", "www")
            .with_attribute("dns_zone_id", zone_ref("id"));
        let zone = Resource::new("azurerm_dns_zone", "main");

        let sorted = sort_resources(&[record, zone]).unwrap();
        let order: Vec<String> = sorted.iter().map(|r| r.binding()).collect();
        assert_eq!(order, vec!["azurerm_dns_zone.main", "azurerm_dns_a_record.www"]);
    }

    #[test]
    fn cycles_are_reported() {
        let a = Resource::new("t", "a").with_attribute(
            "x",
            Value::ResourceRef("t.b".to_string(), "id".to_string()),
        );
        let b = Resource::new("t", "b").with_attribute(
            "x",
            Value::ResourceRef("t.a".to_string(), "id".to_string()),
        );

        let err = sort_resources(&[a, b]).unwrap_err();
        assert_eq!(
            err,
            DependencyError::Cycle(vec!["t.a".to_string(), "t.b".to_string(), "t.a".to_string()])
        );
    }

    #[test]
    fn unknown_references_are_reported() {
        let record = Resource::new("azurerm_dns_a_record", "www")
            .with_attribute("dns_zone_id", zone_ref("id"));
        assert!(matches!(
            sort_resources(&[record]),
            Err(DependencyError::UnknownReference { .. })
        ));
    }

    #[test]
    fn resolve_nested_references() {
        let mut bindings = Bindings::new();
        let mut zone = HashMap::new();
        zone.insert("id".to_string(), Value::String("/zones/example.com".to_string()));
        bindings.insert("azurerm_dns_zone.main".to_string(), zone);

        let value = Value::List(vec![zone_ref("id"), zone_ref("missing")]);
        assert_eq!(
            resolve_value(&value, &bindings),
            Value::List(vec![
                Value::String("/zones/example.com".to_string()),
                zone_ref("missing"),
            ])
        );
    }
}
