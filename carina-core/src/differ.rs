//! Differ - Compare desired state with current state to generate a Plan
//!
//! Compares the "desired state" declared in configuration with the "current
//! state" fetched from the Provider, and generates a list of required
//! Effects (Plan). Only attributes the user set are compared, so values the
//! provider computes never show up as drift.

use std::collections::HashMap;

use crate::effect::Effect;
use crate::plan::Plan;
use crate::resource::{Resource, ResourceId, State, Value};
use crate::schema::{ResourceSchema, SchemaSet, values_equal};

/// Result of a diff operation
#[derive(Debug, Clone, PartialEq)]
pub enum Diff {
    /// Resource does not exist -> needs creation
    Create(Resource),
    /// Resource exists with differences -> needs update
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed_attributes: Vec<String>,
    },
    /// Resource exists but an immutable attribute changed -> needs replacement
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        forced_attributes: Vec<String>,
    },
    /// Resource exists with no differences -> no action needed
    NoChange(ResourceId),
}

impl Diff {
    /// Returns whether this Diff involves a change
    pub fn is_change(&self) -> bool {
        !matches!(self, Diff::NoChange(_))
    }
}

/// Compare desired state with current state to compute a Diff
pub fn diff(desired: &Resource, current: &State, schema: Option<&ResourceSchema>) -> Diff {
    if !current.exists {
        return Diff::Create(desired.clone());
    }

    let changed = find_changed_attributes(&desired.attributes, &current.attributes, schema);
    if changed.is_empty() {
        return Diff::NoChange(desired.id.clone());
    }

    let forced: Vec<String> = schema
        .map(|s| s.force_new_changes(&current.attributes, &desired.attributes))
        .unwrap_or_default()
        .into_iter()
        .filter(|name| changed.contains(name))
        .collect();

    if forced.is_empty() {
        Diff::Update {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            changed_attributes: changed,
        }
    } else {
        Diff::Replace {
            id: desired.id.clone(),
            from: current.clone(),
            to: desired.clone(),
            forced_attributes: forced,
        }
    }
}

/// Find changed attributes between desired and current state
fn find_changed_attributes(
    desired: &HashMap<String, Value>,
    current: &HashMap<String, Value>,
    schema: Option<&ResourceSchema>,
) -> Vec<String> {
    let mut changed = Vec::new();

    for (key, desired_value) in desired {
        // Skip internal attributes (starting with _)
        if key.starts_with('_') {
            continue;
        }

        let equal = match (current.get(key), schema.and_then(|s| s.attributes.get(key))) {
            // Not known until apply
            _ if desired_value.contains_ref() => false,
            (Some(current_value), Some(attr)) => {
                values_equal(&attr.attr_type, desired_value, current_value)
            }
            (Some(current_value), None) => current_value == desired_value,
            (None, _) => is_empty_value(desired_value),
        };

        if !equal {
            changed.push(key.clone());
        }
    }

    changed.sort();
    changed
}

/// Empty collections are what the API reports as absent
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::List(items) => items.is_empty(),
        Value::Map(map) => map.is_empty(),
        _ => false,
    }
}

/// Compute Diff for multiple resources and generate a Plan
///
/// `desired` must already be in dependency order. Data sources become
/// `Read` effects. Entries of `managed` (resources recorded in state) that
/// no longer appear in the configuration are deleted, last recorded first.
pub fn create_plan(
    desired: &[Resource],
    current_states: &HashMap<ResourceId, State>,
    schemas: &SchemaSet,
    managed: &[(ResourceId, String)],
) -> Plan {
    let mut plan = Plan::new();

    for resource in desired {
        if resource.read_only {
            plan.add(Effect::Read(resource.clone()));
            continue;
        }

        let current = current_states
            .get(&resource.id)
            .cloned()
            .unwrap_or_else(|| State::not_found(resource.id.clone()));

        match diff(resource, &current, schemas.resource(&resource.id.resource_type)) {
            Diff::Create(r) => plan.add(Effect::Create(r)),
            Diff::Update {
                id,
                from,
                to,
                changed_attributes,
            } => plan.add(Effect::Update {
                id,
                from,
                to,
                changed: changed_attributes,
            }),
            Diff::Replace {
                id,
                from,
                to,
                forced_attributes,
            } => plan.add(Effect::Replace {
                id,
                from,
                to,
                forced: forced_attributes,
            }),
            Diff::NoChange(_) => {}
        }
    }

    for (id, identifier) in managed.iter().rev() {
        let still_declared = desired.iter().any(|r| !r.read_only && &r.id == id);
        if !still_declared {
            plan.add(Effect::Delete {
                id: id.clone(),
                identifier: identifier.clone(),
            });
        }
    }

    plan
}

/// Plan deleting every managed resource, dependents first
///
/// `managed` is in creation order, so it is walked backwards.
pub fn destroy_plan(managed: &[(ResourceId, String)]) -> Plan {
    let mut plan = Plan::new();
    for (id, identifier) in managed.iter().rev() {
        plan.add(Effect::Delete {
            id: id.clone(),
            identifier: identifier.clone(),
        });
    }
    plan
}
