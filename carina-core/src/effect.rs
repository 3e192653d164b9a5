//! Effect - Side effects represented as values
//!
//! An Effect describes one operation against a Provider. Effects are
//! produced by the differ, collected into a Plan, and only performed
//! when the Interpreter runs them.

use crate::resource::{Resource, ResourceId, State};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Read a data source
    Read(Resource),
    /// Create a resource that does not exist yet
    Create(Resource),
    /// Update a resource in place
    Update {
        id: ResourceId,
        from: State,
        to: Resource,
        changed: Vec<String>,
    },
    /// Delete the existing resource and create it again
    Replace {
        id: ResourceId,
        from: State,
        to: Resource,
        /// Immutable attributes whose change forces the replacement
        forced: Vec<String>,
    },
    /// Delete a resource
    Delete {
        id: ResourceId,
        identifier: String,
    },
}

impl Effect {
    /// Returns true if this effect changes remote infrastructure
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Effect::Read(_))
    }

    /// Resource this effect applies to
    pub fn resource_id(&self) -> &ResourceId {
        match self {
            Effect::Read(r) | Effect::Create(r) => &r.id,
            Effect::Update { id, .. } | Effect::Replace { id, .. } | Effect::Delete { id, .. } => {
                id
            }
        }
    }

    /// Desired resource, if this effect has one
    pub fn desired(&self) -> Option<&Resource> {
        match self {
            Effect::Read(r) | Effect::Create(r) => Some(r),
            Effect::Update { to, .. } | Effect::Replace { to, .. } => Some(to),
            Effect::Delete { .. } => None,
        }
    }

    /// Short label used in plan output
    pub fn verb(&self) -> &'static str {
        match self {
            Effect::Read(_) => "Read",
            Effect::Create(_) => "Create",
            Effect::Update { .. } => "Update",
            Effect::Replace { .. } => "Replace",
            Effect::Delete { .. } => "Delete",
        }
    }
}

impl std::fmt::Display for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Effect::Read(r) => write!(f, "Read data.{}", r.id),
            _ => write!(f, "{} {}", self.verb(), self.resource_id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_is_not_mutating() {
        let read = Effect::Read(Resource::new("azurerm_dns_zone", "main").with_read_only(true));
        assert!(!read.is_mutating());
        assert_eq!(read.to_string(), "Read data.azurerm_dns_zone.main");

        let delete = Effect::Delete {
            id: ResourceId::new("azurerm_dns_zone", "main"),
            identifier: "/subscriptions/x".to_string(),
        };
        assert!(delete.is_mutating());
        assert!(delete.desired().is_none());
        assert_eq!(delete.to_string(), "Delete azurerm_dns_zone.main");
    }
}
