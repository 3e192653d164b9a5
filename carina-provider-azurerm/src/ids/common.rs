use std::fmt;

use super::{IdParseError, Parsed, ResourceId, Segment};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionId {
    pub subscription_id: String,
}

impl SubscriptionId {
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
        }
    }
}

impl ResourceId for SubscriptionId {
    const DESCRIPTION: &'static str = "Subscription";

    fn segments() -> &'static [Segment] {
        &[Segment::Static("subscriptions"), Segment::User("subscriptionId")]
    }

    fn from_parsed(mut parsed: Parsed) -> Result<Self, IdParseError> {
        Ok(Self::new(parsed.take("subscriptionId")))
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/subscriptions/{}", self.subscription_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceGroupId {
    pub subscription_id: String,
    pub resource_group_name: String,
}

impl ResourceGroupId {
    pub fn new(subscription_id: impl Into<String>, resource_group_name: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
        }
    }
}

impl ResourceId for ResourceGroupId {
    const DESCRIPTION: &'static str = "Resource Group";

    fn segments() -> &'static [Segment] {
        &[
            Segment::Static("subscriptions"),
            Segment::User("subscriptionId"),
            Segment::Static("resourceGroups"),
            Segment::User("resourceGroupName"),
        ]
    }

    fn from_parsed(mut parsed: Parsed) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.take("subscriptionId"),
            parsed.take("resourceGroupName"),
        ))
    }
}

impl fmt::Display for ResourceGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}",
            self.subscription_id, self.resource_group_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UserAssignedIdentityId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub user_assigned_identity_name: String,
}

impl UserAssignedIdentityId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        user_assigned_identity_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            user_assigned_identity_name: user_assigned_identity_name.into(),
        }
    }
}

impl ResourceId for UserAssignedIdentityId {
    const DESCRIPTION: &'static str = "User Assigned Identity";

    fn segments() -> &'static [Segment] {
        &[
            Segment::Static("subscriptions"),
            Segment::User("subscriptionId"),
            Segment::Static("resourceGroups"),
            Segment::User("resourceGroupName"),
            Segment::Static("providers"),
            Segment::Static("Microsoft.ManagedIdentity"),
            Segment::Static("userAssignedIdentities"),
            Segment::User("userAssignedIdentityName"),
        ]
    }

    fn from_parsed(mut parsed: Parsed) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.take("subscriptionId"),
            parsed.take("resourceGroupName"),
            parsed.take("userAssignedIdentityName"),
        ))
    }
}

impl fmt::Display for UserAssignedIdentityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.ManagedIdentity/userAssignedIdentities/{}",
            self.subscription_id, self.resource_group_name, self.user_assigned_identity_name
        )
    }
}
