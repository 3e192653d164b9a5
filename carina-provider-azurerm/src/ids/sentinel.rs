use std::fmt;

use super::{IdParseError, Parsed, ResourceId, Segment};

/// Log Analytics workspace that Sentinel is enabled on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub workspace_name: String,
}

impl WorkspaceId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        workspace_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            workspace_name: workspace_name.into(),
        }
    }
}

const WORKSPACE_SEGMENTS: [Segment; 8] = [
    Segment::Static("subscriptions"),
    Segment::User("subscriptionId"),
    Segment::Static("resourceGroups"),
    Segment::User("resourceGroupName"),
    Segment::Static("providers"),
    Segment::Static("Microsoft.OperationalInsights"),
    Segment::Static("workspaces"),
    Segment::User("workspaceName"),
];

impl ResourceId for WorkspaceId {
    const DESCRIPTION: &'static str = "Workspace";

    fn segments() -> &'static [Segment] {
        &WORKSPACE_SEGMENTS
    }

    fn from_parsed(mut parsed: Parsed) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.take("subscriptionId"),
            parsed.take("resourceGroupName"),
            parsed.take("workspaceName"),
        ))
    }
}

impl fmt::Display for WorkspaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.OperationalInsights/workspaces/{}",
            self.subscription_id, self.resource_group_name, self.workspace_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataConnectorId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub workspace_name: String,
    pub data_connector_id: String,
}

impl DataConnectorId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        workspace_name: impl Into<String>,
        data_connector_id: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            workspace_name: workspace_name.into(),
            data_connector_id: data_connector_id.into(),
        }
    }

    pub fn workspace_id(&self) -> WorkspaceId {
        WorkspaceId::new(
            self.subscription_id.clone(),
            self.resource_group_name.clone(),
            self.workspace_name.clone(),
        )
    }
}

impl ResourceId for DataConnectorId {
    const DESCRIPTION: &'static str = "Data Connector";

    fn segments() -> &'static [Segment] {
        &[
            Segment::Static("subscriptions"),
            Segment::User("subscriptionId"),
            Segment::Static("resourceGroups"),
            Segment::User("resourceGroupName"),
            Segment::Static("providers"),
            Segment::Static("Microsoft.OperationalInsights"),
            Segment::Static("workspaces"),
            Segment::User("workspaceName"),
            Segment::Static("providers"),
            Segment::Static("Microsoft.SecurityInsights"),
            Segment::Static("dataConnectors"),
            Segment::User("dataConnectorId"),
        ]
    }

    fn from_parsed(mut parsed: Parsed) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.take("subscriptionId"),
            parsed.take("resourceGroupName"),
            parsed.take("workspaceName"),
            parsed.take("dataConnectorId"),
        ))
    }
}

impl fmt::Display for DataConnectorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/providers/Microsoft.SecurityInsights/dataConnectors/{}",
            self.workspace_id(),
            self.data_connector_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WORKSPACE: &str = "/subscriptions/abc/resourceGroups/security/providers/Microsoft.OperationalInsights/workspaces/sentinel";

    #[test]
    fn workspace_id_round_trip() {
        let id = WorkspaceId::parse(WORKSPACE).unwrap();
        assert_eq!(id.workspace_name, "sentinel");
        assert_eq!(id.to_string(), WORKSPACE);
    }

    #[test]
    fn data_connector_id_round_trip() {
        let input = format!(
            "{}/providers/Microsoft.SecurityInsights/dataConnectors/aad",
            WORKSPACE
        );
        let id = DataConnectorId::parse(&input).unwrap();
        assert_eq!(id.data_connector_id, "aad");
        assert_eq!(id.workspace_id(), WorkspaceId::parse(WORKSPACE).unwrap());
        assert_eq!(id.to_string(), input);
    }

    #[test]
    fn workspace_id_is_not_a_data_connector_id() {
        assert!(matches!(
            DataConnectorId::parse(WORKSPACE),
            Err(IdParseError::SegmentCount { .. })
        ));
    }
}
