//! Microsoft Sentinel data connectors

pub mod connector;
pub mod connectors;

use crate::framework::Registry;
use connector::{ConnectorKind, DataConnectorResource};
use connectors::*;

fn register_connector<C: ConnectorKind>(registry: &mut Registry) {
    registry.register_resource(DataConnectorResource::<C>::new());
}

pub fn register(registry: &mut Registry) {
    register_connector::<AzureActiveDirectoryConnector>(registry);
    register_connector::<AzureAdvancedThreatProtectionConnector>(registry);
    register_connector::<AzureSecurityCenterConnector>(registry);
    register_connector::<MicrosoftCloudAppSecurityConnector>(registry);
    register_connector::<ThreatIntelligenceConnector>(registry);
    register_connector::<MicrosoftThreatProtectionConnector>(registry);
    register_connector::<IotConnector>(registry);
    register_connector::<Dynamics365Connector>(registry);
    register_connector::<Office365ProjectConnector>(registry);
    register_connector::<OfficeIrmConnector>(registry);
    register_connector::<Office365Connector>(registry);
    register_connector::<OfficeAtpConnector>(registry);
    register_connector::<OfficePowerBiConnector>(registry);
    register_connector::<AwsCloudTrailConnector>(registry);
    register_connector::<MicrosoftDefenderAdvancedThreatProtectionConnector>(registry);
    register_connector::<AwsS3Connector>(registry);
    register_connector::<ThreatIntelligenceTaxiiConnector>(registry);
}
