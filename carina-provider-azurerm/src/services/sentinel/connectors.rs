//! Settings of each data connector kind

use carina_core::provider::ProviderResult;
use carina_core::resource::Value;
use carina_core::schema::{AttributeSchema, AttributeType, types};
use serde::{Deserialize, Serialize};

use super::connector::{ConnectorKind, subscription_or_default, tenant_or_default};
use crate::arm::securityinsights::{
    AlertsDataTypes, AwsCloudTrailProperties, AwsS3Properties, ConnectorBody, DataConnectorKind,
    DataTypeToggle, Dynamics365DataTypes, IncidentsDataTypes, IndicatorsDataTypes,
    KnownDataConnector, LogsDataTypes, McasDataTypes, OfficeDataTypes, SubscriptionScoped,
    TaxiiDataTypes, TaxiiProperties, TenantScoped, ThreatIntelligenceProperties,
};
use crate::framework::Clients;

/// Look back from the start of time unless told otherwise
const DEFAULT_LOOKBACK_DATE: &str = "1970-01-01T00:00:00Z";

const DEFAULT_POLLING_FREQUENCY: &str = "OnceAnHour";

fn enabled() -> bool {
    true
}

fn tenant_id_argument() -> AttributeSchema {
    AttributeSchema::new("tenant_id", types::uuid())
        .optional()
        .computed()
        .force_new()
        .with_description("Defaults to the tenant of the provider credentials")
}

fn subscription_id_argument() -> AttributeSchema {
    AttributeSchema::new("subscription_id", types::uuid())
        .optional()
        .computed()
        .force_new()
        .with_description("Defaults to the provider subscription")
}

fn toggle_argument(name: &str) -> AttributeSchema {
    AttributeSchema::new(name, AttributeType::Bool)
        .optional()
        .with_default(Value::Bool(true))
}

fn validate_aws_role_arn(value: &Value) -> Result<(), String> {
    match value {
        Value::String(s) if s.starts_with("arn:aws:iam::") && s.contains(":role/") => Ok(()),
        Value::String(s) => Err(format!("{:?} is not an AWS IAM role ARN", s)),
        _ => Err("Expected string".to_string()),
    }
}

fn aws_role_arn_argument() -> AttributeSchema {
    AttributeSchema::new(
        "aws_role_arn",
        types::string_with("AwsRoleArn", validate_aws_role_arn),
    )
    .required()
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TenantSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SubscriptionSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
}

/// Connectors scoped to a tenant whose one data type is always enabled
macro_rules! tenant_connectors {
    ($($marker:ident => $variant:ident, $resource_type:literal, $data_types:expr;)+) => {
        $(
            pub struct $marker;

            impl ConnectorKind for $marker {
                type Settings = TenantSettings;
                const KIND: DataConnectorKind = DataConnectorKind::$variant;
                const RESOURCE_TYPE: &'static str = $resource_type;

                fn arguments() -> Vec<AttributeSchema> {
                    vec![tenant_id_argument()]
                }

                fn build(
                    settings: &TenantSettings,
                    clients: &Clients,
                ) -> ProviderResult<KnownDataConnector> {
                    Ok(KnownDataConnector::$variant(ConnectorBody::new(TenantScoped {
                        tenant_id: tenant_or_default(&settings.tenant_id, clients)?,
                        data_types: $data_types,
                    })))
                }

                fn flatten(connector: KnownDataConnector) -> Option<TenantSettings> {
                    match connector {
                        KnownDataConnector::$variant(body) => Some(TenantSettings {
                            tenant_id: Some(body.properties.tenant_id),
                        }),
                        _ => None,
                    }
                }
            }
        )+
    };
}

tenant_connectors! {
    AzureActiveDirectoryConnector => AzureActiveDirectory,
        "azurerm_sentinel_data_connector_azure_active_directory",
        AlertsDataTypes { alerts: DataTypeToggle::new(true) };
    AzureAdvancedThreatProtectionConnector => AzureAdvancedThreatProtection,
        "azurerm_sentinel_data_connector_azure_advanced_threat_protection",
        AlertsDataTypes { alerts: DataTypeToggle::new(true) };
    MicrosoftThreatProtectionConnector => MicrosoftThreatProtection,
        "azurerm_sentinel_data_connector_microsoft_threat_protection",
        IncidentsDataTypes { incidents: DataTypeToggle::new(true) };
    Dynamics365Connector => Dynamics365,
        "azurerm_sentinel_data_connector_dynamics_365",
        Dynamics365DataTypes { dynamics365_cds_activities: DataTypeToggle::new(true) };
    Office365ProjectConnector => Office365Project,
        "azurerm_sentinel_data_connector_office_365_project",
        LogsDataTypes { logs: DataTypeToggle::new(true) };
    OfficeIrmConnector => OfficeIrm,
        "azurerm_sentinel_data_connector_office_irm",
        AlertsDataTypes { alerts: DataTypeToggle::new(true) };
    OfficeAtpConnector => OfficeAtp,
        "azurerm_sentinel_data_connector_office_atp",
        AlertsDataTypes { alerts: DataTypeToggle::new(true) };
    OfficePowerBiConnector => OfficePowerBi,
        "azurerm_sentinel_data_connector_office_power_bi",
        LogsDataTypes { logs: DataTypeToggle::new(true) };
    MicrosoftDefenderAdvancedThreatProtectionConnector => MicrosoftDefenderAdvancedThreatProtection,
        "azurerm_sentinel_data_connector_microsoft_defender_advanced_threat_protection",
        AlertsDataTypes { alerts: DataTypeToggle::new(true) };
}

/// Subscription-scoped connectors streaming alerts
macro_rules! subscription_connectors {
    ($($marker:ident => $variant:ident, $resource_type:literal;)+) => {
        $(
            pub struct $marker;

            impl ConnectorKind for $marker {
                type Settings = SubscriptionSettings;
                const KIND: DataConnectorKind = DataConnectorKind::$variant;
                const RESOURCE_TYPE: &'static str = $resource_type;

                fn arguments() -> Vec<AttributeSchema> {
                    vec![subscription_id_argument()]
                }

                fn build(
                    settings: &SubscriptionSettings,
                    clients: &Clients,
                ) -> ProviderResult<KnownDataConnector> {
                    Ok(KnownDataConnector::$variant(ConnectorBody::new(SubscriptionScoped {
                        subscription_id: Some(subscription_or_default(&settings.subscription_id, clients)),
                        data_types: AlertsDataTypes { alerts: DataTypeToggle::new(true) },
                    })))
                }

                fn flatten(connector: KnownDataConnector) -> Option<SubscriptionSettings> {
                    match connector {
                        KnownDataConnector::$variant(body) => Some(SubscriptionSettings {
                            subscription_id: body.properties.subscription_id,
                        }),
                        _ => None,
                    }
                }
            }
        )+
    };
}

subscription_connectors! {
    AzureSecurityCenterConnector => AzureSecurityCenter,
        "azurerm_sentinel_data_connector_azure_security_center";
    IotConnector => Iot, "azurerm_sentinel_data_connector_iot";
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CloudAppSecuritySettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default = "enabled")]
    pub alerts_enabled: bool,
    #[serde(default = "enabled")]
    pub discovery_logs_enabled: bool,
}

pub struct MicrosoftCloudAppSecurityConnector;

impl ConnectorKind for MicrosoftCloudAppSecurityConnector {
    type Settings = CloudAppSecuritySettings;
    const KIND: DataConnectorKind = DataConnectorKind::MicrosoftCloudAppSecurity;
    const RESOURCE_TYPE: &'static str = "azurerm_sentinel_data_connector_microsoft_cloud_app_security";
    const UPDATABLE: bool = true;

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            tenant_id_argument(),
            toggle_argument("alerts_enabled"),
            toggle_argument("discovery_logs_enabled"),
        ]
    }

    fn validate(settings: &CloudAppSecuritySettings) -> Result<(), String> {
        if !settings.alerts_enabled && !settings.discovery_logs_enabled {
            return Err(
                "at least one of `alerts_enabled` or `discovery_logs_enabled` must be true"
                    .to_string(),
            );
        }
        Ok(())
    }

    fn build(
        settings: &CloudAppSecuritySettings,
        clients: &Clients,
    ) -> ProviderResult<KnownDataConnector> {
        Ok(KnownDataConnector::MicrosoftCloudAppSecurity(
            ConnectorBody::new(TenantScoped {
                tenant_id: tenant_or_default(&settings.tenant_id, clients)?,
                data_types: McasDataTypes {
                    alerts: DataTypeToggle::new(settings.alerts_enabled),
                    discovery_logs: Some(DataTypeToggle::new(settings.discovery_logs_enabled)),
                },
            }),
        ))
    }

    fn flatten(connector: KnownDataConnector) -> Option<CloudAppSecuritySettings> {
        match connector {
            KnownDataConnector::MicrosoftCloudAppSecurity(body) => {
                let data_types = body.properties.data_types;
                Some(CloudAppSecuritySettings {
                    tenant_id: Some(body.properties.tenant_id),
                    alerts_enabled: data_types.alerts.enabled(),
                    discovery_logs_enabled: data_types
                        .discovery_logs
                        .is_some_and(|t| t.enabled()),
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Office365Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default = "enabled")]
    pub exchange_enabled: bool,
    #[serde(default = "enabled")]
    pub sharepoint_enabled: bool,
    #[serde(default = "enabled")]
    pub teams_enabled: bool,
}

pub struct Office365Connector;

impl ConnectorKind for Office365Connector {
    type Settings = Office365Settings;
    const KIND: DataConnectorKind = DataConnectorKind::Office365;
    const RESOURCE_TYPE: &'static str = "azurerm_sentinel_data_connector_office_365";
    const UPDATABLE: bool = true;

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            tenant_id_argument(),
            toggle_argument("exchange_enabled"),
            toggle_argument("sharepoint_enabled"),
            toggle_argument("teams_enabled"),
        ]
    }

    fn validate(settings: &Office365Settings) -> Result<(), String> {
        if !(settings.exchange_enabled || settings.sharepoint_enabled || settings.teams_enabled) {
            return Err(
                "at least one of `exchange_enabled`, `sharepoint_enabled` or `teams_enabled` must be true"
                    .to_string(),
            );
        }
        Ok(())
    }

    fn build(settings: &Office365Settings, clients: &Clients) -> ProviderResult<KnownDataConnector> {
        Ok(KnownDataConnector::Office365(ConnectorBody::new(
            TenantScoped {
                tenant_id: tenant_or_default(&settings.tenant_id, clients)?,
                data_types: OfficeDataTypes {
                    exchange: DataTypeToggle::new(settings.exchange_enabled),
                    share_point: DataTypeToggle::new(settings.sharepoint_enabled),
                    teams: DataTypeToggle::new(settings.teams_enabled),
                },
            },
        )))
    }

    fn flatten(connector: KnownDataConnector) -> Option<Office365Settings> {
        match connector {
            KnownDataConnector::Office365(body) => {
                let data_types = body.properties.data_types;
                Some(Office365Settings {
                    tenant_id: Some(body.properties.tenant_id),
                    exchange_enabled: data_types.exchange.enabled(),
                    sharepoint_enabled: data_types.share_point.enabled(),
                    teams_enabled: data_types.teams.enabled(),
                })
            }
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ThreatIntelligenceSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback_date: Option<String>,
}

pub struct ThreatIntelligenceConnector;

impl ConnectorKind for ThreatIntelligenceConnector {
    type Settings = ThreatIntelligenceSettings;
    const KIND: DataConnectorKind = DataConnectorKind::ThreatIntelligence;
    const RESOURCE_TYPE: &'static str = "azurerm_sentinel_data_connector_threat_intelligence";

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            tenant_id_argument(),
            AttributeSchema::new("lookback_date", types::non_empty_string())
                .optional()
                .force_new()
                .with_default(Value::String(DEFAULT_LOOKBACK_DATE.to_string())),
        ]
    }

    fn build(
        settings: &ThreatIntelligenceSettings,
        clients: &Clients,
    ) -> ProviderResult<KnownDataConnector> {
        Ok(KnownDataConnector::ThreatIntelligence(ConnectorBody::new(
            ThreatIntelligenceProperties {
                tenant_id: tenant_or_default(&settings.tenant_id, clients)?,
                tip_lookback_period: Some(
                    settings
                        .lookback_date
                        .clone()
                        .unwrap_or_else(|| DEFAULT_LOOKBACK_DATE.to_string()),
                ),
                data_types: IndicatorsDataTypes {
                    indicators: DataTypeToggle::new(true),
                },
            },
        )))
    }

    fn flatten(connector: KnownDataConnector) -> Option<ThreatIntelligenceSettings> {
        match connector {
            KnownDataConnector::ThreatIntelligence(body) => Some(ThreatIntelligenceSettings {
                tenant_id: Some(body.properties.tenant_id),
                lookback_date: body.properties.tip_lookback_period,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AwsCloudTrailSettings {
    pub aws_role_arn: String,
}

pub struct AwsCloudTrailConnector;

impl ConnectorKind for AwsCloudTrailConnector {
    type Settings = AwsCloudTrailSettings;
    const KIND: DataConnectorKind = DataConnectorKind::AmazonWebServicesCloudTrail;
    const RESOURCE_TYPE: &'static str = "azurerm_sentinel_data_connector_aws_cloud_trail";
    const UPDATABLE: bool = true;

    fn arguments() -> Vec<AttributeSchema> {
        vec![aws_role_arn_argument()]
    }

    fn build(settings: &AwsCloudTrailSettings, _: &Clients) -> ProviderResult<KnownDataConnector> {
        Ok(KnownDataConnector::AmazonWebServicesCloudTrail(
            ConnectorBody::new(AwsCloudTrailProperties {
                aws_role_arn: Some(settings.aws_role_arn.clone()),
                data_types: LogsDataTypes {
                    logs: DataTypeToggle::new(true),
                },
            }),
        ))
    }

    fn flatten(connector: KnownDataConnector) -> Option<AwsCloudTrailSettings> {
        match connector {
            KnownDataConnector::AmazonWebServicesCloudTrail(body) => Some(AwsCloudTrailSettings {
                aws_role_arn: body.properties.aws_role_arn.unwrap_or_default(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AwsS3Settings {
    pub aws_role_arn: String,
    pub destination_table: String,
    pub sqs_urls: Vec<String>,
}

pub struct AwsS3Connector;

impl ConnectorKind for AwsS3Connector {
    type Settings = AwsS3Settings;
    const KIND: DataConnectorKind = DataConnectorKind::AmazonWebServicesS3;
    const RESOURCE_TYPE: &'static str = "azurerm_sentinel_data_connector_aws_s3";
    const UPDATABLE: bool = true;

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            aws_role_arn_argument(),
            AttributeSchema::new("destination_table", types::non_empty_string()).required(),
            AttributeSchema::new(
                "sqs_urls",
                AttributeType::List(Box::new(types::non_empty_string())),
            )
            .required(),
        ]
    }

    fn validate(settings: &AwsS3Settings) -> Result<(), String> {
        if settings.sqs_urls.is_empty() {
            return Err("`sqs_urls` must contain at least one URL".to_string());
        }
        Ok(())
    }

    fn build(settings: &AwsS3Settings, _: &Clients) -> ProviderResult<KnownDataConnector> {
        Ok(KnownDataConnector::AmazonWebServicesS3(ConnectorBody::new(
            AwsS3Properties {
                destination_table: settings.destination_table.clone(),
                role_arn: settings.aws_role_arn.clone(),
                sqs_urls: settings.sqs_urls.clone(),
                data_types: LogsDataTypes {
                    logs: DataTypeToggle::new(true),
                },
            },
        )))
    }

    fn flatten(connector: KnownDataConnector) -> Option<AwsS3Settings> {
        match connector {
            KnownDataConnector::AmazonWebServicesS3(body) => Some(AwsS3Settings {
                aws_role_arn: body.properties.role_arn,
                destination_table: body.properties.destination_table,
                sqs_urls: body.properties.sqs_urls,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TaxiiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
    pub display_name: String,
    pub api_root_url: String,
    pub collection_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default = "default_polling_frequency")]
    pub polling_frequency: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookback_date: Option<String>,
}

fn default_polling_frequency() -> String {
    DEFAULT_POLLING_FREQUENCY.to_string()
}

pub struct ThreatIntelligenceTaxiiConnector;

impl ConnectorKind for ThreatIntelligenceTaxiiConnector {
    type Settings = TaxiiSettings;
    const KIND: DataConnectorKind = DataConnectorKind::ThreatIntelligenceTaxii;
    const RESOURCE_TYPE: &'static str = "azurerm_sentinel_data_connector_threat_intelligence_taxii";
    const UPDATABLE: bool = true;

    fn arguments() -> Vec<AttributeSchema> {
        vec![
            tenant_id_argument(),
            AttributeSchema::new("display_name", types::non_empty_string()).required(),
            AttributeSchema::new("api_root_url", types::non_empty_string()).required(),
            AttributeSchema::new("collection_id", types::non_empty_string()).required(),
            AttributeSchema::new("user_name", types::non_empty_string()).optional(),
            AttributeSchema::new("password", types::non_empty_string())
                .optional()
                .sensitive(),
            AttributeSchema::new(
                "polling_frequency",
                AttributeType::Enum(vec![
                    "OnceAMinute".to_string(),
                    "OnceAnHour".to_string(),
                    "OnceADay".to_string(),
                ]),
            )
            .optional()
            .with_default(Value::String(DEFAULT_POLLING_FREQUENCY.to_string())),
            AttributeSchema::new("lookback_date", types::non_empty_string()).optional(),
        ]
    }

    fn validate(settings: &TaxiiSettings) -> Result<(), String> {
        if settings.password.is_some() && settings.user_name.is_none() {
            return Err("`password` requires `user_name`".to_string());
        }
        Ok(())
    }

    fn build(settings: &TaxiiSettings, clients: &Clients) -> ProviderResult<KnownDataConnector> {
        Ok(KnownDataConnector::ThreatIntelligenceTaxii(
            ConnectorBody::new(TaxiiProperties {
                tenant_id: tenant_or_default(&settings.tenant_id, clients)?,
                workspace_id: None,
                friendly_name: settings.display_name.clone(),
                taxii_server: settings.api_root_url.clone(),
                collection_id: settings.collection_id.clone(),
                user_name: settings.user_name.clone(),
                password: settings.password.clone(),
                polling_frequency: settings.polling_frequency.clone(),
                taxii_lookback_period: settings.lookback_date.clone(),
                data_types: TaxiiDataTypes {
                    taxii_client: DataTypeToggle::new(true),
                },
            }),
        ))
    }

    fn flatten(connector: KnownDataConnector) -> Option<TaxiiSettings> {
        match connector {
            KnownDataConnector::ThreatIntelligenceTaxii(body) => {
                let properties = body.properties;
                Some(TaxiiSettings {
                    tenant_id: Some(properties.tenant_id),
                    display_name: properties.friendly_name,
                    api_root_url: properties.taxii_server,
                    collection_id: properties.collection_id,
                    user_name: properties.user_name,
                    password: properties.password,
                    polling_frequency: properties.polling_frequency,
                    lookback_date: properties.taxii_lookback_period,
                })
            }
            _ => None,
        }
    }
}
