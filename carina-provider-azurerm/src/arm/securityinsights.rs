//! `Microsoft.SecurityInsights/dataConnectors` models and client
//!
//! A data connector is polymorphic: the `kind` field selects the shape of
//! `properties`. Known kinds decode into a typed variant, anything else is
//! kept as raw JSON so a connector created outside Carina can still be read
//! and reported. The `kind` tag alone decides the kind: a known kind whose
//! properties do not fit the typed model is kept raw but keeps its kind.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use super::{ArmError, SharedClient, to_body};
use crate::ids::DataConnectorId;

pub const API_VERSION: &str = "2022-10-01-preview";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataTypeState {
    Enabled,
    Disabled,
}

impl DataTypeState {
    pub fn from_enabled(enabled: bool) -> Self {
        if enabled {
            DataTypeState::Enabled
        } else {
            DataTypeState::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        *self == DataTypeState::Enabled
    }
}

/// `{"state": "Enabled"}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataTypeToggle {
    pub state: DataTypeState,
}

impl DataTypeToggle {
    pub fn new(enabled: bool) -> Self {
        Self {
            state: DataTypeState::from_enabled(enabled),
        }
    }

    pub fn enabled(&self) -> bool {
        self.state.is_enabled()
    }
}

// =============================================================================
// Data types per connector family
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertsDataTypes {
    pub alerts: DataTypeToggle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McasDataTypes {
    pub alerts: DataTypeToggle,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discovery_logs: Option<DataTypeToggle>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentsDataTypes {
    pub incidents: DataTypeToggle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dynamics365DataTypes {
    #[serde(rename = "dynamics365CdsActivities")]
    pub dynamics365_cds_activities: DataTypeToggle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfficeDataTypes {
    pub exchange: DataTypeToggle,
    pub share_point: DataTypeToggle,
    pub teams: DataTypeToggle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogsDataTypes {
    pub logs: DataTypeToggle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorsDataTypes {
    pub indicators: DataTypeToggle,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxiiDataTypes {
    pub taxii_client: DataTypeToggle,
}

// =============================================================================
// Properties
// =============================================================================

/// Properties of connectors scoped to an Azure AD tenant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantScoped<D> {
    pub tenant_id: String,
    pub data_types: D,
}

/// Properties of connectors scoped to a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionScoped<D> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    pub data_types: D,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatIntelligenceProperties {
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tip_lookback_period: Option<String>,
    pub data_types: IndicatorsDataTypes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaxiiProperties {
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_id: Option<String>,
    pub friendly_name: String,
    pub taxii_server: String,
    pub collection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    /// Write-only: the API never returns it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    pub polling_frequency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub taxii_lookback_period: Option<String>,
    pub data_types: TaxiiDataTypes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsCloudTrailProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aws_role_arn: Option<String>,
    pub data_types: LogsDataTypes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AwsS3Properties {
    pub destination_table: String,
    pub role_arn: String,
    pub sqs_urls: Vec<String>,
    pub data_types: LogsDataTypes,
}

/// The ARM envelope shared by every kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorBody<P> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    pub properties: P,
}

impl<P> ConnectorBody<P> {
    pub fn new(properties: P) -> Self {
        Self {
            id: None,
            name: None,
            resource_type: None,
            etag: None,
            properties,
        }
    }
}

macro_rules! data_connectors {
    ($($variant:ident => $wire:literal, $properties:ty;)+) => {
        /// Data connector kinds, named as on the wire
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum DataConnectorKind {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl DataConnectorKind {
            pub const ALL: &'static [DataConnectorKind] = &[$(DataConnectorKind::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(DataConnectorKind::$variant => $wire,)+
                }
            }
        }

        /// A connector whose kind is known, with typed properties
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind")]
        pub enum KnownDataConnector {
            $(
                #[serde(rename = $wire)]
                $variant(ConnectorBody<$properties>),
            )+
        }

        impl KnownDataConnector {
            pub fn kind(&self) -> DataConnectorKind {
                match self {
                    $(KnownDataConnector::$variant(_) => DataConnectorKind::$variant,)+
                }
            }

            pub fn etag(&self) -> Option<&str> {
                match self {
                    $(KnownDataConnector::$variant(body) => body.etag.as_deref(),)+
                }
            }

            pub fn id(&self) -> Option<&str> {
                match self {
                    $(KnownDataConnector::$variant(body) => body.id.as_deref(),)+
                }
            }

            /// Carry the etag of the stored connector so a PUT replaces it
            pub fn set_etag(&mut self, etag: Option<String>) {
                match self {
                    $(KnownDataConnector::$variant(body) => body.etag = etag,)+
                }
            }
        }
    };
}

data_connectors! {
    AzureActiveDirectory => "AzureActiveDirectory", TenantScoped<AlertsDataTypes>;
    AzureAdvancedThreatProtection => "AzureAdvancedThreatProtection", TenantScoped<AlertsDataTypes>;
    AzureSecurityCenter => "AzureSecurityCenter", SubscriptionScoped<AlertsDataTypes>;
    MicrosoftCloudAppSecurity => "MicrosoftCloudAppSecurity", TenantScoped<McasDataTypes>;
    ThreatIntelligence => "ThreatIntelligence", ThreatIntelligenceProperties;
    MicrosoftThreatProtection => "MicrosoftThreatProtection", TenantScoped<IncidentsDataTypes>;
    Iot => "IOT", SubscriptionScoped<AlertsDataTypes>;
    Dynamics365 => "Dynamics365", TenantScoped<Dynamics365DataTypes>;
    Office365Project => "Office365Project", TenantScoped<LogsDataTypes>;
    OfficeIrm => "OfficeIRM", TenantScoped<AlertsDataTypes>;
    Office365 => "Office365", TenantScoped<OfficeDataTypes>;
    OfficeAtp => "OfficeATP", TenantScoped<AlertsDataTypes>;
    OfficePowerBi => "OfficePowerBI", TenantScoped<LogsDataTypes>;
    AmazonWebServicesCloudTrail => "AmazonWebServicesCloudTrail", AwsCloudTrailProperties;
    MicrosoftDefenderAdvancedThreatProtection => "MicrosoftDefenderAdvancedThreatProtection", TenantScoped<AlertsDataTypes>;
    AmazonWebServicesS3 => "AmazonWebServicesS3", AwsS3Properties;
    ThreatIntelligenceTaxii => "ThreatIntelligenceTaxii", TaxiiProperties;
}

impl fmt::Display for DataConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataConnectorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataConnectorKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown data connector kind {:?}", s))
    }
}

/// A connector kept as JSON: an unmodelled kind, or a known kind whose
/// payload did not decode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDataConnector {
    #[serde(default)]
    pub kind: String,
    #[serde(flatten)]
    pub rest: serde_json::Map<String, serde_json::Value>,
    /// Kind from the tag, when it names a known kind
    #[serde(skip)]
    pub known_kind: Option<DataConnectorKind>,
    /// Why the typed decode failed
    #[serde(skip)]
    pub decode_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DataConnector {
    Known(KnownDataConnector),
    Other(RawDataConnector),
}

impl<'de> Deserialize<'de> for DataConnector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(deserializer)?;
        let known_kind = value
            .get("kind")
            .and_then(|k| k.as_str())
            .and_then(|k| k.parse::<DataConnectorKind>().ok());

        let mut decode_error = None;
        if known_kind.is_some() {
            match KnownDataConnector::deserialize(&value) {
                Ok(known) => return Ok(DataConnector::Known(known)),
                Err(e) => {
                    log::debug!("data connector payload kept raw: {}", e);
                    decode_error = Some(e.to_string());
                }
            }
        }

        let mut raw = RawDataConnector::deserialize(value).map_err(D::Error::custom)?;
        raw.known_kind = known_kind;
        raw.decode_error = decode_error;
        Ok(DataConnector::Other(raw))
    }
}

impl DataConnector {
    pub fn kind(&self) -> Option<DataConnectorKind> {
        match self {
            DataConnector::Known(known) => Some(known.kind()),
            DataConnector::Other(raw) => raw.known_kind,
        }
    }

    /// Kind as reported by the API, including unknown ones
    pub fn kind_name(&self) -> &str {
        match self {
            DataConnector::Known(known) => known.kind().as_str(),
            DataConnector::Other(raw) => &raw.kind,
        }
    }

    /// Why a connector of a known kind has no typed payload
    pub fn decode_error(&self) -> Option<&str> {
        match self {
            DataConnector::Known(_) => None,
            DataConnector::Other(raw) => raw.decode_error.as_deref(),
        }
    }

    pub fn etag(&self) -> Option<&str> {
        match self {
            DataConnector::Known(known) => known.etag(),
            DataConnector::Other(raw) => raw.rest.get("etag").and_then(|e| e.as_str()),
        }
    }
}

impl From<KnownDataConnector> for DataConnector {
    fn from(known: KnownDataConnector) -> Self {
        DataConnector::Known(known)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Sentinel Data Connector has mismatched kind, expected: {expected:?}, got {got:?}")]
pub struct KindMismatch {
    pub expected: String,
    pub got: String,
}

/// Check that a connector is of the kind a handler manages
///
/// Connectors of unrecognised kinds never match and report `got ""`.
pub fn assert_data_connector_kind(
    connector: &DataConnector,
    expected: DataConnectorKind,
) -> Result<(), KindMismatch> {
    match connector.kind() {
        Some(kind) if kind == expected => Ok(()),
        kind => Err(KindMismatch {
            expected: expected.as_str().to_string(),
            got: kind.map(|k| k.as_str().to_string()).unwrap_or_default(),
        }),
    }
}

#[derive(Clone)]
pub struct DataConnectorsClient {
    client: SharedClient,
}

impl DataConnectorsClient {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &DataConnectorId) -> Result<DataConnector, ArmError> {
        self.client.get(&id.to_string(), API_VERSION).await?.json()
    }

    pub async fn create_or_update(
        &self,
        id: &DataConnectorId,
        connector: &DataConnector,
    ) -> Result<DataConnector, ArmError> {
        self.client
            .put(&id.to_string(), API_VERSION, &to_body(connector)?)
            .await?
            .json()
    }

    pub async fn delete(&self, id: &DataConnectorId) -> Result<(), ArmError> {
        self.client.delete(&id.to_string(), API_VERSION).await?;
        Ok(())
    }
}
