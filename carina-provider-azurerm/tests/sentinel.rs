use std::sync::Arc;

use carina_core::provider::{ErrorKind, Provider};
use carina_core::resource::{Resource, ResourceId, Value};
use carina_provider_azurerm::{AzureRmProvider, Clients, InMemoryManagementClient};
use serde_json::json;

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";
const TENANT: &str = "2070ecc9-b4d5-4ae4-adaa-936fa1954fa8";
const WORKSPACE_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/security/providers/Microsoft.OperationalInsights/workspaces/sentinel";

fn provider() -> (AzureRmProvider, Arc<InMemoryManagementClient>) {
    let store = Arc::new(InMemoryManagementClient::new());
    let clients =
        Clients::new(store.clone(), SUBSCRIPTION).with_tenant_id(Some(TENANT.to_string()));
    (AzureRmProvider::new(clients), store)
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

fn connector_id(name: &str) -> String {
    format!(
        "{}/providers/Microsoft.SecurityInsights/dataConnectors/{}",
        WORKSPACE_ID, name
    )
}

#[tokio::test]
async fn aad_connector_defaults_tenant_from_credentials() {
    let (provider, store) = provider();
    let connector = Resource::new("azurerm_sentinel_data_connector_azure_active_directory", "aad")
        .with_attribute("name", string("aad"))
        .with_attribute("log_analytics_workspace_id", string(WORKSPACE_ID));

    let state = provider.create(&connector).await.unwrap();
    assert_eq!(state.identifier, Some(connector_id("aad")));
    assert_eq!(state.attributes.get("tenant_id"), Some(&string(TENANT)));
    assert_eq!(
        state.attributes.get("log_analytics_workspace_id"),
        Some(&string(WORKSPACE_ID))
    );

    let stored = store.object(&connector_id("aad")).unwrap();
    assert_eq!(stored["kind"], "AzureActiveDirectory");
    assert_eq!(stored["properties"]["dataTypes"]["alerts"]["state"], "Enabled");

    let err = provider.create(&connector).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
}

#[tokio::test]
async fn import_rejects_a_connector_of_another_kind() {
    let (provider, store) = provider();
    store.insert(
        &connector_id("atp"),
        json!({
            "kind": "OfficeATP",
            "properties": {
                "tenantId": TENANT,
                "dataTypes": { "alerts": { "state": "Enabled" } }
            }
        }),
    );

    let id = ResourceId::new("azurerm_sentinel_data_connector_azure_active_directory", "aad");
    let err = provider.import(&id, &connector_id("atp")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(
        err.message,
        r#"Sentinel Data Connector has mismatched kind, expected: "AzureActiveDirectory", got "OfficeATP""#
    );

    let atp = ResourceId::new("azurerm_sentinel_data_connector_office_atp", "atp");
    let state = provider.import(&atp, &connector_id("atp")).await.unwrap();
    assert_eq!(state.attributes.get("name"), Some(&string("atp")));
}

#[tokio::test]
async fn kind_is_checked_before_the_payload_is_decoded() {
    let (provider, store) = provider();
    // Office 365 connector created before the Teams data type existed
    store.insert(
        &connector_id("o365"),
        json!({
            "kind": "Office365",
            "properties": {
                "tenantId": TENANT,
                "dataTypes": {
                    "exchange": { "state": "Enabled" },
                    "sharePoint": { "state": "Enabled" }
                }
            }
        }),
    );

    let atp = ResourceId::new("azurerm_sentinel_data_connector_office_atp", "atp");
    let err = provider.import(&atp, &connector_id("o365")).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(
        err.message,
        r#"Sentinel Data Connector has mismatched kind, expected: "OfficeATP", got "Office365""#
    );

    let office = ResourceId::new("azurerm_sentinel_data_connector_office_365", "o365");
    let err = provider
        .read(&office, Some(&connector_id("o365")))
        .await
        .unwrap_err();
    assert!(err.message.contains("teams"), "{}", err.message);
}

#[tokio::test]
async fn import_of_unknown_kind_reports_empty_kind() {
    let (provider, store) = provider();
    store.insert(
        &connector_id("gcp"),
        json!({ "kind": "GCP", "properties": { "connectorDefinitionName": "GCPAuditLogs" } }),
    );

    let id = ResourceId::new("azurerm_sentinel_data_connector_threat_intelligence_taxii", "ti");
    let err = provider.import(&id, &connector_id("gcp")).await.unwrap_err();
    assert_eq!(
        err.message,
        r#"Sentinel Data Connector has mismatched kind, expected: "ThreatIntelligenceTaxii", got """#
    );
}

#[tokio::test]
async fn import_of_missing_connector_wraps_the_error() {
    let (provider, _) = provider();
    let id = ResourceId::new("azurerm_sentinel_data_connector_office_irm", "irm");
    let err = provider.import(&id, &connector_id("irm")).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(
        err.message,
        format!("retrieving Sentinel Data Connector {}", connector_id("irm"))
    );
}

#[tokio::test]
async fn import_rejects_malformed_ids() {
    let (provider, _) = provider();
    let id = ResourceId::new("azurerm_sentinel_data_connector_office_irm", "irm");
    let err = provider.import(&id, WORKSPACE_ID).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn taxii_password_is_kept_and_updates_carry_etag() {
    let (provider, store) = provider();
    let taxii = Resource::new("azurerm_sentinel_data_connector_threat_intelligence_taxii", "feed")
        .with_attribute("name", string("feed"))
        .with_attribute("log_analytics_workspace_id", string(WORKSPACE_ID))
        .with_attribute("display_name", string("anomali"))
        .with_attribute("api_root_url", string("https://limo.anomali.com/api/v1/taxii2/feeds/"))
        .with_attribute("collection_id", string("107"))
        .with_attribute("user_name", string("guest"))
        .with_attribute("password", string("guest"));

    let state = provider.create(&taxii).await.unwrap();
    assert_eq!(state.attributes.get("password"), Some(&string("guest")));
    assert_eq!(state.attributes.get("polling_frequency"), Some(&string("OnceAnHour")));

    let id = connector_id("feed");
    let etag_before = store.object(&id).unwrap()["etag"].clone();

    let changed = taxii
        .clone()
        .with_attribute("polling_frequency", string("OnceADay"));
    let updated = provider
        .update(&taxii.id, &id, &state, &changed)
        .await
        .unwrap();
    assert_eq!(updated.attributes.get("polling_frequency"), Some(&string("OnceADay")));
    assert_ne!(store.object(&id).unwrap()["etag"], etag_before);
}

#[tokio::test]
async fn connectors_without_settings_cannot_update_in_place() {
    let (provider, _) = provider();
    let connector = Resource::new("azurerm_sentinel_data_connector_iot", "iot")
        .with_attribute("name", string("iot"))
        .with_attribute("log_analytics_workspace_id", string(WORKSPACE_ID));

    let state = provider.create(&connector).await.unwrap();
    assert_eq!(state.attributes.get("subscription_id"), Some(&string(SUBSCRIPTION)));

    let err = provider
        .update(&connector.id, &connector_id("iot"), &state, &connector)
        .await
        .unwrap_err();
    assert!(err.message.contains("does not support in-place update"));
}
