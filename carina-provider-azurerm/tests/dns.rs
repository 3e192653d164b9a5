use std::collections::HashMap;
use std::sync::Arc;

use carina_core::provider::{ErrorKind, Provider};
use carina_core::resource::{Resource, ResourceId, Value};
use carina_provider_azurerm::{AzureRmProvider, Clients, InMemoryManagementClient};
use serde_json::json;

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";
const ZONE_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com";

fn provider() -> (AzureRmProvider, Arc<InMemoryManagementClient>) {
    let store = Arc::new(InMemoryManagementClient::new());
    let provider = AzureRmProvider::new(Clients::new(store.clone(), SUBSCRIPTION));
    (provider, store)
}

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

fn a_record(ttl: i64, records: &[&str]) -> Resource {
    Resource::new("azurerm_dns_a_record", "www")
        .with_attribute("name", string("www"))
        .with_attribute("dns_zone_id", string(ZONE_ID))
        .with_attribute("ttl", Value::Int(ttl))
        .with_attribute(
            "records",
            Value::List(records.iter().map(|r| string(r)).collect()),
        )
}

#[tokio::test]
async fn zone_lifecycle() {
    let (provider, store) = provider();
    let zone = Resource::new("azurerm_dns_zone", "main")
        .with_attribute("name", string("example.com"))
        .with_attribute("resource_group_name", string("rg"))
        .with_attribute(
            "tags",
            Value::Map(HashMap::from([("env".to_string(), string("dev"))])),
        );

    let state = provider.create(&zone).await.unwrap();
    assert_eq!(state.identifier.as_deref(), Some(ZONE_ID));
    assert_eq!(store.object(ZONE_ID).unwrap()["location"], "global");

    let retagged = zone.clone().with_attribute(
        "tags",
        Value::Map(HashMap::from([("env".to_string(), string("prod"))])),
    );
    let updated = provider
        .update(&zone.id, ZONE_ID, &state, &retagged)
        .await
        .unwrap();
    assert_eq!(
        updated.attributes.get("tags"),
        Some(&Value::Map(HashMap::from([("env".to_string(), string("prod"))])))
    );
    assert!(store.calls().iter().any(|c| c.starts_with("PATCH")));

    provider.delete(&zone.id, ZONE_ID).await.unwrap();
    let gone = provider.read(&zone.id, Some(ZONE_ID)).await.unwrap();
    assert!(!gone.exists);
}

#[tokio::test]
async fn a_record_create_read_update() {
    let (provider, store) = provider();
    let record = a_record(300, &["10.0.0.1", "10.0.0.2"]);

    let state = provider.create(&record).await.unwrap();
    let record_id = format!("{}/A/www", ZONE_ID);
    assert_eq!(state.identifier.as_deref(), Some(record_id.as_str()));
    assert_eq!(state.attributes.get("ttl"), Some(&Value::Int(300)));
    assert_eq!(state.attributes.get("dns_zone_id"), Some(&string(ZONE_ID)));

    let stored = store.object(&record_id).unwrap();
    assert_eq!(stored["properties"]["TTL"], 300);
    assert_eq!(
        stored["properties"]["ARecords"],
        json!([{ "ipv4Address": "10.0.0.1" }, { "ipv4Address": "10.0.0.2" }])
    );

    let changed = a_record(60, &["10.0.0.1", "10.0.0.2"]);
    let updated = provider
        .update(&record.id, &record_id, &state, &changed)
        .await
        .unwrap();
    assert_eq!(updated.attributes.get("ttl"), Some(&Value::Int(60)));
    assert_eq!(
        store.object(&record_id).unwrap()["properties"]["ARecords"][1]["ipv4Address"],
        "10.0.0.2"
    );
}

#[tokio::test]
async fn creating_an_existing_record_is_a_conflict() {
    let (provider, store) = provider();
    store.insert(
        &format!("{}/A/www", ZONE_ID),
        json!({ "properties": { "TTL": 60, "ARecords": [] } }),
    );

    let err = provider
        .create(&a_record(300, &["10.0.0.1"]))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Conflict);
    assert!(err.message.contains("already exists - import it into the state"));
    assert_eq!(
        err.resource_id,
        Some(ResourceId::new("azurerm_dns_a_record", "www"))
    );
}

#[tokio::test]
async fn alias_and_records_are_mutually_exclusive() {
    let (provider, store) = provider();
    let record = a_record(300, &["10.0.0.1"]).with_attribute(
        "target_resource_id",
        string("/subscriptions/x/resourceGroups/rg/providers/Microsoft.Network/publicIPAddresses/ip"),
    );

    let err = provider.create(&record).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(store.is_empty());
}

#[tokio::test]
async fn ds_data_source_reads_from_configured_subscription() {
    let (provider, store) = provider();
    let record_id = format!("{}/DS/secure", ZONE_ID);
    store.insert(
        &record_id,
        json!({
            "properties": {
                "TTL": 3600,
                "fqdn": "secure.example.com.",
                "metadata": { "owner": "dns-team" },
                "DSRecords": [{
                    "keyTag": 34365,
                    "algorithm": 13,
                    "digest": { "algorithmType": 2, "value": "ABCDEF" }
                }]
            }
        }),
    );

    let lookup = Resource::new("azurerm_dns_ds_record", "secure")
        .with_read_only(true)
        .with_attribute("name", string("secure"))
        .with_attribute("resource_group_name", string("rg"))
        .with_attribute("zone_name", string("example.com"));

    let state = provider.read_data_source(&lookup).await.unwrap();
    assert_eq!(state.identifier.as_deref(), Some(record_id.as_str()));
    assert_eq!(state.attributes.get("ttl"), Some(&Value::Int(3600)));
    assert_eq!(state.attributes.get("fqdn"), Some(&string("secure.example.com.")));
    assert_eq!(state.attributes.get("dns_zone_id"), Some(&string(ZONE_ID)));

    let Some(Value::List(records)) = state.attributes.get("record") else {
        panic!("expected a record list, got {:?}", state.attributes.get("record"));
    };
    let Value::Map(record) = &records[0] else {
        panic!("expected a record block");
    };
    assert_eq!(record.get("key_tag"), Some(&Value::Int(34365)));
    assert_eq!(record.get("digest_type"), Some(&Value::Int(2)));
    assert_eq!(record.get("digest_value"), Some(&string("ABCDEF")));
}

#[tokio::test]
async fn missing_data_source_is_an_error() {
    let (provider, _) = provider();
    let lookup = Resource::new("azurerm_dns_ds_record", "secure")
        .with_read_only(true)
        .with_attribute("name", string("secure"))
        .with_attribute("dns_zone_id", string(ZONE_ID));

    let err = provider.read_data_source(&lookup).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.message, format!("{}/DS/secure was not found", ZONE_ID));
}

#[tokio::test]
async fn import_checks_the_record_type() {
    let (provider, store) = provider();
    let id = ResourceId::new("azurerm_dns_txt_record", "spf");
    store.insert(
        &format!("{}/TXT/@", ZONE_ID),
        json!({ "properties": { "TTL": 300, "TXTRecords": [{ "value": ["v=spf1 ", "-all"] }] } }),
    );

    let err = provider
        .import(&id, &format!("{}/MX/@", ZONE_ID))
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);

    let state = provider
        .import(&id, &format!("{}/TXT/@", ZONE_ID))
        .await
        .unwrap();
    let Some(Value::List(records)) = state.attributes.get("record") else {
        panic!("expected TXT records");
    };
    assert_eq!(
        records[0],
        Value::Map(HashMap::from([("value".to_string(), string("v=spf1 -all"))]))
    );

    let err = provider
        .import(&id, &format!("{}/TXT/missing", ZONE_ID))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}
