use std::sync::Arc;

use carina_core::provider::Provider;
use carina_core::resource::{Resource, Value};
use carina_provider_azurerm::{AzureRmProvider, Clients, InMemoryManagementClient};

const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000001";
const FACTORY_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/data/providers/Microsoft.DataFactory/factories/etl";
const IDENTITY_ID: &str = "/subscriptions/00000000-0000-0000-0000-000000000001/resourceGroups/data/providers/Microsoft.ManagedIdentity/userAssignedIdentities/etl-runner";

fn string(s: &str) -> Value {
    Value::String(s.to_string())
}

#[tokio::test]
async fn credential_lifecycle() {
    let store = Arc::new(InMemoryManagementClient::new());
    let provider = AzureRmProvider::new(Clients::new(store.clone(), SUBSCRIPTION));
    let credential_id = format!("{}/credentials/uami", FACTORY_ID);

    let credential = Resource::new("azurerm_data_factory_credential_user_managed_identity", "uami")
        .with_attribute("name", string("uami"))
        .with_attribute("data_factory_id", string(FACTORY_ID))
        .with_attribute("identity_id", string(IDENTITY_ID))
        .with_attribute("annotations", Value::List(vec![string("team-data")]));

    let state = provider.create(&credential).await.unwrap();
    assert_eq!(state.identifier.as_deref(), Some(credential_id.as_str()));
    assert_eq!(state.attributes.get("identity_id"), Some(&string(IDENTITY_ID)));
    assert_eq!(state.attributes.get("data_factory_id"), Some(&string(FACTORY_ID)));
    assert!(!state.attributes.contains_key("description"));

    let stored = store.object(&credential_id).unwrap();
    assert_eq!(stored["properties"]["type"], "ManagedIdentity");
    assert_eq!(
        stored["properties"]["typeProperties"]["resourceId"],
        IDENTITY_ID
    );

    let described = credential
        .clone()
        .with_attribute("description", string("pipeline identity"));
    let updated = provider
        .update(&credential.id, &credential_id, &state, &described)
        .await
        .unwrap();
    assert_eq!(
        updated.attributes.get("description"),
        Some(&string("pipeline identity"))
    );

    provider.delete(&credential.id, &credential_id).await.unwrap();
    assert!(!store.contains(&credential_id));
}

#[tokio::test]
async fn malformed_factory_id_is_rejected_before_any_call() {
    let store = Arc::new(InMemoryManagementClient::new());
    let provider = AzureRmProvider::new(Clients::new(store.clone(), SUBSCRIPTION));

    let credential = Resource::new("azurerm_data_factory_credential_user_managed_identity", "uami")
        .with_attribute("name", string("uami"))
        .with_attribute("data_factory_id", string("/subscriptions/x/resourceGroups/data"))
        .with_attribute("identity_id", string(IDENTITY_ID));

    let err = provider.create(&credential).await.unwrap_err();
    assert!(err.message.starts_with("parsing data_factory_id:"));
    assert!(store.calls().is_empty());
}
