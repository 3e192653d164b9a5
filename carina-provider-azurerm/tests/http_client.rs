use std::time::Duration;

use carina_provider_azurerm::arm::{ArmError, HttpManagementClient, ManagementClient, TokenCredential};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZONE: &str =
    "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.Network/dnsZones/example.com";
const API_VERSION: &str = "2023-07-01-preview";

fn client(server: &MockServer) -> HttpManagementClient {
    HttpManagementClient::new(server.uri(), TokenCredential::from_token("test-token"))
        .unwrap()
        .with_retry_delay(Duration::from_millis(1))
        .with_poll_interval(Duration::from_millis(1))
}

#[tokio::test]
async fn get_sends_bearer_token_and_api_version() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .and(query_param("api-version", API_VERSION))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "example.com",
            "location": "global"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server).get(ZONE, API_VERSION).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(response.body.unwrap()["name"], "example.com");
}

#[tokio::test]
async fn not_found_carries_arm_error_code() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "error": { "code": "ResourceNotFound", "message": "The Resource was not found." }
        })))
        .mount(&server)
        .await;

    let err = client(&server).get(ZONE, API_VERSION).await.unwrap_err();
    assert!(err.was_not_found());
    let ArmError::Status { code, .. } = err else {
        panic!("expected a status error, got {:?}", err);
    };
    assert_eq!(code, "ResourceNotFound");
}

#[tokio::test]
async fn throttled_requests_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "location": "global" })))
        .mount(&server)
        .await;

    let response = client(&server).get(ZONE, API_VERSION).await.unwrap();
    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn retries_give_up_after_the_limit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let err = client(&server)
        .with_max_retries(1)
        .get(ZONE, API_VERSION)
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(503));
}

#[tokio::test]
async fn put_polls_async_operation_then_reads_resource() {
    let server = MockServer::start().await;
    let operation = format!("{}/operations/op1", server.uri());

    Mock::given(method("PUT"))
        .and(path(ZONE))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Azure-AsyncOperation", operation.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "InProgress" })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "Succeeded" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(ZONE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "example.com",
            "location": "global",
            "properties": { "numberOfRecordSets": 2 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = client(&server)
        .put(ZONE, API_VERSION, &json!({ "location": "global" }))
        .await
        .unwrap();
    assert_eq!(response.body.unwrap()["properties"]["numberOfRecordSets"], 2);
}

#[tokio::test]
async fn failed_operation_is_reported() {
    let server = MockServer::start().await;
    let operation = format!("{}/operations/op2", server.uri());

    Mock::given(method("DELETE"))
        .and(path(ZONE))
        .respond_with(
            ResponseTemplate::new(202).insert_header("Azure-AsyncOperation", operation.as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/operations/op2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "Failed",
            "error": { "code": "Conflict", "message": "zone has delegations" }
        })))
        .mount(&server)
        .await;

    let err = client(&server).delete(ZONE, API_VERSION).await.unwrap_err();
    assert_eq!(
        err,
        ArmError::OperationFailed {
            status: "Failed".to_string(),
            message: "zone has delegations".to_string(),
        }
    );
}
