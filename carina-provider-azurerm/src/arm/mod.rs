//! Azure Resource Manager management-plane client
//!
//! `ManagementClient` is the seam between resource handlers and the
//! network: handlers talk to typed service clients (`ZonesClient`,
//! `DataConnectorsClient`, ...), which issue raw calls through whichever
//! `ManagementClient` the provider was built with.

pub mod auth;
pub mod datafactory;
pub mod dns;
pub mod http;
pub mod memory;
pub mod securityinsights;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

pub use auth::TokenCredential;
pub use http::HttpManagementClient;
pub use memory::InMemoryManagementClient;

/// Successful response from a management-plane call
#[derive(Debug, Clone, PartialEq)]
pub struct ArmResponse {
    pub status: u16,
    /// Parsed JSON body; `None` when the response had no body
    pub body: Option<serde_json::Value>,
}

impl ArmResponse {
    pub fn new(status: u16, body: Option<serde_json::Value>) -> Self {
        Self { status, body }
    }

    /// Decode the body into a model
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ArmError> {
        let body = self
            .body
            .clone()
            .ok_or_else(|| ArmError::Decode("response had no body".to_string()))?;
        serde_json::from_value(body).map_err(|e| ArmError::Decode(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArmError {
    /// The API answered with a non-success status
    #[error("unexpected status {status} with error: {code}: {message}")]
    Status {
        status: u16,
        code: String,
        message: String,
    },

    #[error("sending request: {0}")]
    Transport(String),

    #[error("decoding response: {0}")]
    Decode(String),

    #[error("obtaining access token: {0}")]
    Auth(String),

    /// A long-running operation finished unsuccessfully
    #[error("long-running operation {status}: {message}")]
    OperationFailed { status: String, message: String },

    #[error("timed out {0}")]
    Timeout(String),
}

impl ArmError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ArmError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn was_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn was_conflict(&self) -> bool {
        self.status() == Some(409)
    }

    /// Build a status error from an ARM error body (`{"error": {"code", "message"}}`)
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let error = parsed.as_ref().and_then(|v| v.get("error"));
        let field = |name: &str| {
            error
                .and_then(|e| e.get(name))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        };

        ArmError::Status {
            status,
            code: field("code").unwrap_or_else(|| "Unknown".to_string()),
            message: field("message").unwrap_or_else(|| {
                if body.trim().is_empty() {
                    "no error details returned".to_string()
                } else {
                    body.trim().to_string()
                }
            }),
        }
    }

    pub fn not_found(id: &str) -> Self {
        ArmError::Status {
            status: 404,
            code: "ResourceNotFound".to_string(),
            message: format!("The Resource '{}' was not found.", id),
        }
    }
}

/// Raw management-plane operations on a resource ID
///
/// Implementations wait for long-running operations to finish and return
/// non-success statuses as `ArmError::Status`.
#[async_trait]
pub trait ManagementClient: Send + Sync {
    async fn get(&self, id: &str, api_version: &str) -> Result<ArmResponse, ArmError>;

    async fn put(
        &self,
        id: &str,
        api_version: &str,
        body: &serde_json::Value,
    ) -> Result<ArmResponse, ArmError>;

    async fn patch(
        &self,
        id: &str,
        api_version: &str,
        body: &serde_json::Value,
    ) -> Result<ArmResponse, ArmError>;

    async fn delete(&self, id: &str, api_version: &str) -> Result<ArmResponse, ArmError>;
}

pub type SharedClient = Arc<dyn ManagementClient>;

/// Serialize a model for a request body
pub(crate) fn to_body<T: serde::Serialize>(model: &T) -> Result<serde_json::Value, ArmError> {
    serde_json::to_value(model).map_err(|e| ArmError::Decode(format!("encoding request: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn error_body_is_parsed() {
        let err = ArmError::from_response(
            409,
            r#"{"error":{"code":"Conflict","message":"The zone already exists."}}"#,
        );
        assert!(err.was_conflict());
        assert_eq!(
            err.to_string(),
            "unexpected status 409 with error: Conflict: The zone already exists."
        );
    }

    #[test]
    fn error_without_body_still_reports_status() {
        let err = ArmError::from_response(503, "");
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("no error details returned"));
        assert!(!err.was_not_found());
    }

    #[test]
    fn response_decodes_body() {
        #[derive(serde::Deserialize)]
        struct Named {
            name: String,
        }
        let response = ArmResponse::new(200, Some(json!({ "name": "zone1" })));
        assert_eq!(response.json::<Named>().unwrap().name, "zone1");
        assert!(matches!(
            ArmResponse::new(204, None).json::<Named>(),
            Err(ArmError::Decode(_))
        ));
    }
}
