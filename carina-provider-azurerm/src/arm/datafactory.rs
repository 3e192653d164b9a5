//! `Microsoft.DataFactory/factories/credentials` models and client

use serde::{Deserialize, Serialize};

use super::{ArmError, SharedClient, to_body};
use crate::ids::CredentialId;

pub const API_VERSION: &str = "2018-06-01";

/// Discriminator of a managed identity credential
pub const MANAGED_IDENTITY_TYPE: &str = "ManagedIdentity";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManagedIdentityCredentialResource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub properties: ManagedIdentityCredential,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedIdentityCredential {
    #[serde(rename = "type")]
    pub credential_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotations: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_properties: Option<ManagedIdentityTypeProperties>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedIdentityTypeProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl ManagedIdentityCredentialResource {
    pub fn new(
        identity_id: impl Into<String>,
        description: Option<String>,
        annotations: Option<Vec<String>>,
    ) -> Self {
        Self {
            etag: None,
            id: None,
            name: None,
            properties: ManagedIdentityCredential {
                credential_type: MANAGED_IDENTITY_TYPE.to_string(),
                description,
                annotations,
                type_properties: Some(ManagedIdentityTypeProperties {
                    resource_id: Some(identity_id.into()),
                }),
            },
            resource_type: None,
        }
    }

    pub fn identity_id(&self) -> Option<&str> {
        self.properties
            .type_properties
            .as_ref()
            .and_then(|p| p.resource_id.as_deref())
    }
}

#[derive(Clone)]
pub struct CredentialsClient {
    client: SharedClient,
}

impl CredentialsClient {
    pub fn new(client: SharedClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, id: &CredentialId) -> Result<ManagedIdentityCredentialResource, ArmError> {
        self.client.get(&id.to_string(), API_VERSION).await?.json()
    }

    pub async fn create_or_update(
        &self,
        id: &CredentialId,
        credential: &ManagedIdentityCredentialResource,
    ) -> Result<ManagedIdentityCredentialResource, ArmError> {
        self.client
            .put(&id.to_string(), API_VERSION, &to_body(credential)?)
            .await?
            .json()
    }

    pub async fn delete(&self, id: &CredentialId) -> Result<(), ArmError> {
        self.client.delete(&id.to_string(), API_VERSION).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_body_shape() {
        let credential = ManagedIdentityCredentialResource::new(
            "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.ManagedIdentity/userAssignedIdentities/etl",
            Some("pipeline identity".to_string()),
            Some(vec!["team-data".to_string()]),
        );

        assert_eq!(
            serde_json::to_value(&credential).unwrap(),
            json!({
                "properties": {
                    "type": "ManagedIdentity",
                    "description": "pipeline identity",
                    "annotations": ["team-data"],
                    "typeProperties": {
                        "resourceId": "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.ManagedIdentity/userAssignedIdentities/etl"
                    }
                }
            })
        );
    }

    #[test]
    fn response_without_type_properties_decodes() {
        let credential: ManagedIdentityCredentialResource = serde_json::from_value(json!({
            "id": "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.DataFactory/factories/etl/credentials/uami",
            "name": "uami",
            "type": "Microsoft.DataFactory/factories/credentials",
            "etag": "0a008ad4-0000-0000-0000-5e9dbc160000",
            "properties": { "type": "ManagedIdentity" }
        }))
        .unwrap();

        assert_eq!(credential.identity_id(), None);
        assert_eq!(credential.properties.credential_type, MANAGED_IDENTITY_TYPE);
    }
}
