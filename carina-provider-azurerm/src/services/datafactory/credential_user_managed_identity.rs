//! `azurerm_data_factory_credential_user_managed_identity`

use async_trait::async_trait;
use carina_core::provider::{ProviderError, ProviderResult};
use carina_core::schema::{AttributeSchema, AttributeType, types};
use serde::{Deserialize, Serialize};

use crate::arm::datafactory::{MANAGED_IDENTITY_TYPE, ManagedIdentityCredentialResource};
use crate::framework::{ResourceMetaData, TypedResource, already_exists, arm_error};
use crate::ids::{
    CredentialId, FactoryId, IdValidator, ResourceId, id_validator, validate_factory_id,
    validate_user_assigned_identity_id,
};

pub const RESOURCE_TYPE: &str = "azurerm_data_factory_credential_user_managed_identity";

#[derive(Debug, Serialize, Deserialize)]
pub struct CredentialModel {
    pub name: String,
    pub data_factory_id: String,
    pub identity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
}

impl CredentialModel {
    fn to_resource(&self) -> ManagedIdentityCredentialResource {
        ManagedIdentityCredentialResource::new(
            self.identity_id.clone(),
            self.description.clone(),
            (!self.annotations.is_empty()).then(|| self.annotations.clone()),
        )
    }
}

fn parse_id(metadata: &ResourceMetaData) -> ProviderResult<CredentialId> {
    CredentialId::parse(metadata.id()?).map_err(|e| ProviderError::validation(e.to_string()))
}

pub struct UserManagedIdentityCredentialResource;

#[async_trait]
impl TypedResource for UserManagedIdentityCredentialResource {
    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn arguments(&self) -> Vec<AttributeSchema> {
        vec![
            AttributeSchema::new("name", types::non_empty_string())
                .required()
                .force_new(),
            AttributeSchema::new(
                "data_factory_id",
                types::string_with("FactoryId", validate_factory_id),
            )
            .required()
            .force_new(),
            AttributeSchema::new(
                "identity_id",
                types::string_with("UserAssignedIdentityId", validate_user_assigned_identity_id),
            )
            .required()
            .with_description("User-assigned managed identity the credential stands for"),
            AttributeSchema::new("description", AttributeType::String).optional(),
            AttributeSchema::new(
                "annotations",
                AttributeType::List(Box::new(types::non_empty_string())),
            )
            .optional(),
        ]
    }

    fn attributes(&self) -> Vec<AttributeSchema> {
        Vec::new()
    }

    fn id_validation(&self) -> IdValidator {
        id_validator::<CredentialId>()
    }

    async fn create(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let model: CredentialModel = metadata.decode()?;
        let factory = FactoryId::parse(&model.data_factory_id)
            .map_err(|e| ProviderError::validation(format!("parsing data_factory_id: {}", e)))?;
        let id = CredentialId::new(
            factory.subscription_id,
            factory.resource_group_name,
            factory.factory_name,
            model.name.clone(),
        );

        let client = metadata.client.credentials();
        match client.get(&id).await {
            Ok(_) => return Err(already_exists(&id)),
            Err(e) if e.was_not_found() => {}
            Err(e) => {
                return Err(arm_error(
                    format!("checking for presence of existing {}", id),
                    e,
                ));
            }
        }

        client
            .create_or_update(&id, &model.to_resource())
            .await
            .map_err(|e| arm_error(format!("creating {}", id), e))?;

        metadata.set_id(&id);
        Ok(())
    }

    async fn read(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = parse_id(metadata)?;
        let credential = match metadata.client.credentials().get(&id).await {
            Ok(credential) => credential,
            Err(e) if e.was_not_found() => {
                metadata.mark_as_gone();
                return Ok(());
            }
            Err(e) => return Err(arm_error(format!("retrieving {}", id), e)),
        };

        if credential.properties.credential_type != MANAGED_IDENTITY_TYPE {
            return Err(ProviderError::validation(format!(
                "{} is a {:?} credential, expected {:?}",
                id, credential.properties.credential_type, MANAGED_IDENTITY_TYPE
            )));
        }

        let model = CredentialModel {
            name: id.credential_name.clone(),
            data_factory_id: id.factory_id().to_string(),
            identity_id: credential.identity_id().unwrap_or_default().to_string(),
            description: credential.properties.description.clone(),
            annotations: credential.properties.annotations.clone().unwrap_or_default(),
        };
        metadata.encode(&model)
    }

    async fn update(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = parse_id(metadata)?;
        let model: CredentialModel = metadata.decode()?;
        metadata
            .client
            .credentials()
            .create_or_update(&id, &model.to_resource())
            .await
            .map_err(|e| arm_error(format!("updating {}", id), e))?;
        Ok(())
    }

    async fn delete(&self, metadata: &mut ResourceMetaData) -> ProviderResult<()> {
        let id = parse_id(metadata)?;
        metadata
            .client
            .credentials()
            .delete(&id)
            .await
            .map_err(|e| arm_error(format!("deleting {}", id), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_annotations_are_omitted() {
        let model = CredentialModel {
            name: "uami".to_string(),
            data_factory_id: "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.DataFactory/factories/etl".to_string(),
            identity_id: "/subscriptions/abc/resourceGroups/rg/providers/Microsoft.ManagedIdentity/userAssignedIdentities/etl".to_string(),
            description: None,
            annotations: Vec::new(),
        };

        let resource = model.to_resource();
        assert_eq!(resource.properties.annotations, None);
        assert_eq!(resource.identity_id(), Some(model.identity_id.as_str()));
    }
}
