//! Azure Data Factory

pub mod credential_user_managed_identity;

use crate::framework::Registry;

pub fn register(registry: &mut Registry) {
    registry.register_resource(credential_user_managed_identity::UserManagedIdentityCredentialResource);
}
