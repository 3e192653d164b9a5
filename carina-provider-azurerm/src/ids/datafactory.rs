use std::fmt;

use super::{IdParseError, Parsed, ResourceId, Segment};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FactoryId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub factory_name: String,
}

impl FactoryId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        factory_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            factory_name: factory_name.into(),
        }
    }
}

impl ResourceId for FactoryId {
    const DESCRIPTION: &'static str = "Factory";

    fn segments() -> &'static [Segment] {
        &[
            Segment::Static("subscriptions"),
            Segment::User("subscriptionId"),
            Segment::Static("resourceGroups"),
            Segment::User("resourceGroupName"),
            Segment::Static("providers"),
            Segment::Static("Microsoft.DataFactory"),
            Segment::Static("factories"),
            Segment::User("factoryName"),
        ]
    }

    fn from_parsed(mut parsed: Parsed) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.take("subscriptionId"),
            parsed.take("resourceGroupName"),
            parsed.take("factoryName"),
        ))
    }
}

impl fmt::Display for FactoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.DataFactory/factories/{}",
            self.subscription_id, self.resource_group_name, self.factory_name
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CredentialId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub factory_name: String,
    pub credential_name: String,
}

impl CredentialId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        factory_name: impl Into<String>,
        credential_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            factory_name: factory_name.into(),
            credential_name: credential_name.into(),
        }
    }

    pub fn factory_id(&self) -> FactoryId {
        FactoryId::new(
            self.subscription_id.clone(),
            self.resource_group_name.clone(),
            self.factory_name.clone(),
        )
    }
}

impl ResourceId for CredentialId {
    const DESCRIPTION: &'static str = "Credential";

    fn segments() -> &'static [Segment] {
        &[
            Segment::Static("subscriptions"),
            Segment::User("subscriptionId"),
            Segment::Static("resourceGroups"),
            Segment::User("resourceGroupName"),
            Segment::Static("providers"),
            Segment::Static("Microsoft.DataFactory"),
            Segment::Static("factories"),
            Segment::User("factoryName"),
            Segment::Static("credentials"),
            Segment::User("credentialName"),
        ]
    }

    fn from_parsed(mut parsed: Parsed) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.take("subscriptionId"),
            parsed.take("resourceGroupName"),
            parsed.take("factoryName"),
            parsed.take("credentialName"),
        ))
    }
}

impl fmt::Display for CredentialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/credentials/{}", self.factory_id(), self.credential_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_id_round_trip() {
        let input = "/subscriptions/abc/resourceGroups/data/providers/Microsoft.DataFactory/factories/etl/credentials/uami";
        let id = CredentialId::parse(input).unwrap();
        assert_eq!(id.credential_name, "uami");
        assert_eq!(id.factory_id().to_string(), "/subscriptions/abc/resourceGroups/data/providers/Microsoft.DataFactory/factories/etl");
        assert_eq!(id.to_string(), input);
    }

    #[test]
    fn factory_id_rejects_wrong_provider() {
        let err = FactoryId::parse(
            "/subscriptions/abc/resourceGroups/data/providers/Microsoft.Synapse/factories/etl",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            IdParseError::StaticSegment { wanted: "Microsoft.DataFactory", .. }
        ));
    }
}
