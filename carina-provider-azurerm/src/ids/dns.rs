use std::fmt;
use std::str::FromStr;

use super::{IdParseError, Parsed, ResourceId, Segment};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsZoneId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub dns_zone_name: String,
}

impl DnsZoneId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        dns_zone_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            dns_zone_name: dns_zone_name.into(),
        }
    }
}

impl ResourceId for DnsZoneId {
    const DESCRIPTION: &'static str = "Dns Zone";

    fn segments() -> &'static [Segment] {
        &[
            Segment::Static("subscriptions"),
            Segment::User("subscriptionId"),
            Segment::Static("resourceGroups"),
            Segment::User("resourceGroupName"),
            Segment::Static("providers"),
            Segment::Static("Microsoft.Network"),
            Segment::Static("dnsZones"),
            Segment::User("dnsZoneName"),
        ]
    }

    fn from_parsed(mut parsed: Parsed) -> Result<Self, IdParseError> {
        Ok(Self::new(
            parsed.take("subscriptionId"),
            parsed.take("resourceGroupName"),
            parsed.take("dnsZoneName"),
        ))
    }
}

impl fmt::Display for DnsZoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Network/dnsZones/{}",
            self.subscription_id, self.resource_group_name, self.dns_zone_name
        )
    }
}

/// DNS record types as they appear in record set IDs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordType {
    A,
    AAAA,
    CAA,
    CNAME,
    DS,
    MX,
    NAPTR,
    NS,
    PTR,
    SOA,
    SRV,
    TLSA,
    TXT,
}

impl RecordType {
    pub const ALL: [RecordType; 13] = [
        RecordType::A,
        RecordType::AAAA,
        RecordType::CAA,
        RecordType::CNAME,
        RecordType::DS,
        RecordType::MX,
        RecordType::NAPTR,
        RecordType::NS,
        RecordType::PTR,
        RecordType::SOA,
        RecordType::SRV,
        RecordType::TLSA,
        RecordType::TXT,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::AAAA => "AAAA",
            RecordType::CAA => "CAA",
            RecordType::CNAME => "CNAME",
            RecordType::DS => "DS",
            RecordType::MX => "MX",
            RecordType::NAPTR => "NAPTR",
            RecordType::NS => "NS",
            RecordType::PTR => "PTR",
            RecordType::SOA => "SOA",
            RecordType::SRV => "SRV",
            RecordType::TLSA => "TLSA",
            RecordType::TXT => "TXT",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| {
                let names: Vec<&str> = RecordType::ALL.iter().map(RecordType::as_str).collect();
                format!("unknown record type {:?}, expected one of {}", s, names.join(", "))
            })
    }
}

/// A record set within a DNS zone
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordTypeId {
    pub subscription_id: String,
    pub resource_group_name: String,
    pub dns_zone_name: String,
    pub record_type: RecordType,
    pub relative_record_set_name: String,
}

impl RecordTypeId {
    pub fn new(
        subscription_id: impl Into<String>,
        resource_group_name: impl Into<String>,
        dns_zone_name: impl Into<String>,
        record_type: RecordType,
        relative_record_set_name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group_name: resource_group_name.into(),
            dns_zone_name: dns_zone_name.into(),
            record_type,
            relative_record_set_name: relative_record_set_name.into(),
        }
    }

    /// The zone this record set lives in
    pub fn zone_id(&self) -> DnsZoneId {
        DnsZoneId::new(
            self.subscription_id.clone(),
            self.resource_group_name.clone(),
            self.dns_zone_name.clone(),
        )
    }
}

impl ResourceId for RecordTypeId {
    const DESCRIPTION: &'static str = "Record Type";

    fn segments() -> &'static [Segment] {
        &[
            Segment::Static("subscriptions"),
            Segment::User("subscriptionId"),
            Segment::Static("resourceGroups"),
            Segment::User("resourceGroupName"),
            Segment::Static("providers"),
            Segment::Static("Microsoft.Network"),
            Segment::Static("dnsZones"),
            Segment::User("dnsZoneName"),
            Segment::User("recordType"),
            Segment::User("relativeRecordSetName"),
        ]
    }

    fn from_parsed(mut parsed: Parsed) -> Result<Self, IdParseError> {
        let record_type = parsed
            .take("recordType")
            .parse::<RecordType>()
            .map_err(|e| parsed.invalid(e))?;
        Ok(Self::new(
            parsed.take("subscriptionId"),
            parsed.take("resourceGroupName"),
            parsed.take("dnsZoneName"),
            record_type,
            parsed.take("relativeRecordSetName"),
        ))
    }
}

impl fmt::Display for RecordTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.zone_id(),
            self.record_type,
            self.relative_record_set_name
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONE: &str = "/subscriptions/12345678-1234-9876-4563-123456789012/resourceGroups/resGroup1/providers/Microsoft.Network/dnsZones/zone1";

    #[test]
    fn dns_zone_id_round_trip() {
        let id = DnsZoneId::parse(ZONE).unwrap();
        assert_eq!(id.resource_group_name, "resGroup1");
        assert_eq!(id.dns_zone_name, "zone1");
        assert_eq!(id.to_string(), ZONE);
    }

    #[test]
    fn dns_zone_id_from_api_is_read_insensitively() {
        let lowered = ZONE.replace("dnsZones", "dnszones");
        assert!(DnsZoneId::parse(&lowered).is_err());
        assert_eq!(
            DnsZoneId::parse_insensitively(&lowered).unwrap(),
            DnsZoneId::parse(ZONE).unwrap()
        );
    }

    #[test]
    fn record_type_id_round_trip() {
        let input = format!("{}/DS/www", ZONE);
        let id = RecordTypeId::parse(&input).unwrap();
        assert_eq!(id.record_type, RecordType::DS);
        assert_eq!(id.relative_record_set_name, "www");
        assert_eq!(id.zone_id(), DnsZoneId::parse(ZONE).unwrap());
        assert_eq!(id.to_string(), input);
    }

    #[test]
    fn record_type_is_case_insensitive_and_canonicalised() {
        let id = RecordTypeId::parse(&format!("{}/cname/api", ZONE)).unwrap();
        assert_eq!(id.record_type, RecordType::CNAME);
        assert_eq!(id.to_string(), format!("{}/CNAME/api", ZONE));
    }

    #[test]
    fn unknown_record_type_is_rejected() {
        let err = RecordTypeId::parse(&format!("{}/BOGUS/www", ZONE)).unwrap_err();
        assert!(matches!(err, IdParseError::InvalidValue { .. }));
        assert!(err.to_string().contains("unknown record type \"BOGUS\""));
    }

    #[test]
    fn apex_record_name() {
        let id = RecordTypeId::new("s", "rg", "example.com", RecordType::TXT, "@");
        assert_eq!(RecordTypeId::parse(&id.to_string()).unwrap(), id);
    }
}
