//! Azure DNS: zones and record sets

pub mod record;
pub mod records;
pub mod zone;

use crate::framework::Registry;
use record::{DnsRecordDataSource, DnsRecordResource, RecordKind};
use records::{
    AaaaRecordKind, ARecordKind, CaaRecordKind, CnameRecordKind, DsRecordKind, MxRecordKind,
    NsRecordKind, PtrRecordKind, SrvRecordKind, TxtRecordKind,
};
use zone::{DnsZoneDataSource, DnsZoneResource};

fn register_record<K: RecordKind>(registry: &mut Registry) {
    registry.register_resource(DnsRecordResource::<K>::new());
    registry.register_data_source(DnsRecordDataSource::<K>::new());
}

pub fn register(registry: &mut Registry) {
    registry.register_resource(DnsZoneResource);
    registry.register_data_source(DnsZoneDataSource);

    register_record::<ARecordKind>(registry);
    register_record::<AaaaRecordKind>(registry);
    register_record::<CaaRecordKind>(registry);
    register_record::<CnameRecordKind>(registry);
    register_record::<DsRecordKind>(registry);
    register_record::<MxRecordKind>(registry);
    register_record::<NsRecordKind>(registry);
    register_record::<PtrRecordKind>(registry);
    register_record::<SrvRecordKind>(registry);
    register_record::<TxtRecordKind>(registry);
}
