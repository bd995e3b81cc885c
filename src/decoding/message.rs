use serde::Serialize;

use super::{ipfix, netflow1, netflow5, netflow6, netflow7, netflow9};

/// One decoded datagram. The set of variants is closed: every version the
/// decoder accepts has exactly one variant here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "protocol", content = "packet", rename_all = "snake_case")]
pub enum Message {
    NetflowV1(netflow1::Packet),
    NetflowV5(netflow5::Packet),
    NetflowV6(netflow6::Packet),
    NetflowV7(netflow7::Packet),
    NetflowV9(netflow9::Packet),
    Ipfix(ipfix::Message),
}

impl Message {
    /// Wire version number as carried in the first two octets.
    pub fn version(&self) -> u16 {
        match self {
            Message::NetflowV1(_) => netflow1::VERSION,
            Message::NetflowV5(_) => netflow5::VERSION,
            Message::NetflowV6(_) => netflow6::VERSION,
            Message::NetflowV7(_) => netflow7::VERSION,
            Message::NetflowV9(_) => netflow9::VERSION,
            Message::Ipfix(_) => ipfix::VERSION,
        }
    }

    /// Number of flow records carried, counting template data records only
    /// for v9 and IPFIX.
    pub fn record_count(&self) -> usize {
        match self {
            Message::NetflowV1(p) => p.records.len(),
            Message::NetflowV5(p) => p.records.len(),
            Message::NetflowV6(p) => p.records.len(),
            Message::NetflowV7(p) => p.records.len(),
            Message::NetflowV9(p) => data_records(&p.flow_sets),
            Message::Ipfix(m) => data_records(&m.sets),
        }
    }
}

fn data_records(sets: &[super::template::FlowSet]) -> usize {
    sets.iter()
        .map(|s| match s {
            super::template::FlowSet::Data { records, .. } => records.len(),
            _ => 0,
        })
        .sum()
}
