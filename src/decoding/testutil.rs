//! Packet builders shared by the decoder, dispatcher and listener tests.

use super::{ipfix, netflow5, netflow9};

/// Fields of the template used by the v9 and IPFIX builders below.
const FLOW_TEMPLATE: [(u16, u16); 5] = [(8, 4), (12, 4), (7, 2), (11, 2), (1, 4)];

/// A NetFlow v5 packet with one record per `(host, dst_port)`, sourced
/// from `10.0.0.<host>`.
pub fn netflow_v5(flows: &[(u8, u16)]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&netflow5::VERSION.to_be_bytes());
    buf.extend_from_slice(&(flows.len() as u16).to_be_bytes());
    buf.extend_from_slice(&360_000u32.to_be_bytes());
    buf.extend_from_slice(&1_700_000_000u32.to_be_bytes());
    buf.extend_from_slice(&0u32.to_be_bytes());
    buf.extend_from_slice(&42u32.to_be_bytes());
    buf.extend_from_slice(&[0, 0, 0, 0]);
    for (host, dst_port) in flows {
        let mut rec = [0u8; netflow5::RECORD_SIZE];
        rec[0..4].copy_from_slice(&[10, 0, 0, *host]);
        rec[4..8].copy_from_slice(&[10, 0, 1, 1]);
        rec[16..20].copy_from_slice(&10u32.to_be_bytes());
        rec[20..24].copy_from_slice(&1500u32.to_be_bytes());
        rec[32..34].copy_from_slice(&40000u16.to_be_bytes());
        rec[34..36].copy_from_slice(&dst_port.to_be_bytes());
        rec[38] = 6;
        rec[40..42].copy_from_slice(&65001u16.to_be_bytes());
        buf.extend_from_slice(&rec);
    }
    buf
}

fn template_body(template_id: u16) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&template_id.to_be_bytes());
    body.extend_from_slice(&(FLOW_TEMPLATE.len() as u16).to_be_bytes());
    for (id, len) in FLOW_TEMPLATE {
        body.extend_from_slice(&id.to_be_bytes());
        body.extend_from_slice(&len.to_be_bytes());
    }
    body
}

fn data_body(flows: &[(u8, u16)]) -> Vec<u8> {
    let mut body = Vec::new();
    for (host, dst_port) in flows {
        body.extend_from_slice(&[10, 0, 0, *host]);
        body.extend_from_slice(&[10, 0, 1, 1]);
        body.extend_from_slice(&40000u16.to_be_bytes());
        body.extend_from_slice(&dst_port.to_be_bytes());
        body.extend_from_slice(&1500u32.to_be_bytes());
    }
    body
}

fn append_sets(buf: &mut Vec<u8>, sets: &[(u16, Vec<u8>)]) {
    for (id, body) in sets {
        buf.extend_from_slice(&id.to_be_bytes());
        buf.extend_from_slice(&((body.len() + 4) as u16).to_be_bytes());
        buf.extend_from_slice(body);
    }
}

pub fn v9_packet(source_id: u32, sets: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&netflow9::VERSION.to_be_bytes());
    buf.extend_from_slice(&(sets.len() as u16).to_be_bytes());
    buf.extend_from_slice(&360_000u32.to_be_bytes());
    buf.extend_from_slice(&1_700_000_000u32.to_be_bytes());
    buf.extend_from_slice(&7u32.to_be_bytes());
    buf.extend_from_slice(&source_id.to_be_bytes());
    append_sets(&mut buf, sets);
    buf
}

pub fn v9_template_packet(source_id: u32, template_id: u16) -> Vec<u8> {
    v9_packet(
        source_id,
        &[(netflow9::TEMPLATE_FLOWSET_ID, template_body(template_id))],
    )
}

pub fn v9_data_packet(source_id: u32, template_id: u16, flows: &[(u8, u16)]) -> Vec<u8> {
    v9_packet(source_id, &[(template_id, data_body(flows))])
}

pub fn ipfix_message(domain: u32, sets: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&ipfix::VERSION.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    buf.extend_from_slice(&1_700_000_000u32.to_be_bytes());
    buf.extend_from_slice(&11u32.to_be_bytes());
    buf.extend_from_slice(&domain.to_be_bytes());
    append_sets(&mut buf, sets);
    let length = buf.len() as u16;
    buf[2..4].copy_from_slice(&length.to_be_bytes());
    buf
}

pub fn ipfix_template_message(domain: u32, template_id: u16) -> Vec<u8> {
    ipfix_message(
        domain,
        &[(ipfix::TEMPLATE_SET_ID, template_body(template_id))],
    )
}

pub fn ipfix_data_message(domain: u32, template_id: u16, flows: &[(u8, u16)]) -> Vec<u8> {
    ipfix_message(domain, &[(template_id, data_body(flows))])
}

/// Consumer that keeps every routed message, shareable across tasks.
#[derive(Debug, Clone, Default)]
pub struct Collector {
    pub messages: std::sync::Arc<std::sync::Mutex<Vec<super::Message>>>,
}

impl Collector {
    pub fn len(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    pub fn take(&self) -> Vec<super::Message> {
        std::mem::take(&mut *self.messages.lock().unwrap())
    }

    fn push(&mut self, message: super::Message) {
        self.messages.lock().unwrap().push(message);
    }
}

impl crate::dump::Consumer for Collector {
    fn netflow_v1(&mut self, p: super::netflow1::Packet) {
        self.push(super::Message::NetflowV1(p));
    }
    fn netflow_v5(&mut self, p: netflow5::Packet) {
        self.push(super::Message::NetflowV5(p));
    }
    fn netflow_v6(&mut self, p: super::netflow6::Packet) {
        self.push(super::Message::NetflowV6(p));
    }
    fn netflow_v7(&mut self, p: super::netflow7::Packet) {
        self.push(super::Message::NetflowV7(p));
    }
    fn netflow_v9(&mut self, p: netflow9::Packet) {
        self.push(super::Message::NetflowV9(p));
    }
    fn ipfix(&mut self, m: ipfix::Message) {
        self.push(super::Message::Ipfix(m));
    }
}
