//! NetFlow version 6: version 5 extended with encapsulation sizes and the
//! peer next hop, giving 52-byte records.

use std::net::Ipv4Addr;

use serde::Serialize;

use super::netflow5;
use super::reader::ByteReader;
use crate::error_handling::types::DecodeError;

pub use super::netflow5::Header;

pub const VERSION: u16 = 6;
pub const RECORD_SIZE: usize = 52;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    #[serde(flatten)]
    pub base: netflow5::Record,
    pub in_encaps: u8,
    pub out_encaps: u8,
    pub peer_next_hop: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    pub header: Header,
    pub records: Vec<Record>,
}

pub fn decode(data: &[u8]) -> Result<Packet, DecodeError> {
    let mut r = ByteReader::new(data);
    let header = Header::read(&mut r, VERSION)?;
    let mut body = r.sub(usize::from(header.count) * RECORD_SIZE, "netflow v6 records")?;
    let mut records = Vec::with_capacity(usize::from(header.count));
    for _ in 0..header.count {
        let base = netflow5::Record::read(&mut body)?;
        records.push(Record {
            base,
            in_encaps: body.u8("flow record")?,
            out_encaps: body.u8("flow record")?,
            peer_next_hop: body.ipv4("flow record")?,
        });
    }
    Ok(Packet { header, records })
}
