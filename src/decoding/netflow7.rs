//! NetFlow version 7: Catalyst switch export with router shortcut records.

use std::net::Ipv4Addr;

use serde::Serialize;

use super::reader::ByteReader;
use crate::error_handling::types::DecodeError;

pub const VERSION: u16 = 7;
pub const HEADER_SIZE: usize = 24;
pub const RECORD_SIZE: usize = 52;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: u16,
    pub count: u16,
    pub sys_uptime: u32,
    pub unix_secs: u32,
    pub unix_nsecs: u32,
    pub flow_sequence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub src_addr: Ipv4Addr,
    pub dst_addr: Ipv4Addr,
    pub next_hop: Ipv4Addr,
    pub input: u16,
    pub output: u16,
    pub packets: u32,
    pub octets: u32,
    pub first: u32,
    pub last: u32,
    pub src_port: u16,
    pub dst_port: u16,
    pub flags: u8,
    pub tcp_flags: u8,
    pub protocol: u8,
    pub tos: u8,
    pub src_as: u16,
    pub dst_as: u16,
    pub src_mask: u8,
    pub dst_mask: u8,
    pub flags2: u16,
    pub router_sc: Ipv4Addr,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    pub header: Header,
    pub records: Vec<Record>,
}

pub fn decode(data: &[u8]) -> Result<Packet, DecodeError> {
    let mut r = ByteReader::new(data);
    let header = Header {
        version: r.u16("netflow v7 header")?,
        count: r.u16("netflow v7 header")?,
        sys_uptime: r.u32("netflow v7 header")?,
        unix_secs: r.u32("netflow v7 header")?,
        unix_nsecs: r.u32("netflow v7 header")?,
        flow_sequence: r.u32("netflow v7 header")?,
    };
    if header.version != VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }
    r.skip(4, "netflow v7 header")?;

    let mut body = r.sub(usize::from(header.count) * RECORD_SIZE, "netflow v7 records")?;
    let mut records = Vec::with_capacity(usize::from(header.count));
    for _ in 0..header.count {
        records.push(Record {
            src_addr: body.ipv4("netflow v7 record")?,
            dst_addr: body.ipv4("netflow v7 record")?,
            next_hop: body.ipv4("netflow v7 record")?,
            input: body.u16("netflow v7 record")?,
            output: body.u16("netflow v7 record")?,
            packets: body.u32("netflow v7 record")?,
            octets: body.u32("netflow v7 record")?,
            first: body.u32("netflow v7 record")?,
            last: body.u32("netflow v7 record")?,
            src_port: body.u16("netflow v7 record")?,
            dst_port: body.u16("netflow v7 record")?,
            flags: body.u8("netflow v7 record")?,
            tcp_flags: body.u8("netflow v7 record")?,
            protocol: body.u8("netflow v7 record")?,
            tos: body.u8("netflow v7 record")?,
            src_as: body.u16("netflow v7 record")?,
            dst_as: body.u16("netflow v7 record")?,
            src_mask: body.u8("netflow v7 record")?,
            dst_mask: body.u8("netflow v7 record")?,
            flags2: body.u16("netflow v7 record")?,
            router_sc: body.ipv4("netflow v7 record")?,
        });
    }
    Ok(Packet { header, records })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_router_shortcut() {
        let mut data = Vec::new();
        data.extend_from_slice(&VERSION.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&[0u8; HEADER_SIZE - 4]);
        let mut rec = [0u8; RECORD_SIZE];
        rec[36] = 0x01;
        rec[38] = 6;
        rec[48..52].copy_from_slice(&[10, 1, 1, 1]);
        data.extend_from_slice(&rec);

        let p = decode(&data).unwrap();
        assert_eq!(p.records.len(), 1);
        assert_eq!(p.records[0].flags, 1);
        assert_eq!(p.records[0].protocol, 6);
        assert_eq!(p.records[0].router_sc, Ipv4Addr::new(10, 1, 1, 1));
    }

    #[test]
    fn wrong_version_is_rejected() {
        let mut data = vec![0u8; HEADER_SIZE];
        data[1] = 5;
        assert_eq!(decode(&data), Err(DecodeError::UnsupportedVersion(5)));
    }
}
