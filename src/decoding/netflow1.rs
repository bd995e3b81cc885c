//! NetFlow version 1: fixed 16-byte header and 48-byte IPv4 flow records.

use std::net::Ipv4Addr;

use serde::Serialize;

use super::reader::ByteReader;
use crate::error_handling::types::DecodeError;

pub const VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 16;
pub const RECORD_SIZE: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: u16,
    pub count: u16,
    pub sys_uptime: u32,
    pub unix_secs: u32,
    pub unix_nsecs: u32,
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
    pub protocol: u8,
    pub tos: u8,
    pub tcp_flags: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    pub header: Header,
    pub records: Vec<Record>,
}

pub fn decode(data: &[u8]) -> Result<Packet, DecodeError> {
    let mut r = ByteReader::new(data);
    let header = Header {
        version: r.u16("netflow v1 header")?,
        count: r.u16("netflow v1 header")?,
        sys_uptime: r.u32("netflow v1 header")?,
        unix_secs: r.u32("netflow v1 header")?,
        unix_nsecs: r.u32("netflow v1 header")?,
    };
    if header.version != VERSION {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }

    let mut body = r.sub(usize::from(header.count) * RECORD_SIZE, "netflow v1 records")?;
    let mut records = Vec::with_capacity(usize::from(header.count));
    for _ in 0..header.count {
        let src_addr = body.ipv4("netflow v1 record")?;
        let dst_addr = body.ipv4("netflow v1 record")?;
        let next_hop = body.ipv4("netflow v1 record")?;
        let input = body.u16("netflow v1 record")?;
        let output = body.u16("netflow v1 record")?;
        let packets = body.u32("netflow v1 record")?;
        let octets = body.u32("netflow v1 record")?;
        let first = body.u32("netflow v1 record")?;
        let last = body.u32("netflow v1 record")?;
        let src_port = body.u16("netflow v1 record")?;
        let dst_port = body.u16("netflow v1 record")?;
        body.skip(2, "netflow v1 record")?;
        let protocol = body.u8("netflow v1 record")?;
        let tos = body.u8("netflow v1 record")?;
        let tcp_flags = body.u8("netflow v1 record")?;
        body.skip(7, "netflow v1 record")?;
        records.push(Record {
            src_addr,
            dst_addr,
            next_hop,
            input,
            output,
            packets,
            octets,
            first,
            last,
            src_port,
            dst_port,
            protocol,
            tos,
            tcp_flags,
        });
    }

    Ok(Packet { header, records })
}
