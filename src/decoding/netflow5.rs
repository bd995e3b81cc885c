//! NetFlow version 5: the de facto fixed-format export with AS numbers and
//! prefix masks. Its header layout is shared with version 6.

use std::net::Ipv4Addr;

use serde::Serialize;

use super::reader::ByteReader;
use crate::error_handling::types::DecodeError;

pub const VERSION: u16 = 5;
pub const HEADER_SIZE: usize = 24;
pub const RECORD_SIZE: usize = 48;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub version: u16,
    pub count: u16,
    pub sys_uptime: u32,
    pub unix_secs: u32,
    pub unix_nsecs: u32,
    pub flow_sequence: u32,
    pub engine_type: u8,
    pub engine_id: u8,
    pub sampling_interval: u16,
}

impl Header {
    pub(crate) fn read(r: &mut ByteReader<'_>, expected: u16) -> Result<Self, DecodeError> {
        let header = Header {
            version: r.u16("netflow header")?,
            count: r.u16("netflow header")?,
            sys_uptime: r.u32("netflow header")?,
            unix_secs: r.u32("netflow header")?,
            unix_nsecs: r.u32("netflow header")?,
            flow_sequence: r.u32("netflow header")?,
            engine_type: r.u8("netflow header")?,
            engine_id: r.u8("netflow header")?,
            sampling_interval: r.u16("netflow header")?,
        };
        if header.version != expected {
            return Err(DecodeError::UnsupportedVersion(header.version));
        }
        Ok(header)
    }

    /// Sampling interval with the two mode bits masked off; 0 means unsampled.
    pub fn sampling_rate(&self) -> u16 {
        self.sampling_interval & 0x3fff
    }
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
    pub tcp_flags: u8,
    pub protocol: u8,
    pub tos: u8,
    pub src_as: u16,
    pub dst_as: u16,
    pub src_mask: u8,
    pub dst_mask: u8,
}

impl Record {
    /// Reads the 46 octets v5 and v6 records have in common.
    pub(crate) fn read(r: &mut ByteReader<'_>) -> Result<Self, DecodeError> {
        let src_addr = r.ipv4("flow record")?;
        let dst_addr = r.ipv4("flow record")?;
        let next_hop = r.ipv4("flow record")?;
        let input = r.u16("flow record")?;
        let output = r.u16("flow record")?;
        let packets = r.u32("flow record")?;
        let octets = r.u32("flow record")?;
        let first = r.u32("flow record")?;
        let last = r.u32("flow record")?;
        let src_port = r.u16("flow record")?;
        let dst_port = r.u16("flow record")?;
        r.skip(1, "flow record")?;
        let tcp_flags = r.u8("flow record")?;
        let protocol = r.u8("flow record")?;
        let tos = r.u8("flow record")?;
        let src_as = r.u16("flow record")?;
        let dst_as = r.u16("flow record")?;
        let src_mask = r.u8("flow record")?;
        let dst_mask = r.u8("flow record")?;
        Ok(Record {
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
            tcp_flags,
            protocol,
            tos,
            src_as,
            dst_as,
            src_mask,
            dst_mask,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Packet {
    pub header: Header,
    pub records: Vec<Record>,
}

pub fn decode(data: &[u8]) -> Result<Packet, DecodeError> {
    let mut r = ByteReader::new(data);
    let header = Header::read(&mut r, VERSION)?;
    let mut body = r.sub(usize::from(header.count) * RECORD_SIZE, "netflow v5 records")?;
    let mut records = Vec::with_capacity(usize::from(header.count));
    for _ in 0..header.count {
        records.push(Record::read(&mut body)?);
        body.skip(2, "flow record")?;
    }
    Ok(Packet { header, records })
}
