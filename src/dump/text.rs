//! Human-readable rendering of decoded messages.

use std::io::{self, Write};

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;

use super::consumer::Consumer;
use crate::decoding::template::{FieldSpecifier, FlowSet, Template};
use crate::decoding::{ipfix, netflow1, netflow5, netflow6, netflow7, netflow9};

/// Writes a multi-line description of each message to `W`.
pub struct TextDump<W: Write> {
    writer: W,
}

impl TextDump<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TextDump<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn finish(&mut self, what: &str, result: io::Result<()>) {
        if let Err(e) = result.and_then(|_| self.writer.flush()) {
            warn!("Failed to write {} dump: {}", what, e);
        }
    }

    fn write_v1(&mut self, p: &netflow1::Packet) -> io::Result<()> {
        let w = &mut self.writer;
        let h = &p.header;
        writeln!(w, "NetFlow version 1 packet")?;
        writeln!(
            w,
            "  {} records, exported {}, uptime {}",
            h.count,
            export_time(h.unix_secs, h.unix_nsecs),
            uptime(h.sys_uptime)
        )?;
        for r in &p.records {
            writeln!(
                w,
                "  {}:{} -> {}:{} proto {} tos {} flags {:#04x} packets {} bytes {} if {} -> {} via {}",
                r.src_addr,
                r.src_port,
                r.dst_addr,
                r.dst_port,
                r.protocol,
                r.tos,
                r.tcp_flags,
                r.packets,
                r.octets,
                r.input,
                r.output,
                r.next_hop
            )?;
        }
        Ok(())
    }

    fn write_v5_header(&mut self, version: u16, h: &netflow5::Header) -> io::Result<()> {
        let w = &mut self.writer;
        writeln!(w, "NetFlow version {} packet", version)?;
        writeln!(
            w,
            "  sequence {}, {} records, exported {}, uptime {}, engine {}/{}, sampling {}",
            h.flow_sequence,
            h.count,
            export_time(h.unix_secs, h.unix_nsecs),
            uptime(h.sys_uptime),
            h.engine_type,
            h.engine_id,
            h.sampling_rate()
        )
    }

    fn write_v5_record(&mut self, r: &netflow5::Record) -> io::Result<()> {
        write!(
            self.writer,
            "  {}:{} -> {}:{} proto {} tos {} flags {:#04x} packets {} bytes {} as {} -> {} mask /{} -> /{} if {} -> {} via {}",
            r.src_addr,
            r.src_port,
            r.dst_addr,
            r.dst_port,
            r.protocol,
            r.tos,
            r.tcp_flags,
            r.packets,
            r.octets,
            r.src_as,
            r.dst_as,
            r.src_mask,
            r.dst_mask,
            r.input,
            r.output,
            r.next_hop
        )
    }

    fn write_v5(&mut self, p: &netflow5::Packet) -> io::Result<()> {
        self.write_v5_header(netflow5::VERSION, &p.header)?;
        for r in &p.records {
            self.write_v5_record(r)?;
            writeln!(self.writer)?;
        }
        Ok(())
    }

    fn write_v6(&mut self, p: &netflow6::Packet) -> io::Result<()> {
        self.write_v5_header(netflow6::VERSION, &p.header)?;
        for r in &p.records {
            self.write_v5_record(&r.base)?;
            writeln!(
                self.writer,
                " encaps {}/{} peer {}",
                r.in_encaps, r.out_encaps, r.peer_next_hop
            )?;
        }
        Ok(())
    }

    fn write_v7(&mut self, p: &netflow7::Packet) -> io::Result<()> {
        let w = &mut self.writer;
        let h = &p.header;
        writeln!(w, "NetFlow version 7 packet")?;
        writeln!(
            w,
            "  sequence {}, {} records, exported {}, uptime {}",
            h.flow_sequence,
            h.count,
            export_time(h.unix_secs, h.unix_nsecs),
            uptime(h.sys_uptime)
        )?;
        for r in &p.records {
            writeln!(
                w,
                "  {}:{} -> {}:{} proto {} tos {} flags {:#04x} packets {} bytes {} as {} -> {} mask /{} -> /{} if {} -> {} via {} shortcut {}",
                r.src_addr,
                r.src_port,
                r.dst_addr,
                r.dst_port,
                r.protocol,
                r.tos,
                r.tcp_flags,
                r.packets,
                r.octets,
                r.src_as,
                r.dst_as,
                r.src_mask,
                r.dst_mask,
                r.input,
                r.output,
                r.next_hop,
                r.router_sc
            )?;
        }
        Ok(())
    }

    fn write_v9(&mut self, p: &netflow9::Packet) -> io::Result<()> {
        let h = &p.header;
        writeln!(self.writer, "NetFlow version 9 packet")?;
        writeln!(
            self.writer,
            "  source id {}, sequence {}, exported {}, uptime {}",
            h.source_id,
            h.sequence,
            export_time(h.unix_secs, 0),
            uptime(h.sys_uptime)
        )?;
        self.write_sets(&p.flow_sets)
    }

    fn write_ipfix(&mut self, m: &ipfix::Message) -> io::Result<()> {
        let h = &m.header;
        writeln!(self.writer, "IPFIX message")?;
        writeln!(
            self.writer,
            "  observation domain {}, sequence {}, exported {}, {} bytes",
            h.observation_domain_id,
            h.sequence,
            export_time(h.export_time, 0),
            h.length
        )?;
        self.write_sets(&m.sets)
    }

    fn write_sets(&mut self, sets: &[FlowSet]) -> io::Result<()> {
        for set in sets {
            match set {
                FlowSet::Templates { templates } => {
                    for t in templates {
                        self.write_template("template", t)?;
                    }
                }
                FlowSet::OptionsTemplates { templates } => {
                    for t in templates {
                        self.write_template("options template", t)?;
                    }
                }
                FlowSet::Data {
                    template_id,
                    records,
                } => {
                    writeln!(self.writer, "  data {}: {} records", template_id, records.len())?;
                    for record in records {
                        let fields: Vec<String> = record
                            .fields
                            .iter()
                            .map(|f| match f.name {
                                Some(name) => format!("{}={}", name, f.value),
                                None => {
                                    format!("{}={}", element_label(f.id, f.enterprise), f.value)
                                }
                            })
                            .collect();
                        writeln!(self.writer, "    {}", fields.join(" "))?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_template(&mut self, kind: &str, t: &Template) -> io::Result<()> {
        if t.is_withdrawal() {
            return writeln!(self.writer, "  {} {} withdrawn", kind, t.id);
        }
        let fields: Vec<String> = t.fields.iter().map(describe_field).collect();
        writeln!(self.writer, "  {} {}: {}", kind, t.id, fields.join(" "))
    }
}

fn element_label(id: u16, enterprise: Option<u32>) -> String {
    match enterprise {
        Some(pen) => format!("{}.{}", pen, id),
        None => id.to_string(),
    }
}

fn describe_field(spec: &FieldSpecifier) -> String {
    let label = element_label(spec.id, spec.enterprise);
    match spec.name() {
        Some(name) => format!("{}({})/{}", name, label, spec.length),
        None => format!("{}/{}", label, spec.length),
    }
}

fn export_time(secs: u32, nsecs: u32) -> String {
    match DateTime::<Utc>::from_timestamp(i64::from(secs), nsecs) {
        Some(t) => t.to_rfc3339_opts(SecondsFormat::Millis, true),
        None => format!("{}.{:09}", secs, nsecs),
    }
}

fn uptime(millis: u32) -> String {
    format!("{}.{:03}s", millis / 1000, millis % 1000)
}

impl<W: Write> Consumer for TextDump<W> {
    fn netflow_v1(&mut self, packet: netflow1::Packet) {
        let result = self.write_v1(&packet);
        self.finish("netflow v1", result);
    }

    fn netflow_v5(&mut self, packet: netflow5::Packet) {
        let result = self.write_v5(&packet);
        self.finish("netflow v5", result);
    }

    fn netflow_v6(&mut self, packet: netflow6::Packet) {
        let result = self.write_v6(&packet);
        self.finish("netflow v6", result);
    }

    fn netflow_v7(&mut self, packet: netflow7::Packet) {
        let result = self.write_v7(&packet);
        self.finish("netflow v7", result);
    }

    fn netflow_v9(&mut self, packet: netflow9::Packet) {
        let result = self.write_v9(&packet);
        self.finish("netflow v9", result);
    }

    fn ipfix(&mut self, message: ipfix::Message) {
        let result = self.write_ipfix(&message);
        self.finish("ipfix", result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::testutil;
    use crate::decoding::template::TemplateCache;

    fn render<F: FnOnce(&mut TextDump<Vec<u8>>)>(f: F) -> String {
        let mut dump = TextDump::new(Vec::new());
        f(&mut dump);
        String::from_utf8(dump.into_inner()).unwrap()
    }

    #[test]
    fn renders_v5_records() {
        let packet = netflow5::decode(&testutil::netflow_v5(&[(3, 443)])).unwrap();
        let out = render(|d| d.netflow_v5(packet));
        assert!(out.starts_with("NetFlow version 5 packet\n"));
        assert!(out.contains("exported 2023-11-14T22:13:20.000Z"));
        assert!(out.contains("uptime 360.000s"));
        assert!(out.contains("10.0.0.3:40000 -> 10.0.1.1:443 proto 6"));
    }

    #[test]
    fn renders_v9_templates_and_named_fields() {
        let mut cache = TemplateCache::new();
        let template = netflow9::decode(&testutil::v9_template_packet(4, 256), &mut cache).unwrap();
        let data = netflow9::decode(&testutil::v9_data_packet(4, 256, &[(9, 53)]), &mut cache)
            .unwrap();
        let out = render(|d| {
            d.netflow_v9(template);
            d.netflow_v9(data);
        });
        assert!(out.contains("template 256: sourceIPv4Address(8)/4"));
        assert!(out.contains("data 256: 1 records"));
        assert!(out.contains("sourceIPv4Address=10.0.0.9"));
        assert!(out.contains("destinationTransportPort=53"));
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_failures_do_not_panic() {
        let packet = netflow5::decode(&testutil::netflow_v5(&[(1, 1)])).unwrap();
        let mut dump = TextDump::new(FailingWriter);
        dump.netflow_v5(packet);
    }
}
