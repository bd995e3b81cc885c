//! # Dispatcher
//!
//! The per-datagram half of the receive loop: resolve the exporter, fetch or
//! create its session, decode the payload against that session, and route the
//! decoded message to the consumer. Every failure here is terminal for the
//! datagram only.
//!
//! ```text
//! datagram ─▶ ExporterId ─▶ SessionStore ─▶ WireDecoder ─▶ route ─▶ Consumer
//! ```

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::time::Instant;

use super::types::{DispatchStats, Outcome};
use crate::decoding::WireDecoder;
use crate::dump::{route, Consumer};
use crate::session_management::{ExporterId, KeyPolicy, SessionStore};

pub struct Dispatcher<D, C> {
    sessions: Arc<SessionStore>,
    decoder: D,
    consumer: C,
    key_policy: KeyPolicy,
    stats: DispatchStats,
}

impl<D: WireDecoder, C: Consumer> Dispatcher<D, C> {
    /// Creates a dispatcher over an injected session store, so callers (and
    /// tests) decide the store's lifetime and sharing.
    pub fn new(
        sessions: Arc<SessionStore>,
        decoder: D,
        consumer: C,
        key_policy: KeyPolicy,
    ) -> Self {
        Self {
            sessions,
            decoder,
            consumer,
            key_policy,
            stats: DispatchStats::default(),
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Handles the result of one receive into `buf`.
    ///
    /// Only the first `octets` bytes reported by the transport are decoded;
    /// the remainder of `buf` is never looked at.
    pub fn process(&mut self, received: io::Result<(usize, SocketAddr)>, buf: &[u8]) -> Outcome {
        match received {
            Ok((octets, remote)) => {
                let payload = &buf[..octets.min(buf.len())];
                self.handle_datagram(remote, payload)
            }
            Err(e) => {
                self.stats.read_errors += 1;
                error!("Error reading datagram: {}", e);
                Outcome::ReadFailed
            }
        }
    }

    /// Decodes and routes one datagram from `remote`.
    pub fn handle_datagram(&mut self, remote: SocketAddr, payload: &[u8]) -> Outcome {
        self.stats.datagrams += 1;
        self.stats.bytes += payload.len() as u64;
        debug!("Received {} bytes from {}", payload.len(), remote);

        let exporter = ExporterId::resolve(self.key_policy, remote);
        let session = self.sessions.get_or_create(&exporter);
        let decoded = {
            let mut session = session.lock().unwrap_or_else(PoisonError::into_inner);
            self.decoder.decode(&mut session, payload)
        };

        match decoded {
            Ok(message) => {
                let version = message.version();
                route(message, &mut self.consumer);
                self.stats.routed += 1;
                Outcome::Routed { exporter, version }
            }
            Err(error) => {
                self.stats.decode_errors += 1;
                warn!("Decoder error for exporter {}: {}", exporter, error);
                Outcome::DecodeFailed { exporter, error }
            }
        }
    }

    /// Evicts sessions idle for longer than `max_idle` as of `now`.
    pub fn evict_idle(&mut self, max_idle: Duration, now: Instant) -> usize {
        let evicted = self.sessions.evict_idle(max_idle, now);
        if evicted > 0 {
            info!(
                "Evicted {} idle sessions, {} remaining",
                evicted,
                self.sessions.len()
            );
        }
        self.stats.evicted += evicted as u64;
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoding::testutil::{self, Collector};
    use crate::decoding::{FlowDecoder, Message};
    use crate::error_handling::types::DecodeError;
    use crate::session_management::Session;
    use std::cell::RefCell;
    use uuid::Uuid;

    /// Records the session id and exact payload of every decode call.
    #[derive(Default)]
    struct Probe {
        seen: RefCell<Vec<(Uuid, Vec<u8>)>>,
    }

    impl WireDecoder for &Probe {
        fn decode(&self, session: &mut Session, payload: &[u8]) -> Result<Message, DecodeError> {
            self.seen.borrow_mut().push((session.id(), payload.to_vec()));
            FlowDecoder::new().decode(session, payload)
        }
    }

    fn addr(s: &str) -> SocketAddr {
        s.parse().unwrap()
    }

    fn dispatcher<D: WireDecoder>(decoder: D) -> (Dispatcher<D, Collector>, Collector) {
        let collector = Collector::default();
        let d = Dispatcher::new(
            Arc::new(SessionStore::new()),
            decoder,
            collector.clone(),
            KeyPolicy::AddressPort,
        );
        (d, collector)
    }

    #[test]
    fn same_exporter_reuses_its_session() {
        let probe = Probe::default();
        let (mut d, _) = dispatcher(&probe);
        let e1 = addr("192.0.2.1:3000");
        let e2 = addr("192.0.2.2:3000");
        d.handle_datagram(e1, &testutil::netflow_v5(&[(1, 80)]));
        d.handle_datagram(e2, &testutil::netflow_v5(&[(2, 80)]));
        d.handle_datagram(e1, &testutil::netflow_v5(&[(3, 80)]));

        let seen = probe.seen.borrow();
        assert_eq!(seen[0].0, seen[2].0);
        assert_ne!(seen[0].0, seen[1].0);
        assert_eq!(d.sessions().len(), 2);
    }

    #[test]
    fn decoder_sees_only_the_bytes_read() {
        let probe = Probe::default();
        let (mut d, collector) = dispatcher(&probe);
        let packet = testutil::netflow_v5(&[(1, 80)]);
        let mut buf = vec![0u8; 8192];
        buf[..packet.len()].copy_from_slice(&packet);
        buf[packet.len()..].fill(0xee);

        let outcome = d.process(Ok((packet.len(), addr("192.0.2.1:3000"))), &buf);
        assert!(matches!(outcome, Outcome::Routed { version: 5, .. }));
        assert_eq!(probe.seen.borrow()[0].1, packet);
        assert_eq!(collector.len(), 1);
    }

    #[test]
    fn read_error_does_not_stop_processing() {
        let (mut d, collector) = dispatcher(FlowDecoder::new());
        let err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert_eq!(d.process(Err(err), &[]), Outcome::ReadFailed);

        let packet = testutil::netflow_v5(&[(1, 80)]);
        let outcome = d.process(Ok((packet.len(), addr("192.0.2.1:3000"))), &packet);
        assert!(matches!(outcome, Outcome::Routed { .. }));
        assert_eq!(collector.len(), 1);
        assert_eq!(d.stats().read_errors, 1);
        assert_eq!(d.stats().routed, 1);
    }

    #[test]
    fn decode_failure_is_isolated_per_exporter() {
        let (mut d, collector) = dispatcher(FlowDecoder::new());
        let a = addr("192.0.2.1:3000");
        let b = addr("192.0.2.2:3000");
        d.handle_datagram(b, &testutil::v9_template_packet(1, 256));

        let outcome = d.handle_datagram(a, &[0x00, 0x63, 0x01]);
        assert!(matches!(
            outcome,
            Outcome::DecodeFailed { error: DecodeError::UnsupportedVersion(99), .. }
        ));

        let b_session = d.sessions().get(&ExporterId::Socket(b)).unwrap();
        assert_eq!(b_session.lock().unwrap().template_count(), 1);
        drop(b_session);

        assert!(matches!(
            d.handle_datagram(a, &testutil::netflow_v5(&[(1, 80)])),
            Outcome::Routed { .. }
        ));
        assert!(matches!(
            d.handle_datagram(b, &testutil::v9_data_packet(1, 256, &[(2, 80)])),
            Outcome::Routed { version: 9, .. }
        ));
        assert_eq!(collector.len(), 3);
        assert_eq!(d.stats().decode_errors, 1);
    }

    #[test]
    fn interleaved_exporters_keep_their_own_templates() {
        let (mut d, collector) = dispatcher(FlowDecoder::new());
        let e1 = addr("198.51.100.1:2055");
        let e2 = addr("198.51.100.2:2055");
        // Both exporters reuse source id 1 and template 256 with different layouts.
        let mut e2_template = Vec::new();
        e2_template.extend_from_slice(&256u16.to_be_bytes());
        e2_template.extend_from_slice(&1u16.to_be_bytes());
        e2_template.extend_from_slice(&2u16.to_be_bytes());
        e2_template.extend_from_slice(&4u16.to_be_bytes());

        d.handle_datagram(e1, &testutil::v9_template_packet(1, 256));
        d.handle_datagram(e2, &testutil::v9_packet(1, &[(0, e2_template)]));
        let r1 = d.handle_datagram(e1, &testutil::v9_data_packet(1, 256, &[(1, 80)]));
        let e2_data = testutil::v9_packet(1, &[(256, 77u32.to_be_bytes().to_vec())]);
        let r2 = d.handle_datagram(e2, &e2_data);

        assert!(matches!(r1, Outcome::Routed { version: 9, .. }));
        assert!(matches!(r2, Outcome::Routed { version: 9, .. }));
        let messages = collector.take();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[2].record_count(), 1);
        assert_eq!(messages[3].record_count(), 1);
        match &messages[3] {
            Message::NetflowV9(p) => match &p.flow_sets[0] {
                crate::decoding::template::FlowSet::Data { records, .. } => {
                    assert_eq!(records[0].fields.len(), 1);
                    assert_eq!(records[0].fields[0].name, Some("packetDeltaCount"));
                }
                other => panic!("unexpected flowset {:?}", other),
            },
            other => panic!("unexpected message {:?}", other),
        }
    }

    #[test]
    fn data_before_template_fails_then_recovers() {
        let (mut d, collector) = dispatcher(FlowDecoder::new());
        let e = addr("203.0.113.5:9996");

        let early = d.handle_datagram(e, &testutil::ipfix_data_message(3, 300, &[(1, 443)]));
        assert!(matches!(
            early,
            Outcome::DecodeFailed {
                error: DecodeError::UnknownTemplate {
                    template_id: 300,
                    ..
                },
                ..
            }
        ));

        d.handle_datagram(e, &testutil::ipfix_template_message(3, 300));
        let late = d.handle_datagram(e, &testutil::ipfix_data_message(3, 300, &[(1, 443)]));
        assert!(matches!(late, Outcome::Routed { version: 10, .. }));
        assert_eq!(collector.len(), 2);
        assert_eq!(d.stats().decode_errors, 1);
        assert_eq!(d.sessions().len(), 1);
    }

    #[test]
    fn address_policy_shares_session_across_ports() {
        let collector = Collector::default();
        let mut d = Dispatcher::new(
            Arc::new(SessionStore::new()),
            FlowDecoder::new(),
            collector.clone(),
            KeyPolicy::Address,
        );
        d.handle_datagram(addr("192.0.2.9:1000"), &testutil::v9_template_packet(1, 256));
        let outcome = d.handle_datagram(
            addr("192.0.2.9:1001"),
            &testutil::v9_data_packet(1, 256, &[(1, 80)]),
        );
        assert!(matches!(outcome, Outcome::Routed { .. }));
        assert_eq!(d.sessions().len(), 1);
    }

    #[test]
    fn eviction_is_counted() {
        let (mut d, _) = dispatcher(FlowDecoder::new());
        d.handle_datagram(addr("192.0.2.1:1"), &testutil::netflow_v5(&[]));
        assert_eq!(d.evict_idle(Duration::from_secs(60), Instant::now()), 0);
        let later = Instant::now() + Duration::from_secs(61);
        assert_eq!(d.evict_idle(Duration::from_secs(60), later), 1);
        assert_eq!(d.stats().evicted, 1);
        assert!(d.sessions().is_empty());
    }
}
