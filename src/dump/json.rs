//! JSON rendering: one document per line, tagged with the protocol.

use std::io::{self, Write};

use log::warn;

use super::consumer::Consumer;
use crate::decoding::{ipfix, netflow1, netflow5, netflow6, netflow7, netflow9, Message};

pub struct JsonDump<W: Write> {
    writer: W,
}

impl JsonDump<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> JsonDump<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Writes `message` as `{"protocol": ..., "packet": ...}` on one line.
    fn emit(&mut self, message: Message) {
        let result = serde_json::to_writer(&mut self.writer, &message)
            .map_err(io::Error::from)
            .and_then(|_| self.writer.write_all(b"\n"))
            .and_then(|_| self.writer.flush());
        if let Err(e) = result {
            warn!("Failed to write version {} JSON dump: {}", message.version(), e);
        }
    }
}

impl<W: Write> Consumer for JsonDump<W> {
    fn netflow_v1(&mut self, packet: netflow1::Packet) {
        self.emit(Message::NetflowV1(packet));
    }

    fn netflow_v5(&mut self, packet: netflow5::Packet) {
        self.emit(Message::NetflowV5(packet));
    }

    fn netflow_v6(&mut self, packet: netflow6::Packet) {
        self.emit(Message::NetflowV6(packet));
    }

    fn netflow_v7(&mut self, packet: netflow7::Packet) {
        self.emit(Message::NetflowV7(packet));
    }

    fn netflow_v9(&mut self, packet: netflow9::Packet) {
        self.emit(Message::NetflowV9(packet));
    }

    fn ipfix(&mut self, message: ipfix::Message) {
        self.emit(Message::Ipfix(message));
    }
}
