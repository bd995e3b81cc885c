use log::trace;

use super::message::Message;
use super::reader::ByteReader;
use super::{ipfix, netflow1, netflow5, netflow6, netflow7, netflow9};
use crate::error_handling::types::DecodeError;
use crate::session_management::session::Session;

/// Interprets one datagram in the context of its exporter's session.
///
/// Implementations may learn state (templates) into the session as a side
/// effect; they must not retain the payload.
pub trait WireDecoder {
    fn decode(&self, session: &mut Session, payload: &[u8]) -> Result<Message, DecodeError>;
}

/// Version-detecting decoder for NetFlow v1/5/6/7/9 and IPFIX.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlowDecoder;

impl FlowDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Reads the version field without consuming the payload.
    pub fn peek_version(payload: &[u8]) -> Result<u16, DecodeError> {
        ByteReader::new(payload).u16("version")
    }
}

impl WireDecoder for FlowDecoder {
    fn decode(&self, session: &mut Session, payload: &[u8]) -> Result<Message, DecodeError> {
        let version = Self::peek_version(payload)?;
        trace!("Decoding version {} payload of {} bytes", version, payload.len());
        match version {
            netflow1::VERSION => netflow1::decode(payload).map(Message::NetflowV1),
            netflow5::VERSION => netflow5::decode(payload).map(Message::NetflowV5),
            netflow6::VERSION => netflow6::decode(payload).map(Message::NetflowV6),
            netflow7::VERSION => netflow7::decode(payload).map(Message::NetflowV7),
            netflow9::VERSION => netflow9::decode(payload, session.netflow9_templates_mut())
                .map(Message::NetflowV9),
            ipfix::VERSION => {
                ipfix::decode(payload, session.ipfix_templates_mut()).map(Message::Ipfix)
            }
            other => Err(DecodeError::UnsupportedVersion(other)),
        }
    }
}
