use crate::error_handling::types::DecodeError;
use crate::session_management::ExporterId;

/// What happened to one receive attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The transport reported an error; nothing was decoded.
    ReadFailed,
    /// The datagram was discarded because it could not be decoded.
    DecodeFailed {
        exporter: ExporterId,
        error: DecodeError,
    },
    /// The decoded message was handed to its consumer.
    Routed { exporter: ExporterId, version: u16 },
}

/// Running counters kept by the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub datagrams: u64,
    pub bytes: u64,
    pub read_errors: u64,
    pub decode_errors: u64,
    pub routed: u64,
    pub evicted: u64,
}
