//! Flow-export wire decoding.
//!
//! This module turns one datagram payload into one typed [`Message`],
//! consulting and updating the exporter's [`Session`] for template-based
//! versions. Version detection happens in [`FlowDecoder`]; each version has
//! its own parser module.
//!
//! Supported versions:
//! - `netflow1`, `netflow5`, `netflow6`, `netflow7`: fixed-format records.
//! - `netflow9`, `ipfix`: template-defined records, templates kept per session.
//!
//! [`Session`]: crate::session_management::session::Session

pub mod decoder;
pub mod elements;
pub mod ipfix;
pub mod message;
pub mod netflow1;
pub mod netflow5;
pub mod netflow6;
pub mod netflow7;
pub mod netflow9;
pub mod reader;
pub mod template;
#[cfg(test)]
pub(crate) mod testutil;

pub use decoder::{FlowDecoder, WireDecoder};
pub use message::Message;
