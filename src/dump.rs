//! Consumers of decoded messages.
//!
//! Components:
//! - `consumer`: the [`Consumer`] trait, one action per message variant.
//! - `router`: exhaustive routing of a [`Message`](crate::decoding::Message) to its
//!   consumer action.
//! - `text`: human-readable rendering.
//! - `json`: one JSON document per message.

pub mod consumer;
pub mod json;
pub mod router;
pub mod text;

pub use consumer::Consumer;
pub use json::JsonDump;
pub use router::route;
pub use text::TextDump;
