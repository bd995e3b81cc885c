//! Per-exporter session management.
//!
//! This module provides the types that tie each exporter to the long-lived
//! decoding context its templates are learned into:
//! - [`exporter`]: exporter identity and the policy deriving it from a source address.
//! - [`session`]: the per-exporter decoding context.
//! - [`session_store`]: lookup-or-create ownership of all sessions.

/// Exporter identity and keying policy.
pub mod exporter;
/// Per-exporter decoding context.
pub mod session;
/// Session store implementation.
pub mod session_store;

pub use exporter::{ExporterId, KeyPolicy};
pub use session::Session;
pub use session_store::{SessionStore, SharedSession};
