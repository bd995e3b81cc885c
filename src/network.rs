//! Datagram reception and dispatch.
//!
//! - `dispatcher`: per-datagram protocol: exporter lookup, decode, route.
//! - `network_listener`: socket setup and the receive loop driving the dispatcher.
//! - `types`: outcomes and counters reported by the dispatcher.

pub mod dispatcher;
pub mod network_listener;
pub mod types;

pub use dispatcher::Dispatcher;
pub use network_listener::NetworkListener;
pub use types::{DispatchStats, Outcome};
