//! # Network Listener Module
//!
//! Owns the UDP socket and drives the receive loop. Each datagram is handed to
//! a [`Dispatcher`] on the same task, so decoding is sequential per socket and
//! a slow consumer applies back-pressure to the socket buffer.
//!
//! ```text
//! ┌─────────────┐    ┌──────────────────┐    ┌─────────────┐
//! │ Exporters   │───▶│ NetworkListener  │───▶│ Dispatcher  │
//! │ (UDP)       │    │ - recv_from loop │    │             │
//! └─────────────┘    │ - idle sweeps    │    └─────────────┘
//!                    │ - shutdown       │
//!                    └──────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use nf_dump::decoding::FlowDecoder;
//! use nf_dump::dump::TextDump;
//! use nf_dump::network::network_listener::{bind_socket, resolve_listen_addr};
//! use nf_dump::network::{Dispatcher, NetworkListener};
//! use nf_dump::session_management::{KeyPolicy, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), nf_dump::error_handling::types::NetworkError> {
//!     let addr = resolve_listen_addr(":2055").await?;
//!     let socket = bind_socket(addr, 131_072).await?;
//!     let dispatcher = Dispatcher::new(
//!         Arc::new(SessionStore::new()),
//!         FlowDecoder::new(),
//!         TextDump::stdout(),
//!         KeyPolicy::default(),
//!     );
//!     let listener = NetworkListener::new(socket, dispatcher, 8192);
//!     listener.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use log::{info, warn};
use socket2::SockRef;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::{interval_at, Instant, Interval};

use super::dispatcher::Dispatcher;
use super::types::DispatchStats;
use crate::decoding::WireDecoder;
use crate::dump::Consumer;
use crate::error_handling::types::NetworkError;

/// Resolves a listen address. A bare `:port` listens on every IPv4 interface.
pub async fn resolve_listen_addr(addr: &str) -> Result<SocketAddr, NetworkError> {
    let normalized = if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    };

    let mut candidates = lookup_host(normalized.as_str())
        .await
        .map_err(|e| NetworkError::ResolveFailed(format!("{}: {}", addr, e)))?;
    candidates
        .next()
        .ok_or_else(|| NetworkError::ResolveFailed(format!("{}: no address found", addr)))
}

/// Binds the UDP socket and asks the kernel for a receive buffer of
/// `read_buffer` bytes. The kernel may grant a different size; the granted
/// size is logged.
pub async fn bind_socket(addr: SocketAddr, read_buffer: usize) -> Result<UdpSocket, NetworkError> {
    let socket = UdpSocket::bind(addr)
        .await
        .map_err(NetworkError::BindError)?;

    let sock = SockRef::from(&socket);
    sock.set_recv_buffer_size(read_buffer)
        .map_err(NetworkError::SockError)?;
    match sock.recv_buffer_size() {
        Ok(granted) => info!(
            "Listening on {} (receive buffer {} bytes, requested {})",
            addr, granted, read_buffer
        ),
        Err(e) => warn!("Could not read back receive buffer size: {}", e),
    }

    Ok(socket)
}

enum Event {
    Shutdown,
    Received(io::Result<(usize, SocketAddr)>),
    Sweep(Instant),
}

/// Receive loop over one bound UDP socket.
pub struct NetworkListener<D, C> {
    socket: UdpSocket,
    dispatcher: Dispatcher<D, C>,
    max_datagram: usize,
    session_timeout: Option<Duration>,
}

impl<D: WireDecoder, C: Consumer> NetworkListener<D, C> {
    pub fn new(socket: UdpSocket, dispatcher: Dispatcher<D, C>, max_datagram: usize) -> Self {
        Self {
            socket,
            dispatcher,
            max_datagram,
            session_timeout: None,
        }
    }

    /// Enables periodic eviction of sessions idle for longer than `timeout`.
    pub fn with_session_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.session_timeout = timeout;
        self
    }

    pub fn local_addr(&self) -> Result<SocketAddr, NetworkError> {
        self.socket.local_addr().map_err(NetworkError::SockError)
    }

    /// Receives datagrams until `shutdown` completes, then returns the
    /// dispatcher's counters.
    ///
    /// Read errors are logged and the loop carries on. Every receive gets a
    /// freshly zeroed buffer of `max_datagram` bytes, so a payload never
    /// carries bytes from a previous datagram.
    pub async fn run<F: Future<Output = ()>>(mut self, shutdown: F) -> DispatchStats {
        tokio::pin!(shutdown);

        let mut sweep = self.session_timeout.map(|timeout| {
            let period = sweep_period(timeout);
            interval_at(Instant::now() + period, period)
        });

        loop {
            let mut buf = vec![0u8; self.max_datagram];
            let event = tokio::select! {
                biased;
                _ = &mut shutdown => Event::Shutdown,
                now = next_sweep(&mut sweep) => Event::Sweep(now),
                received = self.socket.recv_from(&mut buf) => Event::Received(received),
            };

            match event {
                Event::Shutdown => {
                    info!("Shutdown requested, stopping listener");
                    break;
                }
                Event::Sweep(now) => {
                    if let Some(max_idle) = self.session_timeout {
                        self.dispatcher.evict_idle(max_idle, now);
                    }
                }
                Event::Received(received) => {
                    self.dispatcher.process(received, &buf);
                }
            }
        }

        self.dispatcher.stats()
    }
}

fn sweep_period(timeout: Duration) -> Duration {
    (timeout / 4).max(Duration::from_secs(1))
}

async fn next_sweep(sweep: &mut Option<Interval>) -> Instant {
    match sweep {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[tokio::test]
    async fn bare_port_listens_on_all_interfaces() {
        let addr = assert_ok!(resolve_listen_addr(":2055").await);
        assert_eq!(addr, "0.0.0.0:2055".parse::<SocketAddr>().unwrap());
    }

    #[tokio::test]
    async fn explicit_address_is_kept() {
        let addr = assert_ok!(resolve_listen_addr("127.0.0.1:9995").await);
        assert_eq!(addr.port(), 9995);
        assert!(addr.ip().is_loopback());
    }

    #[tokio::test]
    async fn unparseable_address_fails_to_resolve() {
        let err = assert_err!(resolve_listen_addr("127.0.0.1:70000").await);
        assert!(matches!(err, NetworkError::ResolveFailed(_)));
        let err = assert_err!(resolve_listen_addr("no-port-here").await);
        assert!(matches!(err, NetworkError::ResolveFailed(_)));
    }

    #[tokio::test]
    async fn binding_an_address_in_use_fails() {
        let first = bind_socket("127.0.0.1:0".parse().unwrap(), 65_536)
            .await
            .unwrap();
        let taken = first.local_addr().unwrap();
        let err = assert_err!(bind_socket(taken, 65_536).await);
        assert!(matches!(err, NetworkError::BindError(_)));
    }

    #[test]
    fn sweep_period_has_a_floor() {
        assert_eq!(sweep_period(Duration::from_secs(2)), Duration::from_secs(1));
        assert_eq!(sweep_period(Duration::from_secs(600)), Duration::from_secs(150));
    }
}
