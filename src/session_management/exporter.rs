use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::Deserialize;

/// How a datagram's source address is collapsed into an exporter identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum KeyPolicy {
    /// Address and source port, as observed on the socket.
    #[default]
    AddressPort,
    /// Address only, for exporters whose source port changes (NAT, load balancers).
    Address,
}

/// Identity of a flow exporter, used solely as a session lookup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExporterId {
    Socket(SocketAddr),
    Address(IpAddr),
}

impl ExporterId {
    pub fn resolve(policy: KeyPolicy, remote: SocketAddr) -> Self {
        match policy {
            KeyPolicy::AddressPort => ExporterId::Socket(remote),
            KeyPolicy::Address => ExporterId::Address(remote.ip()),
        }
    }
}

impl fmt::Display for ExporterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExporterId::Socket(addr) => write!(f, "{}", addr),
            ExporterId::Address(ip) => write!(f, "{}", ip),
        }
    }
}
