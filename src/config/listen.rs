//! Network listener configuration.

use serde::Deserialize;
use std::net::SocketAddr;

/// Network listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind to (e.g., "127.0.0.1:7777").
    pub address: SocketAddr,
    /// Enable TCP keepalive on accepted sockets (default: true).
    #[serde(default = "default_keepalive")]
    pub tcp_keepalive: bool,
}

fn default_keepalive() -> bool {
    true
}
