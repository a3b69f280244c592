//! Frame, queue and connection limits.

use serde::Deserialize;
use std::time::Duration;

/// Resource limits applied to every client connection.
///
/// These bound how much a single peer can make the broker buffer, and how
/// long an idle socket may sit before completing the handshake.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Largest accepted inbound frame in bytes, terminator included (default: 65536).
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    /// Routed MESSAGE frames buffered per subscriber before it is evicted (default: 1024).
    #[serde(default = "default_outbound_queue_capacity")]
    pub outbound_queue_capacity: usize,
    /// Seconds a connection may stay unconnected before it is dropped (default: 30).
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Concurrent connections accepted; 0 means unlimited (default: 0).
    #[serde(default)]
    pub max_connections: usize,
}

impl LimitsConfig {
    /// Handshake deadline as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: default_max_frame_bytes(),
            outbound_queue_capacity: default_outbound_queue_capacity(),
            connect_timeout_secs: default_connect_timeout_secs(),
            max_connections: 0,
        }
    }
}

fn default_max_frame_bytes() -> usize {
    stomp_proto::DEFAULT_MAX_FRAME_LEN
}

fn default_outbound_queue_capacity() -> usize {
    1024
}

fn default_connect_timeout_secs() -> u64 {
    30
}
