//! Telemetry utilities for frame timing and connection spans.

use std::time::Instant;

/// Guard for timing frame handling and recording metrics.
///
/// Records handler latency when dropped.
pub struct CommandTimer {
    command: &'static str,
    start: Instant,
}

impl CommandTimer {
    /// Start timing a command.
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            start: Instant::now(),
        }
    }
}

impl Drop for CommandTimer {
    fn drop(&mut self) {
        let duration = self.start.elapsed().as_secs_f64();
        crate::metrics::record_command(self.command, duration);
    }
}

/// Span constructors shared by the network layer.
pub mod spans {
    use std::net::SocketAddr;
    use tracing::{Span, info_span};

    /// Span covering one client connection.
    pub fn connection(session: &str, addr: &SocketAddr) -> Span {
        info_span!("connection", session = %session, addr = %addr)
    }
}
