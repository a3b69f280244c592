//! Connection - Handles an individual client connection.
//!
//! Each Connection runs in its own Tokio task:
//!
//! ```text
//!   FramedRead<StompCodec> ──▶ Registry::dispatch ──▶ replies ─┐
//!                                   │                          │
//!                                   ▼                          ▼
//!                           Router (other sessions)     FramedWrite<StompCodec>
//!                                                              ▲
//!   outbox (mpsc, bounded) ◀── Router (routed MESSAGEs) ───────┘
//! ```
//!
//! The registry holds only a weak sender to the outbox, so dropping the
//! connection closes the queue and later deliveries fail fast.

mod error_handling;
mod event_loop;

use crate::handlers::Registry;
use crate::state::{Broker, SessionHandle, SessionId, SessionState};
use event_loop::{CloseReason, SessionIo};
use std::net::SocketAddr;
use std::sync::Arc;
use stomp_proto::StompCodec;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::info;

/// A client connection handler.
pub struct Connection {
    id: SessionId,
    stream: TcpStream,
    addr: SocketAddr,
    broker: Arc<Broker>,
    registry: Arc<Registry>,
}

impl Connection {
    pub fn new(
        id: SessionId,
        stream: TcpStream,
        addr: SocketAddr,
        broker: Arc<Broker>,
        registry: Arc<Registry>,
    ) -> Self {
        Self {
            id,
            stream,
            addr,
            broker,
            registry,
        }
    }

    /// Run the session until it closes, then drop its subscriptions.
    pub async fn run(self) -> anyhow::Result<()> {
        let Self {
            id,
            stream,
            addr,
            broker,
            registry,
        } = self;
        let settings = &broker.settings;
        let max_frame_bytes = settings.max_frame_bytes;

        let (read_half, write_half) = stream.into_split();
        let (outbox_tx, outbox_rx) = mpsc::channel(settings.outbound_queue_capacity);
        let (handle, evicted) = SessionHandle::new(id.clone(), &outbox_tx);

        info!(server = %broker.server_info.name, "Client connected");

        let mut io = SessionIo {
            reader: FramedRead::new(read_half, StompCodec::with_max_len(max_frame_bytes)),
            writer: FramedWrite::new(write_half, StompCodec::with_max_len(max_frame_bytes)),
            outbox: outbox_rx,
            evicted,
            shutdown: broker.lifecycle.subscribe(),
        };
        let mut state = SessionState::new();

        let reason = if broker.lifecycle.is_shutting_down() {
            CloseReason::Shutdown
        } else {
            event_loop::run(&mut io, &handle, &broker, &registry, &mut state, addr).await
        };

        // Keep the strong sender alive until the loop is done with the outbox.
        drop(outbox_tx);

        let removed = broker.registry.remove_session(&id);
        broker.update_registry_gauges();
        info!(
            reason = reason.as_str(),
            subscriptions = removed,
            login = state.login.as_deref().unwrap_or("-"),
            "Session closed"
        );
        Ok(())
    }
}
