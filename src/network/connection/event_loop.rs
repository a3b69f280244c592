//! The per-connection select loop.

use super::error_handling::{ReadErrorAction, classify_read_error, handler_error_reply};
use crate::error::error_frame;
use crate::handlers::{Context, Registry};
use crate::state::{Broker, Phase, SessionHandle, SessionState};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use stomp_proto::{Frame, ProtocolError, StompCodec, StompItem};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{Notify, broadcast, mpsc};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, info, warn};

/// Upper bound on a farewell ERROR write to a client that may not be reading.
const FINAL_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Transport and signal endpoints owned by one session.
pub(super) struct SessionIo {
    pub reader: FramedRead<OwnedReadHalf, StompCodec>,
    pub writer: FramedWrite<OwnedWriteHalf, StompCodec>,
    pub outbox: mpsc::Receiver<Frame>,
    pub evicted: Arc<Notify>,
    pub shutdown: broadcast::Receiver<()>,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum CloseReason {
    Disconnect,
    PeerClosed,
    ProtocolError,
    HandshakeTimeout,
    SlowConsumer,
    Shutdown,
    WriteFailed,
}

impl CloseReason {
    pub(super) fn as_str(self) -> &'static str {
        match self {
            Self::Disconnect => "disconnect",
            Self::PeerClosed => "peer_closed",
            Self::ProtocolError => "protocol_error",
            Self::HandshakeTimeout => "handshake_timeout",
            Self::SlowConsumer => "slow_consumer",
            Self::Shutdown => "shutdown",
            Self::WriteFailed => "write_failed",
        }
    }
}

enum WriteOutcome {
    Written,
    Evicted,
    Failed(ProtocolError),
}

/// Write `frames` in order, giving up if the session is evicted meanwhile.
async fn write_batch(io: &mut SessionIo, frames: Vec<Frame>) -> WriteOutcome {
    let SessionIo { writer, evicted, .. } = io;
    let write = async {
        for frame in frames {
            writer.feed(frame).await?;
        }
        writer.flush().await
    };
    tokio::select! {
        result = write => match result {
            Ok(()) => WriteOutcome::Written,
            Err(e) => WriteOutcome::Failed(e),
        },
        _ = evicted.notified() => WriteOutcome::Evicted,
    }
}

/// Best-effort last frame before closing.
async fn send_final(io: &mut SessionIo, frame: Frame) {
    let write = io.writer.send(frame);
    match tokio::time::timeout(FINAL_WRITE_TIMEOUT, write).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "Final frame not delivered"),
        Err(_) => debug!("Final frame write timed out"),
    }
}

/// Move every MESSAGE already routed to this session into `batch`.
fn drain_outbox(io: &mut SessionIo, batch: &mut Vec<Frame>) {
    while let Ok(frame) = io.outbox.try_recv() {
        batch.push(frame);
    }
}

fn write_outcome(outcome: WriteOutcome) -> Option<CloseReason> {
    match outcome {
        WriteOutcome::Written => None,
        WriteOutcome::Evicted => {
            warn!("Evicted while writing, closing");
            Some(CloseReason::SlowConsumer)
        }
        WriteOutcome::Failed(e) => {
            debug!(error = %e, "Write failed");
            Some(CloseReason::WriteFailed)
        }
    }
}

/// Drive one session until it closes.
pub(super) async fn run(
    io: &mut SessionIo,
    session: &SessionHandle,
    broker: &Arc<Broker>,
    registry: &Registry,
    state: &mut SessionState,
    remote_addr: SocketAddr,
) -> CloseReason {
    let handshake_deadline = tokio::time::sleep(broker.settings.connect_timeout);
    tokio::pin!(handshake_deadline);

    loop {
        let awaiting_connect = state.phase == Phase::Unconnected;

        tokio::select! {
            biased;

            _ = io.shutdown.recv() => {
                info!("Server shutting down, closing session");
                send_final(io, error_frame("server shutting down", None, None)).await;
                return CloseReason::Shutdown;
            }

            _ = io.evicted.notified() => {
                warn!("Outbound queue overflowed, evicting slow consumer");
                send_final(io, error_frame("slow consumer", None, None)).await;
                return CloseReason::SlowConsumer;
            }

            _ = &mut handshake_deadline, if awaiting_connect => {
                info!(timeout = ?broker.settings.connect_timeout, "No CONNECT before deadline");
                send_final(io, error_frame("handshake timeout", None, None)).await;
                return CloseReason::HandshakeTimeout;
            }

            Some(message) = io.outbox.recv() => {
                let mut batch = vec![message];
                drain_outbox(io, &mut batch);
                if let Some(reason) = write_outcome(write_batch(io, batch).await) {
                    return reason;
                }
            }

            item = io.reader.next() => {
                let item = match item {
                    None => {
                        debug!("Peer closed connection");
                        return CloseReason::PeerClosed;
                    }
                    Some(Err(e)) => match classify_read_error(&e) {
                        ReadErrorAction::PeerGone => {
                            debug!(error = %e, "Read failed");
                            return CloseReason::PeerClosed;
                        }
                        ReadErrorAction::Fatal(reply) => {
                            warn!(error = %e, "Protocol error");
                            send_final(io, reply).await;
                            return CloseReason::ProtocolError;
                        }
                    },
                    Some(Ok(item)) => item,
                };

                let mut replies = Vec::new();
                let fatal = match item {
                    StompItem::Heartbeat => continue,
                    StompItem::Rejected(rejected) => {
                        let ctx = Context::new(session, broker, state, remote_addr, &mut replies);
                        let error = registry.reject(&ctx, &rejected);
                        drop(ctx);
                        debug!(command = %rejected.command, error = %error, "Rejected frame");
                        let receipt = rejected.header("receipt");
                        replies.push(handler_error_reply(&error, &rejected, receipt));
                        error.is_fatal()
                    }
                    StompItem::Frame(frame) => {
                        let mut ctx =
                            Context::new(session, broker, state, remote_addr, &mut replies);
                        let result = registry.dispatch(&mut ctx, &frame).await;
                        drop(ctx);
                        match result {
                            Ok(()) => false,
                            Err(error) => {
                                let receipt = frame.receipt_request();
                                replies.push(handler_error_reply(&error, &frame, receipt));
                                error.is_fatal()
                            }
                        }
                    }
                };

                // Messages routed to this session before the frame finished
                // go out ahead of its replies.
                let mut batch = Vec::with_capacity(replies.len());
                drain_outbox(io, &mut batch);
                batch.append(&mut replies);

                if fatal {
                    // Bounded like any farewell write.
                    let flush = write_batch(io, batch);
                    if tokio::time::timeout(FINAL_WRITE_TIMEOUT, flush).await.is_err() {
                        debug!("ERROR write timed out");
                    }
                    return CloseReason::ProtocolError;
                }

                if let Some(reason) = write_outcome(write_batch(io, batch).await) {
                    return reason;
                }

                if state.phase == Phase::Closed {
                    return CloseReason::Disconnect;
                }
            }
        }
    }
}
