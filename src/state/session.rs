//! Per-connection session state and the registry-side session handle.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use stomp_proto::Frame;
use tokio::sync::{Notify, mpsc};

use crate::error::DeliveryError;

/// Server-assigned session identifier (the CONNECTED `session` header).
pub type SessionId = String;

/// Generates unique session IDs.
///
/// Format: fixed prefix + at least 6 base36 characters, e.g. "session-AAAAAB".
/// Longer ids appear once the 6-character space is used up, so ids never
/// repeat within a process.
pub struct SessionIdGenerator {
    prefix: String,
    counter: AtomicU64,
}

impl SessionIdGenerator {
    /// Create a generator with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicU64::new(0),
        }
    }

    /// Generate the next unique session ID.
    pub fn next(&self) -> SessionId {
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        format!("{}{}", self.prefix, base36_encode(n))
    }
}

/// Encode a number in base36, left-padded with 'A' to 6 characters.
fn base36_encode(mut n: u64) -> String {
    const CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const MIN_WIDTH: usize = 6;
    let mut digits = Vec::with_capacity(13);

    while n > 0 || digits.len() < MIN_WIDTH {
        digits.push(CHARS[(n % 36) as usize]);
        n /= 36;
    }
    digits.reverse();

    String::from_utf8_lossy(&digits).into_owned()
}

/// Protocol phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Transport open, CONNECT not yet accepted.
    Unconnected,
    /// CONNECT accepted; broker commands allowed.
    Connected,
    /// Terminal; no further frames are processed.
    Closed,
}

/// State owned exclusively by a session task.
#[derive(Debug)]
pub struct SessionState {
    /// Current phase.
    pub phase: Phase,
    /// `login` from CONNECT. Informational only.
    pub login: Option<String>,
    /// Subscriptions owned by this session: id -> topic.
    pub subscriptions: HashMap<String, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Unconnected,
            login: None,
            subscriptions: HashMap::new(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning handle the registry keeps for each subscribed session.
///
/// Holds a weak sender to the session's outbound queue, so a session that
/// has gone away is observed as [`DeliveryError::Closed`] rather than kept
/// alive, and an eviction signal the router raises on delivery failure.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    outbox: mpsc::WeakSender<Frame>,
    evicted: Arc<Notify>,
}

impl SessionHandle {
    /// Create a handle for `outbox`. The returned `Notify` fires on eviction.
    pub fn new(id: SessionId, outbox: &mpsc::Sender<Frame>) -> (Self, Arc<Notify>) {
        let evicted = Arc::new(Notify::new());
        let handle = Self {
            id,
            outbox: outbox.downgrade(),
            evicted: Arc::clone(&evicted),
        };
        (handle, evicted)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Enqueue a routed frame without waiting.
    pub fn deliver(&self, frame: Frame) -> Result<(), DeliveryError> {
        let tx = self.outbox.upgrade().ok_or(DeliveryError::Closed)?;
        tx.try_send(frame)?;
        Ok(())
    }

    /// Ask the owning session to close.
    pub fn evict(&self) {
        // notify_one keeps a permit if the session is not waiting yet.
        self.evicted.notify_one();
    }
}
