//! Lifecycle management: the shutdown signal shared by gateway and sessions.

use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::broadcast;

/// Server shutdown signalling.
///
/// Sessions subscribe when they start; a shutdown broadcast makes each of
/// them send ERROR and close.
pub struct LifecycleManager {
    shutdown_tx: broadcast::Sender<()>,
    shutting_down: AtomicBool,
}

impl LifecycleManager {
    pub fn new() -> Self {
        // Receivers only ever need the latest signal.
        let (shutdown_tx, _) = broadcast::channel(4);
        Self {
            shutdown_tx,
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Receiver for the session shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Tell every live session to close. Idempotent.
    pub fn close_sessions(&self) -> usize {
        self.shutting_down.store(true, Ordering::SeqCst);
        // Err only means no session is listening.
        self.shutdown_tx.send(()).unwrap_or(0)
    }

    /// Whether [`close_sessions`](Self::close_sessions) has been called.
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::SeqCst)
    }
}

impl Default for LifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_see_close() {
        let lifecycle = LifecycleManager::new();
        let mut rx = lifecycle.subscribe();
        assert!(!lifecycle.is_shutting_down());
        assert_eq!(lifecycle.close_sessions(), 1);
        assert!(rx.recv().await.is_ok());
        assert!(lifecycle.is_shutting_down());
    }

    #[test]
    fn close_without_sessions_is_fine() {
        let lifecycle = LifecycleManager::new();
        assert_eq!(lifecycle.close_sessions(), 0);
    }
}
