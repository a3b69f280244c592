//! Frame handler context and trait.

use crate::error::HandlerResult;
use crate::state::{Broker, SessionHandle, SessionState};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use stomp_proto::Frame;

/// Handler context passed to each frame handler.
pub struct Context<'a> {
    /// Registry-side handle of this session.
    pub session: &'a SessionHandle,
    /// Shared broker state.
    pub broker: &'a Arc<Broker>,
    /// Session state owned by the connection task.
    pub state: &'a mut SessionState,
    /// Remote address of the client.
    pub remote_addr: SocketAddr,
    /// Replies to write on this connection, in order, after the frame is handled.
    pub replies: &'a mut Vec<Frame>,
}

impl<'a> Context<'a> {
    pub fn new(
        session: &'a SessionHandle,
        broker: &'a Arc<Broker>,
        state: &'a mut SessionState,
        remote_addr: SocketAddr,
        replies: &'a mut Vec<Frame>,
    ) -> Self {
        Self {
            session,
            broker,
            state,
            remote_addr,
            replies,
        }
    }

    /// Queue a reply for this connection.
    #[inline]
    pub fn reply(&mut self, frame: Frame) {
        self.replies.push(frame);
    }

    /// Session id, for log fields.
    #[inline]
    pub fn session_id(&self) -> &str {
        self.session.id()
    }
}

/// A handler for one client command.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut Context<'_>, frame: &Frame) -> HandlerResult;
}
