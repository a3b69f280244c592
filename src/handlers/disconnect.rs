//! DISCONNECT handler.

use super::{Context, Handler};
use crate::error::HandlerResult;
use crate::state::Phase;
use async_trait::async_trait;
use stomp_proto::Frame;
use tracing::info;

/// Handler for DISCONNECT.
///
/// Moves the session to Closed; the registry appends the RECEIPT and the
/// connection loop closes the transport after writing it.
pub struct DisconnectHandler;

#[async_trait]
impl Handler for DisconnectHandler {
    async fn handle(&self, ctx: &mut Context<'_>, frame: &Frame) -> HandlerResult {
        ctx.state.phase = Phase::Closed;
        info!(
            session = %ctx.session_id(),
            receipt = frame.receipt_request(),
            subscriptions = ctx.state.subscriptions.len(),
            "Client disconnect"
        );
        Ok(())
    }
}
