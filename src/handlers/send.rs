//! SEND handler: publish to a topic.

use super::{Context, Handler, required_header};
use crate::error::{HandlerError, HandlerResult};
use async_trait::async_trait;
use stomp_proto::{Frame, header};
use tracing::trace;

/// Handler for SEND.
///
/// Routes the body to every subscription of the destination that exists
/// when the frame is handled. Delivery failures affect only the failing
/// subscriber and are not reported to the publisher.
///
/// With `require_subscription_to_send`, a session may only publish to a
/// destination it currently subscribes to.
pub struct SendHandler;

#[async_trait]
impl Handler for SendHandler {
    async fn handle(&self, ctx: &mut Context<'_>, frame: &Frame) -> HandlerResult {
        let topic = required_header(frame, header::DESTINATION)?;
        if ctx.broker.settings.require_subscription_to_send
            && !ctx.state.subscriptions.values().any(|t| t == topic)
        {
            return Err(HandlerError::NotSubscribed(topic.to_string()));
        }
        let report = ctx.broker.route(topic, &frame.body, &frame.headers);
        trace!(
            session = %ctx.session_id(),
            %topic,
            bytes = frame.body.len(),
            delivered = report.delivered,
            "SEND handled"
        );
        Ok(())
    }
}
