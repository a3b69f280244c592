//! SUBSCRIBE and UNSUBSCRIBE handlers.

use super::{Context, Handler, required_header};
use crate::error::HandlerResult;
use crate::state::SubscribeOutcome;
use async_trait::async_trait;
use stomp_proto::{Frame, header};
use tracing::debug;

/// Handler for SUBSCRIBE.
pub struct SubscribeHandler;

#[async_trait]
impl Handler for SubscribeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, frame: &Frame) -> HandlerResult {
        let topic = required_header(frame, header::DESTINATION)?;
        let id = required_header(frame, header::ID)?;

        let outcome = ctx.broker.registry.subscribe(topic, id, ctx.session);
        ctx.state.subscriptions.insert(id.to_string(), topic.to_string());
        ctx.broker.update_registry_gauges();

        match outcome {
            SubscribeOutcome::Added => {
                debug!(session = %ctx.session_id(), %topic, subscription = %id, "Subscribed");
            }
            SubscribeOutcome::Unchanged => {
                debug!(
                    session = %ctx.session_id(),
                    %topic,
                    subscription = %id,
                    "Already subscribed"
                );
            }
            SubscribeOutcome::Moved { from } => {
                debug!(
                    session = %ctx.session_id(),
                    %from,
                    %topic,
                    subscription = %id,
                    "Subscription moved"
                );
            }
        }
        Ok(())
    }
}

/// Handler for UNSUBSCRIBE.
pub struct UnsubscribeHandler;

#[async_trait]
impl Handler for UnsubscribeHandler {
    async fn handle(&self, ctx: &mut Context<'_>, frame: &Frame) -> HandlerResult {
        let id = required_header(frame, header::ID)?;

        let removed = ctx.broker.registry.unsubscribe(id, ctx.session_id());
        ctx.state.subscriptions.remove(id);
        ctx.broker.update_registry_gauges();

        match removed {
            Some(topic) => {
                debug!(session = %ctx.session_id(), %topic, subscription = %id, "Unsubscribed")
            }
            None => debug!(
                session = %ctx.session_id(),
                subscription = %id,
                "Unsubscribe for unknown id"
            ),
        }
        Ok(())
    }
}
