//! Router: turns one SEND into a MESSAGE per current subscription.

use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use stomp_proto::{Command, Frame, header};
use tracing::{debug, warn};

use super::registry::SubscriptionRegistry;

/// Headers the router sets itself or that only make sense on the SEND.
const RESERVED_HEADERS: [&str; 6] = [
    header::DESTINATION,
    header::RECEIPT,
    header::TRANSACTION,
    header::CONTENT_LENGTH,
    header::SUBSCRIPTION,
    header::MESSAGE_ID,
];

fn is_reserved(name: &str) -> bool {
    RESERVED_HEADERS.contains(&name)
}

/// Outcome of routing one published message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RouteReport {
    /// MESSAGE frames enqueued.
    pub delivered: usize,
    /// Subscribers that failed and were evicted.
    pub failed: usize,
}

/// Builds MESSAGE frames and fans them out through the registry.
pub struct Router {
    server_name: String,
    next_message_id: AtomicU64,
}

impl Router {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            next_message_id: AtomicU64::new(1),
        }
    }

    /// Fresh, process-unique message id.
    fn message_id(&self) -> String {
        let n = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        format!("{}-{}", self.server_name, n)
    }

    /// Deliver `body` to every subscription of `topic` at the moment of the call.
    pub fn route(
        &self,
        registry: &SubscriptionRegistry,
        topic: &str,
        body: &Bytes,
        source_headers: &[(String, String)],
    ) -> RouteReport {
        let forwarded: Vec<&(String, String)> = source_headers
            .iter()
            .filter(|(name, _)| !is_reserved(name))
            .collect();

        let delivery = registry.deliver(topic, |subscription| {
            let mut frame = Frame::new(Command::Message)
                .with_header(header::DESTINATION, topic)
                .with_header(header::SUBSCRIPTION, subscription)
                .with_header(header::MESSAGE_ID, self.message_id());
            for (name, value) in &forwarded {
                frame.push_header(name.as_str(), value.as_str());
            }
            if !body.is_empty() {
                frame.push_header(header::CONTENT_LENGTH, body.len().to_string());
            }
            frame.with_body(body.clone())
        });

        if delivery.delivered == 0 && delivery.failed.is_empty() {
            debug!(%topic, "No subscribers, message dropped");
            crate::metrics::record_dropped();
            return RouteReport::default();
        }

        for (session, error) in &delivery.failed {
            warn!(session = %session.id(), %topic, %error, "Delivery failed, evicting subscriber");
            crate::metrics::record_delivery_error(error.label());
            session.evict();
        }

        crate::metrics::record_fanout(delivery.delivered);
        debug!(
            %topic,
            delivered = delivery.delivered,
            failed = delivery.failed.len(),
            "Message routed"
        );

        RouteReport {
            delivered: delivery.delivered,
            failed: delivery.failed.len(),
        }
    }
}
