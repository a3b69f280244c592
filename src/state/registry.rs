//! Subscription registry: topic -> subscribers, session -> subscriptions.
//!
//! Every operation takes the single registry lock, so subscribe,
//! unsubscribe, session removal and routing are mutually exclusive. Routing
//! enqueues onto subscriber queues while the lock is held; an unsubscribe
//! that returned is therefore never followed by a delivery to that
//! subscription.

use std::collections::HashMap;

use parking_lot::Mutex;
use stomp_proto::Frame;

use super::session::{SessionHandle, SessionId};
use crate::error::DeliveryError;

/// Process-wide subscription table.
pub struct SubscriptionRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    /// Subscribers per topic in subscribe order. No empty vectors.
    topics: HashMap<String, Vec<Subscriber>>,
    /// Per session: subscription id -> topic. No empty maps.
    sessions: HashMap<SessionId, HashMap<String, String>>,
    /// Sum of the `sessions` map sizes.
    subscriptions: usize,
}

struct Subscriber {
    session: SessionHandle,
    subscription: String,
}

/// Result of [`SubscriptionRegistry::subscribe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscribeOutcome {
    /// A new subscription was recorded.
    Added,
    /// The same id was already subscribed to the same topic.
    Unchanged,
    /// The id was re-used for a different topic and now points here.
    Moved { from: String },
}

/// Result of [`SubscriptionRegistry::deliver`].
#[derive(Debug, Default)]
pub struct Delivery {
    /// Subscriptions that accepted the frame.
    pub delivered: usize,
    /// Subscribers whose queue rejected the frame; already removed.
    pub failed: Vec<(SessionHandle, DeliveryError)>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner::default()),
        }
    }

    /// Subscribe `session` to `topic` under `subscription_id`.
    pub fn subscribe(
        &self,
        topic: &str,
        subscription_id: &str,
        session: &SessionHandle,
    ) -> SubscribeOutcome {
        let mut inner = self.inner.lock();
        let previous = inner
            .sessions
            .entry(session.id().to_string())
            .or_default()
            .insert(subscription_id.to_string(), topic.to_string());

        let outcome = match previous {
            Some(existing) if existing == topic => return SubscribeOutcome::Unchanged,
            Some(existing) => {
                inner.detach(&existing, session.id(), subscription_id);
                SubscribeOutcome::Moved { from: existing }
            }
            None => {
                inner.subscriptions += 1;
                SubscribeOutcome::Added
            }
        };

        inner
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(Subscriber {
                session: session.clone(),
                subscription: subscription_id.to_string(),
            });
        outcome
    }

    /// Remove one subscription. Returns its topic, or `None` if unknown.
    pub fn unsubscribe(&self, subscription_id: &str, session: &str) -> Option<String> {
        let mut inner = self.inner.lock();
        let ids = inner.sessions.get_mut(session)?;
        let topic = ids.remove(subscription_id)?;
        if ids.is_empty() {
            inner.sessions.remove(session);
        }
        inner.subscriptions -= 1;
        inner.detach(&topic, session, subscription_id);
        Some(topic)
    }

    /// Remove every subscription owned by `session`. Returns how many.
    pub fn remove_session(&self, session: &str) -> usize {
        self.inner.lock().remove_session(session)
    }

    /// Snapshot of `(session, subscription id)` pairs for `topic`, in
    /// subscribe order.
    #[cfg(test)]
    pub fn subscribers_of(&self, topic: &str) -> Vec<(SessionId, String)> {
        self.inner
            .lock()
            .topics
            .get(topic)
            .map(|subs| {
                subs.iter()
                    .map(|s| (s.session.id().to_string(), s.subscription.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Enqueue one frame per subscription of `topic`, built by `build` from
    /// the subscription id.
    ///
    /// Runs entirely under the registry lock. Subscribers whose queue
    /// rejects the frame lose all their subscriptions before the lock is
    /// released and are returned for eviction.
    pub fn deliver<F>(&self, topic: &str, mut build: F) -> Delivery
    where
        F: FnMut(&str) -> Frame,
    {
        let mut inner = self.inner.lock();
        let mut delivery = Delivery::default();

        if let Some(subs) = inner.topics.get(topic) {
            for sub in subs {
                if delivery
                    .failed
                    .iter()
                    .any(|(h, _)| h.id() == sub.session.id())
                {
                    continue;
                }
                match sub.session.deliver(build(&sub.subscription)) {
                    Ok(()) => delivery.delivered += 1,
                    Err(e) => delivery.failed.push((sub.session.clone(), e)),
                }
            }
        }

        for (handle, _) in &delivery.failed {
            inner.remove_session(handle.id());
        }
        delivery
    }

    /// Live subscriptions and topics with at least one subscriber, read
    /// under one lock.
    pub fn sizes(&self) -> (usize, usize) {
        let inner = self.inner.lock();
        (inner.subscriptions, inner.topics.len())
    }

    /// Number of topics with at least one subscriber.
    #[cfg(test)]
    pub fn topic_count(&self) -> usize {
        self.inner.lock().topics.len()
    }

    /// Total number of live subscriptions.
    #[cfg(test)]
    pub fn subscription_count(&self) -> usize {
        self.inner.lock().subscriptions
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryInner {
    /// Drop one entry from a topic's subscriber list, removing the topic
    /// when it becomes empty.
    fn detach(&mut self, topic: &str, session: &str, subscription_id: &str) {
        if let Some(subs) = self.topics.get_mut(topic) {
            subs.retain(|s| !(s.session.id() == session && s.subscription == subscription_id));
            if subs.is_empty() {
                self.topics.remove(topic);
            }
        }
    }

    fn remove_session(&mut self, session: &str) -> usize {
        let Some(ids) = self.sessions.remove(session) else {
            return 0;
        };
        for (subscription_id, topic) in &ids {
            self.detach(topic, session, subscription_id);
        }
        self.subscriptions -= ids.len();
        ids.len()
    }
}
