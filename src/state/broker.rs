//! Broker - shared state handed to every session.

use bytes::Bytes;

use super::lifecycle::LifecycleManager;
use super::registry::SubscriptionRegistry;
use super::router::{RouteReport, Router};
use super::session::SessionIdGenerator;
use crate::config::Config;

/// Server identity advertised in CONNECTED.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub name: String,
    pub version: &'static str,
}

impl ServerInfo {
    /// Value of the CONNECTED `server` header.
    pub fn banner(&self) -> String {
        format!("{}/{}", self.name, self.version)
    }
}

/// Per-session settings copied out of the config.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub require_credentials: bool,
    pub require_subscription_to_send: bool,
    pub max_frame_bytes: usize,
    pub outbound_queue_capacity: usize,
    pub connect_timeout: std::time::Duration,
}

/// Shared broker state.
///
/// Holds the subscription registry, router, session id generator and
/// shutdown signal. Sessions own nothing here; they reach it via `Arc`.
pub struct Broker {
    pub server_info: ServerInfo,
    pub settings: SessionSettings,
    pub registry: SubscriptionRegistry,
    pub router: Router,
    pub lifecycle: LifecycleManager,
    pub session_ids: SessionIdGenerator,
}

impl Broker {
    pub fn new(config: &Config) -> Self {
        Self {
            server_info: ServerInfo {
                name: config.server.name.clone(),
                version: env!("CARGO_PKG_VERSION"),
            },
            settings: SessionSettings {
                require_credentials: config.connect.require_credentials,
                require_subscription_to_send: config.connect.require_subscription_to_send,
                max_frame_bytes: config.limits.max_frame_bytes,
                outbound_queue_capacity: config.limits.outbound_queue_capacity,
                connect_timeout: config.limits.connect_timeout(),
            },
            registry: SubscriptionRegistry::new(),
            router: Router::new(config.server.name.clone()),
            lifecycle: LifecycleManager::new(),
            session_ids: SessionIdGenerator::new("session-"),
        }
    }

    /// Publish `body` to `topic`.
    pub fn route(
        &self,
        topic: &str,
        body: &Bytes,
        source_headers: &[(String, String)],
    ) -> RouteReport {
        let report = self.router.route(&self.registry, topic, body, source_headers);
        if report.failed > 0 {
            self.update_registry_gauges();
        }
        report
    }

    /// Refresh the subscription and topic gauges.
    pub fn update_registry_gauges(&self) {
        let (subscriptions, topics) = self.registry.sizes();
        crate::metrics::set_registry_size(subscriptions, topics);
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// Broker built from a minimal config.
    pub fn broker() -> Broker {
        let config: Config = toml::from_str(
            r#"
[server]
name = "test-broker"

[listen]
address = "127.0.0.1:0"
"#,
        )
        .expect("test config");
        Broker::new(&config)
    }
}
