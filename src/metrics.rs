//! Prometheus metrics collection for stompd.
//!
//! Metrics are registered once by [`init`] and exposed over HTTP by
//! [`crate::http`]. Every recording helper is a no-op until `init` has run,
//! so the broker works unchanged with metrics disabled.
//!
//! - `stomp_frames_total{command}` - Inbound frames handled by command
//! - `stomp_command_duration_seconds{command}` - Handler latency
//! - `stomp_message_fanout` - Recipients per published message

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Counters
// ========================================================================

/// Published messages routed to at least one subscriber.
pub static MESSAGES_ROUTED: OnceLock<IntCounter> = OnceLock::new();

/// Published messages with no subscriber at routing time.
pub static MESSAGES_DROPPED: OnceLock<IntCounter> = OnceLock::new();

/// Per-recipient delivery failures by reason.
pub static DELIVERY_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Connections refused by the max_connections limit.
pub static CONNECTIONS_REFUSED: OnceLock<IntCounter> = OnceLock::new();

/// Fatal framing errors by kind.
pub static PROTOCOL_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

// ========================================================================
// Gauges
// ========================================================================

/// Currently open client connections.
pub static CONNECTED_SESSIONS: OnceLock<IntGauge> = OnceLock::new();

/// Live subscriptions across all sessions.
pub static ACTIVE_SUBSCRIPTIONS: OnceLock<IntGauge> = OnceLock::new();

/// Topics with at least one subscriber.
pub static ACTIVE_TOPICS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Per-command metrics
// ========================================================================

/// Frames handled by command.
pub static COMMAND_COUNTER: OnceLock<IntCounterVec> = OnceLock::new();

/// Handler latency by command.
pub static COMMAND_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

/// Handler errors by command and error kind.
pub static COMMAND_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Recipients per published message.
pub static MESSAGE_FANOUT: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Must be called once at startup before metrics are scraped.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(
                            error = %e,
                            concat!("Failed to register metric ", stringify!($metric))
                        );
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        concat!("Failed to create metric ", stringify!($metric))
                    );
                }
            }
        };
    }

    register!(
        MESSAGES_ROUTED,
        IntCounter::new(
            "stomp_messages_routed_total",
            "Messages routed to at least one subscriber"
        )
    );
    register!(
        MESSAGES_DROPPED,
        IntCounter::new(
            "stomp_messages_dropped_total",
            "Messages published to a topic without subscribers"
        )
    );
    register!(
        DELIVERY_ERRORS,
        IntCounterVec::new(
            Opts::new("stomp_delivery_errors_total", "Per-recipient delivery failures"),
            &["reason"]
        )
    );
    register!(
        CONNECTIONS_REFUSED,
        IntCounter::new(
            "stomp_connections_refused_total",
            "Connections refused at the connection limit"
        )
    );
    register!(
        PROTOCOL_ERRORS,
        IntCounterVec::new(
            Opts::new("stomp_protocol_errors_total", "Fatal framing errors"),
            &["kind"]
        )
    );
    register!(
        CONNECTED_SESSIONS,
        IntGauge::new("stomp_connected_sessions", "Currently open client connections")
    );
    register!(
        ACTIVE_SUBSCRIPTIONS,
        IntGauge::new("stomp_active_subscriptions", "Live subscriptions")
    );
    register!(
        ACTIVE_TOPICS,
        IntGauge::new("stomp_active_topics", "Topics with at least one subscriber")
    );
    register!(
        COMMAND_COUNTER,
        IntCounterVec::new(
            Opts::new("stomp_frames_total", "Inbound frames handled by command"),
            &["command"]
        )
    );
    register!(
        COMMAND_LATENCY,
        HistogramVec::new(
            HistogramOpts::new(
                "stomp_command_duration_seconds",
                "Frame handler latency by command"
            )
            .buckets(vec![0.00001, 0.00005, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05]),
            &["command"]
        )
    );
    register!(
        COMMAND_ERRORS,
        IntCounterVec::new(
            Opts::new("stomp_command_errors_total", "Frame handler errors"),
            &["command", "error"]
        )
    );
    register!(
        MESSAGE_FANOUT,
        Histogram::with_opts(
            HistogramOpts::new("stomp_message_fanout", "Recipients per published message")
                .buckets(vec![1.0, 2.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 1000.0])
        )
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recording helpers
// ============================================================================

/// Record a handled frame with its latency.
#[inline]
pub fn record_command(command: &str, duration_secs: f64) {
    if let Some(c) = COMMAND_COUNTER.get() {
        c.with_label_values(&[command]).inc();
    }
    if let Some(h) = COMMAND_LATENCY.get() {
        h.with_label_values(&[command]).observe(duration_secs);
    }
}

/// Record a handler error.
#[inline]
pub fn record_command_error(command: &str, error: &str) {
    if let Some(c) = COMMAND_ERRORS.get() {
        c.with_label_values(&[command, error]).inc();
    }
}

/// Record a fatal framing error.
#[inline]
pub fn record_protocol_error(kind: &str) {
    if let Some(c) = PROTOCOL_ERRORS.get() {
        c.with_label_values(&[kind]).inc();
    }
}

/// Record how many subscribers received a published message.
#[inline]
pub fn record_fanout(recipients: usize) {
    if let Some(c) = MESSAGES_ROUTED.get() {
        c.inc();
    }
    if let Some(h) = MESSAGE_FANOUT.get() {
        h.observe(recipients as f64);
    }
}

/// Record a message published with no subscribers.
#[inline]
pub fn record_dropped() {
    if let Some(c) = MESSAGES_DROPPED.get() {
        c.inc();
    }
}

/// Record a failed per-recipient delivery.
#[inline]
pub fn record_delivery_error(reason: &str) {
    if let Some(c) = DELIVERY_ERRORS.get() {
        c.with_label_values(&[reason]).inc();
    }
}

/// Record a connection refused at the limit.
#[inline]
pub fn record_refused() {
    if let Some(c) = CONNECTIONS_REFUSED.get() {
        c.inc();
    }
}

/// Adjust the open connection gauge.
#[inline]
pub fn session_opened() {
    if let Some(g) = CONNECTED_SESSIONS.get() {
        g.inc();
    }
}

#[inline]
pub fn session_closed() {
    if let Some(g) = CONNECTED_SESSIONS.get() {
        g.dec();
    }
}

/// Set the registry size gauges.
#[inline]
pub fn set_registry_size(subscriptions: usize, topics: usize) {
    if let Some(g) = ACTIVE_SUBSCRIPTIONS.get() {
        g.set(subscriptions as i64);
    }
    if let Some(g) = ACTIVE_TOPICS.get() {
        g.set(topics as i64);
    }
}
