//! stompd - a concurrent STOMP 1.2 publish/subscribe broker.
//!
//! Clients connect over TCP, subscribe to named topics and publish
//! messages that the broker fans out to every current subscriber.

mod config;
mod error;
mod handlers;
mod http;
mod metrics;
mod network;
mod state;
mod telemetry;

use crate::config::{Config, validate};
use crate::handlers::Registry;
use crate::network::Gateway;
use crate::state::Broker;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid configuration");
        }
        anyhow::bail!("{} configuration error(s) in {}", errors.len(), config_path);
    }

    info!(
        server = %config.server.name,
        address = %config.listen.address,
        policy = ?config.shutdown.policy,
        "Starting stompd"
    );

    // Prometheus metrics are optional.
    // Convention: metrics_port = 0 disables the HTTP endpoint (used by tests).
    let metrics_port = config.server.metrics_port;
    if metrics_port == 0 {
        info!("Metrics disabled");
    } else {
        metrics::init();
        info!("Metrics initialized");

        let metrics_server = http::MetricsServer::bind(metrics_port).await.map_err(|e| {
            error!(port = metrics_port, error = %e, "Failed to bind metrics endpoint");
            e
        })?;
        info!(address = %metrics_server.local_addr()?, "Serving Prometheus metrics");
        tokio::spawn(metrics_server.serve());
    }

    let broker = Arc::new(Broker::new(&config));
    let registry = Arc::new(Registry::new());

    let gateway = Gateway::bind(
        config.listen.clone(),
        config.limits.max_connections,
        config.shutdown.clone(),
        Arc::clone(&broker),
        registry,
    )
    .await?;
    info!(address = %gateway.local_addr()?, "Accepting connections");

    gateway.run(shutdown_signal()).await?;

    info!("stompd stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
