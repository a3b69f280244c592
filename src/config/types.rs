//! Core configuration types and loading.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use super::limits::LimitsConfig;
use super::listen::ListenConfig;
use super::shutdown::ShutdownConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Broker configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity.
    #[serde(default)]
    pub server: ServerConfig,
    /// Network listen configuration.
    pub listen: ListenConfig,
    /// CONNECT handshake requirements.
    #[serde(default)]
    pub connect: ConnectConfig,
    /// Frame, queue and connection limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Shutdown behaviour.
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, used in the CONNECTED `server` header and as the
    /// message-id prefix (default: "stompd").
    #[serde(default = "default_server_name")]
    pub name: String,
    /// Prometheus metrics HTTP port; 0 disables the endpoint (default: 0).
    #[serde(default)]
    pub metrics_port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            metrics_port: 0,
        }
    }
}

fn default_server_name() -> String {
    "stompd".to_string()
}

/// CONNECT handshake requirements.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectConfig {
    /// Require `login` and `passcode` headers (values are not verified).
    #[serde(default = "default_true")]
    pub require_credentials: bool,
    /// Only accept SEND to a destination the session is subscribed to;
    /// anything else is a fatal ERROR (default: false).
    #[serde(default)]
    pub require_subscription_to_send: bool,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            require_credentials: true,
            require_subscription_to_send: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShutdownPolicy;
    use std::io::Write;

    #[test]
    fn minimal_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[listen]
address = "127.0.0.1:7777"
"#,
        )
        .unwrap();
        assert_eq!(config.server.name, "stompd");
        assert_eq!(config.server.metrics_port, 0);
        assert!(config.connect.require_credentials);
        assert!(!config.connect.require_subscription_to_send);
        assert_eq!(config.limits.outbound_queue_capacity, 1024);
        assert_eq!(config.shutdown.policy, ShutdownPolicy::Drain);
    }

    #[test]
    fn listen_section_is_required() {
        assert!(toml::from_str::<Config>("[server]\nname = \"x\"").is_err());
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[server]
name = "broker-a"

[listen]
address = "0.0.0.0:61613"

[connect]
require_credentials = false
require_subscription_to_send = true

[shutdown]
policy = "force"
drain_timeout_secs = 3
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.name, "broker-a");
        assert_eq!(config.listen.address.port(), 61613);
        assert!(!config.connect.require_credentials);
        assert!(config.connect.require_subscription_to_send);
        assert_eq!(config.shutdown.policy, ShutdownPolicy::Force);
        assert_eq!(config.shutdown.drain_timeout_secs, 3);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let err = Config::load("/nonexistent/stompd.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
