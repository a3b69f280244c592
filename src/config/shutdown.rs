//! Shutdown policy configuration.

use serde::Deserialize;
use std::time::Duration;

/// What to do with open sessions when the broker is asked to stop.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownPolicy {
    /// Stop accepting and let clients leave; force-close stragglers at the deadline.
    #[default]
    Drain,
    /// Send every session an ERROR and close it immediately.
    Force,
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ShutdownConfig {
    /// Shutdown policy (default: drain).
    #[serde(default)]
    pub policy: ShutdownPolicy,
    /// Upper bound on the wait for sessions to finish (default: 10).
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl ShutdownConfig {
    /// Drain deadline as a `Duration`.
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_secs(self.drain_timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            policy: ShutdownPolicy::default(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_drain_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_lowercase() {
        let cfg: ShutdownConfig = toml::from_str(r#"policy = "force""#).unwrap();
        assert_eq!(cfg.policy, ShutdownPolicy::Force);
        assert_eq!(cfg.drain_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        assert!(toml::from_str::<ShutdownConfig>(r#"policy = "later""#).is_err());
    }
}
