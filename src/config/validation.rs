//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::{Config, ShutdownPolicy};
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.name must not contain whitespace or ':', got '{0}'")]
    InvalidServerName(String),
    #[error("limits.max_frame_bytes must be greater than zero")]
    ZeroFrameLimit,
    #[error("limits.outbound_queue_capacity must be greater than zero")]
    ZeroQueueCapacity,
    #[error("limits.connect_timeout_secs must be greater than zero")]
    ZeroConnectTimeout,
    #[error("shutdown.drain_timeout_secs must be greater than zero with the drain policy")]
    ZeroDrainTimeout,
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let name = &config.server.name;
    if name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    } else if name.chars().any(|c| c.is_whitespace() || c == ':') {
        // The name ends up in header values.
        errors.push(ValidationError::InvalidServerName(name.clone()));
    }

    if config.limits.max_frame_bytes == 0 {
        errors.push(ValidationError::ZeroFrameLimit);
    }
    if config.limits.outbound_queue_capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    }
    if config.limits.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroConnectTimeout);
    }
    if config.shutdown.policy == ShutdownPolicy::Drain && config.shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::ZeroDrainTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
