//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Top-level `Config`, `ServerConfig`, `ConnectConfig` and loading
//! - [`listen`]: Network listener configuration (`ListenConfig`)
//! - [`limits`]: Frame, queue and connection limits (`LimitsConfig`)
//! - [`shutdown`]: Shutdown policy (`ShutdownConfig`, `ShutdownPolicy`)
//! - [`validation`]: Startup validation of the loaded values

mod limits;
mod listen;
mod shutdown;
mod types;
mod validation;

pub use listen::ListenConfig;
pub use shutdown::{ShutdownConfig, ShutdownPolicy};
pub use types::Config;
pub use validation::validate;
