//! Core handler infrastructure.
//!
//! This module contains the handler trait, the per-frame context and the
//! registry that dispatches frames to handlers by command.

pub mod context;
pub mod registry;

pub use context::{Context, Handler};
pub use registry::Registry;
