//! State management module.
//!
//! Contains the Broker (shared state), the subscription registry, the
//! router and per-session types.

mod broker;
mod lifecycle;
mod registry;
mod router;
mod session;

pub use broker::Broker;
#[cfg(test)]
pub(crate) use broker::test_support;
pub use registry::SubscribeOutcome;
pub use session::{Phase, SessionHandle, SessionId, SessionState};
