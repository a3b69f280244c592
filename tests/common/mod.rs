//! Integration test common infrastructure.
//!
//! Provides utilities for spawning test brokers, creating test clients,
//! and asserting on STOMP frame flows.

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::{ServerOptions, TestServer};
