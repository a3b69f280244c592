//! # stomp-proto
//!
//! A Rust library for parsing and serializing STOMP 1.2 frames, with an
//! incremental parser suitable for fragmented byte streams.
//!
//! ## Features
//!
//! - Strongly typed [`Command`] and an ordered-header [`Frame`]
//! - Incremental [`parse_frame`] that reports [`Parsed::Incomplete`] instead of
//!   blocking on partial input
//! - Optional Tokio integration via [`StompCodec`]
//!
//! ## Quick Start
//!
//! ```rust
//! use stomp_proto::{parse_frame, Command, Frame, Parsed, StompItem};
//!
//! let frame = Frame::new(Command::Send)
//!     .with_header("destination", "/topic/games")
//!     .with_body("Goal for Brazil!");
//! let wire = frame.to_bytes();
//!
//! match parse_frame(&wire, 64 * 1024).unwrap() {
//!     Parsed::Complete { item: StompItem::Frame(decoded), consumed } => {
//!         assert_eq!(consumed, wire.len());
//!         assert_eq!(decoded.header("destination"), Some("/topic/games"));
//!     }
//!     other => panic!("unexpected parse result: {other:?}"),
//! }
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod command;
pub mod error;
pub mod frame;
pub mod parse;

#[cfg(feature = "tokio")]
pub mod codec;

pub use self::command::Command;
pub use self::error::{ProtocolError, Result};
pub use self::frame::{header, Frame, RejectedFrame};
pub use self::parse::{parse_frame, Parsed, StompItem};

#[cfg(feature = "tokio")]
pub use self::codec::StompCodec;

/// The only protocol version this crate negotiates.
pub const STOMP_VERSION: &str = "1.2";

/// Default upper bound on a single encoded frame (64 KiB).
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024;
