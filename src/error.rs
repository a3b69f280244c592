//! Unified error handling for stompd.
//!
//! This module provides the error hierarchy for frame handling and message
//! delivery, with metric labels and conversion into STOMP ERROR frames.

use std::fmt;

use stomp_proto::{Command, Frame, ProtocolError, header};
use thiserror::Error;

// ============================================================================
// Handler Errors (frame processing)
// ============================================================================

/// Errors that can occur while handling one inbound frame.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("not connected: the first frame must be CONNECT")]
    NotConnected,

    #[error("already connected")]
    AlreadyConnected,

    #[error("supported protocol versions are {supported}, client offered {offered:?}")]
    UnsupportedVersion {
        supported: &'static str,
        offered: String,
    },

    #[error("missing required header: {0}")]
    MissingHeader(&'static str),

    #[error("{0} frames are only sent by the server")]
    UnexpectedCommand(Command),

    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("permission denied: not subscribed to {0}")]
    NotSubscribed(String),

    #[error("malformed frame: {0}")]
    Protocol(#[from] ProtocolError),
}

impl HandlerError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotConnected => "not_connected",
            Self::AlreadyConnected => "already_connected",
            Self::UnsupportedVersion { .. } => "unsupported_version",
            Self::MissingHeader(_) => "missing_header",
            Self::UnexpectedCommand(_) => "unexpected_command",
            Self::UnknownCommand(_) => "unknown_command",
            Self::NotSubscribed(_) => "not_subscribed",
            Self::Protocol(e) => e.kind(),
        }
    }

    /// Whether the connection must be closed after the ERROR is sent.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::AlreadyConnected | Self::UnexpectedCommand(_) | Self::UnknownCommand(_) => false,
            Self::NotConnected
            | Self::UnsupportedVersion { .. }
            | Self::MissingHeader(_)
            | Self::NotSubscribed(_)
            | Self::Protocol(_) => true,
        }
    }

    /// Build the ERROR frame reporting this error.
    ///
    /// `offending` is echoed in the body and `receipt` becomes `receipt-id`.
    pub fn to_error_frame(
        &self,
        offending: Option<&dyn fmt::Display>,
        receipt: Option<&str>,
    ) -> Frame {
        error_frame(&self.to_string(), offending, receipt)
    }
}

/// Result type for frame handlers.
pub type HandlerResult = Result<(), HandlerError>;

/// Build an ERROR frame.
///
/// Headers are `message`, optional `receipt-id`, `content-type` and
/// `content-length`. The body quotes the offending frame when one is known,
/// otherwise repeats the description.
pub fn error_frame(
    message: &str,
    offending: Option<&dyn fmt::Display>,
    receipt: Option<&str>,
) -> Frame {
    let body = match offending {
        Some(frame) => format!("The message:\n-----\n{frame}\n-----\n"),
        None => format!("{message}\n"),
    };

    // Header values cannot carry line breaks.
    let summary: String = message
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();

    let mut frame = Frame::new(Command::Error).with_header(header::MESSAGE, summary);
    if let Some(id) = receipt {
        frame.push_header(header::RECEIPT_ID, id);
    }
    frame
        .with_header(header::CONTENT_TYPE, "text/plain")
        .with_header(header::CONTENT_LENGTH, body.len().to_string())
        .with_body(body)
}

// ============================================================================
// Delivery Errors (router -> subscriber queue)
// ============================================================================

/// Failure to hand a routed MESSAGE to one subscriber.
///
/// Isolated to that recipient: other subscribers are unaffected and the
/// failing session is evicted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("subscriber outbound queue is full")]
    QueueFull,

    #[error("subscriber session has closed")]
    Closed,
}

impl DeliveryError {
    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::QueueFull => "queue_full",
            Self::Closed => "closed",
        }
    }
}

impl<T> From<tokio::sync::mpsc::error::TrySendError<T>> for DeliveryError {
    fn from(err: tokio::sync::mpsc::error::TrySendError<T>) -> Self {
        match err {
            tokio::sync::mpsc::error::TrySendError::Full(_) => Self::QueueFull,
            tokio::sync::mpsc::error::TrySendError::Closed(_) => Self::Closed,
        }
    }
}
