//! Error handling utilities for STOMP connection management.
//!
//! Classifies codec errors and converts handler errors into ERROR frames.

use crate::error::{HandlerError, error_frame};
use std::fmt::Display;
use stomp_proto::{Frame, ProtocolError};

/// Classification of transport read errors for appropriate handling.
pub(super) enum ReadErrorAction {
    /// I/O error - connection is broken, just log and disconnect
    PeerGone,
    /// Malformed input - send this ERROR and disconnect
    Fatal(Frame),
}

/// Classify a codec read error into an actionable category.
pub(super) fn classify_read_error(e: &ProtocolError) -> ReadErrorAction {
    match e {
        ProtocolError::Io(_) => ReadErrorAction::PeerGone,
        other => {
            crate::metrics::record_protocol_error(other.kind());
            ReadErrorAction::Fatal(error_frame(&format!("malformed frame: {other}"), None, None))
        }
    }
}

/// ERROR reply for a frame that failed in its handler.
///
/// The offending frame is quoted in the body and its `receipt`, if any,
/// becomes `receipt-id`.
pub(super) fn handler_error_reply(
    error: &HandlerError,
    offending: &dyn Display,
    receipt: Option<&str>,
) -> Frame {
    error.to_error_frame(Some(offending), receipt)
}
