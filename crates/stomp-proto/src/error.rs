//! Error types for the STOMP protocol library.
//!
//! Every [`ProtocolError`] describes a stream that can no longer be trusted:
//! the peer sent something that breaks framing, so the connection should be
//! answered with an ERROR frame and closed. Recoverable conditions (an
//! unknown command inside an otherwise well-formed frame) are not errors; they
//! surface as [`crate::StompItem::Rejected`].

use thiserror::Error;

/// Convenience type alias for Results using [`ProtocolError`].
pub type Result<T, E = ProtocolError> = std::result::Result<T, E>;

/// Fatal framing errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// I/O error during reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The command line was empty.
    #[error("empty command line")]
    EmptyCommand,

    /// The command line or a header line was not valid UTF-8.
    #[error("invalid UTF-8 in frame {section} at byte {byte_pos}")]
    InvalidUtf8 {
        /// Which part of the frame failed to decode ("command" or "header").
        section: &'static str,
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
    },

    /// A NUL byte arrived before the blank line that closes the headers.
    #[error("frame terminated before end of headers")]
    UnterminatedHeaders,

    /// A header line had no `:` separator.
    #[error("malformed header line: {0:?}")]
    MalformedHeader(String),

    /// A `content-length` header could not be parsed as a byte count.
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),

    /// The byte following a `content-length` delimited body was not NUL.
    #[error("frame body not terminated by NUL after {expected} bytes")]
    MissingTerminator {
        /// Declared body length.
        expected: usize,
    },

    /// A command that may not carry a body arrived with one.
    #[error("{command} frames must not have a body")]
    UnexpectedBody {
        /// The offending command.
        command: &'static str,
    },

    /// Frame exceeded the configured maximum size.
    #[error("frame too large: {actual} bytes (limit: {limit})")]
    FrameTooLarge {
        /// Number of bytes seen so far.
        actual: usize,
        /// Maximum allowed frame length.
        limit: usize,
    },

    /// The stream ended in the middle of a frame.
    #[error("stream closed with {0} bytes of an unterminated frame")]
    Truncated(usize),
}

impl ProtocolError {
    /// Short, stable label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::EmptyCommand => "empty_command",
            Self::InvalidUtf8 { .. } => "invalid_utf8",
            Self::UnterminatedHeaders => "unterminated_headers",
            Self::MalformedHeader(_) => "malformed_header",
            Self::InvalidContentLength(_) => "invalid_content_length",
            Self::MissingTerminator { .. } => "missing_terminator",
            Self::UnexpectedBody { .. } => "unexpected_body",
            Self::FrameTooLarge { .. } => "frame_too_large",
            Self::Truncated(_) => "truncated",
        }
    }
}
