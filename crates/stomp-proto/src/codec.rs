//! Frame codec for tokio.
//!
//! Wraps [`parse_frame`] as a [`Decoder`] and [`Frame::encode_into`] as an
//! [`Encoder`], for use with `FramedRead` / `FramedWrite`.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::error::{ProtocolError, Result};
use crate::frame::Frame;
use crate::parse::{parse_frame, Parsed, StompItem};
use crate::DEFAULT_MAX_FRAME_LEN;

/// Codec yielding [`StompItem`]s and writing [`Frame`]s.
///
/// A decode error ends the stream; unknown commands do not, they arrive as
/// [`StompItem::Rejected`].
#[derive(Debug, Clone)]
pub struct StompCodec {
    max_frame_len: usize,
}

impl StompCodec {
    /// Create a codec with the default 64 KiB frame limit.
    pub fn new() -> Self {
        Self {
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    /// Create a codec with a custom frame limit.
    pub fn with_max_len(max_frame_len: usize) -> Self {
        Self { max_frame_len }
    }

    /// The configured frame limit.
    pub fn max_frame_len(&self) -> usize {
        self.max_frame_len
    }
}

impl Default for StompCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for StompCodec {
    type Item = StompItem;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<StompItem>> {
        match parse_frame(src, self.max_frame_len)? {
            Parsed::Complete { item, consumed } => {
                src.advance(consumed);
                trace!(consumed, remaining = src.len(), "decoded stomp item");
                Ok(Some(item))
            }
            Parsed::Incomplete => {
                src.reserve(1024.min(self.max_frame_len));
                Ok(None)
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<StompItem>> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        // A lone CR at EOF is an unfinished heart-beat, not a frame.
        if src.iter().all(|b| matches!(b, b'\r' | b'\n')) {
            src.clear();
            return Ok(None);
        }
        Err(ProtocolError::Truncated(src.len()))
    }
}

impl Encoder<Frame> for StompCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Frame, dst: &mut BytesMut) -> Result<()> {
        frame.encode_into(dst);
        Ok(())
    }
}
