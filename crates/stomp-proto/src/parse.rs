//! Incremental frame parser.
//!
//! [`parse_frame`] inspects the front of a receive buffer and either returns
//! one complete item together with the number of bytes it occupied, or
//! [`Parsed::Incomplete`] when more bytes are needed. It never consumes
//! anything itself, so callers keep the remainder for the next read.

use bytes::Bytes;

use crate::command::Command;
use crate::error::{ProtocolError, Result};
use crate::frame::{header, Frame, RejectedFrame};

/// One unit recognised at the front of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StompItem {
    /// A complete frame with a known command.
    Frame(Frame),
    /// A bare EOL between frames (STOMP heart-beat).
    Heartbeat,
    /// A well-formed frame whose command is not recognised.
    Rejected(RejectedFrame),
}

/// Outcome of a parse attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parsed {
    /// An item was recognised; `consumed` bytes belong to it.
    Complete {
        /// The recognised item.
        item: StompItem,
        /// Number of bytes at the front of the buffer it occupied.
        consumed: usize,
    },
    /// The buffer holds only a prefix of the next item.
    Incomplete,
}

/// Try to parse one item from the front of `buf`.
///
/// `max_frame_len` bounds the total encoded size of a frame, terminator
/// included. Exceeding it is reported as soon as it can be detected, even
/// before the frame is complete.
pub fn parse_frame(buf: &[u8], max_frame_len: usize) -> Result<Parsed> {
    match buf {
        [] | [b'\r'] => return Ok(Parsed::Incomplete),
        [b'\n', ..] => return Ok(heartbeat(1)),
        [b'\r', b'\n', ..] => return Ok(heartbeat(2)),
        _ => {}
    }

    let Some(head) = split_head(buf)? else {
        return incomplete_or_too_large(buf.len(), max_frame_len);
    };

    let command_line = decode_line(&buf[..head.command_end], "command")?;
    if command_line.is_empty() {
        return Err(ProtocolError::EmptyCommand);
    }

    let mut headers = Vec::with_capacity(head.header_lines.len());
    for (start, end) in head.header_lines {
        let line = decode_line(&buf[start..end], "header")?;
        let Some((name, value)) = line.split_once(':') else {
            return Err(ProtocolError::MalformedHeader(line.to_string()));
        };
        headers.push((name.to_string(), value.to_string()));
    }

    let body_start = head.body_start;
    let content_length = headers
        .iter()
        .find(|(k, _)| k == header::CONTENT_LENGTH)
        .map(|(_, v)| {
            v.trim()
                .parse::<usize>()
                .map_err(|_| ProtocolError::InvalidContentLength(v.clone()))
        })
        .transpose()?;

    let (body_end, consumed) = match content_length {
        Some(len) => {
            let total = body_start.saturating_add(len).saturating_add(1);
            if total > max_frame_len {
                return Err(ProtocolError::FrameTooLarge {
                    actual: total,
                    limit: max_frame_len,
                });
            }
            if buf.len() < total {
                return Ok(Parsed::Incomplete);
            }
            if buf[body_start + len] != 0 {
                return Err(ProtocolError::MissingTerminator { expected: len });
            }
            (body_start + len, total)
        }
        None => match buf[body_start..].iter().position(|b| *b == 0) {
            Some(offset) => (body_start + offset, body_start + offset + 1),
            None => return incomplete_or_too_large(buf.len(), max_frame_len),
        },
    };

    if consumed > max_frame_len {
        return Err(ProtocolError::FrameTooLarge {
            actual: consumed,
            limit: max_frame_len,
        });
    }

    let body = &buf[body_start..body_end];
    let item = match command_line.parse::<Command>() {
        Ok(command) => {
            let body = if command.allows_body() {
                Bytes::copy_from_slice(body)
            } else if body.iter().all(|b| matches!(b, b'\r' | b'\n')) {
                Bytes::new()
            } else {
                return Err(ProtocolError::UnexpectedBody {
                    command: command.as_str(),
                });
            };
            StompItem::Frame(Frame {
                command,
                headers,
                body,
            })
        }
        Err(unknown) => StompItem::Rejected(RejectedFrame {
            command: unknown.0,
            headers,
        }),
    };

    Ok(Parsed::Complete { item, consumed })
}

fn heartbeat(consumed: usize) -> Parsed {
    Parsed::Complete {
        item: StompItem::Heartbeat,
        consumed,
    }
}

fn incomplete_or_too_large(seen: usize, limit: usize) -> Result<Parsed> {
    if seen > limit {
        Err(ProtocolError::FrameTooLarge {
            actual: seen,
            limit,
        })
    } else {
        Ok(Parsed::Incomplete)
    }
}

/// Byte offsets of the command line, header lines and body start.
struct Head {
    command_end: usize,
    header_lines: Vec<(usize, usize)>,
    body_start: usize,
}

/// Locate the header block. `None` until the closing blank line has arrived.
fn split_head(buf: &[u8]) -> Result<Option<Head>> {
    let mut command_end = None;
    let mut header_lines = Vec::new();
    let mut line_start = 0;

    for (pos, byte) in buf.iter().enumerate() {
        match byte {
            0 => return Err(ProtocolError::UnterminatedHeaders),
            b'\n' => {
                let line = trim_cr(line_start, pos, buf);
                match command_end {
                    None => command_end = Some(line),
                    Some(_) if line == line_start => {
                        return Ok(Some(Head {
                            command_end: command_end.unwrap_or(0),
                            header_lines,
                            body_start: pos + 1,
                        }));
                    }
                    Some(_) => header_lines.push((line_start, line)),
                }
                line_start = pos + 1;
            }
            _ => {}
        }
    }
    Ok(None)
}

/// End offset of the line `[start, newline)` with one trailing CR removed.
fn trim_cr(start: usize, newline: usize, buf: &[u8]) -> usize {
    if newline > start && buf[newline - 1] == b'\r' {
        newline - 1
    } else {
        newline
    }
}

fn decode_line<'a>(bytes: &'a [u8], section: &'static str) -> Result<&'a str> {
    std::str::from_utf8(bytes).map_err(|e| ProtocolError::InvalidUtf8 {
        section,
        byte_pos: e.valid_up_to(),
    })
}
