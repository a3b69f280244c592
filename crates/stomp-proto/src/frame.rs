//! The in-memory STOMP frame and its wire serialization.

use std::fmt;

use bytes::{BufMut, Bytes, BytesMut};

use crate::command::Command;

/// Well-known header names.
pub mod header {
    /// Versions offered by the client in CONNECT.
    pub const ACCEPT_VERSION: &str = "accept-version";
    /// Virtual host named by the client in CONNECT.
    pub const HOST: &str = "host";
    /// Client identity in CONNECT.
    pub const LOGIN: &str = "login";
    /// Client secret in CONNECT.
    pub const PASSCODE: &str = "passcode";
    /// Negotiated version in CONNECTED.
    pub const VERSION: &str = "version";
    /// Server identification in CONNECTED.
    pub const SERVER: &str = "server";
    /// Server-assigned session id in CONNECTED.
    pub const SESSION: &str = "session";
    /// Heart-beat settings.
    pub const HEART_BEAT: &str = "heart-beat";
    /// Topic name on SUBSCRIBE, SEND and MESSAGE.
    pub const DESTINATION: &str = "destination";
    /// Subscription id on SUBSCRIBE and UNSUBSCRIBE.
    pub const ID: &str = "id";
    /// Matching subscription id on MESSAGE.
    pub const SUBSCRIPTION: &str = "subscription";
    /// Server-assigned id on MESSAGE.
    pub const MESSAGE_ID: &str = "message-id";
    /// Receipt request on any client frame.
    pub const RECEIPT: &str = "receipt";
    /// Receipt correlation on RECEIPT and ERROR.
    pub const RECEIPT_ID: &str = "receipt-id";
    /// Short error description on ERROR.
    pub const MESSAGE: &str = "message";
    /// Body length in bytes.
    pub const CONTENT_LENGTH: &str = "content-length";
    /// Body MIME type.
    pub const CONTENT_TYPE: &str = "content-type";
    /// Transaction id (not supported, but reserved).
    pub const TRANSACTION: &str = "transaction";
}

/// One STOMP protocol message unit.
///
/// Headers keep their wire order. Duplicate names are preserved, and
/// [`Frame::header`] returns the first occurrence as STOMP 1.2 requires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The frame command.
    pub command: Command,
    /// Ordered `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
    /// Raw body bytes (empty when absent).
    pub body: Bytes,
}

impl Frame {
    /// Create a frame with no headers and an empty body.
    pub fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: Bytes::new(),
        }
    }

    /// Build a RECEIPT frame correlated to `receipt_id`.
    pub fn receipt(receipt_id: impl Into<String>) -> Self {
        Self::new(Command::Receipt).with_header(header::RECEIPT_ID, receipt_id)
    }

    /// Append a header, builder style.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_header(name, value);
        self
    }

    /// Replace the body, builder style.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Append a header.
    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// First value for `name`, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        first_header(&self.headers, name)
    }

    /// The `receipt` header, if the client asked for one.
    pub fn receipt_request(&self) -> Option<&str> {
        self.header(header::RECEIPT)
    }

    /// Exact number of bytes [`Frame::encode_into`] will write.
    pub fn encoded_len(&self) -> usize {
        let headers: usize = self
            .headers
            .iter()
            .map(|(k, v)| k.len() + 1 + v.len() + 1)
            .sum();
        self.command.as_str().len() + 1 + headers + 1 + self.body.len() + 1
    }

    /// Serialize onto `dst`: command line, header lines, blank line, body, NUL.
    pub fn encode_into(&self, dst: &mut BytesMut) {
        dst.reserve(self.encoded_len());
        dst.put_slice(self.command.as_str().as_bytes());
        dst.put_u8(b'\n');
        for (name, value) in &self.headers {
            dst.put_slice(name.as_bytes());
            dst.put_u8(b':');
            dst.put_slice(value.as_bytes());
            dst.put_u8(b'\n');
        }
        dst.put_u8(b'\n');
        dst.put_slice(&self.body);
        dst.put_u8(0);
    }

    /// Serialize into a fresh buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut buf);
        buf.freeze()
    }
}

/// Human-readable rendering without the NUL terminator.
///
/// Used when echoing an offending frame back inside an ERROR body and in
/// debug logs. Non-UTF-8 body bytes are replaced.
impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.command)?;
        for (name, value) in &self.headers {
            writeln!(f, "{name}:{value}")?;
        }
        writeln!(f)?;
        f.write_str(&String::from_utf8_lossy(&self.body))
    }
}

/// A syntactically valid frame whose command is not one this crate models.
///
/// The parser still consumes it up to its terminator so the stream stays in
/// sync; the receiver decides whether that is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedFrame {
    /// The command line exactly as received.
    pub command: String,
    /// Ordered `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
}

impl RejectedFrame {
    /// First value for `name`, if present.
    pub fn header(&self, name: &str) -> Option<&str> {
        first_header(&self.headers, name)
    }
}

impl fmt::Display for RejectedFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.command)?;
        for (name, value) in &self.headers {
            writeln!(f, "{name}:{value}")?;
        }
        Ok(())
    }
}

fn first_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_layout() {
        let frame = Frame::new(Command::Message)
            .with_header("destination", "/topic/games")
            .with_header("subscription", "77")
            .with_body("Goal for Brazil!");
        assert_eq!(
            &frame.to_bytes()[..],
            b"MESSAGE\ndestination:/topic/games\nsubscription:77\n\nGoal for Brazil!\0"
        );
    }

    #[test]
    fn encode_without_headers_keeps_blank_line() {
        let frame = Frame::new(Command::Disconnect);
        assert_eq!(&frame.to_bytes()[..], b"DISCONNECT\n\n\0");
    }

    #[test]
    fn encoded_len_is_exact() {
        let frame = Frame::receipt("bye_alice").with_header("x", "a:b:c");
        assert_eq!(frame.encoded_len(), frame.to_bytes().len());
    }

    #[test]
    fn first_header_wins() {
        let frame = Frame::new(Command::Send)
            .with_header("destination", "/a")
            .with_header("destination", "/b");
        assert_eq!(frame.header("destination"), Some("/a"));
    }

    #[test]
    fn header_names_are_case_sensitive() {
        let frame = Frame::new(Command::Send).with_header("Destination", "/a");
        assert_eq!(frame.header("destination"), None);
    }

    #[test]
    fn display_omits_terminator() {
        let frame = Frame::receipt("100");
        assert_eq!(frame.to_string(), "RECEIPT\nreceipt-id:100\n\n");
    }
}
