//! Test STOMP client.
//!
//! Writes raw frames and reads server frames through the broker's own codec.

use futures_util::StreamExt;
use std::time::Duration;
use stomp_proto::{Command, Frame, StompCodec, StompItem};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;
use tokio_util::codec::FramedRead;

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A test STOMP client.
pub struct TestClient {
    reader: FramedRead<OwnedReadHalf, StompCodec>,
    writer: OwnedWriteHalf,
}

#[allow(dead_code)]
impl TestClient {
    /// Connect to a test server.
    pub async fn open(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();
        Ok(Self {
            reader: FramedRead::new(read_half, StompCodec::with_max_len(1 << 20)),
            writer: write_half,
        })
    }

    /// Write raw bytes.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Encode and write a frame.
    pub async fn send_frame(&mut self, frame: &Frame) -> anyhow::Result<()> {
        self.send_raw(&frame.to_bytes()).await
    }

    /// CONNECT with credentials and expect CONNECTED.
    pub async fn handshake(&mut self, login: &str) -> anyhow::Result<Frame> {
        let connect = Frame::new(Command::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", "stomp")
            .with_header("login", login)
            .with_header("passcode", login);
        self.send_frame(&connect).await?;
        let reply = self.recv().await?;
        anyhow::ensure!(
            reply.command == Command::Connected,
            "expected CONNECTED, got {}",
            reply.command
        );
        Ok(reply)
    }

    pub async fn subscribe(&mut self, topic: &str, id: &str, receipt: &str) -> anyhow::Result<()> {
        let frame = Frame::new(Command::Subscribe)
            .with_header("destination", topic)
            .with_header("id", id)
            .with_header("receipt", receipt);
        self.send_frame(&frame).await?;
        self.expect_receipt(receipt).await
    }

    pub async fn unsubscribe(&mut self, id: &str, receipt: &str) -> anyhow::Result<()> {
        let frame = Frame::new(Command::Unsubscribe)
            .with_header("id", id)
            .with_header("receipt", receipt);
        self.send_frame(&frame).await?;
        self.expect_receipt(receipt).await
    }

    /// SEND without a receipt.
    pub async fn publish(&mut self, topic: &str, body: &str) -> anyhow::Result<()> {
        let frame = Frame::new(Command::Send)
            .with_header("destination", topic)
            .with_body(body.to_string());
        self.send_frame(&frame).await
    }

    /// Receive the next frame.
    pub async fn recv(&mut self) -> anyhow::Result<Frame> {
        self.recv_timeout(RECV_TIMEOUT).await
    }

    /// Receive the next frame, skipping heart-beats.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<Frame> {
        loop {
            match timeout(dur, self.reader.next()).await? {
                Some(Ok(StompItem::Frame(frame))) => return Ok(frame),
                Some(Ok(StompItem::Heartbeat)) => continue,
                Some(Ok(StompItem::Rejected(r))) => {
                    anyhow::bail!("unexpected command {}", r.command)
                }
                Some(Err(e)) => return Err(e.into()),
                None => anyhow::bail!("connection closed"),
            }
        }
    }

    /// Next frame must be RECEIPT for `id`.
    pub async fn expect_receipt(&mut self, id: &str) -> anyhow::Result<()> {
        let frame = self.recv().await?;
        anyhow::ensure!(
            frame.command == Command::Receipt && frame.header("receipt-id") == Some(id),
            "expected RECEIPT {id}, got {frame}"
        );
        Ok(())
    }

    /// Next frame must be ERROR; returns it.
    pub async fn expect_error(&mut self) -> anyhow::Result<Frame> {
        let frame = self.recv().await?;
        anyhow::ensure!(frame.command == Command::Error, "expected ERROR, got {frame}");
        Ok(frame)
    }

    /// Nothing arrives within `dur`.
    pub async fn expect_silence(&mut self, dur: Duration) -> anyhow::Result<()> {
        match timeout(dur, self.reader.next()).await {
            Err(_) => Ok(()),
            Ok(other) => anyhow::bail!("expected silence, got {other:?}"),
        }
    }

    /// The server closes the connection within the receive timeout.
    pub async fn expect_closed(&mut self) -> anyhow::Result<()> {
        loop {
            match timeout(RECV_TIMEOUT, self.reader.next()).await? {
                None | Some(Err(_)) => return Ok(()),
                Some(Ok(StompItem::Heartbeat)) => continue,
                Some(Ok(other)) => anyhow::bail!("expected close, got {other:?}"),
            }
        }
    }
}
