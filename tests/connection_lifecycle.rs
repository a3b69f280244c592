//! Handshake deadline, connection limit, slow consumers and shutdown.

mod common;

use common::{ServerOptions, TestServer};
use std::time::Duration;
use stomp_proto::{Command, Frame};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

#[tokio::test]
async fn test_handshake_timeout() -> anyhow::Result<()> {
    let server = TestServer::spawn_with(ServerOptions {
        connect_timeout_secs: 1,
        ..Default::default()
    })
    .await?;
    let mut idle = server.open().await?;
    let error = idle.recv_timeout(Duration::from_secs(4)).await?;
    assert_eq!(error.command, Command::Error);
    assert_eq!(error.header("message"), Some("handshake timeout"));
    idle.expect_closed().await?;

    // A connected session is not subject to the deadline.
    let mut connected = server.connect("patient").await?;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    connected.subscribe("/topic/x", "1", "r").await?;
    Ok(())
}

#[tokio::test]
async fn test_connection_limit() -> anyhow::Result<()> {
    let server = TestServer::spawn_with(ServerOptions {
        max_connections: 2,
        ..Default::default()
    })
    .await?;
    // The readiness check connection may still be counted; let it go.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let _first = server.connect("one").await?;
    let _second = server.connect("two").await?;

    let mut third = server.open().await?;
    let error = third.expect_error().await?;
    assert_eq!(error.header("message"), Some("too many connections"));
    third.expect_closed().await?;
    Ok(())
}

#[tokio::test]
async fn test_slow_consumer_is_evicted() -> anyhow::Result<()> {
    let server = TestServer::spawn_with(ServerOptions {
        outbound_queue_capacity: 4,
        ..Default::default()
    })
    .await?;

    // Subscribe with a raw socket that never reads again.
    let mut stalled = tokio::net::TcpStream::connect(server.address()).await?;
    let connect = Frame::new(Command::Connect)
        .with_header("accept-version", "1.2")
        .with_header("host", "stomp")
        .with_header("login", "slow")
        .with_header("passcode", "slow");
    let subscribe = Frame::new(Command::Subscribe)
        .with_header("destination", "/topic/flood")
        .with_header("id", "1")
        .with_header("receipt", "subscribed");
    stalled.write_all(&connect.to_bytes()).await?;
    stalled.write_all(&subscribe.to_bytes()).await?;

    // Read up to the RECEIPT, then never read again.
    let mut seen = Vec::new();
    let mut chunk = [0u8; 512];
    while !String::from_utf8_lossy(&seen).contains("receipt-id:subscribed") {
        let n = tokio::time::timeout(Duration::from_secs(5), stalled.read(&mut chunk)).await??;
        anyhow::ensure!(n > 0, "closed before subscribing");
        seen.extend_from_slice(&chunk[..n]);
    }

    let mut healthy = server.connect("fast").await?;
    healthy.subscribe("/topic/flood", "1", "r").await?;

    // Large bodies fill the stalled socket buffers, then its queue.
    let mut publisher = server.connect("pub").await?;
    let body = "y".repeat(32 * 1024);
    for _ in 0..600 {
        publisher.publish("/topic/flood", &body).await?;
        let msg = healthy.recv().await?;
        assert_eq!(msg.body.len(), body.len());
    }

    // Publisher and healthy subscriber are unaffected.
    publisher.unsubscribe("none", "still-alive").await?;

    // The stalled session was closed: reading drains its backlog, then EOF.
    let drained = tokio::time::timeout(Duration::from_secs(10), async {
        let mut buf = vec![0u8; 64 * 1024];
        loop {
            match stalled.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
        }
    })
    .await;
    assert!(drained.is_ok(), "stalled subscriber was never disconnected");
    Ok(())
}

#[tokio::test]
async fn test_force_shutdown_notifies_sessions() -> anyhow::Result<()> {
    let mut server = TestServer::spawn_with(ServerOptions {
        policy: "force",
        drain_timeout_secs: 5,
        ..Default::default()
    })
    .await?;
    let mut client = server.connect("stay").await?;
    client.subscribe("/topic/x", "1", "r").await?;

    server.interrupt()?;

    let error = client.expect_error().await?;
    assert_eq!(error.header("message"), Some("server shutting down"));
    client.expect_closed().await?;

    let status = server.wait_exit(Duration::from_secs(10)).await?;
    assert!(status.success());
    Ok(())
}

#[tokio::test]
async fn test_drain_shutdown_waits_for_clients() -> anyhow::Result<()> {
    let mut server = TestServer::spawn_with(ServerOptions {
        policy: "drain",
        drain_timeout_secs: 10,
        ..Default::default()
    })
    .await?;
    let mut client = server.connect("leaving").await?;

    server.interrupt()?;
    tokio::time::sleep(Duration::from_millis(300)).await;

    // Existing sessions keep working while draining.
    client.subscribe("/topic/x", "1", "r").await?;
    client
        .send_frame(&Frame::new(Command::Disconnect).with_header("receipt", "bye"))
        .await?;
    client.expect_receipt("bye").await?;

    let status = server.wait_exit(Duration::from_secs(5)).await?;
    assert!(status.success());
    Ok(())
}

#[tokio::test]
async fn test_drain_deadline_closes_stragglers() -> anyhow::Result<()> {
    let mut server = TestServer::spawn_with(ServerOptions {
        policy: "drain",
        drain_timeout_secs: 1,
        ..Default::default()
    })
    .await?;
    let mut client = server.connect("straggler").await?;

    server.interrupt()?;

    let error = client.recv_timeout(Duration::from_secs(5)).await?;
    assert_eq!(error.command, Command::Error);
    assert_eq!(error.header("message"), Some("server shutting down"));

    let status = server.wait_exit(Duration::from_secs(10)).await?;
    assert!(status.success());
    Ok(())
}
