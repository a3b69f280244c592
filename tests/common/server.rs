//! Test server management.
//!
//! Spawns and manages stompd instances for integration testing.

use std::process::{Child, Command, ExitStatus};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Knobs for the generated config file.
#[derive(Debug, Clone)]
pub struct ServerOptions {
    pub require_credentials: bool,
    pub require_subscription_to_send: bool,
    pub max_frame_bytes: usize,
    pub outbound_queue_capacity: usize,
    pub connect_timeout_secs: u64,
    pub max_connections: usize,
    pub policy: &'static str,
    pub drain_timeout_secs: u64,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            require_credentials: true,
            require_subscription_to_send: false,
            max_frame_bytes: 65536,
            outbound_queue_capacity: 1024,
            connect_timeout_secs: 30,
            max_connections: 0,
            policy: "drain",
            drain_timeout_secs: 10,
        }
    }
}

/// A test server instance.
pub struct TestServer {
    child: Child,
    port: u16,
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn a broker with default options.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with(ServerOptions::default()).await
    }

    /// Spawn a broker with the given options on a free local port.
    pub async fn spawn_with(options: ServerOptions) -> anyhow::Result<Self> {
        let port = free_port()?;
        let data_dir = tempfile::tempdir()?;
        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "test-stompd"
metrics_port = 0

[listen]
address = "127.0.0.1:{port}"

[connect]
require_credentials = {}
require_subscription_to_send = {}

[limits]
max_frame_bytes = {}
outbound_queue_capacity = {}
connect_timeout_secs = {}
max_connections = {}

[shutdown]
policy = "{}"
drain_timeout_secs = {}
"#,
            options.require_credentials,
            options.require_subscription_to_send,
            options.max_frame_bytes,
            options.outbound_queue_capacity,
            options.connect_timeout_secs,
            options.max_connections,
            options.policy,
            options.drain_timeout_secs,
        );
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_stompd"))
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .spawn()?;

        let server = Self {
            child,
            port,
            _data_dir: data_dir,
        };

        // Wait for server to start listening
        server.wait_until_ready().await?;

        Ok(server)
    }

    /// Wait until the server is accepting connections.
    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..50 {
            if tokio::net::TcpStream::connect(self.address()).await.is_ok() {
                return Ok(());
            }
            sleep(Duration::from_millis(100)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    /// Get the server address.
    pub fn address(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Open a TCP connection without sending anything.
    pub async fn open(&self) -> anyhow::Result<super::client::TestClient> {
        super::client::TestClient::open(&self.address()).await
    }

    /// Open a connection and complete the CONNECT handshake.
    pub async fn connect(&self, login: &str) -> anyhow::Result<super::client::TestClient> {
        let mut client = self.open().await?;
        client.handshake(login).await?;
        Ok(client)
    }

    /// Send SIGINT, as an operator pressing Ctrl-C would.
    #[allow(dead_code)]
    pub fn interrupt(&self) -> anyhow::Result<()> {
        let status = Command::new("kill")
            .arg("-INT")
            .arg(self.child.id().to_string())
            .status()?;
        anyhow::ensure!(status.success(), "kill -INT failed: {status}");
        Ok(())
    }

    /// Wait for the process to exit.
    #[allow(dead_code)]
    pub async fn wait_exit(&mut self, within: Duration) -> anyhow::Result<ExitStatus> {
        let deadline = tokio::time::Instant::now() + within;
        loop {
            if let Some(status) = self.child.try_wait()? {
                return Ok(status);
            }
            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("server still running after {within:?}");
            }
            sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        // Kill the server process
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
