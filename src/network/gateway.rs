//! Gateway - TCP listener that accepts incoming connections.
//!
//! The Gateway binds the listen socket, spawns a Connection task per client
//! and, once told to stop, applies the configured shutdown policy to the
//! sessions still running.

use crate::config::{ListenConfig, ShutdownConfig, ShutdownPolicy};
use crate::error::error_frame;
use crate::handlers::Registry;
use crate::network::Connection;
use crate::state::Broker;
use crate::telemetry::spans;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{Instrument, error, info, instrument, warn};

/// Time sessions get to write their shutdown ERROR before they are aborted.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// The Gateway accepts incoming TCP connections and spawns handlers.
pub struct Gateway {
    listener: TcpListener,
    tcp_keepalive: bool,
    max_connections: usize,
    shutdown: ShutdownConfig,
    broker: Arc<Broker>,
    registry: Arc<Registry>,
}

impl Gateway {
    /// Bind the gateway to the configured address.
    pub async fn bind(
        listen: ListenConfig,
        max_connections: usize,
        shutdown: ShutdownConfig,
        broker: Arc<Broker>,
        registry: Arc<Registry>,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(listen.address).await?;
        info!(address = %listen.address, "Listener bound");

        Ok(Self {
            listener,
            tcp_keepalive: listen.tcp_keepalive,
            max_connections,
            shutdown,
            broker,
            registry,
        })
    }

    /// Address actually bound (differs from the config when port 0 is used).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves, then close sessions.
    #[instrument(skip_all, name = "gateway")]
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> anyhow::Result<()> {
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => self.admit(stream, addr, &mut sessions),
                    Err(e) => error!(error = %e, "Failed to accept connection"),
                },
            }
        }

        let Self {
            listener,
            shutdown: policy,
            broker,
            ..
        } = self;
        drop(listener);
        info!(sessions = sessions.len(), policy = ?policy.policy, "Listener closed, shutting down");

        close_sessions(&broker, &policy, &mut sessions).await;
        info!("All sessions closed");
        Ok(())
    }

    fn admit(&self, stream: TcpStream, addr: SocketAddr, sessions: &mut JoinSet<()>) {
        while let Some(finished) = sessions.try_join_next() {
            log_join_error(finished);
        }

        if self.max_connections != 0 && sessions.len() >= self.max_connections {
            warn!(%addr, limit = self.max_connections, "Connection limit reached, refusing");
            crate::metrics::record_refused();
            tokio::spawn(refuse(stream));
            return;
        }

        if let Err(e) = stream.set_nodelay(true) {
            warn!(%addr, error = %e, "Failed to set TCP_NODELAY");
        }
        if self.tcp_keepalive
            && let Err(e) = socket2::SockRef::from(&stream).set_keepalive(true)
        {
            warn!(%addr, error = %e, "Failed to enable TCP keepalive");
        }

        let id = self.broker.session_ids.next();
        let span = spans::connection(&id, &addr);
        let connection = Connection::new(
            id,
            stream,
            addr,
            Arc::clone(&self.broker),
            Arc::clone(&self.registry),
        );

        sessions.spawn(
            async move {
                crate::metrics::session_opened();
                if let Err(e) = connection.run().await {
                    error!(error = %e, "Connection error");
                }
                crate::metrics::session_closed();
            }
            .instrument(span),
        );
    }
}

/// Tell a client over the connection limit why it is being dropped.
async fn refuse(mut stream: TcpStream) {
    let frame = error_frame("too many connections", None, None);
    let write = async {
        stream.write_all(&frame.to_bytes()).await?;
        stream.shutdown().await
    };
    // Best effort; the socket is dropped either way.
    let _ = tokio::time::timeout(CLOSE_GRACE, write).await;
}

/// Apply the shutdown policy to every running session.
async fn close_sessions(broker: &Broker, config: &ShutdownConfig, sessions: &mut JoinSet<()>) {
    let timeout = config.drain_timeout();

    match config.policy {
        ShutdownPolicy::Drain => {
            info!(timeout = ?timeout, "Draining sessions");
            if tokio::time::timeout(timeout, join_all(sessions)).await.is_ok() {
                return;
            }
            warn!(remaining = sessions.len(), "Drain timeout elapsed, closing remaining sessions");
            let notified = broker.lifecycle.close_sessions();
            info!(notified, "Shutdown broadcast sent");
            if tokio::time::timeout(CLOSE_GRACE, join_all(sessions)).await.is_err() {
                abort_all(sessions).await;
            }
        }
        ShutdownPolicy::Force => {
            let notified = broker.lifecycle.close_sessions();
            info!(notified, "Shutdown broadcast sent");
            if tokio::time::timeout(timeout, join_all(sessions)).await.is_err() {
                abort_all(sessions).await;
            }
        }
    }
}

async fn abort_all(sessions: &mut JoinSet<()>) {
    warn!(remaining = sessions.len(), "Aborting sessions");
    sessions.abort_all();
    join_all(sessions).await;
}

async fn join_all(sessions: &mut JoinSet<()>) {
    while let Some(finished) = sessions.join_next().await {
        log_join_error(finished);
    }
}

fn log_join_error(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result
        && e.is_panic()
    {
        error!(error = %e, "Session task panicked");
    }
}
