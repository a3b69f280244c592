//! Prometheus scrape endpoint.
//!
//! The listener is bound during startup so a port conflict stops the broker
//! before it accepts STOMP clients. Serving then runs on its own task.

use axum::{Router, http::header, response::IntoResponse, routing::get};
use std::net::SocketAddr;
use tokio::net::TcpListener;

/// Bound `/metrics` listener, not yet serving.
pub struct MetricsServer {
    listener: TcpListener,
}

impl MetricsServer {
    /// Bind `0.0.0.0:port`.
    pub async fn bind(port: u16) -> std::io::Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve scrapes until the process exits.
    pub async fn serve(self) {
        if let Err(e) = axum::serve(self.listener, routes()).await {
            tracing::error!(error = %e, "Metrics endpoint stopped");
        }
    }
}

fn routes() -> Router {
    Router::new().route("/metrics", get(scrape))
}

async fn scrape() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        crate::metrics::gather_metrics(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn get(port: u16, path: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request =
            format!("GET {path} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n");
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn serves_prometheus_text() {
        let server = MetricsServer::bind(0).await.unwrap();
        let port = server.local_addr().unwrap().port();
        tokio::spawn(server.serve());

        let response = get(port, "/metrics").await;
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("text/plain; version=0.0.4"), "{response}");
    }

    #[tokio::test]
    async fn other_paths_are_not_found() {
        let server = MetricsServer::bind(0).await.unwrap();
        let port = server.local_addr().unwrap().port();
        tokio::spawn(server.serve());

        let response = get(port, "/").await;
        assert!(response.starts_with("HTTP/1.1 404"), "{response}");
    }
}
