//! Individual probe implementations.
//!
//! Probes report pass/fail with detail text; deadlines are enforced by
//! the executor so every probe kind gets identical timeout handling.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default per-probe timeout.
const DEFAULT_TIMEOUT_MS: u64 = 3_000;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// How a probe reaches its dependency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProbeKind {
    /// HTTP GET expecting a 2xx response.
    Http { path: String },
    /// Bare TCP connect.
    Tcp,
}

/// A named, timeout-bounded check of one dependency.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProbeSpec {
    /// Service identity — used for dedup, cooldown keys, and healing rules.
    pub name: String,
    /// Target address (`host:port`).
    pub target: String,
    #[serde(flatten)]
    pub kind: ProbeKind,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ProbeSpec {
    /// An HTTP probe with the default timeout.
    pub fn http(name: &str, target: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_string(),
            kind: ProbeKind::Http {
                path: path.to_string(),
            },
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// A TCP-connect probe with the default timeout.
    pub fn tcp(name: &str, target: &str) -> Self {
        Self {
            name: name.to_string(),
            target: target.to_string(),
            kind: ProbeKind::Tcp,
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Execute the probe once, without a deadline (the executor applies it).
    pub async fn check(&self) -> ProbeOutcome {
        match &self.kind {
            ProbeKind::Http { path } => http_probe(&self.target, path).await,
            ProbeKind::Tcp => tcp_probe(&self.target).await,
        }
    }
}

/// Result of a single probe attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The dependency responded successfully.
    Pass,
    /// Unreachable, errored, or returned a non-success response.
    Fail(String),
}

/// Perform an HTTP GET against `http://{target}{path}`.
///
/// `Pass` for 2xx; `Fail` with the status line for non-2xx; `Fail` with
/// the error text for connection/handshake/request failures.
pub async fn http_probe(target: &str, path: &str) -> ProbeOutcome {
    let uri = format!("http://{target}{path}");

    let stream = match tokio::net::TcpStream::connect(target).await {
        Ok(s) => s,
        Err(e) => {
            debug!(error = %e, %uri, "probe connection failed");
            return ProbeOutcome::Fail(format!("connect: {e}"));
        }
    };

    let io = hyper_util::rt::TokioIo::new(stream);
    let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
        Ok(pair) => pair,
        Err(e) => {
            debug!(error = %e, %uri, "probe handshake failed");
            return ProbeOutcome::Fail(format!("handshake: {e}"));
        }
    };

    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });

    let req = match http::Request::builder()
        .method("GET")
        .uri(&uri)
        .header("host", target)
        .header("user-agent", "vigil-probe/0.1")
        .body(http_body_util::Empty::<bytes::Bytes>::new())
    {
        Ok(req) => req,
        Err(e) => return ProbeOutcome::Fail(format!("request build: {e}")),
    };

    match sender.send_request(req).await {
        Ok(resp) if resp.status().is_success() => ProbeOutcome::Pass,
        Ok(resp) => {
            debug!(status = %resp.status(), %uri, "probe non-2xx");
            ProbeOutcome::Fail(format!("status {}", resp.status()))
        }
        Err(e) => {
            debug!(error = %e, %uri, "probe request failed");
            ProbeOutcome::Fail(format!("request: {e}"))
        }
    }
}

/// Attempt a bare TCP connect to `target`.
pub async fn tcp_probe(target: &str) -> ProbeOutcome {
    match tokio::net::TcpStream::connect(target).await {
        Ok(_) => ProbeOutcome::Pass,
        Err(e) => {
            debug!(error = %e, %target, "tcp probe failed");
            ProbeOutcome::Fail(format!("connect: {e}"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn tcp_probe_passes_against_listener() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Keep the listener alive while probing.
        let outcome = tcp_probe(&addr.to_string()).await;
        assert_eq!(outcome, ProbeOutcome::Pass);
    }

    #[tokio::test]
    async fn tcp_probe_fails_against_closed_port() {
        let outcome = tcp_probe("127.0.0.1:1").await;
        assert!(matches!(outcome, ProbeOutcome::Fail(_)));
    }

    #[tokio::test]
    async fn http_probe_fails_against_closed_port() {
        let outcome = http_probe("127.0.0.1:1", "/healthz").await;
        assert!(matches!(outcome, ProbeOutcome::Fail(ref d) if d.starts_with("connect")));
    }

    #[tokio::test]
    async fn http_probe_passes_against_minimal_server() {
        let addr = spawn_static_server("HTTP/1.1 200 OK\r\ncontent-length: 0\r\n\r\n").await;
        let outcome = http_probe(&addr, "/healthz").await;
        assert_eq!(outcome, ProbeOutcome::Pass);
    }

    #[tokio::test]
    async fn http_probe_fails_on_server_error_status() {
        let addr =
            spawn_static_server("HTTP/1.1 503 Service Unavailable\r\ncontent-length: 0\r\n\r\n")
                .await;
        let outcome = http_probe(&addr, "/healthz").await;
        assert!(matches!(outcome, ProbeOutcome::Fail(ref d) if d.contains("503")));
    }

    #[test]
    fn spec_deserializes_from_toml_shape() {
        let spec: ProbeSpec = serde_json::from_value(serde_json::json!({
            "name": "Gateway",
            "target": "127.0.0.1:8787",
            "kind": "http",
            "path": "/healthz"
        }))
        .unwrap();
        assert_eq!(spec.timeout_ms, 3_000);
        assert_eq!(spec.kind, ProbeKind::Http { path: "/healthz".to_string() });
    }

    /// Serve a fixed HTTP response to every connection.
    async fn spawn_static_server(response: &'static str) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                tokio::spawn(async move {
                    use tokio::io::{AsyncReadExt, AsyncWriteExt};
                    let mut buf = [0u8; 1024];
                    let _ = socket.read(&mut buf).await;
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });
        addr
    }
}
