//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use scope_gateway::config::GatewayConfig;
use scope_gateway::observability::AttemptObserver;
use scope_gateway::{GatewayServer, Shutdown};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// A request as seen by the mock upstream.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

/// How the mock answers one call. `None` holds the connection open forever.
pub type Reply = Option<(u16, String)>;

/// Programmable upstream that records every request it receives.
pub struct MockUpstream {
    pub addr: SocketAddr,
    calls: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockUpstream {
    /// Start a mock on an ephemeral port. `handler` receives the zero-based
    /// call index.
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(u32) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let calls = Arc::new(AtomicU32::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler = Arc::new(handler);

        let (c, r) = (calls.clone(), requests.clone());
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let (c, r, handler) = (c.clone(), r.clone(), handler.clone());
                tokio::spawn(async move {
                    serve_one(socket, c, r, handler.as_ref()).await;
                });
            }
        });

        Self { addr, calls, requests }
    }

    /// Always answer with the same status and body.
    pub async fn fixed(status: u16, body: serde_json::Value) -> Self {
        let body = body.to_string();
        Self::start(move |_| Some((status, body.clone()))).await
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

async fn serve_one<F>(
    mut socket: TcpStream,
    calls: Arc<AtomicU32>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handler: &F,
) where
    F: Fn(u32) -> Reply,
{
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    let index = calls.fetch_add(1, Ordering::SeqCst);
    requests.lock().unwrap().push(request);

    match handler(index) {
        Some((status, body)) => {
            let response = format!(
                "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        None => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
    }
}

/// Read headers plus a `Content-Length` body.
async fn read_request(socket: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = buf.len().min(header_end + content_length);
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    Some(RecordedRequest { method, path, headers, body })
}

/// Configuration pointing at the given upstreams, with fast retries.
pub fn test_config(llm_url: &str, scopestack_url: &str) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.timeouts.upstream_ms = 2_000;
    config.retries.max_attempts = 3;
    config.retries.base_delay_ms = 1;
    config.retries.max_delay_ms = 5;
    config.retries.jitter = false;
    config.llm.base_url = format!("{llm_url}/v1");
    config.llm.api_key = Some("test-llm-key".into());
    config.llm.default_model = "test-model".into();
    config.scopestack.base_url = scopestack_url.to_string();
    config.scopestack.api_token = Some("test-scopestack-token".into());
    config
}

/// Serve `config` on an ephemeral port.
pub async fn start_gateway(config: GatewayConfig) -> (SocketAddr, Shutdown) {
    serve(GatewayServer::new(config)).await
}

/// Serve `config` with `observer` receiving every upstream attempt.
pub async fn start_gateway_with_observer(
    config: GatewayConfig,
    observer: Arc<dyn AttemptObserver>,
) -> (SocketAddr, Shutdown) {
    serve(GatewayServer::with_observer(config, observer)).await
}

async fn serve(server: GatewayServer) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    (addr, shutdown)
}

/// Chat-completion response body carrying `text`.
pub fn completion_body(text: &str) -> String {
    serde_json::json!({
        "id": "chatcmpl-test",
        "model": "test-model",
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": text } }]
    })
    .to_string()
}
