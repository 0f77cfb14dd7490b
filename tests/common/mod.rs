//! Shared utilities for integration testing.
//!
//! Mock backends speak just enough HTTP/1.1 over raw TCP: they read one
//! request (headers plus a `Content-Length` body), record it, answer with a
//! canned response and close the connection.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use tool_gateway::config::GatewayConfig;
use tool_gateway::config::schema::ToolOverride;
use tool_gateway::http::HttpServer;
use tool_gateway::lifecycle::Shutdown;
use tool_gateway::security::{AuthGate, MemorySessionStore, StaticAuthSettings, User};

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Captured {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Canned backend answer.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub delay: Duration,
}

impl MockResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        let headers = content_type
            .map(|ct| vec![("Content-Type".to_string(), ct.to_string())])
            .unwrap_or_default();
        Self {
            status,
            headers,
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn html(body: &str) -> Self {
        Self::new(200, Some("text/html; charset=utf-8"), body)
    }

    pub fn json(body: &str) -> Self {
        Self::new(200, Some("application/json"), body)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn encode(&self) -> Vec<u8> {
        let reason = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("Unknown");
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status, reason);
        for (name, value) in &self.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str(&format!("Content-Length: {}\r\nConnection: close\r\n\r\n", self.body.len()));

        let mut out = head.into_bytes();
        out.extend_from_slice(&self.body);
        out
    }
}

/// Programmable backend on an ephemeral loopback port.
pub struct MockBackend {
    pub port: u16,
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl MockBackend {
    pub async fn start(response: MockResponse) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = requests.clone();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let response = response.clone();
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    if let Some(captured) = read_request(&mut socket).await {
                        recorded.lock().unwrap().push(captured);
                    }
                    tokio::time::sleep(response.delay).await;
                    let _ = socket.write_all(&response.encode()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self { port, requests }
    }

    pub fn requests(&self) -> Vec<Captured> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Captured {
        self.requests().pop().expect("backend received no request")
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split(' ');
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();

    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(Captured {
        method,
        target,
        headers,
        body,
    })
}

/// Accepts connections and never answers.
pub async fn black_hole() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    port
}

/// A loopback port with nothing listening.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

pub fn alice() -> User {
    User {
        id: "u-42".into(),
        email: "alice@example.com".into(),
        role: "admin".into(),
        name: "Alice".into(),
    }
}

/// Config pointing `slug` at `port`, with a registry path that does not exist.
pub fn config_for(tools: &[(&str, u16)], registry_dir: &tempfile::TempDir) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.registry.path = registry_dir.path().join(".ports.json").to_string_lossy().into_owned();
    for (slug, port) in tools {
        config.tools.insert(
            slug.to_string(),
            ToolOverride {
                port: Some(*port),
                uses_own_login: None,
            },
        );
    }
    config
}

/// A running gateway; shut down on drop.
pub struct TestGateway {
    pub addr: SocketAddr,
    shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway whose session store knows `sessions`.
pub async fn start_gateway(config: GatewayConfig, sessions: &[(&str, User)]) -> TestGateway {
    let store = MemorySessionStore::new();
    for (token, user) in sessions {
        store.insert(*token, user.clone());
    }
    let gate = AuthGate::new(
        &config,
        Arc::new(store),
        Arc::new(StaticAuthSettings::from_config(&config)),
    );
    start_gateway_with_gate(config, gate).await
}

/// Start a gateway around an explicitly built gate.
pub async fn start_gateway_with_gate(config: GatewayConfig, gate: AuthGate) -> TestGateway {
    let server = HttpServer::with_gate(config, gate).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestGateway { addr, shutdown }
}

/// Client that does not follow redirects.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// Send `GET {target}` verbatim over TCP; HTTP clients would normalize dot
/// segments before sending. Returns the status code.
pub async fn raw_get(addr: SocketAddr, target: &str) -> u16 {
    let mut socket = TcpStream::connect(addr).await.unwrap();
    let request = format!(
        "GET {} HTTP/1.1\r\nHost: {}\r\nAccept: application/json\r\nConnection: close\r\n\r\n",
        target, addr
    );
    socket.write_all(request.as_bytes()).await.unwrap();

    let mut response = Vec::new();
    socket.read_to_end(&mut response).await.unwrap();
    let head = String::from_utf8_lossy(&response);
    head.split(' ').nth(1).and_then(|code| code.parse().ok()).unwrap_or(0)
}
