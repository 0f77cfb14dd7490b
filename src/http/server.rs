//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy mounts, health and admin routes
//! - Wire up middleware (request ID, tracing, timeout ceiling, body limit)
//! - Run one proxied request end to end: resolve, authorize, forward,
//!   rewrite, finalize
//! - Observability (metrics, request-scoped log fields)
//!
//! # Design Decisions
//! - One handler serves both `/proxy/` and `/_proxy/`
//! - The tool is resolved and the caller authorized before the body is read
//! - Single forward attempt, no retries: the browser re-issues after a 5xx
//! - The outer timeout ceiling sits above the longest per-class deadline so
//!   the forwarder's own timeout always fires first

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::GatewayConfig;
use crate::http::error::GatewayError;
use crate::http::forwarder::{ForwardError, RequestForwarder};
use crate::http::request::{has_dot_segment, original_url, tool_path, wants_html, ProxyRequest};
use crate::http::response::finalize;
use crate::lifecycle::shutdown::stopped;
use crate::observability::metrics;
use crate::rewrite::{rewrite, WsTarget};
use crate::routing::PortResolver;
use crate::security::auth::identity_headers;
use crate::security::headers::{apply_response_policy, backend_request_headers, forwarded_host, forwarded_proto};
use crate::security::{Access, AuthGate};

/// Shared per-process components.
pub struct GatewayState {
    pub config: GatewayConfig,
    pub resolver: PortResolver,
    pub gate: AuthGate,
    pub forwarder: RequestForwarder,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<GatewayState>,
}

/// HTTP server for the tool gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with collaborators taken from the config.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let gate = AuthGate::from_config(&config);
        Self::with_gate(config, gate)
    }

    /// Create a server around an explicitly constructed auth gate.
    pub fn with_gate(config: GatewayConfig, gate: AuthGate) -> Result<Self, reqwest::Error> {
        let state = AppState {
            inner: Arc::new(GatewayState {
                resolver: PortResolver::from_config(&config),
                forwarder: RequestForwarder::new(config.timeouts.clone())?,
                gate,
                config: config.clone(),
            }),
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let mut router = Router::new()
            .route("/_gateway/health", get(health_handler))
            .route("/proxy", any(proxy_handler))
            .route("/proxy/", any(proxy_handler))
            .route("/proxy/{*path}", any(proxy_handler))
            .route("/_proxy", any(proxy_handler))
            .route("/_proxy/", any(proxy_handler))
            .route("/_proxy/{*path}", any(proxy_handler))
            .with_state(state.clone());

        if config.admin.enabled {
            router = router.merge(setup_admin_router(state));
        }

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    let request_id = request
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("unknown");
                    tracing::info_span!(
                        "request",
                        request_id = %request_id,
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                }))
                .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                .layer(TimeoutLayer::new(config.timeouts.request_ceiling())),
        )
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            admin = self.config.admin.enabled,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                stopped(shutdown).await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

/// Liveness check, never authenticated.
async fn health_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    let tools = state.inner.resolver.registrations().await.len();
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "tools": tools,
    }))
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let gateway = &state.inner;
    let (parts, body) = request.into_parts();
    let method = parts.method.to_string();
    let html = wants_html(&parts.headers);

    // 1. Resolve tool
    let path = tool_path(&parts.uri).unwrap_or("");
    if has_dot_segment(path) {
        tracing::warn!(path = %parts.uri.path(), "Rejected path with dot segment");
        let error = GatewayError::InvalidPath {
            path: parts.uri.path().to_string(),
        };
        return reject(error, html, "none", &method, start);
    }
    let resolved = match gateway.resolver.locate(path).await {
        Some(resolved) => resolved,
        None => {
            tracing::warn!(path = %parts.uri.path(), "No tool matched");
            let error = GatewayError::UnknownTool {
                path: parts.uri.path().to_string(),
            };
            return reject(error, html, "none", &method, start);
        }
    };
    let tool = resolved.tool.slug.clone();
    let port = resolved.tool.port;

    // 2. Authorize
    let identity = match gateway.gate.check(&tool, &resolved.remaining_path, &parts.headers).await {
        Ok(Access::Public) => None,
        Ok(Access::Authenticated(user)) => {
            tracing::debug!(tool = %tool, user_id = %user.id, "Session accepted");
            Some(identity_headers(&user))
        }
        Err(_) => {
            tracing::info!(tool = %tool, path = %resolved.remaining_path, "Unauthenticated request rejected");
            let error = GatewayError::Unauthenticated {
                login_path: gateway.config.auth.login_path.clone(),
                original_url: original_url(&parts.uri),
            };
            return reject(error, html, &tool, &method, start);
        }
    };

    // 3. Buffer body
    let mut proxy_request = ProxyRequest::new(
        parts.method.clone(),
        &tool,
        &resolved.remaining_path,
        &parts.uri,
        parts.headers.clone(),
    );
    if proxy_request.carries_body() {
        match axum::body::to_bytes(body, gateway.config.security.max_body_size).await {
            Ok(bytes) => proxy_request = proxy_request.with_body(bytes),
            Err(e) => {
                tracing::warn!(tool = %tool, error = %e, "Failed to read request body");
                metrics::record_request(&tool, &method, StatusCode::PAYLOAD_TOO_LARGE.as_u16(), start);
                let body = json!({ "error": "request body too large", "code": "body_too_large" });
                return (StatusCode::PAYLOAD_TOO_LARGE, Json(body)).into_response();
            }
        }
    }

    // 4. Forward
    let headers = backend_request_headers(&parts.headers, identity);
    let backend = match gateway.forwarder.forward(&proxy_request, headers, port).await {
        Ok(backend) => backend,
        Err(e) => {
            metrics::record_backend_error(&tool, e.kind());
            match &e {
                ForwardError::Timeout { timeout, class, .. } => tracing::warn!(
                    tool = %tool,
                    port = port,
                    kind = e.kind(),
                    timeout_class = class.as_str(),
                    timeout_secs = timeout.as_secs(),
                    "Backend timed out"
                ),
                _ => tracing::error!(tool = %tool, port = port, kind = e.kind(), error = %e, "Backend request failed"),
            }
            return reject(GatewayError::from_forward(&tool, port, e), html, &tool, &method, start);
        }
    };

    if backend.status.as_u16() >= 400 && backend.body.is_empty() {
        tracing::warn!(tool = %tool, status = backend.status.as_u16(), "Backend error without body");
        let error = GatewayError::empty_error_body(&tool, port, backend.status);
        return reject(error, html, &tool, &method, start);
    }

    // 5. Rewrite and finalize
    let ws = ws_target(&gateway.config, &parts.headers);
    let response = finalize(rewrite(backend, &tool, &ws));

    tracing::debug!(tool = %tool, port = port, status = response.status().as_u16(), "Request proxied");
    metrics::record_request(&tool, &method, response.status().as_u16(), start);
    response
}

fn reject(error: GatewayError, wants_html: bool, tool: &str, method: &str, start: Instant) -> Response {
    let mut response = error.present(wants_html);
    apply_response_policy(response.headers_mut());
    metrics::record_request(tool, method, response.status().as_u16(), start);
    response
}

/// Where relocated sockets connect for this client: configured host, else
/// the host the client addressed, on the WebSocket proxy's port.
pub fn ws_target(config: &GatewayConfig, headers: &HeaderMap) -> WsTarget {
    let protocol = WsTarget::protocol_for(forwarded_proto(headers));
    let host = match &config.websocket.host {
        Some(host) => host.clone(),
        None => forwarded_host(headers)
            .map(host_name)
            .unwrap_or("localhost")
            .to_string(),
    };
    WsTarget::new(protocol, host, config.websocket.port)
}

/// Host without its port, keeping IPv6 brackets.
fn host_name(authority: &str) -> &str {
    if authority.starts_with('[') {
        return authority
            .find(']')
            .map(|end| &authority[..=end])
            .unwrap_or(authority);
    }
    authority.split(':').next().unwrap_or(authority)
}
