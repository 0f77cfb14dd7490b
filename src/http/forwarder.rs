//! Backend request forwarding.
//!
//! # Responsibilities
//! - Build the backend URL on loopback
//! - Forward method, headers and body in a single attempt
//! - Bound the whole exchange (send + full body read) by the class deadline
//! - Classify transport failures into unreachable / timeout / other
//!
//! # Design Decisions
//! - Redirects are followed by the client, the browser never sees them
//! - Bodies are buffered: the rewriter needs the complete payload
//! - Decompression happens in the client; callers strip content-encoding

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, StatusCode};

use crate::config::schema::TimeoutConfig;
use crate::http::request::ProxyRequest;
use crate::resilience::timeouts::{with_deadline, TimeoutClass, TimeoutPolicy};

/// Loopback host every tool backend binds to.
pub const BACKEND_HOST: &str = "127.0.0.1";

/// A fully buffered backend response.
#[derive(Debug, Clone)]
pub struct BackendResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl BackendResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        Self {
            status,
            headers,
            content_type,
            body,
        }
    }
}

/// Transport failure kinds.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error("backend at {url} is unreachable: {message}")]
    Unreachable { url: String, message: String },

    #[error("backend at {url} did not answer within {timeout:?}")]
    Timeout {
        url: String,
        timeout: Duration,
        class: TimeoutClass,
    },

    #[error("forwarding to {url} failed: {message}")]
    Other { url: String, message: String },
}

impl ForwardError {
    pub fn kind(&self) -> &'static str {
        match self {
            ForwardError::Unreachable { .. } => "unreachable",
            ForwardError::Timeout { .. } => "timeout",
            ForwardError::Other { .. } => "other",
        }
    }

    fn classify(error: reqwest::Error, url: &str, policy: TimeoutPolicy) -> Self {
        if error.is_timeout() {
            ForwardError::Timeout {
                url: url.to_string(),
                timeout: policy.duration,
                class: policy.class,
            }
        } else if error.is_connect() {
            ForwardError::Unreachable {
                url: url.to_string(),
                message: error_chain(&error),
            }
        } else {
            ForwardError::Other {
                url: url.to_string(),
                message: error_chain(&error),
            }
        }
    }
}

/// `reqwest` hides the interesting part of connect errors in `source()`.
fn error_chain(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// `http://127.0.0.1:{port}{normalizedPath}{?query}`.
pub fn backend_url(port: u16, normalized_path: &str, query: Option<&str>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("http://{}:{}{}?{}", BACKEND_HOST, port, normalized_path, q),
        _ => format!("http://{}:{}{}", BACKEND_HOST, port, normalized_path),
    }
}

/// Sends proxy requests to tool backends.
#[derive(Clone)]
pub struct RequestForwarder {
    client: reqwest::Client,
    timeouts: TimeoutConfig,
}

impl RequestForwarder {
    pub fn new(timeouts: TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .redirect(reqwest::redirect::Policy::limited(10))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self { client, timeouts })
    }

    pub fn policy_for(&self, remaining_path: &str) -> TimeoutPolicy {
        TimeoutPolicy::for_path(&self.timeouts, remaining_path)
    }

    /// Forward one request. `headers` is the outbound header set, already
    /// filtered and carrying identity headers where applicable.
    pub async fn forward(
        &self,
        request: &ProxyRequest,
        headers: HeaderMap,
        port: u16,
    ) -> Result<BackendResponse, ForwardError> {
        let url = backend_url(port, &request.normalized_path(), request.query.as_deref());
        let policy = self.policy_for(&request.remaining_path);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .headers(headers);
        if let Some(body) = request.body.clone().filter(|_| request.carries_body()) {
            builder = builder.body(body);
        }

        tracing::debug!(
            tool = %request.tool_slug,
            url = %url,
            timeout_class = policy.class.as_str(),
            timeout_secs = policy.duration.as_secs(),
            "Forwarding to backend"
        );

        let exchange = async {
            let response = builder.send().await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(BackendResponse::new(status, headers, body))
        };

        match with_deadline(policy.duration, exchange).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => Err(ForwardError::classify(e, &url, policy)),
            Err(_) => Err(ForwardError::Timeout {
                url,
                timeout: policy.duration,
                class: policy.class,
            }),
        }
    }
}
