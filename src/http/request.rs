//! Inbound request model.
//!
//! # Responsibilities
//! - Strip the mount point (`/proxy/`, `/_proxy/`) from the request path
//! - Carry the per-request forwarding inputs (`ProxyRequest`)
//! - Content negotiation for error presentation
//! - Refuse paths with dot segments before they reach auth or the backend URL
//!
//! # Design Decisions
//! - The tool is resolved before the body is read
//! - Paths stay percent-encoded; the backend sees exactly what the client sent

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, Uri};

/// Mount points served by the proxy handler.
pub const MOUNTS: &[&str] = &["/proxy/", "/_proxy/"];

/// Path after the mount point, or `None` for foreign paths.
pub fn tool_path(uri: &Uri) -> Option<&str> {
    let path = uri.path();
    MOUNTS.iter().find_map(|mount| {
        path.strip_prefix(mount)
            .or_else(|| (path == mount.trim_end_matches('/')).then_some(""))
    })
}

/// Whether any segment is `.` or `..`, including percent-encoded dots and
/// separators. The outbound URL parser would collapse such segments after
/// the auth decision was taken on the raw path.
pub fn has_dot_segment(path: &str) -> bool {
    let lowered = path.to_ascii_lowercase();
    let unescaped = lowered
        .replace("%2f", "/")
        .replace("%5c", "/")
        .replace("%2e", ".");
    unescaped
        .split(['/', '\\'])
        .any(|segment| segment == "." || segment == "..")
}

/// Forwarding inputs, derived once per inbound request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    pub method: Method,
    pub tool_slug: String,
    pub remaining_path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

impl ProxyRequest {
    pub fn new(method: Method, tool_slug: impl Into<String>, remaining_path: impl Into<String>, uri: &Uri, headers: HeaderMap) -> Self {
        Self {
            method,
            tool_slug: tool_slug.into(),
            remaining_path: remaining_path.into(),
            query: uri.query().filter(|q| !q.is_empty()).map(str::to_string),
            headers,
            body: None,
        }
    }

    /// GET and HEAD never carry a forwarded body.
    pub fn carries_body(&self) -> bool {
        self.method != Method::GET && self.method != Method::HEAD
    }

    pub fn with_body(mut self, body: Bytes) -> Self {
        if self.carries_body() {
            self.body = Some(body);
        }
        self
    }

    /// `/` for the tool root, otherwise exactly one leading slash.
    pub fn normalized_path(&self) -> String {
        normalize_path(&self.remaining_path)
    }
}

pub fn normalize_path(remaining_path: &str) -> String {
    format!("/{}", remaining_path.trim_start_matches('/'))
}

/// Browser navigations prefer HTML; everything else gets JSON.
pub fn wants_html(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|accept| accept.contains("text/html"))
        .unwrap_or(false)
}

/// Path and query of the original request, used as a login return target.
pub fn original_url(uri: &Uri) -> String {
    uri.path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string())
}
