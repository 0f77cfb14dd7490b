//! Request-level error taxonomy and its presentation.
//!
//! # Responsibilities
//! - Name every way a proxied request can fail before a backend answer
//!   reaches the client
//! - Present each failure as an HTML page or redirect for browsers and as
//!   JSON with stable field names for programmatic clients
//!
//! # Design Decisions
//! - Rewrite failures are absent: they are recovered inside the rewriter
//! - Every JSON body carries `error` and `code`; context fields are added
//!   where they exist so a caller can diagnose without server logs

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::Json;
use serde_json::{json, Map, Value};

use crate::http::forwarder::ForwardError;
use crate::http::response::normalize_status;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("no tool matches path '{path}'")]
    UnknownTool { path: String },

    #[error("path '{path}' contains a dot segment")]
    InvalidPath { path: String },

    #[error("authentication required")]
    Unauthenticated { login_path: String, original_url: String },

    #[error("tool '{tool}' is not reachable on port {port}")]
    BackendUnreachable {
        tool: String,
        port: u16,
        url: String,
        message: String,
    },

    #[error("tool '{tool}' did not respond within {}s", .timeout.as_secs())]
    BackendTimeout {
        tool: String,
        port: u16,
        url: String,
        timeout: Duration,
    },

    #[error("forwarding to tool '{tool}' failed: {message}")]
    BackendForward {
        tool: String,
        port: u16,
        url: String,
        message: String,
    },

    #[error("tool '{tool}' answered {status} with an empty body")]
    BackendEmptyErrorBody {
        tool: String,
        port: u16,
        status: StatusCode,
    },
}

impl GatewayError {
    pub fn from_forward(tool: &str, port: u16, error: ForwardError) -> Self {
        match error {
            ForwardError::Unreachable { url, message } => GatewayError::BackendUnreachable {
                tool: tool.to_string(),
                port,
                url,
                message,
            },
            ForwardError::Timeout { url, timeout, .. } => GatewayError::BackendTimeout {
                tool: tool.to_string(),
                port,
                url,
                timeout,
            },
            ForwardError::Other { url, message } => GatewayError::BackendForward {
                tool: tool.to_string(),
                port,
                url,
                message,
            },
        }
    }

    /// Backend error without a body; the status is clamped like any other
    /// backend status.
    pub fn empty_error_body(tool: &str, port: u16, status: StatusCode) -> Self {
        GatewayError::BackendEmptyErrorBody {
            tool: tool.to_string(),
            port,
            status: normalize_status(status, true),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::UnknownTool { .. } => StatusCode::NOT_FOUND,
            GatewayError::InvalidPath { .. } => StatusCode::BAD_REQUEST,
            GatewayError::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            GatewayError::BackendUnreachable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::BackendTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::BackendForward { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::BackendEmptyErrorBody { status, .. } => *status,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GatewayError::UnknownTool { .. } => "unknown_tool",
            GatewayError::InvalidPath { .. } => "invalid_path",
            GatewayError::Unauthenticated { .. } => "unauthenticated",
            GatewayError::BackendUnreachable { .. } => "backend_unreachable",
            GatewayError::BackendTimeout { .. } => "backend_timeout",
            GatewayError::BackendForward { .. } => "backend_forward_error",
            GatewayError::BackendEmptyErrorBody { .. } => "backend_empty_error_body",
        }
    }

    /// Browsers get a page (or the login redirect), everyone else JSON.
    pub fn present(&self, wants_html: bool) -> Response {
        if wants_html {
            if let GatewayError::Unauthenticated { login_path, original_url } = self {
                return login_redirect(login_path, original_url);
            }
            (self.status(), Html(self.html_page())).into_response()
        } else {
            (self.status(), Json(self.json_body())).into_response()
        }
    }

    pub fn json_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("error".into(), json!(self.to_string()));
        body.insert("code".into(), json!(self.code()));

        match self {
            GatewayError::UnknownTool { path } | GatewayError::InvalidPath { path } => {
                body.insert("path".into(), json!(path));
            }
            GatewayError::Unauthenticated { login_path, original_url } => {
                body.insert("login_url".into(), json!(login_location(login_path, original_url)));
            }
            GatewayError::BackendUnreachable { tool, port, url, message }
            | GatewayError::BackendForward { tool, port, url, message } => {
                body.insert("tool".into(), json!(tool));
                body.insert("port".into(), json!(port));
                body.insert("url".into(), json!(url));
                body.insert("details".into(), json!(message));
            }
            GatewayError::BackendTimeout { tool, port, url, timeout } => {
                body.insert("tool".into(), json!(tool));
                body.insert("port".into(), json!(port));
                body.insert("url".into(), json!(url));
                body.insert("timeout_secs".into(), json!(timeout.as_secs()));
            }
            GatewayError::BackendEmptyErrorBody { tool, port, status } => {
                body.insert("tool".into(), json!(tool));
                body.insert("port".into(), json!(port));
                body.insert("status".into(), json!(status.as_u16()));
            }
        }
        Value::Object(body)
    }

    fn html_page(&self) -> String {
        let (title, detail) = match self {
            GatewayError::UnknownTool { path } => (
                "Tool not found",
                format!("<p>No tool is registered for <code>{}</code>.</p>", escape_html(path)),
            ),
            GatewayError::InvalidPath { path } => (
                "Bad request",
                format!("<p>The path <code>{}</code> is not allowed.</p>", escape_html(path)),
            ),
            GatewayError::Unauthenticated { .. } => (
                "Sign in required",
                "<p>Sign in to the dashboard to open this tool.</p>".to_string(),
            ),
            GatewayError::BackendUnreachable { tool, port, .. } => (
                "Service unavailable",
                format!(
                    "<p>The <strong>{tool}</strong> service is not running on port <code>{port}</code>.</p>\
                     <ol><li>Start the tool's backend process.</li>\
                     <li>Check that it listens on <code>127.0.0.1:{port}</code> (or that the port registry lists its current port).</li>\
                     <li>Reload this page.</li></ol>",
                    tool = escape_html(tool),
                    port = port,
                ),
            ),
            GatewayError::BackendTimeout { tool, timeout, .. } => (
                "Gateway timeout",
                format!(
                    "<p>The <strong>{}</strong> service did not respond within {} seconds. Try again in a moment.</p>",
                    escape_html(tool),
                    timeout.as_secs()
                ),
            ),
            GatewayError::BackendForward { tool, message, .. } => (
                "Bad gateway",
                format!(
                    "<p>The request to <strong>{}</strong> failed.</p><pre>{}</pre>",
                    escape_html(tool),
                    escape_html(message)
                ),
            ),
            GatewayError::BackendEmptyErrorBody { tool, status, .. } => (
                "Tool error",
                format!(
                    "<p>The <strong>{}</strong> service answered <code>{}</code> without details.</p>",
                    escape_html(tool),
                    status.as_u16()
                ),
            ),
        };

        format!(
            "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>{title}</title>\
             <style>body{{font-family:system-ui,sans-serif;background:#f5f6f8;color:#1f2933;margin:0}}\
             main{{max-width:640px;margin:10vh auto;background:#fff;border-radius:8px;padding:32px;box-shadow:0 2px 8px rgba(0,0,0,.08)}}\
             h1{{font-size:1.4rem;margin-top:0}}code,pre{{background:#eef1f4;padding:2px 4px;border-radius:4px}}\
             .status{{color:#8a94a0;font-size:.9rem}}</style></head>\
             <body><main><h1>{title}</h1>{detail}<p class=\"status\">{status}</p></main></body></html>",
            title = title,
            detail = detail,
            status = self.status(),
        )
    }
}

/// `{login_path}?redirect={original_url}` with the target form-encoded.
pub fn login_location(login_path: &str, original_url: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(original_url.as_bytes()).collect();
    format!("{}?redirect={}", login_path, encoded)
}

fn login_redirect(login_path: &str, original_url: &str) -> Response {
    let location = login_location(login_path, original_url);
    match HeaderValue::from_str(&location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => StatusCode::UNAUTHORIZED.into_response(),
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
