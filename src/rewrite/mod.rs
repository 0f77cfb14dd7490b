//! Response rewriting.
//!
//! # Responsibilities
//! - Decide whether a backend payload is HTML
//! - Pick one rule set per document (generic or Streamlit)
//! - Re-prefix root-relative URLs under `/_proxy/{slug}/`
//! - Relocate framework WebSockets to the WebSocket proxy
//!
//! # Design Decisions
//! - Rule sets are ordered tables of small functions, each tested on its own
//! - Non-HTML bodies are returned byte-for-byte
//! - Empty bodies (HEAD, `204`, a true `304`) are never rewritten
//! - A failing rewrite falls back to the original bytes; it is never an
//!   error response

pub mod detect;
pub mod generic;
pub mod rules;
pub mod streamlit;
pub mod websocket;

use std::panic::{catch_unwind, AssertUnwindSafe};

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};

use crate::http::forwarder::BackendResponse;
use crate::observability::metrics;
use crate::rewrite::rules::Rule;
use crate::security::headers::strip_response_headers;

pub use websocket::WsTarget;

/// Rule set selected for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    Generic,
    Streamlit,
}

impl RewriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RewriteMode::Generic => "generic",
            RewriteMode::Streamlit => "streamlit",
        }
    }

    pub fn rules(&self) -> &'static [Rule] {
        match self {
            RewriteMode::Generic => generic::GENERIC_RULES,
            RewriteMode::Streamlit => streamlit::STREAMLIT_RULES,
        }
    }
}

/// Per-document rewrite inputs.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    pub tool_slug: String,
    pub mode: RewriteMode,
    pub ws: WsTarget,
}

impl RewriteContext {
    /// Mode is taken from the document itself.
    pub fn detect(tool_slug: impl Into<String>, html: &str, ws: WsTarget) -> Self {
        Self {
            tool_slug: tool_slug.into(),
            mode: detect::detect_mode(html),
            ws,
        }
    }

    /// `/_proxy/{slug}/`
    pub fn base_path(&self) -> String {
        format!("/_proxy/{}/", self.tool_slug)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RewriteError {
    #[error("body is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    #[error("rule set {0} panicked")]
    Panicked(&'static str),
}

/// Response ready for status normalization and the response policy.
#[derive(Debug, Clone)]
pub struct FinalResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    /// Rule set applied, `None` for passthrough or fallback.
    pub mode: Option<RewriteMode>,
}

/// Apply the context's rule set to a UTF-8 document.
pub fn apply(body: &[u8], tool_slug: &str, ws: &WsTarget) -> Result<(RewriteMode, String), RewriteError> {
    let html = std::str::from_utf8(body)?;
    let ctx = RewriteContext::detect(tool_slug, html, ws.clone());
    let mode = ctx.mode;
    catch_unwind(AssertUnwindSafe(|| rules::run(mode.rules(), html, &ctx)))
        .map(|text| (mode, text))
        .map_err(|_| RewriteError::Panicked(mode.as_str()))
}

/// Whether there is a document to rewrite. HEAD answers arrive with an
/// empty body, so they pass through here as well.
fn has_document(status: StatusCode, body: &[u8]) -> bool {
    !body.is_empty() && status != StatusCode::NO_CONTENT
}

/// Turn a buffered backend response into the body the client receives.
pub fn rewrite(response: BackendResponse, tool_slug: &str, ws: &WsTarget) -> FinalResponse {
    let BackendResponse {
        status,
        mut headers,
        content_type,
        body,
    } = response;

    // The client already decoded the payload; length is recomputed on emit.
    strip_response_headers(&mut headers);

    if !has_document(status, &body) || !detect::is_html(content_type.as_deref(), &body) {
        return FinalResponse {
            status,
            headers,
            body,
            mode: None,
        };
    }

    if !detect::declares_html(content_type.as_deref()) {
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
    }

    match apply(&body, tool_slug, ws) {
        Ok((mode, text)) => {
            metrics::record_rewrite(tool_slug, mode.as_str(), "rewritten");
            FinalResponse {
                status,
                headers,
                body: Bytes::from(text),
                mode: Some(mode),
            }
        }
        Err(e) => {
            tracing::warn!(tool = %tool_slug, error = %e, "HTML rewrite failed, serving original body");
            metrics::record_rewrite(tool_slug, "none", "fallback");
            FinalResponse {
                status,
                headers,
                body,
                mode: None,
            }
        }
    }
}
