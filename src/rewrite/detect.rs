//! Payload classification: is it HTML, and which rule set applies.

use crate::rewrite::RewriteMode;

/// How much of an undeclared body is inspected for an HTML signature.
pub const SNIFF_LEN: usize = 1024;

const HTML_SIGNATURES: &[&str] = &["<!doctype", "<html", "<head"];

/// Substrings only Streamlit documents carry.
const STREAMLIT_MARKERS: &[&str] = &["streamlit", "_stcore"];

/// Content types that say nothing about the payload.
fn is_generic(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    essence.is_empty()
        || essence.eq_ignore_ascii_case("application/octet-stream")
        || essence.eq_ignore_ascii_case("binary/octet-stream")
}

pub fn declares_html(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase().contains("text/html"))
        .unwrap_or(false)
}

/// Trust a declared HTML type; sniff only when the type is absent or
/// generic. Any other declared type is never rewritten.
pub fn is_html(content_type: Option<&str>, body: &[u8]) -> bool {
    if declares_html(content_type) {
        return true;
    }
    if content_type.map(is_generic).unwrap_or(true) {
        return sniff_html(body);
    }
    false
}

pub fn sniff_html(body: &[u8]) -> bool {
    let head = &body[..body.len().min(SNIFF_LEN)];
    let head = String::from_utf8_lossy(head).to_ascii_lowercase();
    HTML_SIGNATURES.iter().any(|sig| head.contains(sig))
}

pub fn detect_mode(html: &str) -> RewriteMode {
    let lowered = html.to_ascii_lowercase();
    if STREAMLIT_MARKERS.iter().any(|m| lowered.contains(m)) {
        RewriteMode::Streamlit
    } else {
        RewriteMode::Generic
    }
}
