//! Header manipulation in both directions.
//!
//! # Responsibilities
//! - Build the header set sent to the backend (X-Forwarded-*, cookie)
//! - Strip backend response headers that break framing or embedding
//! - Add permissive CORS and nosniff to every proxied response

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::security::auth::{X_PROXY_AUTHENTICATED, X_PROXY_USER};

pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const FRAME_ANCESTORS: HeaderName = HeaderName::from_static("frame-ancestors");

pub const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
pub const PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");

/// Inbound headers never copied to the backend: host, the encoding/length
/// pair the outbound client owns, hop-by-hop headers, and identity headers
/// which only the gate may set.
const NOT_FORWARDED: [HeaderName; 11] = [
    header::HOST,
    header::ACCEPT_ENCODING,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
    header::TE,
    header::UPGRADE,
    KEEP_ALIVE,
    PROXY_CONNECTION,
    X_PROXY_AUTHENTICATED,
    X_PROXY_USER,
];

/// Backend response headers never returned to the client.
pub const STRIPPED_RESPONSE_HEADERS: [HeaderName; 7] = [
    header::CONTENT_ENCODING,
    header::TRANSFER_ENCODING,
    header::X_FRAME_OPTIONS,
    header::CONTENT_SECURITY_POLICY,
    FRAME_ANCESTORS,
    header::CONTENT_LENGTH,
    header::CONNECTION,
];

/// Scheme the client used to reach the gateway.
pub fn forwarded_proto(headers: &HeaderMap) -> &str {
    headers
        .get(&X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("http")
}

/// Host the client addressed, preferring an upstream proxy's assertion.
pub fn forwarded_host(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(&X_FORWARDED_HOST)
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

/// Headers for the backend request: inbound headers minus `NOT_FORWARDED`,
/// with cookie and forwarding headers re-asserted.
pub fn backend_request_headers(inbound: &HeaderMap, identity: Option<HeaderMap>) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len() + 4);
    for (name, value) in inbound {
        if !NOT_FORWARDED.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    // Multiple cookie headers are folded into one.
    let cookies: Vec<&str> = inbound
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if !cookies.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&cookies.join("; ")) {
            headers.insert(header::COOKIE, value);
        }
    }

    if let Some(host) = forwarded_host(inbound).and_then(|h| HeaderValue::from_str(h).ok()) {
        headers.insert(X_FORWARDED_HOST, host);
    }
    if let Ok(proto) = HeaderValue::from_str(forwarded_proto(inbound)) {
        headers.insert(X_FORWARDED_PROTO, proto);
    }

    if let Some(identity) = identity {
        for (name, value) in identity.iter() {
            headers.insert(name.clone(), value.clone());
        }
    }
    headers
}

/// Remove headers that must not reach the client.
pub fn strip_response_headers(headers: &mut HeaderMap) {
    for name in STRIPPED_RESPONSE_HEADERS {
        headers.remove(name);
    }
}

/// Permissive CORS plus nosniff.
pub fn apply_response_policy(headers: &mut HeaderMap) {
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE, PATCH, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization, X-Requested-With"),
    );
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_headers_drop_host_and_assert_forwarding() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::HOST, HeaderValue::from_static("dash.local:4090"));
        inbound.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("br"));
        inbound.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        inbound.append(header::COOKIE, HeaderValue::from_static("a=1"));
        inbound.append(header::COOKIE, HeaderValue::from_static("session_token=x"));

        let out = backend_request_headers(&inbound, None);
        assert!(out.get(header::HOST).is_none());
        assert!(out.get(header::ACCEPT_ENCODING).is_none());
        assert_eq!(out[header::ACCEPT], "text/html");
        assert_eq!(out[header::COOKIE], "a=1; session_token=x");
        assert_eq!(out.get_all(header::COOKIE).iter().count(), 1);
        assert_eq!(out[X_FORWARDED_HOST], "dash.local:4090");
        assert_eq!(out[X_FORWARDED_PROTO], "http");
    }

    #[test]
    fn test_client_cannot_forge_identity() {
        let mut inbound = HeaderMap::new();
        inbound.insert(X_PROXY_AUTHENTICATED, HeaderValue::from_static("true"));
        inbound.insert(X_PROXY_USER, HeaderValue::from_static(r#"{"id":"root"}"#));

        let out = backend_request_headers(&inbound, None);
        assert!(out.get(X_PROXY_AUTHENTICATED).is_none());
        assert!(out.get(X_PROXY_USER).is_none());

        let mut identity = HeaderMap::new();
        identity.insert(X_PROXY_AUTHENTICATED, HeaderValue::from_static("true"));
        let out = backend_request_headers(&inbound, Some(identity));
        assert_eq!(out[X_PROXY_AUTHENTICATED], "true");
        assert!(out.get(X_PROXY_USER).is_none());
    }

    #[test]
    fn test_upstream_forwarded_proto_wins() {
        let mut inbound = HeaderMap::new();
        inbound.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https, http"));
        inbound.insert(X_FORWARDED_HOST, HeaderValue::from_static("tools.example.com"));
        inbound.insert(header::HOST, HeaderValue::from_static("10.0.0.5"));
        assert_eq!(forwarded_proto(&inbound), "https");
        assert_eq!(forwarded_host(&inbound), Some("tools.example.com"));
    }

    #[test]
    fn test_response_policy() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        headers.insert(header::CONTENT_SECURITY_POLICY, HeaderValue::from_static("default-src 'self'"));
        headers.insert(FRAME_ANCESTORS, HeaderValue::from_static("'none'"));
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));

        strip_response_headers(&mut headers);
        apply_response_policy(&mut headers);

        assert!(headers.get(header::CONTENT_ENCODING).is_none());
        assert!(headers.get(header::X_FRAME_OPTIONS).is_none());
        assert!(headers.get(header::CONTENT_SECURITY_POLICY).is_none());
        assert!(headers.get(FRAME_ANCESTORS).is_none());
        assert_eq!(headers[header::CONTENT_TYPE], "text/html");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    }
}
