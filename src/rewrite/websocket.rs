//! WebSocket endpoint relocation.
//!
//! The HTTP gateway cannot service protocol upgrades, so framework sockets
//! are pointed at the separate WebSocket proxy. Only URLs carrying one of
//! the framework's marker segments (or an existing proxy prefix) move;
//! everything else keeps its original target.

use crate::rewrite::rules::js_string;

/// Path segments identifying framework sockets.
pub const MARKER_SEGMENTS: &[&str] = &["_stcore", "stream"];

/// Marker proving the constructor override is installed.
pub const SHIM_MARKER: &str = "window.__PROXY_WS_PATCHED__";

/// Where relocated sockets connect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsTarget {
    pub protocol: String,
    pub host: String,
    pub port: u16,
}

impl WsTarget {
    pub fn new(protocol: impl Into<String>, host: impl Into<String>, port: u16) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            port,
        }
    }

    /// `wss` behind TLS, `ws` otherwise.
    pub fn protocol_for(forwarded_proto: &str) -> &'static str {
        if forwarded_proto.eq_ignore_ascii_case("https") {
            "wss"
        } else {
            "ws"
        }
    }

    /// `{protocol}://{host}:{port}{logical_path}`.
    pub fn url_for(&self, logical_path: &str) -> String {
        format!("{}://{}:{}{}", self.protocol, self.host, self.port, logical_path)
    }

    /// Relocated URL, or `None` when `url` is not a framework socket.
    pub fn relocate(&self, url: &str) -> Option<String> {
        is_relocatable(url).then(|| self.url_for(&logical_path(url)))
    }
}

/// Path portion of `url` with scheme, authority and any
/// `/_proxy/{slug}` prefix removed. Always starts with `/`.
pub fn logical_path(url: &str) -> String {
    let path = match url.split_once("://") {
        Some((_, rest)) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
        None => url,
    };

    let path = match path.strip_prefix("/_proxy/") {
        Some(rest) => rest.find('/').map(|i| &rest[i..]).unwrap_or("/"),
        None => path,
    };

    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Framework sockets and anything already under the proxy prefix.
pub fn is_relocatable(url: &str) -> bool {
    if url.contains("/_proxy/") {
        return true;
    }
    let path = logical_path(url);
    let path = path.split(['?', '#']).next().unwrap_or("");
    path.split('/').any(|segment| MARKER_SEGMENTS.contains(&segment))
}

/// Script replacing the global WebSocket constructor. Marker segments are
/// written without a leading slash so the literal-path rules never touch
/// the shim itself.
pub fn shim_script(target: &WsTarget) -> String {
    let markers = MARKER_SEGMENTS
        .iter()
        .map(|m| js_string(m))
        .collect::<Vec<_>>()
        .join(",");

    format!(
        r#"<script>(function(){{
if ({marker}) return;
{marker} = true;
var OriginalWebSocket = window.WebSocket;
var wsProtocol = window.location.protocol === 'https:' ? 'wss' : 'ws';
var wsHost = {host};
var wsPort = {port};
var markers = [{markers}];
function logicalPath(url) {{
  var path = url.replace(/^[a-z][a-z0-9+.-]*:\/\/[^\/]*/i, '');
  path = path.replace(/^\/_proxy\/[^\/?#]+/, '');
  return path.charAt(0) === '/' ? path : '/' + path;
}}
function relocatable(url) {{
  if (url.indexOf('/_proxy/') !== -1) return true;
  var segments = logicalPath(url).split(/[?#]/)[0].split('/');
  for (var i = 0; i < segments.length; i++) {{
    if (markers.indexOf(segments[i]) !== -1) return true;
  }}
  return false;
}}
function ProxiedWebSocket(url, protocols) {{
  var target = String(url);
  if (relocatable(target)) {{
    target = wsProtocol + '://' + wsHost + ':' + wsPort + logicalPath(target);
  }}
  return protocols === undefined ? new OriginalWebSocket(target) : new OriginalWebSocket(target, protocols);
}}
ProxiedWebSocket.prototype = OriginalWebSocket.prototype;
ProxiedWebSocket.CONNECTING = OriginalWebSocket.CONNECTING;
ProxiedWebSocket.OPEN = OriginalWebSocket.OPEN;
ProxiedWebSocket.CLOSING = OriginalWebSocket.CLOSING;
ProxiedWebSocket.CLOSED = OriginalWebSocket.CLOSED;
window.WebSocket = ProxiedWebSocket;
}})();</script>"#,
        marker = SHIM_MARKER,
        host = js_string(&target.host),
        port = target.port,
        markers = markers,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logical_path() {
        assert_eq!(logical_path("ws://host/_proxy/slug/_stcore/stream"), "/_stcore/stream");
        assert_eq!(logical_path("wss://host:8501/_stcore/stream?x=1"), "/_stcore/stream?x=1");
        assert_eq!(logical_path("ws://host"), "/");
        assert_eq!(logical_path("/_proxy/slug/stream"), "/stream");
        assert_eq!(logical_path("_stcore/stream"), "/_stcore/stream");
    }

    #[test]
    fn test_relocatable() {
        assert!(is_relocatable("ws://host/_stcore/stream"));
        assert!(is_relocatable("ws://host/stream"));
        assert!(is_relocatable("ws://host/_proxy/other/socket"));
        assert!(!is_relocatable("ws://host/streaming-api"));
        assert!(!is_relocatable("wss://chat.example.com/socket"));
    }

    #[test]
    fn test_relocate() {
        let target = WsTarget::new("ws", "localhost", 4100);
        assert_eq!(
            target.relocate("ws://host/_proxy/slug/_stcore/stream").as_deref(),
            Some("ws://localhost:4100/_stcore/stream")
        );
        assert_eq!(target.relocate("wss://elsewhere/live"), None);
    }

    #[test]
    fn test_protocol_for() {
        assert_eq!(WsTarget::protocol_for("https"), "wss");
        assert_eq!(WsTarget::protocol_for("http"), "ws");
    }

    #[test]
    fn test_shim_script_carries_target() {
        let script = shim_script(&WsTarget::new("ws", "dash.local", 4100));
        assert!(script.starts_with("<script>"));
        assert!(script.contains(SHIM_MARKER));
        assert!(script.contains("var wsHost = \"dash.local\";"));
        assert!(script.contains("var wsPort = 4100;"));
        assert!(script.contains(r#"var markers = ["_stcore","stream"];"#));
        assert!(!script.contains("'/_stcore"));
    }
}
