//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the tool gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dynamic port-registry settings.
    pub registry: RegistryConfig,

    /// Per-tool overrides keyed by public slug.
    pub tools: HashMap<String, ToolOverride>,

    /// Centralized authentication settings.
    pub auth: AuthConfig,

    /// Per-class forwarding timeouts.
    pub timeouts: TimeoutConfig,

    /// Separate WebSocket proxy that relocated sockets connect to.
    pub websocket: WebSocketProxyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request limits.
    pub security: SecurityConfig,

    /// Admin/status API.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:4090").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:4090".to_string(),
        }
    }
}

/// Port-registry file consumed on every port-cache refresh.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Path of the JSON registry written by the tool launchers.
    pub path: String,

    /// Port cache time-to-live in milliseconds.
    pub ttl_ms: u64,
}

impl RegistryConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            path: ".ports.json".to_string(),
            ttl_ms: 5_000,
        }
    }
}

/// Override of a compiled-in tool default.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ToolOverride {
    /// Default port used when the registry file has no entry.
    pub port: Option<u16>,

    /// Tool authenticates its own users; centralized auth is skipped.
    pub uses_own_login: Option<bool>,
}

/// Centralized authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Enforce centralized auth. Disable only for local development.
    pub enabled: bool,

    /// Name of the session cookie issued by the dashboard host.
    pub session_cookie: String,

    /// Login page browsers are redirected to.
    pub login_path: String,

    /// Session lookup endpoint of the dashboard host. When unset, an
    /// empty in-memory store is used and every session is rejected.
    pub session_url: Option<String>,

    /// Optional endpoint returning `{slug: uses_own_login}`.
    pub settings_url: Option<String>,

    /// Auth-settings cache time-to-live in milliseconds.
    pub settings_ttl_ms: u64,

    /// Timeout for session and settings lookups, in milliseconds.
    pub lookup_timeout_ms: u64,
}

impl AuthConfig {
    pub fn settings_ttl(&self) -> Duration {
        Duration::from_millis(self.settings_ttl_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_cookie: "session_token".to_string(),
            login_path: "/login".to_string(),
            session_url: None,
            settings_url: None,
            settings_ttl_ms: 30_000,
            lookup_timeout_ms: 5_000,
        }
    }
}

/// Forwarding timeouts, selected per request by path substring.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for ordinary requests in seconds.
    pub default_secs: u64,

    /// Timeout for the long-running data refresh endpoint in seconds.
    pub refresh_secs: u64,

    /// Timeout for document generation endpoints in seconds.
    pub document_secs: u64,

    /// Path substrings that select the document timeout.
    pub document_markers: Vec<String>,

    /// Path substrings that select the refresh timeout.
    pub refresh_markers: Vec<String>,
}

impl TimeoutConfig {
    /// Ceiling for the outer request timeout layer. Always above every
    /// per-class forward timeout so the forwarder reports timeouts itself.
    pub fn request_ceiling(&self) -> Duration {
        let longest = self
            .default_secs
            .max(self.refresh_secs)
            .max(self.document_secs);
        Duration::from_secs(longest + 30)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_secs: 30,
            refresh_secs: 120,
            document_secs: 300,
            document_markers: vec![
                "vendor-pdf".to_string(),
                "generate-pdf".to_string(),
                "generate-report".to_string(),
            ],
            refresh_markers: vec!["refresh-data".to_string()],
        }
    }
}

/// WebSocket-capable proxy that relocated sockets are pointed at.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketProxyConfig {
    /// Host advertised to browsers. Falls back to the inbound host name.
    pub host: Option<String>,

    /// Port of the WebSocket proxy.
    pub port: u16,
}

impl Default for WebSocketProxyConfig {
    fn default() -> Self {
        Self {
            host: None,
            port: 4100,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Human-readable or JSON lines.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 50 * 1024 * 1024,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable `/admin/*` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:4090");
        assert_eq!(config.registry.ttl_ms, 5_000);
        assert_eq!(config.auth.settings_ttl_ms, 30_000);
        assert_eq!(config.websocket.port, 4100);
        assert!(config.auth.enabled);
    }

    #[test]
    fn test_tool_overrides_parse() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [tools.sheets]
            port = 5001
            uses_own_login = true

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();
        let sheets = &config.tools["sheets"];
        assert_eq!(sheets.port, Some(5001));
        assert_eq!(sheets.uses_own_login, Some(true));
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_request_ceiling_exceeds_longest_class() {
        let timeouts = TimeoutConfig::default();
        assert!(timeouts.request_ceiling() > Duration::from_secs(timeouts.document_secs));
    }
}
