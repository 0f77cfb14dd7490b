//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};
use crate::routing::tools::TOOLS;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub const WS_PROXY_PORT: &str = "WS_PROXY_PORT";
pub const WS_PROXY_HOST: &str = "WS_PROXY_HOST";
pub const GATEWAY_BIND_ADDRESS: &str = "GATEWAY_BIND_ADDRESS";
pub const PORT_REGISTRY_PATH: &str = "PORT_REGISTRY_PATH";

/// Parse a TOML file without validating it.
pub fn read_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// File (or defaults when `path` is `None`), then the process environment,
/// then validation.
pub fn load(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

/// `load` with an injected environment.
pub fn load_with(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => GatewayConfig::default(),
    };
    apply_env_overrides(&mut config, lookup);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(variable = key, value = %raw, "Ignoring unparseable environment override");
            None
        }
    }
}

/// Overlay environment variables onto `config`. `lookup` is injected so the
/// overlay can be tested without touching the process environment.
pub fn apply_env_overrides(config: &mut GatewayConfig, lookup: impl Fn(&str) -> Option<String>) {
    for tool in TOOLS {
        if let Some(port) = parse_var::<u16>(&lookup, &tool.port_env()) {
            config.tools.entry(tool.slug.to_string()).or_default().port = Some(port);
        }
    }

    if let Some(port) = parse_var::<u16>(&lookup, WS_PROXY_PORT) {
        config.websocket.port = port;
    }
    if let Some(host) = lookup(WS_PROXY_HOST).filter(|h| !h.trim().is_empty()) {
        config.websocket.host = Some(host.trim().to_string());
    }
    if let Some(addr) = lookup(GATEWAY_BIND_ADDRESS).filter(|a| !a.trim().is_empty()) {
        config.listener.bind_address = addr.trim().to_string();
    }
    if let Some(path) = lookup(PORT_REGISTRY_PATH).filter(|p| !p.trim().is_empty()) {
        config.registry.path = path.trim().to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_overrides() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(
            &mut config,
            env(&[
                ("SHEETS_PORT", "5001"),
                ("ORDER_ID_EXTRACTOR_PORT", "5006"),
                ("WS_PROXY_PORT", "4200"),
                ("WS_PROXY_HOST", "ws.internal"),
                ("PORT_REGISTRY_PATH", "/run/ports.json"),
            ]),
        );
        assert_eq!(config.tools["sheets"].port, Some(5001));
        assert_eq!(config.tools["order-id-extractor"].port, Some(5006));
        assert_eq!(config.websocket.port, 4200);
        assert_eq!(config.websocket.host.as_deref(), Some("ws.internal"));
        assert_eq!(config.registry.path, "/run/ports.json");
    }

    #[test]
    fn test_unparseable_env_ignored() {
        let mut config = GatewayConfig::default();
        apply_env_overrides(&mut config, env(&[("SHEETS_PORT", "abc"), ("WS_PROXY_PORT", "99999")]));
        assert!(config.tools.get("sheets").is_none());
        assert_eq!(config.websocket.port, 4100);
    }

    #[test]
    fn test_load_file_then_env() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener]\nbind_address = \"127.0.0.1:8080\"\n[timeouts]\ndefault_secs = 10").unwrap();
        let config = load_with(Some(file.path()), env(&[("SHEETS_PORT", "5001")])).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:8080");
        assert_eq!(config.timeouts.default_secs, 10);
        assert_eq!(config.timeouts.document_secs, 300);
        assert_eq!(config.tools["sheets"].port, Some(5001));
    }

    #[test]
    fn test_invalid_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[tools.unknown]\nport = 1").unwrap();
        assert!(matches!(load_with(Some(file.path()), env(&[])), Err(ConfigError::Validation(_))));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[listener").unwrap();
        assert!(matches!(load_with(Some(file.path()), env(&[])), Err(ConfigError::Parse(_))));
    }
}
