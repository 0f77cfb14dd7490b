//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (overrides name known tools)
//! - Validate value ranges (timeouts > 0, ports valid, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;
use crate::routing::tools::{self, TOOLS};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field}: '{value}' is not a valid socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("tool '{0}' has port 0")]
    InvalidToolPort(String),

    #[error("tools.{0}: no such tool")]
    UnknownTool(String),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("timeouts must satisfy default_secs <= refresh_secs <= document_secs")]
    TimeoutOrder,

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled && config.observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    for (slug, tool_override) in &config.tools {
        if tools::find(slug).is_none() {
            errors.push(ValidationError::UnknownTool(slug.clone()));
        }
        if tool_override.port == Some(0) {
            errors.push(ValidationError::InvalidToolPort(slug.clone()));
        }
    }
    for tool in TOOLS {
        if tool.default_port == 0 && !config.tools.get(tool.slug).is_some_and(|o| o.port.is_some()) {
            errors.push(ValidationError::InvalidToolPort(tool.slug.to_string()));
        }
    }

    if config.registry.ttl_ms == 0 {
        errors.push(ValidationError::NotPositive("registry.ttl_ms"));
    }
    if config.registry.path.trim().is_empty() {
        errors.push(ValidationError::Empty("registry.path"));
    }
    if config.auth.settings_ttl_ms == 0 {
        errors.push(ValidationError::NotPositive("auth.settings_ttl_ms"));
    }
    if config.auth.lookup_timeout_ms == 0 {
        errors.push(ValidationError::NotPositive("auth.lookup_timeout_ms"));
    }
    if config.auth.session_cookie.trim().is_empty() {
        errors.push(ValidationError::Empty("auth.session_cookie"));
    }

    let timeouts = &config.timeouts;
    for (field, value) in [
        ("timeouts.default_secs", timeouts.default_secs),
        ("timeouts.refresh_secs", timeouts.refresh_secs),
        ("timeouts.document_secs", timeouts.document_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::NotPositive(field));
        }
    }
    if timeouts.default_secs > timeouts.refresh_secs || timeouts.refresh_secs > timeouts.document_secs {
        errors.push(ValidationError::TimeoutOrder);
    }

    if config.websocket.port == 0 {
        errors.push(ValidationError::NotPositive("websocket.port"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::NotPositive("security.max_body_size"));
    }
    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::Empty("admin.api_key"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
