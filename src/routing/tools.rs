//! Compiled-in tool table.
//!
//! Maps each public slug onto the key the tool launchers use when they
//! write the port-registry file. The two namespaces differ, so the
//! mapping is explicit and checked once at startup.

use std::collections::HashSet;

use serde::Serialize;

/// Static description of one tool backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    /// Public path segment.
    pub slug: &'static str,
    /// Key in the port-registry file.
    pub registry_key: &'static str,
    /// Port used when neither config nor registry say otherwise.
    pub default_port: u16,
    /// Tool authenticates its own users.
    pub uses_own_login: bool,
}

impl ToolSpec {
    /// Environment variable carrying this tool's default port.
    pub fn port_env(&self) -> String {
        format!("{}_PORT", self.slug.to_uppercase().replace('-', "_"))
    }
}

pub const TOOLS: &[ToolSpec] = &[
    ToolSpec {
        slug: "sheets",
        registry_key: "gsheet",
        default_port: 4091,
        uses_own_login: false,
    },
    ToolSpec {
        slug: "data-extractor",
        registry_key: "data-extractor",
        default_port: 4092,
        uses_own_login: false,
    },
    ToolSpec {
        slug: "mer-report",
        registry_key: "mer",
        default_port: 4093,
        uses_own_login: false,
    },
    ToolSpec {
        slug: "quote-engine",
        registry_key: "quote-backend",
        default_port: 4094,
        uses_own_login: false,
    },
    ToolSpec {
        slug: "inventory",
        registry_key: "inventory-backend",
        default_port: 4096,
        uses_own_login: true,
    },
    ToolSpec {
        slug: "order-id-extractor",
        registry_key: "order-id-extractor",
        default_port: 4098,
        uses_own_login: false,
    },
];

/// Look up a tool by public slug.
pub fn find(slug: &str) -> Option<&'static ToolSpec> {
    TOOLS.iter().find(|t| t.slug == slug)
}

/// Where a resolved port came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PortSource {
    Default,
    Registry,
}

/// A resolved tool backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolRegistration {
    pub slug: String,
    pub port: u16,
    pub uses_own_login: bool,
    pub source: PortSource,
}

/// Problems with the compiled-in table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TableError {
    #[error("duplicate slug '{0}'")]
    DuplicateSlug(&'static str),
    #[error("duplicate registry key '{0}'")]
    DuplicateRegistryKey(&'static str),
    #[error("tool '{0}' has no default port")]
    MissingPort(&'static str),
    #[error("tool '{0}' has an empty slug or registry key")]
    EmptyName(&'static str),
}

/// Verify the table is a complete one-to-one mapping.
pub fn check_table(table: &[ToolSpec]) -> Result<(), Vec<TableError>> {
    let mut errors = Vec::new();
    let mut slugs = HashSet::new();
    let mut keys = HashSet::new();

    for tool in table {
        if tool.slug.is_empty() || tool.registry_key.is_empty() {
            errors.push(TableError::EmptyName(tool.slug));
        }
        if !slugs.insert(tool.slug) {
            errors.push(TableError::DuplicateSlug(tool.slug));
        }
        if !keys.insert(tool.registry_key) {
            errors.push(TableError::DuplicateRegistryKey(tool.registry_key));
        }
        if tool.default_port == 0 {
            errors.push(TableError::MissingPort(tool.slug));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
