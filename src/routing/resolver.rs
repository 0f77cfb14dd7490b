//! Tool port resolution.
//!
//! # Responsibilities
//! - Merge compiled-in defaults with the dynamic port-registry file
//! - Cache the merged table for a short TTL
//! - Resolve a request path to a tool and its remaining path
//!
//! # Design Decisions
//! - Registry problems are never fatal: logged, defaults kept
//! - Refresh is synchronous on expiry; the request waits for it
//! - Unknown slug is a distinct outcome from an unreachable backend

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::cache::TtlCache;
use crate::config::GatewayConfig;
use crate::routing::matcher::{match_by_prefix, split_first_segment};
use crate::routing::tools::{PortSource, ToolRegistration, TOOLS};

/// One entry of the port-registry file. Extra fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryEntry {
    pub port: u16,
}

/// The port-registry file, keyed by registry key.
pub type RegistryFile = HashMap<String, RegistryEntry>;

/// A request path resolved to a tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub tool: ToolRegistration,
    pub remaining_path: String,
}

/// Defaults from the tool table with config (and env) overrides applied.
pub fn default_registrations(config: &GatewayConfig) -> Vec<ToolRegistration> {
    TOOLS
        .iter()
        .map(|spec| {
            let overrides = config.tools.get(spec.slug);
            ToolRegistration {
                slug: spec.slug.to_string(),
                port: overrides.and_then(|o| o.port).unwrap_or(spec.default_port),
                uses_own_login: overrides
                    .and_then(|o| o.uses_own_login)
                    .unwrap_or(spec.uses_own_login),
                source: PortSource::Default,
            }
        })
        .collect()
}

/// Overlay registry ports onto the defaults. Zero ports are skipped.
pub fn merge(defaults: &[ToolRegistration], registry: &RegistryFile) -> Vec<ToolRegistration> {
    defaults
        .iter()
        .map(|registration| {
            let entry = TOOLS
                .iter()
                .find(|spec| spec.slug == registration.slug)
                .and_then(|spec| registry.get(spec.registry_key))
                .filter(|entry| entry.port > 0);

            match entry {
                Some(entry) => ToolRegistration {
                    port: entry.port,
                    source: PortSource::Registry,
                    ..registration.clone()
                },
                None => registration.clone(),
            }
        })
        .collect()
}

pub fn parse_registry(content: &str) -> Result<RegistryFile, serde_json::Error> {
    serde_json::from_str(content)
}

/// Resolves tool slugs to backend ports.
pub struct PortResolver {
    defaults: Vec<ToolRegistration>,
    registry_path: PathBuf,
    cache: TtlCache<Vec<ToolRegistration>>,
}

impl PortResolver {
    pub fn new(defaults: Vec<ToolRegistration>, registry_path: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            defaults,
            registry_path: registry_path.into(),
            cache: TtlCache::new("ports", ttl),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            default_registrations(config),
            &config.registry.path,
            config.registry.ttl(),
        )
    }

    /// Current registrations, refreshing first if the cache expired.
    pub async fn registrations(&self) -> Arc<Vec<ToolRegistration>> {
        self.cache
            .get_or_refresh(Instant::now(), || async {
                match self.read_registry().await {
                    Some(registry) => merge(&self.defaults, &registry),
                    None => self.defaults.clone(),
                }
            })
            .await
    }

    /// Look up a tool by exact slug.
    pub async fn resolve(&self, slug: &str) -> Option<ToolRegistration> {
        self.registrations()
            .await
            .iter()
            .find(|r| r.slug == slug)
            .cloned()
    }

    /// Resolve the path after the mount point. Tries the first segment as a
    /// slug, then falls back to prefix matching against every known slug.
    pub async fn locate(&self, path: &str) -> Option<Resolved> {
        let registrations = self.registrations().await;

        let (first, rest) = split_first_segment(path);
        if let Some(tool) = registrations.iter().find(|r| r.slug == first) {
            return Some(Resolved {
                tool: tool.clone(),
                remaining_path: rest.to_string(),
            });
        }

        let (slug, rest) = match_by_prefix(registrations.iter().map(|r| r.slug.as_str()), path)?;
        let tool = registrations.iter().find(|r| r.slug == slug)?;
        tracing::debug!(path = %path, tool = %slug, "Tool resolved by path prefix");
        Some(Resolved {
            tool: tool.clone(),
            remaining_path: rest.to_string(),
        })
    }

    async fn read_registry(&self) -> Option<RegistryFile> {
        let content = match tokio::fs::read_to_string(&self.registry_path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(path = ?self.registry_path, error = %e, "Failed to read port registry, using defaults");
                return None;
            }
        };

        match parse_registry(&content) {
            Ok(registry) => Some(registry),
            Err(e) => {
                tracing::warn!(path = ?self.registry_path, error = %e, "Failed to parse port registry, using defaults");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::ToolOverride;

    fn resolver_with(content: Option<&str>) -> (PortResolver, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ports.json");
        if let Some(content) = content {
            std::fs::write(&path, content).unwrap();
        }
        let resolver = PortResolver::new(
            default_registrations(&GatewayConfig::default()),
            path,
            Duration::from_secs(5),
        );
        (resolver, dir)
    }

    #[test]
    fn test_config_overrides_defaults() {
        let mut config = GatewayConfig::default();
        config.tools.insert(
            "sheets".into(),
            ToolOverride { port: Some(5555), uses_own_login: Some(true) },
        );
        let defaults = default_registrations(&config);
        let sheets = defaults.iter().find(|r| r.slug == "sheets").unwrap();
        assert_eq!(sheets.port, 5555);
        assert!(sheets.uses_own_login);
    }

    #[test]
    fn test_merge_maps_registry_keys_to_slugs() {
        let defaults = default_registrations(&GatewayConfig::default());
        let registry = parse_registry(
            r#"{"gsheet": {"port": 5091, "url": "http://localhost:5091"}, "mer": {"port": 0}, "other": {"port": 1}}"#,
        )
        .unwrap();
        let merged = merge(&defaults, &registry);

        let sheets = merged.iter().find(|r| r.slug == "sheets").unwrap();
        assert_eq!(sheets.port, 5091);
        assert_eq!(sheets.source, PortSource::Registry);

        let mer = merged.iter().find(|r| r.slug == "mer-report").unwrap();
        assert_eq!(mer.port, 4093);
        assert_eq!(mer.source, PortSource::Default);
        assert_eq!(merged.len(), defaults.len());
    }

    #[tokio::test]
    async fn test_every_known_slug_resolves_to_positive_port() {
        let (resolver, _dir) = resolver_with(None);
        for spec in TOOLS {
            let registration = resolver.resolve(spec.slug).await.unwrap();
            assert!(registration.port > 0);
        }
        assert!(resolver.resolve("nope").await.is_none());
    }

    #[tokio::test]
    async fn test_malformed_registry_keeps_defaults() {
        let (resolver, _dir) = resolver_with(Some("{not json"));
        let sheets = resolver.resolve("sheets").await.unwrap();
        assert_eq!(sheets.port, 4091);
    }

    #[tokio::test]
    async fn test_registry_file_overrides_port() {
        let (resolver, _dir) = resolver_with(Some(r#"{"inventory-backend": {"port": 6000}}"#));
        let inventory = resolver.resolve("inventory").await.unwrap();
        assert_eq!(inventory.port, 6000);
    }

    #[tokio::test]
    async fn test_locate_by_segment_and_by_prefix() {
        let (resolver, _dir) = resolver_with(None);

        let hit = resolver.locate("sheets/api/rows").await.unwrap();
        assert_eq!(hit.tool.slug, "sheets");
        assert_eq!(hit.remaining_path, "api/rows");

        let hit = resolver.locate("inventoryitems/42").await.unwrap();
        assert_eq!(hit.tool.slug, "inventory");
        assert_eq!(hit.remaining_path, "items/42");

        assert!(resolver.locate("unknown/path").await.is_none());
    }

    #[tokio::test]
    async fn test_cache_serves_snapshot_until_expiry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".ports.json");
        std::fs::write(&path, r#"{"gsheet": {"port": 7001}}"#).unwrap();
        let resolver = PortResolver::new(
            default_registrations(&GatewayConfig::default()),
            &path,
            Duration::from_millis(200),
        );
        assert_eq!(resolver.resolve("sheets").await.unwrap().port, 7001);

        std::fs::write(&path, r#"{"gsheet": {"port": 7002}}"#).unwrap();
        assert_eq!(resolver.resolve("sheets").await.unwrap().port, 7001);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(resolver.resolve("sheets").await.unwrap().port, 7002);
    }
}
