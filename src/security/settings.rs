//! Per-tool auth settings.
//!
//! Which tools run their own login is decided by the dashboard operators
//! and may change at runtime, so the table comes from a source that is
//! re-read whenever the auth-settings cache expires.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::GatewayConfig;
use crate::routing::TOOLS;

/// `slug -> uses_own_login`.
pub type AuthSettings = HashMap<String, bool>;

/// Produces a complete settings table. Never fails: sources fall back to
/// their defaults and log.
#[async_trait]
pub trait AuthSettingsSource: Send + Sync {
    async fn load(&self) -> AuthSettings;
}

/// Built from the tool table and config overrides.
#[derive(Debug, Clone)]
pub struct StaticAuthSettings {
    settings: AuthSettings,
}

impl StaticAuthSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let settings = TOOLS
            .iter()
            .map(|spec| {
                let own_login = config
                    .tools
                    .get(spec.slug)
                    .and_then(|o| o.uses_own_login)
                    .unwrap_or(spec.uses_own_login);
                (spec.slug.to_string(), own_login)
            })
            .collect();
        Self { settings }
    }

    pub fn settings(&self) -> &AuthSettings {
        &self.settings
    }
}

#[async_trait]
impl AuthSettingsSource for StaticAuthSettings {
    async fn load(&self) -> AuthSettings {
        self.settings.clone()
    }
}

/// Fetches `{slug: bool}` from the dashboard host and overlays it on the
/// static defaults.
pub struct HttpAuthSettings {
    client: reqwest::Client,
    url: String,
    defaults: StaticAuthSettings,
}

impl HttpAuthSettings {
    pub fn new(url: impl Into<String>, defaults: StaticAuthSettings, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
            defaults,
        })
    }

    async fn fetch(&self) -> Result<AuthSettings, reqwest::Error> {
        self.client
            .get(&self.url)
            .send()
            .await?
            .error_for_status()?
            .json::<AuthSettings>()
            .await
    }
}

#[async_trait]
impl AuthSettingsSource for HttpAuthSettings {
    async fn load(&self) -> AuthSettings {
        let mut settings = self.defaults.settings().clone();
        match self.fetch().await {
            Ok(remote) => {
                for (slug, own_login) in remote {
                    if settings.contains_key(&slug) {
                        settings.insert(slug, own_login);
                    } else {
                        tracing::debug!(tool = %slug, "Ignoring auth setting for unknown tool");
                    }
                }
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Failed to fetch auth settings, using defaults");
            }
        }
        settings
    }
}
