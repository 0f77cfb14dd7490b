//! Centralized authentication gate.
//!
//! # Responsibilities
//! - Decide per tool and path whether a session is required
//! - Resolve the caller's session cookie through the session store
//! - Produce identity headers backends can trust
//!
//! # Design Decisions
//! - Static assets and login routes always pass, whatever the tool
//! - Tools running their own login are skipped entirely
//! - The gate reports, it never renders; presentation is the handler's job
//! - Store failures fail closed

use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::cache::TtlCache;
use crate::config::GatewayConfig;
use crate::security::session::{HttpSessionStore, MemorySessionStore, SessionStore, User};
use crate::security::settings::{AuthSettings, AuthSettingsSource, HttpAuthSettings, StaticAuthSettings};

pub const X_PROXY_AUTHENTICATED: HeaderName = HeaderName::from_static("x-proxy-authenticated");
pub const X_PROXY_USER: HeaderName = HeaderName::from_static("x-proxy-user");

const STATIC_EXTENSIONS: &[&str] = &[
    "js", "mjs", "css", "map", "png", "jpg", "jpeg", "gif", "svg", "ico", "webp", "avif",
    "woff", "woff2", "ttf", "otf", "eot",
];

const STATIC_PREFIXES: &[&str] = &[
    "_next/static/",
    "_next/webpack-hmr",
    "static/",
    "assets/",
    "media/",
    "_stcore/health",
    "_stcore/host-config",
    "_stcore/allowed-message-origins",
    "@vite/",
    "@react-refresh",
    "@fs/",
    "node_modules/",
    "__webpack_hmr",
];

const LOGIN_ROUTES: &[&str] = &[
    "login",
    "logout",
    "register",
    "signup",
    "auth/login",
    "auth/register",
    "api/login",
    "api/logout",
    "api/register",
    "api/auth/login",
    "api/auth/register",
];

const LOGIN_SUFFIXES: &[&str] = &["/login", "/logout", "/register", "/signup"];

/// Asset requests never need a session.
pub fn is_static_asset(path: &str) -> bool {
    let path = path.trim_start_matches('/');
    if STATIC_PREFIXES.iter().any(|p| path.starts_with(p)) {
        return true;
    }

    let file = path.rsplit('/').next().unwrap_or(path);
    match file.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            let ext = ext.to_ascii_lowercase();
            STATIC_EXTENSIONS.contains(&ext.as_str())
        }
        _ => false,
    }
}

/// Login and registration routes of a tool.
pub fn is_login_path(path: &str) -> bool {
    let path = path.trim_matches('/');
    LOGIN_ROUTES.contains(&path) || LOGIN_SUFFIXES.iter().any(|s| path.ends_with(s))
}

/// Outcome of a successful gate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// No session required for this request.
    Public,
    /// Session validated.
    Authenticated(User),
}

/// The caller has no valid session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("authentication required")]
pub struct Unauthenticated;

/// Authentication policy shared by all requests.
pub struct AuthGate {
    enabled: bool,
    cookie_name: String,
    sessions: Arc<dyn SessionStore>,
    settings_source: Arc<dyn AuthSettingsSource>,
    settings: TtlCache<AuthSettings>,
}

impl AuthGate {
    pub fn new(
        config: &GatewayConfig,
        sessions: Arc<dyn SessionStore>,
        settings_source: Arc<dyn AuthSettingsSource>,
    ) -> Self {
        Self {
            enabled: config.auth.enabled,
            cookie_name: config.auth.session_cookie.clone(),
            sessions,
            settings_source,
            settings: TtlCache::new("auth_settings", config.auth.settings_ttl()),
        }
    }

    /// Gate wired to the collaborators named in the config.
    pub fn from_config(config: &GatewayConfig) -> Self {
        let sessions: Arc<dyn SessionStore> = match &config.auth.session_url {
            Some(url) => match HttpSessionStore::new(url, &config.auth.session_cookie, config.auth.lookup_timeout()) {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build session client, rejecting all sessions");
                    Arc::new(MemorySessionStore::new())
                }
            },
            None => {
                if config.auth.enabled {
                    tracing::warn!("No auth.session_url configured, centralized auth will reject every session");
                }
                Arc::new(MemorySessionStore::new())
            }
        };

        let defaults = StaticAuthSettings::from_config(config);
        let settings_source: Arc<dyn AuthSettingsSource> = match &config.auth.settings_url {
            Some(url) => match HttpAuthSettings::new(url, defaults.clone(), config.auth.lookup_timeout()) {
                Ok(source) => Arc::new(source),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to build settings client, using static auth settings");
                    Arc::new(defaults)
                }
            },
            None => Arc::new(defaults),
        };

        Self::new(config, sessions, settings_source)
    }

    /// Current auth-settings snapshot, refreshed first if expired.
    pub async fn settings(&self) -> Arc<AuthSettings> {
        self.settings
            .get_or_refresh(Instant::now(), || self.settings_source.load())
            .await
    }

    /// Whether this request must carry a valid session.
    pub async fn requires_auth(&self, slug: &str, remaining_path: &str, is_static_asset: bool) -> bool {
        if !self.enabled || is_static_asset || is_login_path(remaining_path) {
            return false;
        }
        let uses_own_login = self.settings().await.get(slug).copied().unwrap_or(false);
        !uses_own_login
    }

    /// Resolve the session cookie to a user.
    pub async fn authorize(&self, headers: &HeaderMap) -> Result<User, Unauthenticated> {
        let token = session_token(headers, &self.cookie_name).ok_or(Unauthenticated)?;
        match self.sessions.lookup(&token).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(Unauthenticated),
            Err(e) => {
                tracing::error!(error = %e, "Session lookup failed");
                Err(Unauthenticated)
            }
        }
    }

    /// Full policy for one request.
    pub async fn check(&self, slug: &str, remaining_path: &str, headers: &HeaderMap) -> Result<Access, Unauthenticated> {
        if !self.requires_auth(slug, remaining_path, is_static_asset(remaining_path)).await {
            return Ok(Access::Public);
        }
        self.authorize(headers).await.map(Access::Authenticated)
    }
}

/// Extract a cookie value from all `Cookie` headers.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let prefix = format!("{}=", cookie_name);
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .find_map(|c| c.strip_prefix(&prefix))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Headers asserting the authenticated identity to the backend.
pub fn identity_headers(user: &User) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(X_PROXY_AUTHENTICATED, HeaderValue::from_static("true"));
    match serde_json::to_string(user).map(|json| HeaderValue::from_str(&ascii_only(&json))) {
        Ok(Ok(value)) => {
            headers.insert(X_PROXY_USER, value);
        }
        _ => tracing::warn!(user_id = %user.id, "User identity is not a valid header value"),
    }
    headers
}

/// Escape non-ASCII characters of a JSON document as `\uXXXX`.
fn ascii_only(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0u16; 2];
            for unit in c.encode_utf16(&mut units) {
                out.push_str(&format!("\\u{:04x}", unit));
            }
        }
    }
    out
}
