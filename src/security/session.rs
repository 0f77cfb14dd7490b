//! Session lookup collaborators.
//!
//! The gateway never authenticates users itself. It hands the session
//! token to a `SessionStore` owned by the dashboard host and trusts the
//! answer.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderValue, COOKIE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Authenticated dashboard user, as asserted to backends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: String,
    pub name: String,
}

/// Transport-level session lookup failures.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("session lookup failed: {0}")]
    Lookup(String),

    #[error("session lookup returned unexpected status {0}")]
    UnexpectedStatus(u16),
}

/// Resolves a session token to a user.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// `Ok(None)` when the token is unknown or expired.
    async fn lookup(&self, token: &str) -> Result<Option<User>, AuthError>;
}

/// In-process store for tests and local development.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, User>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, token: impl Into<String>, user: User) {
        if let Ok(mut sessions) = self.sessions.write() {
            sessions.insert(token.into(), user);
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn lookup(&self, token: &str) -> Result<Option<User>, AuthError> {
        let sessions = self
            .sessions
            .read()
            .map_err(|e| AuthError::Lookup(e.to_string()))?;
        Ok(sessions.get(token).cloned())
    }
}

/// Asks the dashboard host's session endpoint.
///
/// Sends the token back as the session cookie. 200 carries the user as
/// JSON, 401/403/404 mean no session.
pub struct HttpSessionStore {
    client: reqwest::Client,
    url: String,
    cookie_name: String,
}

impl HttpSessionStore {
    pub fn new(url: impl Into<String>, cookie_name: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Lookup(e.to_string()))?;
        Ok(Self {
            client,
            url: url.into(),
            cookie_name: cookie_name.into(),
        })
    }
}

#[async_trait]
impl SessionStore for HttpSessionStore {
    async fn lookup(&self, token: &str) -> Result<Option<User>, AuthError> {
        let cookie = HeaderValue::from_str(&format!("{}={}", self.cookie_name, token))
            .map_err(|e| AuthError::Lookup(e.to_string()))?;

        let response = self
            .client
            .get(&self.url)
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(|e| AuthError::Lookup(e.to_string()))?;

        match response.status() {
            StatusCode::OK => {
                let user = response
                    .json::<User>()
                    .await
                    .map_err(|e| AuthError::Lookup(e.to_string()))?;
                Ok(Some(user))
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            other => Err(AuthError::UnexpectedStatus(other.as_u16())),
        }
    }
}
