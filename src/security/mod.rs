//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (tool resolved):
//!     → auth.rs (static/login bypass, own-login bypass, session check)
//!         → settings.rs (TTL-cached {slug: uses_own_login})
//!         → session.rs (session store collaborator)
//!     → headers.rs (X-Forwarded-*, identity headers)
//!     → Forward
//!
//! Backend response:
//!     → headers.rs (strip framing/embedding headers, add CORS + nosniff)
//! ```
//!
//! # Design Decisions
//! - Fail closed: store errors count as no session
//! - No trust in client-supplied identity headers: gate output overwrites them

pub mod auth;
pub mod headers;
pub mod session;
pub mod settings;

pub use auth::{Access, AuthGate, Unauthenticated};
pub use session::{AuthError, MemorySessionStore, SessionStore, User};
pub use settings::{AuthSettingsSource, StaticAuthSettings};
