//! Path-based gateway for internal tool backends.

// Core subsystems
pub mod config;
pub mod http;
pub mod rewrite;
pub mod routing;

// Shared state
pub mod cache;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
