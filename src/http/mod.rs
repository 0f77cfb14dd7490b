//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, proxy handler)
//!     → request.rs (mount stripping, ProxyRequest, negotiation)
//!     → [routing resolves tool, security authorizes]
//!     → forwarder.rs (single buffered backend exchange)
//!     → [rewrite adjusts HTML]
//!     → response.rs (status normalization, header policy)
//!     → Send to client
//!
//! Failures at any step → error.rs (HTML page / redirect or JSON)
//! ```

pub mod error;
pub mod forwarder;
pub mod request;
pub mod response;
pub mod server;

pub use error::GatewayError;
pub use forwarder::{BackendResponse, ForwardError, RequestForwarder};
pub use request::ProxyRequest;
pub use server::HttpServer;
