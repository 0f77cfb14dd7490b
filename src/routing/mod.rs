//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Path after the mount point ("sheets/api/rows")
//!     → matcher.rs (first segment, or prefix fallback)
//!     → resolver.rs (TTL-cached tool table → port)
//!     → Return: Resolved { tool, remaining_path } or no match
//!
//! Cache refresh (on expiry):
//!     tools.rs defaults + config/env overrides
//!     → overlay port-registry file (if present and parseable)
//!     → swap snapshot
//! ```
//!
//! # Design Decisions
//! - Deterministic: same input always matches same tool
//! - First match wins (tool-table order)
//! - Explicit no-match rather than silent default

pub mod matcher;
pub mod resolver;
pub mod tools;

pub use resolver::{PortResolver, Resolved};
pub use tools::{ToolRegistration, ToolSpec, TOOLS};
