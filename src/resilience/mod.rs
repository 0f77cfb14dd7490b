//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (pick deadline by endpoint class, enforce it)
//!     → On expiry: transport dropped, 504 surfaced
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every backend call has a deadline
//! - No retries: one attempt per request, the browser re-issues

pub mod timeouts;

pub use timeouts::{TimeoutClass, TimeoutPolicy};
