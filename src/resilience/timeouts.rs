//! Timeout enforcement.
//!
//! # Responsibilities
//! - Pick the forward deadline for a request from its path
//! - Wrap backend calls with that deadline
//!
//! # Design Decisions
//! - Document generation first, then refresh, then the default
//! - Timeout errors are distinct from other errors
//! - Timed-out requests return 504 Gateway Timeout

use std::future::Future;
use std::time::Duration;

use crate::config::schema::TimeoutConfig;

/// Endpoint class driving the forward deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeoutClass {
    Document,
    Refresh,
    Default,
}

impl TimeoutClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutClass::Document => "document",
            TimeoutClass::Refresh => "refresh",
            TimeoutClass::Default => "default",
        }
    }
}

/// Deadline chosen for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub class: TimeoutClass,
    pub duration: Duration,
}

impl TimeoutPolicy {
    /// Select by substring match on the remaining path.
    pub fn for_path(config: &TimeoutConfig, remaining_path: &str) -> Self {
        let matches = |markers: &[String]| markers.iter().any(|m| !m.is_empty() && remaining_path.contains(m.as_str()));

        if matches(&config.document_markers) {
            Self {
                class: TimeoutClass::Document,
                duration: Duration::from_secs(config.document_secs),
            }
        } else if matches(&config.refresh_markers) {
            Self {
                class: TimeoutClass::Refresh,
                duration: Duration::from_secs(config.refresh_secs),
            }
        } else {
            Self {
                class: TimeoutClass::Default,
                duration: Duration::from_secs(config.default_secs),
            }
        }
    }
}

/// Marker error for an expired deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("deadline of {0:?} elapsed")]
pub struct Elapsed(pub Duration);

/// Run `future` under `duration`. On expiry the future is dropped, which
/// cancels whatever transport it owns.
pub async fn with_deadline<F, T>(duration: Duration, future: F) -> Result<T, Elapsed>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| Elapsed(duration))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_selection() {
        let config = TimeoutConfig::default();

        let policy = TimeoutPolicy::for_path(&config, "api/vendor-pdf/123");
        assert_eq!(policy.class, TimeoutClass::Document);
        assert_eq!(policy.duration, Duration::from_secs(300));

        let policy = TimeoutPolicy::for_path(&config, "api/refresh-data");
        assert_eq!(policy.class, TimeoutClass::Refresh);
        assert_eq!(policy.duration, Duration::from_secs(120));

        let policy = TimeoutPolicy::for_path(&config, "api/orders");
        assert_eq!(policy.class, TimeoutClass::Default);
        assert_eq!(policy.duration, Duration::from_secs(30));
    }

    #[test]
    fn test_document_wins_over_refresh() {
        let config = TimeoutConfig::default();
        let policy = TimeoutPolicy::for_path(&config, "refresh-data/vendor-pdf");
        assert_eq!(policy.class, TimeoutClass::Document);
    }

    #[tokio::test]
    async fn test_with_deadline() {
        let ok = with_deadline(Duration::from_millis(200), async { 5 }).await;
        assert_eq!(ok, Ok(5));

        let err = with_deadline(
            Duration::from_millis(20),
            tokio::time::sleep(Duration::from_secs(5)),
        )
        .await;
        assert_eq!(err, Err(Elapsed(Duration::from_millis(20))));
    }
}
