//! Time-bounded snapshot caches.
//!
//! # Design Decisions
//! - A snapshot is immutable; refresh builds a new one and swaps it in whole
//! - Readers never block (ArcSwap load)
//! - Concurrent refreshes may race; last writer wins, all writers hold
//!   equally valid data
//! - Nothing is served before the first successful load

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;

use crate::observability::metrics;

/// One loaded value and its expiry.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub data: Arc<T>,
    pub expires_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, now: Instant, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            expires_at: now + ttl,
        }
    }

    pub fn is_fresh(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

/// Refresh step: `current` while it is fresh at `now`, otherwise an entry
/// built from `loaded`.
pub fn refreshed<T>(
    current: Option<Arc<CacheEntry<T>>>,
    now: Instant,
    ttl: Duration,
    loaded: T,
) -> Arc<CacheEntry<T>> {
    match current {
        Some(entry) if entry.is_fresh(now) => entry,
        _ => Arc::new(CacheEntry::new(loaded, now, ttl)),
    }
}

/// Process-wide cache holding a single snapshot.
#[derive(Debug)]
pub struct TtlCache<T> {
    name: &'static str,
    slot: ArcSwapOption<CacheEntry<T>>,
    ttl: Duration,
}

impl<T> TtlCache<T> {
    /// `name` labels the refresh counter.
    pub fn new(name: &'static str, ttl: Duration) -> Self {
        Self {
            name,
            slot: ArcSwapOption::empty(),
            ttl,
        }
    }

    /// Current data if loaded and not expired.
    pub fn fresh(&self, now: Instant) -> Option<Arc<T>> {
        self.slot
            .load_full()
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.data.clone())
    }

    /// Serve the snapshot, running `load` first when it is missing or expired.
    pub async fn get_or_refresh<F, Fut>(&self, now: Instant, load: F) -> Arc<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if let Some(data) = self.fresh(now) {
            return data;
        }

        let loaded = load().await;
        let entry = refreshed(self.slot.load_full(), now, self.ttl, loaded);
        self.slot.store(Some(entry.clone()));
        metrics::record_cache_refresh(self.name);
        tracing::debug!(cache = self.name, "Cache refreshed");
        entry.data.clone()
    }
}
