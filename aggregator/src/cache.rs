//! Process-wide status cache.
//!
//! Maps `platform:channel_id` to the last successfully fetched status and
//! the instant it was stored. No TTL lives here: readers decide staleness per
//! call, so one cache serves both fresh reads and stale fallbacks.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use common::models::StreamStatus;

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub status: StreamStatus,
    pub cached_at: Instant,
}

impl CacheEntry {
    pub fn age(&self) -> Duration {
        self.cached_at.elapsed()
    }

    /// True while the entry is younger than `ttl`.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.age() < ttl
    }
}

#[derive(Clone, Default)]
pub struct StatusCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl StatusCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Owned snapshot of the entry for `key`.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let entries = self.entries.read().await;
        entries.get(key).cloned()
    }

    /// Store `status` under `key`, stamped with the current instant.
    pub async fn put(&self, key: String, status: StreamStatus) {
        let entry = CacheEntry { status, cached_at: Instant::now() };
        let mut entries = self.entries.write().await;
        entries.insert(key, entry);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
