//! Analysis response cache.
//!
//! Memoizes the raw text returned by the analysis service per source so
//! repeated montages of the same video skip the upstream call. Entries are
//! evicted by a deferred task armed on every `put`; there is no capacity
//! bound.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use crate::metrics;
use crate::scheduler::DelayScheduler;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<str>,
    expires_at: Instant,
}

/// TTL cache of raw analysis responses, keyed by source reference.
pub struct AnalysisCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    evictions: DelayScheduler,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            evictions: DelayScheduler::new(),
        }
    }

    /// Get the cached response for `key`, if it has not expired.
    pub async fn get(&self, key: &str) -> Option<Arc<str>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                metrics::record_cache_hit();
                debug!("Analysis cache hit for {}", key);
                Some(Arc::clone(&entry.value))
            }
            _ => {
                metrics::record_cache_miss();
                None
            }
        }
    }

    /// Store `value` under `key` and arm its eviction after `ttl`.
    ///
    /// Overwrites any existing entry and restarts its timer.
    pub async fn put(&self, key: impl Into<String>, value: impl Into<Arc<str>>, ttl: Duration) {
        let key = key.into();
        let entry = CacheEntry {
            value: value.into(),
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().await.insert(key.clone(), entry);

        let entries = Arc::clone(&self.entries);
        let evict_key = key.clone();
        self.evictions.schedule(key, ttl, async move {
            if entries.write().await.remove(&evict_key).is_some() {
                debug!("Evicted analysis cache entry for {}", evict_key);
            }
        });
    }

    /// Drop the entry for `key` and its pending eviction.
    pub async fn remove(&self, key: &str) -> bool {
        self.evictions.cancel(key);
        self.entries.write().await.remove(key).is_some()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(3600);

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl() {
        let cache = AnalysisCache::new();
        assert!(cache.get("gs://bucket/a.mp4").await.is_none());

        cache.put("gs://bucket/a.mp4", "[]", TTL).await;
        tokio::time::sleep(Duration::from_secs(60)).await;

        assert_eq!(cache.get("gs://bucket/a.mp4").await.as_deref(), Some("[]"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_evicted_after_ttl() {
        let cache = AnalysisCache::new();
        cache.put("gs://bucket/a.mp4", "[]", TTL).await;

        tokio::time::sleep(TTL + Duration::from_secs(1)).await;

        assert!(cache.get("gs://bucket/a.mp4").await.is_none());
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_overwrites_and_rearms() {
        let cache = AnalysisCache::new();
        cache.put("k", "old", TTL).await;

        tokio::time::sleep(Duration::from_secs(3000)).await;
        cache.put("k", "new", TTL).await;

        // Past the first entry's deadline, inside the second's
        tokio::time::sleep(Duration::from_secs(1000)).await;
        assert_eq!(cache.get("k").await.as_deref(), Some("new"));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove() {
        let cache = AnalysisCache::new();
        cache.put("k", "v", TTL).await;
        assert!(cache.remove("k").await);
        assert!(!cache.remove("k").await);
        assert!(cache.get("k").await.is_none());
    }
}
