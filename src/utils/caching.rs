use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use crate::config::CacheSettings;
use crate::models::ProtocolScoreRecord;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(3600), // scores change once per refresh pass
            max_capacity: 1000,
        }
    }
}

impl From<&CacheSettings> for CacheConfig {
    fn from(settings: &CacheSettings) -> Self {
        Self {
            ttl: Duration::from_secs(settings.protocol_ttl_seconds),
            max_capacity: settings.max_capacity,
        }
    }
}

/// In-memory TTL cache of score records by slug.
///
/// Clones share the same underlying cache, so the refresh pass and the read
/// API can each hold one. Every `invalidate_all` bumps a generation; a row
/// read under an older generation is never left in the cache.
#[derive(Clone)]
pub struct ProtocolCache {
    inner: Cache<String, ProtocolScoreRecord>,
    generation: Arc<AtomicU64>,
}

impl ProtocolCache {
    pub fn new(config: CacheConfig) -> Self {
        let inner = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(config.ttl)
            .build();
        Self {
            inner,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Take before reading from the store; pass to [`insert_if_current`](Self::insert_if_current).
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub async fn get(&self, slug: &str) -> Option<ProtocolScoreRecord> {
        self.inner.get(slug).await
    }

    pub async fn insert(&self, record: ProtocolScoreRecord) {
        self.inner.insert(record.slug.clone(), record).await;
    }

    /// Cache a record read while `generation` was current. If an invalidation
    /// ran since, the entry is dropped again and `false` is returned.
    pub async fn insert_if_current(&self, record: ProtocolScoreRecord, generation: u64) -> bool {
        let slug = record.slug.clone();
        self.inner.insert(slug.clone(), record).await;

        // an invalidate_all after the insert already covers the entry
        if self.generation() != generation {
            debug!(protocol = %slug, "Discarding protocol read that raced a refresh");
            self.inner.invalidate(&slug).await;
            return false;
        }
        true
    }

    /// Drop every entry; called after new scores are written.
    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        debug!(entries = self.inner.entry_count(), "Invalidating protocol cache");
        self.inner.invalidate_all();
    }
}
