//! Query-Result Cache: an in-process `moka::future::Cache`, deliberately a different backend
//! and namespace from the Redis-backed [`EmbeddingCache`](super::embedding_cache::EmbeddingCache).
//! Used by the Knowledge-Base Router, whose call surface is already async.

use std::time::Duration;

use moka::future::Cache;

use crate::router::Source;
use crate::vector::model::SearchHit;

/// A cached query result: hits plus the provenance that produced them, so a cache hit can
/// report the same `source`/`degraded` the fresh computation would have reported.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedQuery {
    pub hits: Vec<SearchHit>,
    pub source: Source,
    pub degraded: bool,
}

/// Caches router query results keyed by a 64-bit hash of `(strategy, text, k, filters)`.
pub struct QueryCache {
    entries: Cache<u64, CachedQuery>,
}

impl QueryCache {
    /// Creates a cache with the given time-to-live and a generous entry capacity.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Cache::builder()
                .max_capacity(10_000)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Looks up a cached result. `None` on miss or TTL expiry.
    pub async fn get(&self, key: u64) -> Option<CachedQuery> {
        self.entries.get(&key).await
    }

    /// Stores a result under `key`, overwriting any prior entry.
    pub async fn put(&self, key: u64, value: CachedQuery) {
        self.entries.insert(key, value).await;
    }

    /// Drops a single cached entry, if present (manual invalidation).
    pub async fn invalidate(&self, key: u64) {
        self.entries.invalidate(&key).await;
    }

    /// Drops every cached entry.
    pub fn invalidate_all(&self) {
        self.entries.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::model::SearchHit;
    use std::collections::HashMap;

    fn cached(hits: Vec<SearchHit>) -> CachedQuery {
        CachedQuery { hits, source: Source::Hybrid, degraded: false }
    }

    #[tokio::test]
    async fn stores_and_retrieves() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let value = cached(vec![SearchHit {
            chunk_id: "c1".to_string(),
            score: 0.9,
            payload: HashMap::new(),
        }]);
        cache.put(42, value.clone()).await;
        assert_eq!(cache.get(42).await, Some(value));
    }

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let cache = QueryCache::new(Duration::from_secs(60));
        assert_eq!(cache.get(1).await, None);
    }

    #[tokio::test]
    async fn invalidate_clears_entry() {
        let cache = QueryCache::new(Duration::from_secs(60));
        cache.put(1, cached(Vec::new())).await;
        cache.invalidate(1).await;
        assert_eq!(cache.get(1).await, None);
    }

    #[tokio::test]
    async fn preserves_source_and_degraded() {
        let cache = QueryCache::new(Duration::from_secs(60));
        let value = CachedQuery { hits: Vec::new(), source: Source::Vector, degraded: false };
        cache.put(7, value).await;
        let got = cache.get(7).await.unwrap();
        assert_eq!(got.source, Source::Vector);
    }
}
