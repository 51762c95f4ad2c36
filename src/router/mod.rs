//! Knowledge-Base Router: chooses between vector, lexical, or hybrid search per query,
//! based on caller strategy, confidence, and component health.

pub mod error;

pub use error::RouterError;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::warn;

use crate::cache::{CachedQuery, QueryCache};
use crate::config::{RouterConfig, Strategy};
use crate::embedding::EmbeddingChain;
use crate::lexical::LexicalIndex;
use crate::vector::{EqualityFilter, SearchHit, VectorIndex};

/// The path a [`QueryResult`] was ultimately served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Vector,
    Lexical,
    Hybrid,
}

/// A single ranked hit plus its provenance, as returned by [`Router::query`].
#[derive(Debug, Clone)]
pub struct QueryResult {
    pub hits: Vec<SearchHit>,
    pub source: Source,
    pub degraded: bool,
    pub from_cache: bool,
}

#[derive(Debug, Default)]
struct StrategyCounters {
    queries_served: AtomicU64,
    cache_hits: AtomicU64,
    vector_failures: AtomicU64,
    lexical_fallbacks: AtomicU64,
    hybrid_merges: AtomicU64,
}

/// Snapshot of [`StrategyCounters`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RouterMetrics {
    pub queries_served: u64,
    pub cache_hits: u64,
    pub vector_failures: u64,
    pub lexical_fallbacks: u64,
    pub hybrid_merges: u64,
}

/// The decision layer above the vector and lexical indices.
pub struct Router<V: VectorIndex> {
    config: RouterConfig,
    embedding: EmbeddingChain,
    vector: V,
    lexical: LexicalIndex,
    collection: String,
    query_cache: Option<QueryCache>,
    counters: StrategyCounters,
    search_deadline: Duration,
}

impl<V: VectorIndex> Router<V> {
    pub fn new(
        config: RouterConfig,
        embedding: EmbeddingChain,
        vector: V,
        lexical: LexicalIndex,
        collection: String,
        query_cache: Option<QueryCache>,
        search_deadline: Duration,
    ) -> Self {
        Self {
            config,
            embedding,
            vector,
            lexical,
            collection,
            query_cache,
            counters: StrategyCounters::default(),
            search_deadline,
        }
    }

    /// Runs a query under the router's configured default strategy.
    pub async fn query(&self, text: &str, k: usize, filter: Option<EqualityFilter>) -> QueryResult {
        self.query_with_strategy(text, k, filter, self.config.strategy).await
    }

    /// Runs a query under an explicit strategy override (used by `hybrid-search`).
    pub async fn query_with_strategy(
        &self,
        text: &str,
        k: usize,
        filter: Option<EqualityFilter>,
        strategy: Strategy,
    ) -> QueryResult {
        self.counters.queries_served.fetch_add(1, Ordering::Release);

        if k == 0 {
            return QueryResult { hits: Vec::new(), source: Source::Vector, degraded: false, from_cache: false };
        }

        let cache_key = self.config.enable_cache.then(|| {
            crate::hashing::query_cache_key(
                &self.collection,
                strategy_label(strategy),
                text,
                k,
                filter.as_ref().map(|f| format!("{}={}", f.field, f.value)).unwrap_or_default().as_str(),
            )
        });

        if let (Some(cache), Some(key)) = (&self.query_cache, cache_key) {
            if let Some(cached) = cache.get(key).await {
                self.counters.cache_hits.fetch_add(1, Ordering::Release);
                return QueryResult {
                    hits: cached.hits,
                    source: cached.source,
                    degraded: cached.degraded,
                    from_cache: true,
                };
            }
        }

        let result = match strategy {
            Strategy::VectorOnly => self.vector_only(text, k, filter.clone()).await,
            Strategy::LexicalOnly => self.lexical_only(text, k),
            Strategy::Hybrid => self.hybrid(text, k, filter.clone()).await,
            Strategy::Auto => self.auto(text, k, filter.clone()).await,
        };

        // A degraded result (e.g. a vector-store outage) reflects a transient failure, not a
        // value worth replaying as a cache hit for the full TTL.
        if !result.degraded {
            if let (Some(cache), Some(key)) = (&self.query_cache, cache_key) {
                let to_cache = CachedQuery { hits: result.hits.clone(), source: result.source, degraded: result.degraded };
                cache.put(key, to_cache).await;
            }
        }

        result
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, RouterError> {
        self.embedding
            .embed(text)
            .await
            .map(|r| r.vector)
            .map_err(|e| RouterError::EmbeddingFailed { reason: e.to_string() })
    }

    async fn vector_only(&self, text: &str, k: usize, filter: Option<EqualityFilter>) -> QueryResult {
        match self.vector_search(text, k, filter).await {
            Ok(hits) => QueryResult { hits, source: Source::Vector, degraded: false, from_cache: false },
            Err(_) => {
                self.counters.vector_failures.fetch_add(1, Ordering::Release);
                QueryResult { hits: Vec::new(), source: Source::Vector, degraded: true, from_cache: false }
            }
        }
    }

    fn lexical_only(&self, text: &str, k: usize) -> QueryResult {
        QueryResult {
            hits: self.lexical.search(text, k),
            source: Source::Lexical,
            degraded: false,
            from_cache: false,
        }
    }

    /// Embeds `text` and searches the vector store, bounded end-to-end by `search_deadline`.
    /// A timeout here is indistinguishable from any other vector-search failure to callers
    /// (`vector_only` degrades to empty, `auto` falls through to lexical, `hybrid` merges
    /// with an empty vector leg) — this is what makes a slow store behave the same as a
    /// down one.
    async fn vector_search(&self, text: &str, k: usize, filter: Option<EqualityFilter>) -> Result<Vec<SearchHit>, RouterError> {
        let leg = async {
            let query_vector = self.embed_query(text).await?;
            self.vector
                .search(&self.collection, query_vector, k as u64, filter)
                .await
                .map_err(|e| RouterError::EmbeddingFailed { reason: e.to_string() })
        };

        match tokio::time::timeout(self.search_deadline, leg).await {
            Ok(Ok(hits)) => Ok(hits),
            Ok(Err(e)) => {
                warn!(error = %e, "vector search failed");
                Err(e)
            }
            Err(_) => {
                warn!(deadline = ?self.search_deadline, "vector search exceeded deadline");
                Err(RouterError::EmbeddingFailed { reason: "search deadline exceeded".to_string() })
            }
        }
    }

    async fn hybrid(&self, text: &str, k: usize, filter: Option<EqualityFilter>) -> QueryResult {
        let (vector_hits, lexical_hits) = tokio::join!(
            self.vector_search(text, k, filter),
            async { self.lexical.search(text, k) }
        );

        let vector_hits = match vector_hits {
            Ok(hits) => hits,
            Err(_) => {
                self.counters.vector_failures.fetch_add(1, Ordering::Release);
                Vec::new()
            }
        };

        self.counters.hybrid_merges.fetch_add(1, Ordering::Release);
        let hits = merge_weighted(vector_hits, lexical_hits, self.config.weight_vector, self.config.weight_lexical, k);
        QueryResult { hits, source: Source::Hybrid, degraded: false, from_cache: false }
    }

    async fn auto(&self, text: &str, k: usize, filter: Option<EqualityFilter>) -> QueryResult {
        match self.vector_search(text, k, filter.clone()).await {
            Ok(vector_hits) => {
                let top1 = vector_hits.first().map(|h| h.score as f32).unwrap_or(0.0);
                if top1 >= self.config.confidence_threshold {
                    return QueryResult { hits: vector_hits, source: Source::Vector, degraded: false, from_cache: false };
                }
                self.counters.lexical_fallbacks.fetch_add(1, Ordering::Release);
                let lexical_hits = self.lexical.search(text, k);
                self.counters.hybrid_merges.fetch_add(1, Ordering::Release);
                let hits = merge_weighted(vector_hits, lexical_hits, self.config.weight_vector, self.config.weight_lexical, k);
                QueryResult { hits, source: Source::Hybrid, degraded: false, from_cache: false }
            }
            Err(_) => {
                self.counters.vector_failures.fetch_add(1, Ordering::Release);
                self.counters.lexical_fallbacks.fetch_add(1, Ordering::Release);
                QueryResult { hits: self.lexical.search(text, k), source: Source::Lexical, degraded: false, from_cache: false }
            }
        }
    }

    pub fn metrics(&self) -> RouterMetrics {
        RouterMetrics {
            queries_served: self.counters.queries_served.load(Ordering::Acquire),
            cache_hits: self.counters.cache_hits.load(Ordering::Acquire),
            vector_failures: self.counters.vector_failures.load(Ordering::Acquire),
            lexical_fallbacks: self.counters.lexical_fallbacks.load(Ordering::Acquire),
            hybrid_merges: self.counters.hybrid_merges.load(Ordering::Acquire),
        }
    }

    pub fn vector_index(&self) -> &V {
        &self.vector
    }

    pub fn lexical_index(&self) -> &LexicalIndex {
        &self.lexical
    }

    pub fn embedding_chain(&self) -> &EmbeddingChain {
        &self.embedding
    }
}

fn strategy_label(strategy: Strategy) -> &'static str {
    match strategy {
        Strategy::Auto => "auto",
        Strategy::VectorOnly => "vector-only",
        Strategy::LexicalOnly => "lexical-only",
        Strategy::Hybrid => "hybrid",
    }
}

/// Merges two result sets by id: an id present in both gets `w_v * vector_score +
/// w_l * lexical_score`; an id present in only one keeps its single-source score scaled by
/// the corresponding weight. Re-ranks descending and truncates to `k`.
fn merge_weighted(vector_hits: Vec<SearchHit>, lexical_hits: Vec<SearchHit>, weight_vector: f32, weight_lexical: f32, k: usize) -> Vec<SearchHit> {
    let mut merged: HashMap<String, SearchHit> = HashMap::new();

    for hit in vector_hits {
        let mut scaled = hit.clone();
        scaled.score *= weight_vector as f64;
        merged.insert(hit.chunk_id, scaled);
    }

    for hit in lexical_hits {
        merged
            .entry(hit.chunk_id.clone())
            .and_modify(|existing| existing.score += hit.score * weight_lexical as f64)
            .or_insert_with(|| {
                let mut scaled = hit.clone();
                scaled.score *= weight_lexical as f64;
                scaled
            });
    }

    let mut hits: Vec<SearchHit> = merged.into_values().collect();
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    hits.truncate(k);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f64) -> SearchHit {
        SearchHit { chunk_id: id.to_string(), score, payload: HashMap::new() }
    }

    #[test]
    fn merge_combines_shared_ids() {
        let vector_hits = vec![hit("a", 0.8), hit("b", 0.4)];
        let lexical_hits = vec![hit("a", 0.2), hit("c", 0.9)];
        let merged = merge_weighted(vector_hits, lexical_hits, 0.7, 0.3, 10);

        let a = merged.iter().find(|h| h.chunk_id == "a").unwrap();
        assert!((a.score - (0.7 * 0.8 + 0.3 * 0.2)).abs() < 1e-9);

        let c = merged.iter().find(|h| h.chunk_id == "c").unwrap();
        assert!((c.score - 0.3 * 0.9).abs() < 1e-9);
    }

    #[test]
    fn merge_truncates_to_k() {
        let vector_hits = vec![hit("a", 0.9), hit("b", 0.8), hit("c", 0.7)];
        let merged = merge_weighted(vector_hits, Vec::new(), 1.0, 0.0, 2);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].chunk_id, "a");
    }

    #[test]
    fn merge_is_not_empty_when_one_path_empty() {
        let merged = merge_weighted(Vec::new(), vec![hit("a", 0.5)], 0.7, 0.3, 10);
        assert_eq!(merged.len(), 1);
    }
}
