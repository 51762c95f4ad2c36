//! RAG Orchestrator: the single public façade composing the embedding chain, vector index,
//! lexical index, and router behind one end-to-end index/search API.

pub mod error;

pub use error::OrchestratorError;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::cache::{Backend, EmbeddingCache, NoopBackend, QueryCache, RedisBackend};
use crate::config::Config;
use crate::embedding::EmbeddingChain;
use crate::embedding::local::LocalProvider;
use crate::embedding::mock::MockProvider;
use crate::embedding::provider::Provider;
use crate::embedding::remote::RemoteProvider;
use crate::lexical::{LexicalIndex, LexicalRecord};
use crate::router::{QueryResult, Router, RouterMetrics};
use crate::vector::{ChunkRecord, EqualityFilter, VectorIndex, VectorStore};

/// A text chunk and its metadata, as submitted by the caller for indexing.
#[derive(Debug, Clone)]
pub struct DocumentChunk {
    pub chunk_id: String,
    pub text: String,
    pub metadata: HashMap<String, Value>,
}

/// Aggregate health as reported by [`RagOrchestrator::health`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Per-component health plus the rolled-up [`HealthStatus`].
#[derive(Debug, Clone)]
pub struct Health {
    pub status: HealthStatus,
    pub component_statuses: HashMap<String, HealthStatus>,
}

/// Aggregate metrics exposed by [`RagOrchestrator::metrics`].
#[derive(Debug, Clone)]
pub struct OrchestratorMetrics {
    pub indexed_count: u64,
    pub search_count: u64,
    pub avg_search_ms: f64,
    pub cache_hit_rate: f64,
    pub router: RouterMetrics,
}

/// `{document-id, title, chunks-indexed}` aggregated from the lexical index's payload.
#[derive(Debug, Clone)]
pub struct DocumentStat {
    pub document_id: String,
    pub title: String,
    pub chunks_indexed: usize,
}

#[derive(Default)]
struct SearchLatency {
    total_ms: AtomicU64,
    count: AtomicU64,
}

/// The single public façade; composes §4.B through §4.E behind one index/search API.
pub struct RagOrchestrator<V: VectorIndex> {
    router: Router<V>,
    collection: String,
    indexed_count: AtomicU64,
    latency: SearchLatency,
}

impl<V: VectorIndex> RagOrchestrator<V> {
    /// Explicit composition root: constructs the orchestrator from already-built components,
    /// per the redesign decision to avoid process-wide singletons (no `OnceLock`/`lazy_static`
    /// holding shared engine state — callers inject fakes in tests, production backends in
    /// `build`).
    pub fn new(config: &Config, embedding: EmbeddingChain, vector: V, lexical: LexicalIndex, query_cache: Option<QueryCache>) -> Self {
        let search_deadline = Duration::from_secs(config.search_deadline_sec);
        let router = Router::new(
            config.router.clone(),
            embedding,
            vector,
            lexical,
            config.vector.collection_name.clone(),
            query_cache,
            search_deadline,
        );

        Self {
            router,
            collection: config.vector.collection_name.clone(),
            indexed_count: AtomicU64::new(0),
            latency: SearchLatency::default(),
        }
    }

    /// Indexes a single chunk: embeds, then upserts to the vector and lexical indices in the
    /// same logical operation (§3's co-presence invariant).
    #[instrument(skip(self, chunk), fields(chunk_id = %chunk.chunk_id))]
    pub async fn index_document(&self, chunk: DocumentChunk, wait: bool) -> Result<(), OrchestratorError> {
        self.index_batch(vec![chunk], wait).await
    }

    /// Indexes a batch: one embedding-chain call, one vector upsert, one lexical bulk update.
    #[instrument(skip(self, chunks), fields(batch_size = chunks.len()))]
    pub async fn index_batch(&self, chunks: Vec<DocumentChunk>, wait: bool) -> Result<(), OrchestratorError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self
            .router
            .embedding_chain()
            .embed_batch(&texts)
            .await
            .map_err(|e| OrchestratorError::EmbeddingFailed { reason: e.to_string() })?;

        let mut vector_records = Vec::with_capacity(chunks.len());
        let mut lexical_records = Vec::with_capacity(chunks.len());

        for (chunk, embedded) in chunks.into_iter().zip(embeddings.into_iter()) {
            let mut payload = chunk.metadata.clone();
            payload.insert("text".to_string(), Value::String(chunk.text.clone()));
            payload.insert("embedding_model_name".to_string(), Value::String(embedded.model_name));

            vector_records.push(ChunkRecord::new(chunk.chunk_id.clone(), embedded.vector, payload.clone()));
            lexical_records.push(LexicalRecord { chunk_id: chunk.chunk_id, text: chunk.text, payload });
        }

        self.router
            .vector_index()
            .upsert(&self.collection, vector_records, wait)
            .await
            .map_err(|e| OrchestratorError::UpsertFailed { reason: e.to_string() })?;

        let indexed = lexical_records.len() as u64;
        self.router.lexical_index().add_or_update(lexical_records);
        self.indexed_count.fetch_add(indexed, Ordering::Release);

        Ok(())
    }

    /// Removes chunks from both indices; best-effort atomic at the batch granularity.
    #[instrument(skip(self, chunk_ids))]
    pub async fn delete_documents(&self, chunk_ids: &[String]) -> Result<(), OrchestratorError> {
        self.router
            .vector_index()
            .delete(&self.collection, chunk_ids)
            .await
            .map_err(|e| OrchestratorError::DeleteFailed { reason: e.to_string() })?;
        self.router.lexical_index().remove(chunk_ids);
        self.indexed_count.fetch_sub(chunk_ids.len() as u64, Ordering::Release);
        Ok(())
    }

    /// Searches under the router's configured default strategy. The search deadline is
    /// enforced inside the router, around the vector leg only (§4.C/§4.E): under
    /// `vector-only` a deadline overrun degrades to an empty, `degraded=true` result;
    /// under `auto` it falls through to lexical, same as any other vector-store outage;
    /// under `hybrid` it merges with an empty vector leg.
    #[instrument(skip(self), fields(k, collection = %self.collection))]
    pub async fn search(&self, text: &str, k: usize, filter: Option<EqualityFilter>) -> QueryResult {
        let started = Instant::now();
        let result = self.router.query(text, k, filter).await;
        self.record_latency(started.elapsed());
        result
    }

    /// Forces `strategy=hybrid` for a single call, with caller-supplied weights.
    #[instrument(skip(self))]
    pub async fn hybrid_search(&self, text: &str, k: usize, filter: Option<EqualityFilter>) -> QueryResult {
        let started = Instant::now();
        let result = self
            .router
            .query_with_strategy(text, k, filter, crate::config::Strategy::Hybrid)
            .await;
        self.record_latency(started.elapsed());
        result
    }

    fn record_latency(&self, elapsed: Duration) {
        self.latency.total_ms.fetch_add(elapsed.as_millis() as u64, Ordering::Release);
        self.latency.count.fetch_add(1, Ordering::Release);
    }

    /// Rolls up component health: embedding-provider skip state, and a trivial vector-store
    /// ping via `info()`. Unhealthy if the vector store is unreachable; degraded if any
    /// non-terminal embedding provider is currently skipped.
    pub async fn health(&self) -> Health {
        let mut component_statuses = HashMap::new();

        let vector_status = match self.router.vector_index().info(&self.collection).await {
            Ok(_) => HealthStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "vector store health check failed");
                HealthStatus::Unhealthy
            }
        };
        component_statuses.insert("vector".to_string(), vector_status);
        component_statuses.insert("lexical".to_string(), HealthStatus::Healthy);

        let mut any_provider_skipped = false;
        for (provider_id, is_skipped) in self.router.embedding_chain().providers_status() {
            let status = if is_skipped { HealthStatus::Degraded } else { HealthStatus::Healthy };
            any_provider_skipped |= is_skipped;
            component_statuses.insert(format!("embedding:{provider_id}"), status);
        }

        let overall = if vector_status == HealthStatus::Unhealthy {
            HealthStatus::Unhealthy
        } else if any_provider_skipped {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        Health { status: overall, component_statuses }
    }

    /// `{indexed-count, search-count, avg-search-ms, cache-hit-rate, component-health}`.
    pub fn metrics(&self) -> OrchestratorMetrics {
        let router_metrics = self.router.metrics();
        let count = self.latency.count.load(Ordering::Acquire);
        let total_ms = self.latency.total_ms.load(Ordering::Acquire);

        OrchestratorMetrics {
            indexed_count: self.indexed_count.load(Ordering::Acquire),
            search_count: router_metrics.queries_served,
            avg_search_ms: if count > 0 { total_ms as f64 / count as f64 } else { 0.0 },
            cache_hit_rate: if router_metrics.queries_served > 0 {
                router_metrics.cache_hits as f64 / router_metrics.queries_served as f64
            } else {
                0.0
            },
            router: router_metrics,
        }
    }

    /// Aggregates distinct `document-id` values from the lexical index's payload.
    pub fn document_stats(&self) -> Vec<DocumentStat> {
        let mut by_document: HashMap<String, (String, usize)> = HashMap::new();

        for (_, payload) in self.router.lexical_index().payloads() {
            let document_id = payload
                .get("document-id")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown")
                .to_string();
            let title = payload
                .get("document-title")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();

            let entry = by_document.entry(document_id).or_insert((title, 0));
            entry.1 += 1;
        }

        by_document
            .into_iter()
            .map(|(document_id, (title, chunks_indexed))| DocumentStat { document_id, title, chunks_indexed })
            .collect()
    }
}

impl RagOrchestrator<VectorStore> {
    /// Wires the default production backends from a resolved [`Config`]: remote/local/mock
    /// embedding providers in a chain, a Redis-or-noop embedding cache, a Qdrant-backed vector
    /// store, an empty lexical index, and an optional moka query-result cache.
    ///
    /// Initialisation order: embedding providers (with self-test) → vector index (collection
    /// ensure) → lexical index → router — matching §4.F.
    pub async fn build(config: Config) -> Result<Self, OrchestratorError> {
        let mut providers = Vec::new();
        if let Some(remote) = &config.embedding.remote {
            match RemoteProvider::new(remote, Duration::from_secs(config.embedding.timeout_sec)) {
                Ok(p) => providers.push(Provider::Remote(p)),
                Err(e) => warn!(error = %e, "remote embedding provider misconfigured, skipping"),
            }
        }
        if let Some(local) = &config.embedding.local {
            providers.push(Provider::Local(LocalProvider::new(local, 512, config.vector.dimension)));
        }
        providers.push(Provider::Mock(MockProvider::new(config.vector.dimension)));

        let embedding_cache_backend = match &config.cache.embedding_backend_url {
            Some(url) => match RedisBackend::connect(url).await {
                Ok(b) => Backend::Redis(b),
                Err(e) => {
                    warn!(error = %e, "redis embedding cache unreachable at startup, degrading to no-op");
                    Backend::Noop(NoopBackend)
                }
            },
            None => Backend::Noop(NoopBackend),
        };
        let embedding_cache = EmbeddingCache::new(embedding_cache_backend, Duration::from_secs(config.cache.embedding_ttl_sec));
        let embedding_chain = EmbeddingChain::new(providers, embedding_cache, Duration::from_secs(config.embedding.timeout_sec));
        embedding_chain.self_test_all().await.map_err(|e| OrchestratorError::EmbeddingFailed { reason: e.to_string() })?;
        info!("embedding providers initialised");

        // The declared collection dimension must match what the chain's terminal provider
        // actually produces; a remote provider's real output width is only knowable by
        // calling it, so probe once before touching the vector store.
        let probe = embedding_chain
            .embed("ragcore-startup-dimension-probe")
            .await
            .map_err(|e| OrchestratorError::EmbeddingFailed { reason: e.to_string() })?;
        config.validate(probe.vector.len())?;

        let vector = VectorStore::Qdrant(
            crate::vector::QdrantVectorIndex::connect(
                &config.vector.store_url,
                Duration::from_secs(config.vector.timeout_sec),
            )
            .await
            .map_err(|e| OrchestratorError::UpsertFailed { reason: e.to_string() })?,
        );
        vector
            .ensure_collection(
                &config.vector.collection_name,
                config.vector.dimension as u64,
                config.vector.metric,
                config.vector.hnsw_m,
                config.vector.hnsw_ef_construct,
            )
            .await
            .map_err(|e| OrchestratorError::UpsertFailed { reason: e.to_string() })?;
        info!(collection = %config.vector.collection_name, "vector collection ensured");

        let lexical = LexicalIndex::new(config.lexical_max_vocab_size);

        let query_cache = config
            .router
            .enable_cache
            .then(|| QueryCache::new(Duration::from_secs(config.cache.results_ttl_sec)));

        Ok(Self::new(&config, embedding_chain, vector, lexical, query_cache))
    }
}
