//! # ragcore
//!
//! Retrieval-augmented generation core for a script content-rating application: an
//! embedding provider chain, a vector index facade, a TF-IDF lexical shadow index, and a
//! knowledge-base router, composed behind one orchestrator.
//!
//! ```text
//! index-document → embed (B) → upsert (C) + lexical update (D)
//! search          → router (E) → vector (C via B) | lexical (D) | hybrid merge
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use ragcore::config::Config;
//! use ragcore::orchestrator::RagOrchestrator;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = Config::from_env()?;
//! let orchestrator = RagOrchestrator::build(config).await?;
//! let health = orchestrator.health().await;
//! println!("status: {:?}", health.status);
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Purpose |
//! |---------|---------|
//! | `cpu` | CPU-only local-model inference (docs.rs default) |
//! | `metal` | Apple Silicon GPU acceleration |
//! | `cuda` | NVIDIA GPU acceleration |
//! | `mock` | Mock embedding provider / vector index for tests |
//!
//! ## Modules
//!
//! - [`cache`] - Embedding cache (Redis) and query-result cache (in-process)
//! - [`config`] - Resolved configuration record
//! - [`embedding`] - Embedding provider chain (remote / local / mock)
//! - [`vector`] - Vector index facade (Qdrant)
//! - [`lexical`] - TF-IDF shadow index
//! - [`router`] - Knowledge-base router (vector / lexical / hybrid / auto)
//! - [`orchestrator`] - End-to-end index/search façade
//!
//! Links: repo/issues at the crate `repository` URL.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod cache;
pub mod config;
pub mod constants;
pub mod embedding;
pub mod hashing;
pub mod lexical;
pub mod orchestrator;
pub mod router;
pub mod vector;

pub use cache::{Backend, CacheBackend, CachedQuery, CacheError, EmbeddingCache, NoopBackend, QueryCache, RedisBackend};
pub use config::{Config, ConfigError};
pub use constants::{DimConfig, DimValidationError, validate_embedding_dim};
pub use embedding::{EmbedProvider, EmbedResult, EmbeddingChain, EmbeddingError, Provider, ProviderHealth, ProviderMetrics};
pub use hashing::{embedding_cache_key, hash_to_u64, query_cache_key};
pub use lexical::{LexicalIndex, LexicalRecord};
pub use orchestrator::{
    DocumentChunk, DocumentStat, Health, HealthStatus, OrchestratorError, OrchestratorMetrics,
    RagOrchestrator,
};
pub use router::{QueryResult, Router, RouterError, RouterMetrics, Source};
pub use vector::{ChunkRecord, CollectionInfo, EqualityFilter, SearchHit, VectorError, VectorIndex, VectorStore};
