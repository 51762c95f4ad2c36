//! Cache layer.
//!
//! Two distinct caches, deliberately kept as two backends rather than two namespaces of one:
//!
//! - [`embedding_cache`] maps `(provider-id, text)` to a vector, backed by Redis by default.
//! - [`query_cache`] maps a router query hash to a result set, backed by an in-process
//!   `moka::future::Cache`.
//!
//! Both are best-effort: [`backend::CacheBackend`] failures are logged and swallowed by the
//! layer above, never propagated to the engine's caller.

pub mod backend;
pub mod embedding_cache;
pub mod error;
pub mod noop_backend;
pub mod query_cache;
pub mod redis_backend;

pub use backend::{Backend, CacheBackend};
pub use embedding_cache::EmbeddingCache;
pub use error::CacheError;
pub use noop_backend::NoopBackend;
pub use query_cache::{CachedQuery, QueryCache};
pub use redis_backend::RedisBackend;
