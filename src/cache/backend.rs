//! The `CacheBackend` seam: the Embedding Provider Chain never branches on "is caching
//! configured" — it always talks to a `CacheBackend`, and an absent backend is just the
//! no-op implementation.

use std::future::Future;
use std::time::Duration;

use super::error::CacheError;

/// A best-effort key-value store for cached vectors.
///
/// Implementations MUST treat every failure as something to log and swallow internally where
/// possible; the error type exists for diagnostics, not for caller-visible branching.
pub trait CacheBackend: Send + Sync {
    /// Fetches the raw bytes stored at `key`, or `None` on a miss or expiry.
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Vec<u8>>, CacheError>> + Send;

    /// Stores `value` at `key` with the given time-to-live, overwriting any prior entry.
    fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Checks backend reachability; used by the orchestrator's health check.
    fn ping(&self) -> impl Future<Output = Result<(), CacheError>> + Send;
}

/// The closed set of backends the Embedding Cache can run against.
pub enum Backend {
    /// Networked default.
    Redis(super::redis_backend::RedisBackend),
    /// Absent-backend stand-in.
    Noop(super::noop_backend::NoopBackend),
}

impl CacheBackend for Backend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        match self {
            Backend::Redis(b) => b.get(key).await,
            Backend::Noop(b) => b.get(key).await,
        }
    }

    async fn put(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError> {
        match self {
            Backend::Redis(b) => b.put(key, value, ttl).await,
            Backend::Noop(b) => b.put(key, value, ttl).await,
        }
    }

    async fn ping(&self) -> Result<(), CacheError> {
        match self {
            Backend::Redis(b) => b.ping().await,
            Backend::Noop(b) => b.ping().await,
        }
    }
}
