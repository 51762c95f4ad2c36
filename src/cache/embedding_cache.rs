//! Embedding Cache: `(provider-id, sha256(text)) -> vector`, backed by a pluggable
//! [`CacheBackend`]. Best-effort: every failure degrades to a miss or a swallowed no-op, and
//! the cache is never the source of truth — the chain above it always has a fresh-compute path.

use std::time::Duration;

use tracing::warn;

use super::backend::{Backend, CacheBackend};
use crate::hashing::embedding_cache_key;

/// Fronts a [`CacheBackend`] with the embedding-specific key derivation and vector encoding.
pub struct EmbeddingCache {
    backend: Backend,
    ttl: Duration,
}

impl EmbeddingCache {
    /// Wraps a backend with the configured time-to-live.
    pub fn new(backend: Backend, ttl: Duration) -> Self {
        Self { backend, ttl }
    }

    /// Looks up the cached vector for `(provider_id, text)`. Any backend failure is logged and
    /// treated as a miss, per the cache's best-effort contract.
    pub async fn get(&self, provider_id: &str, text: &str) -> Option<Vec<f32>> {
        let key = embedding_cache_key(provider_id, text);
        match self.backend.get(&key).await {
            Ok(Some(bytes)) => decode_vector(&bytes),
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "embedding cache get failed, treating as miss");
                None
            }
        }
    }

    /// Unconditionally stores `vector` for `(provider_id, text)`, overwriting any prior entry.
    /// Failures are logged and swallowed.
    pub async fn put(&self, provider_id: &str, text: &str, vector: &[f32]) {
        let key = embedding_cache_key(provider_id, text);
        let bytes = encode_vector(vector);
        if let Err(e) = self.backend.put(&key, bytes, self.ttl).await {
            warn!(error = %e, "embedding cache put failed, continuing without caching");
        }
    }

    /// Checks backend reachability for health reporting.
    pub async fn ping(&self) -> bool {
        self.backend.ping().await.is_ok()
    }
}

/// Encodes a vector as little-endian `f32` bytes (not `f16`: the embedding cache is not
/// latency-bound the way an ANN store's index is, and precision loss here would break the
/// bit-identical determinism contract on embeddings).
fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn decode_vector(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(chunk.try_into().expect("chunk of 4 bytes")))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::noop_backend::NoopBackend;

    #[test]
    fn round_trips_vector() {
        let v = vec![0.1_f32, -0.2, 3.5, 0.0];
        let bytes = encode_vector(&v);
        assert_eq!(decode_vector(&bytes), Some(v));
    }

    #[test]
    fn rejects_misaligned_bytes() {
        assert_eq!(decode_vector(&[1, 2, 3]), None);
    }

    #[tokio::test]
    async fn noop_backend_always_misses() {
        let cache = EmbeddingCache::new(Backend::Noop(NoopBackend), Duration::from_secs(60));
        cache.put("mock", "hello", &[1.0, 2.0]).await;
        assert_eq!(cache.get("mock", "hello").await, None);
        assert!(cache.ping().await);
    }
}
