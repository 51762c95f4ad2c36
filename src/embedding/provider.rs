use std::future::Future;

use super::error::EmbeddingError;
use super::local::LocalProvider;
use super::mock::MockProvider;
use super::remote::RemoteProvider;

/// A single embedding-generating backend.
///
/// Implemented with return-position `impl Future` rather than `#[async_trait]`, matching this
/// crate's other async-trait seams (e.g. the vector client).
pub trait EmbedProvider: Send + Sync {
    /// Stable identifier used in cache keys and result annotations (`"remote"`, `"local"`, `"mock"`).
    fn provider_id(&self) -> &str;

    /// Name of the underlying model, for the indexed-record payload.
    fn model_name(&self) -> &str;

    /// `true` if two calls with the same text are guaranteed to produce bit-identical vectors.
    /// Non-deterministic providers must not have their results written to the embedding cache.
    fn is_deterministic(&self) -> bool {
        true
    }

    /// Embeds a batch of texts, preserving order. All-or-nothing: either every text gets a
    /// vector or the call fails as a whole.
    fn embed(&self, texts: &[String]) -> impl Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send;

    /// Probes the provider once with a trivial input at startup.
    fn self_test(&self) -> impl Future<Output = Result<(), EmbeddingError>> + Send {
        async move {
            self.embed(&["test".to_string()]).await.map(|_| ())
        }
    }
}

/// The closed set of embedding providers this crate supports.
pub enum Provider {
    /// HTTPS call to a third-party embedding API.
    Remote(RemoteProvider),
    /// In-process sentence-embedding model.
    Local(LocalProvider),
    /// Deterministic hash-seeded stand-in; always present as the terminal fallback.
    Mock(MockProvider),
}

impl Provider {
    /// Returns `true` if this provider is currently skipped (cool-down or permanent).
    pub fn is_skipped(&self) -> bool {
        match self {
            Provider::Remote(p) => p.health().is_skipped(),
            Provider::Local(p) => p.health().is_skipped(),
            Provider::Mock(_) => false,
        }
    }

    /// Records the outcome of a call against this provider's health tracker.
    pub fn record_outcome(&self, succeeded: bool) {
        let health = match self {
            Provider::Remote(p) => p.health(),
            Provider::Local(p) => p.health(),
            Provider::Mock(_) => return,
        };
        if succeeded {
            health.record_success();
        } else {
            health.record_failure();
        }
    }
}

impl EmbedProvider for Provider {
    fn provider_id(&self) -> &str {
        match self {
            Provider::Remote(p) => p.provider_id(),
            Provider::Local(p) => p.provider_id(),
            Provider::Mock(p) => p.provider_id(),
        }
    }

    fn model_name(&self) -> &str {
        match self {
            Provider::Remote(p) => p.model_name(),
            Provider::Local(p) => p.model_name(),
            Provider::Mock(p) => p.model_name(),
        }
    }

    fn is_deterministic(&self) -> bool {
        match self {
            Provider::Remote(p) => p.is_deterministic(),
            Provider::Local(p) => p.is_deterministic(),
            Provider::Mock(p) => p.is_deterministic(),
        }
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        match self {
            Provider::Remote(p) => p.embed(texts).await,
            Provider::Local(p) => p.embed(texts).await,
            Provider::Mock(p) => p.embed(texts).await,
        }
    }
}
