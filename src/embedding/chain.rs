//! Embedding Provider Chain: cache-probe, invoke-under-timeout, record-and-fallthrough.
//!
//! Mirrors the corpus's `EmbeddingService._metrics` dict with a fixed set of per-provider
//! counters rather than a free-form map, since the provider set is closed (§4.B).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::warn;

use super::error::EmbeddingError;
use super::provider::{EmbedProvider, Provider};
use crate::cache::EmbeddingCache;

/// A single embedded text plus its provenance, matching the data model's Embedding result.
#[derive(Debug, Clone)]
pub struct EmbedResult {
    pub text: String,
    pub vector: Vec<f32>,
    pub provider_id: String,
    pub model_name: String,
    pub from_cache: bool,
    pub fallback_used: bool,
}

#[derive(Debug, Default)]
struct ProviderCounters {
    embeds_total: AtomicU64,
    cache_hits_total: AtomicU64,
    timeouts_total: AtomicU64,
    errors_total: AtomicU64,
}

/// Snapshot of [`ProviderCounters`] at the time of the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProviderMetrics {
    pub embeds_total: u64,
    pub cache_hits_total: u64,
    pub timeouts_total: u64,
    pub errors_total: u64,
}

/// Ordered, non-empty list of providers, always terminated by a mock fallback.
pub struct EmbeddingChain {
    providers: Vec<Provider>,
    cache: EmbeddingCache,
    per_call_timeout: Duration,
    counters: HashMap<String, ProviderCounters>,
}

impl EmbeddingChain {
    /// Builds a chain from `providers` (already ordered: primary first, mock last) and a
    /// shared embedding cache. Panics if `providers` is empty — the caller is responsible
    /// for always appending the terminal mock provider.
    pub fn new(providers: Vec<Provider>, cache: EmbeddingCache, per_call_timeout: Duration) -> Self {
        assert!(!providers.is_empty(), "embedding chain must not be empty");
        let counters = providers
            .iter()
            .map(|p| (p.provider_id().to_string(), ProviderCounters::default()))
            .collect();
        Self {
            providers,
            cache,
            per_call_timeout,
            counters,
        }
    }

    /// Embeds a single text, trying each provider in order until one succeeds.
    pub async fn embed(&self, text: &str) -> Result<EmbedResult, EmbeddingError> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        Ok(results.into_iter().next().expect("batch of one returns one"))
    }

    /// Embeds a batch of texts, preserving input order.
    ///
    /// For each provider in turn: the texts not yet resolved are cache-probed against that
    /// provider; remaining misses are submitted as a single all-or-nothing call; on failure
    /// or timeout the whole miss set falls through to the next provider, which repeats the
    /// cache probe against itself before invoking.
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<EmbedResult>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut slots: Vec<Option<EmbedResult>> = vec![None; texts.len()];
        let mut remaining: Vec<usize> = (0..texts.len()).collect();

        for (idx, provider) in self.providers.iter().enumerate() {
            if remaining.is_empty() {
                break;
            }
            if provider.is_skipped() {
                continue;
            }

            let mut still_missing = Vec::new();
            for &i in &remaining {
                if let Some(vector) = self.cache.get(provider.provider_id(), &texts[i]).await {
                    self.counters[provider.provider_id()]
                        .cache_hits_total
                        .fetch_add(1, Ordering::Release);
                    slots[i] = Some(EmbedResult {
                        text: texts[i].clone(),
                        vector,
                        provider_id: provider.provider_id().to_string(),
                        model_name: provider.model_name().to_string(),
                        from_cache: true,
                        fallback_used: false,
                    });
                } else {
                    still_missing.push(i);
                }
            }

            if still_missing.is_empty() {
                remaining.clear();
                continue;
            }

            let miss_texts: Vec<String> = still_missing.iter().map(|&i| texts[i].clone()).collect();

            match tokio::time::timeout(self.per_call_timeout, provider.embed(&miss_texts)).await {
                Ok(Ok(vectors)) => {
                    provider.record_outcome(true);
                    self.counters[provider.provider_id()]
                        .embeds_total
                        .fetch_add(vectors.len() as u64, Ordering::Release);

                    for (vector, &i) in vectors.into_iter().zip(still_missing.iter()) {
                        if provider.is_deterministic() {
                            self.cache.put(provider.provider_id(), &texts[i], &vector).await;
                        }
                        slots[i] = Some(EmbedResult {
                            text: texts[i].clone(),
                            vector,
                            provider_id: provider.provider_id().to_string(),
                            model_name: provider.model_name().to_string(),
                            from_cache: false,
                            fallback_used: idx > 0,
                        });
                    }
                    remaining.clear();
                }
                Ok(Err(e)) => {
                    provider.record_outcome(false);
                    self.counters[provider.provider_id()]
                        .errors_total
                        .fetch_add(1, Ordering::Release);
                    warn!(provider = provider.provider_id(), error = %e, "embedding provider failed, trying next");
                    remaining = still_missing;
                }
                Err(_) => {
                    provider.record_outcome(false);
                    self.counters[provider.provider_id()]
                        .timeouts_total
                        .fetch_add(1, Ordering::Release);
                    warn!(provider = provider.provider_id(), "embedding provider timed out, trying next");
                    remaining = still_missing;
                }
            }
        }

        if !remaining.is_empty() {
            return Err(EmbeddingError::ChainExhausted);
        }

        Ok(slots.into_iter().map(|s| s.expect("every index resolved")).collect())
    }

    /// Per-provider counters accumulated since construction.
    pub fn metrics(&self) -> HashMap<String, ProviderMetrics> {
        self.counters
            .iter()
            .map(|(id, c)| {
                (
                    id.clone(),
                    ProviderMetrics {
                        embeds_total: c.embeds_total.load(Ordering::Acquire),
                        cache_hits_total: c.cache_hits_total.load(Ordering::Acquire),
                        timeouts_total: c.timeouts_total.load(Ordering::Acquire),
                        errors_total: c.errors_total.load(Ordering::Acquire),
                    },
                )
            })
            .collect()
    }

    /// `(provider-id, is-skipped)` for every provider in the chain, in order; used to fold
    /// embedding-provider health into the orchestrator's component status rollup.
    pub fn providers_status(&self) -> Vec<(String, bool)> {
        self.providers
            .iter()
            .map(|p| (p.provider_id().to_string(), p.is_skipped()))
            .collect()
    }

    /// Runs each provider's [`EmbedProvider::self_test`] once; called at startup.
    pub async fn self_test_all(&self) -> Result<(), EmbeddingError> {
        for provider in &self.providers {
            if let Err(e) = provider.self_test().await {
                warn!(provider = provider.provider_id(), error = %e, "provider self-test failed at startup");
                provider.record_outcome(false);
            } else {
                provider.record_outcome(true);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{Backend, NoopBackend};
    use crate::embedding::mock::MockProvider;

    fn chain_with_mock() -> EmbeddingChain {
        let cache = EmbeddingCache::new(Backend::Noop(NoopBackend), Duration::from_secs(60));
        EmbeddingChain::new(
            vec![Provider::Mock(MockProvider::new(8))],
            cache,
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn single_embed_round_trips_through_mock() {
        let chain = chain_with_mock();
        let result = chain.embed("hello").await.unwrap();
        assert_eq!(result.text, "hello");
        assert_eq!(result.vector.len(), 8);
        assert!(!result.from_cache);
    }

    #[tokio::test]
    async fn batch_preserves_order() {
        let chain = chain_with_mock();
        let texts = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let results = chain.embed_batch(&texts).await.unwrap();
        let got: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(got, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn metrics_count_embeds() {
        let chain = chain_with_mock();
        chain.embed_batch(&["x".to_string(), "y".to_string()]).await.unwrap();
        let metrics = chain.metrics();
        assert_eq!(metrics["mock"].embeds_total, 2);
    }

    #[tokio::test]
    async fn fallback_used_is_true_when_terminal_provider_succeeds_after_earlier_failure() {
        use crate::config::LocalProviderConfig;
        use crate::embedding::local::LocalProvider;

        // A `LocalProvider` pointed at a nonexistent model path fails fast on its first
        // `embed` call (no file to load), so the chain falls through to the terminal mock.
        let broken_local = LocalProvider::new(
            &LocalProviderConfig {
                model_name: "missing".to_string(),
                model_path: std::path::PathBuf::from("/nonexistent/model.gguf"),
                tokenizer_path: std::path::PathBuf::from("/nonexistent/tokenizer.json"),
            },
            512,
            8,
        );

        let cache = EmbeddingCache::new(Backend::Noop(NoopBackend), Duration::from_secs(60));
        let chain = EmbeddingChain::new(
            vec![Provider::Local(broken_local), Provider::Mock(MockProvider::new(8))],
            cache,
            Duration::from_secs(1),
        );

        let result = chain.embed("hello").await.unwrap();
        assert_eq!(result.provider_id, "mock");
        assert!(result.fallback_used);
    }

    #[tokio::test]
    async fn fallback_used_is_false_for_the_sole_provider() {
        let chain = chain_with_mock();
        let result = chain.embed("hello").await.unwrap();
        assert!(!result.fallback_used);
    }

    #[tokio::test]
    async fn providers_status_reports_each_provider_in_order() {
        let chain = chain_with_mock();
        let status = chain.providers_status();
        assert_eq!(status, vec![("mock".to_string(), false)]);
    }
}
