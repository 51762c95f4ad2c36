//! Deterministic hash-seeded embedding provider: zero external dependencies, always succeeds.
//!
//! Used as the terminal fallback of the chain (it is the only provider guaranteed never to be
//! skipped) and directly by tests.

use std::hash::{DefaultHasher, Hash, Hasher};

use super::error::EmbeddingError;
use super::provider::EmbedProvider;

/// Hash-seeded deterministic embedder.
pub struct MockProvider {
    dim: usize,
}

impl MockProvider {
    /// Creates a mock provider producing `dim`-dimensional vectors.
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut hasher = DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut embedding = Vec::with_capacity(self.dim);
        let mut state = seed;
        for _ in 0..self.dim {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
            let value = ((state >> 32) as f32 / u32::MAX as f32) * 2.0 - 1.0;
            embedding.push(value);
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        embedding
    }
}

impl EmbedProvider for MockProvider {
    fn provider_id(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-hash-embed"
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
