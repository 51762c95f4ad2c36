//! HTTPS embedding provider backed by a third-party API (OpenAI-compatible `/embeddings`).

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

use super::error::EmbeddingError;
use super::health::ProviderHealth;
use super::provider::EmbedProvider;
use crate::config::RemoteProviderConfig;

const MAX_FAILURES: u32 = 5;
const FAILURE_WINDOW_MS: u64 = 60_000;
const COOLDOWN_MS: u64 = 30_000;

/// Calls a remote embedding API over HTTPS.
pub struct RemoteProvider {
    api_key: String,
    base_url: String,
    model: String,
    client: reqwest::Client,
    timeout: Duration,
    health: ProviderHealth,
}

impl RemoteProvider {
    /// Builds a provider from its resolved configuration and the shared request timeout.
    pub fn new(config: &RemoteProviderConfig, timeout: Duration) -> Result<Self, EmbeddingError> {
        if config.api_key.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "remote provider requires a non-empty api_key".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client,
            timeout,
            health: ProviderHealth::new(MAX_FAILURES, FAILURE_WINDOW_MS, COOLDOWN_MS),
        })
    }

    /// Health tracker for this provider (used by [`Provider`](super::provider::Provider)).
    pub fn health(&self) -> &ProviderHealth {
        &self.health
    }

    async fn embed_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);

        let response = tokio::time::timeout(
            self.timeout,
            self.client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&json!({
                    "model": self.model,
                    "input": texts,
                    "encoding_format": "float",
                }))
                .send(),
        )
        .await
        .map_err(|_| EmbeddingError::Timeout {
            provider: "remote".to_string(),
        })?
        .map_err(|e| EmbeddingError::ConnectionFailed {
            provider: "remote".to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::AuthRejected {
                provider: "remote".to_string(),
                message: body,
            });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::HttpStatus {
                provider: "remote".to_string(),
                status: status.as_u16(),
                message: body,
            });
        }

        let parsed: RemoteEmbeddingResponse = response.json().await.map_err(|e| {
            warn!(error = %e, "failed to decode remote embeddings response");
            EmbeddingError::HttpStatus {
                provider: "remote".to_string(),
                status: status.as_u16(),
                message: format!("failed to decode response body: {e}"),
            }
        })?;

        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::ResponseShapeMismatch {
                provider: "remote".to_string(),
                expected: texts.len(),
                actual: parsed.data.len(),
            });
        }

        let mut sorted = parsed.data;
        sorted.sort_by_key(|item| item.index);
        Ok(sorted.into_iter().map(|item| item.embedding).collect())
    }
}

impl EmbedProvider for RemoteProvider {
    fn provider_id(&self) -> &str {
        "remote"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed_request(texts).await
    }
}

#[derive(Debug, Deserialize)]
struct RemoteEmbeddingResponse {
    data: Vec<RemoteEmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct RemoteEmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}
