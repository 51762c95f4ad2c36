//! In-process sentence-embedding model (GGUF + tokenizer).
//!
//! The first call loads the model, which may block for as long as the file read and device
//! placement take. If that first load fails, the provider is marked permanently skipped for
//! the rest of the process's lifetime rather than retried on every subsequent miss.

pub(crate) mod model;

use std::path::PathBuf;
use std::sync::Arc;

use candle_core::{Device, IndexOp, Tensor};
use parking_lot::{Mutex, Once};
use tracing::{debug, info, warn};

use super::device::select_device;
use super::error::EmbeddingError;
use super::health::ProviderHealth;
use super::provider::EmbedProvider;
use crate::config::LocalProviderConfig;
use model::LocalEmbeddingModel;

const MAX_FAILURES: u32 = 3;
const FAILURE_WINDOW_MS: u64 = 60_000;
const COOLDOWN_MS: u64 = 60_000;

struct Loaded {
    model: Mutex<LocalEmbeddingModel>,
    tokenizer: tokenizers::Tokenizer,
    device: Device,
}

/// Sentence-embedding provider backed by an in-process transformer.
pub struct LocalProvider {
    model_name: String,
    model_path: PathBuf,
    tokenizer_path: PathBuf,
    max_seq_len: usize,
    embedding_dim: usize,
    health: ProviderHealth,
    load_once: Once,
    loaded: Mutex<Option<Arc<Loaded>>>,
}

impl LocalProvider {
    /// Builds a provider from its resolved configuration; the model itself is not loaded yet.
    pub fn new(config: &LocalProviderConfig, max_seq_len: usize, embedding_dim: usize) -> Self {
        Self {
            model_name: config.model_name.clone(),
            model_path: config.model_path.clone(),
            tokenizer_path: config.tokenizer_path.clone(),
            max_seq_len,
            embedding_dim,
            health: ProviderHealth::new(MAX_FAILURES, FAILURE_WINDOW_MS, COOLDOWN_MS),
            load_once: Once::new(),
            loaded: Mutex::new(None),
        }
    }

    /// Health tracker for this provider (used by [`Provider`](super::provider::Provider)).
    pub fn health(&self) -> &ProviderHealth {
        &self.health
    }

    fn ensure_loaded(&self) -> Result<Arc<Loaded>, EmbeddingError> {
        self.load_once.call_once(|| {
            let result = self.load();
            let mut slot = self.loaded.lock();
            match result {
                Ok(loaded) => *slot = Some(Arc::new(loaded)),
                Err(e) => {
                    warn!(error = %e, "local embedding model failed to load on first call");
                    self.health.mark_permanently_skipped();
                }
            }
        });

        self.loaded
            .lock()
            .clone()
            .ok_or_else(|| EmbeddingError::ModelNotFound {
                path: self.model_path.clone(),
            })
    }

    fn load(&self) -> Result<Loaded, EmbeddingError> {
        if self.model_path.as_os_str().is_empty() || !self.model_path.exists() {
            return Err(EmbeddingError::ModelNotFound {
                path: self.model_path.clone(),
            });
        }

        let device = select_device()?;
        debug!(?device, "selected compute device for local embedding provider");

        let tokenizer = tokenizers::Tokenizer::from_file(&self.tokenizer_path).map_err(|e| {
            EmbeddingError::TokenizationFailed {
                reason: format!("failed to load tokenizer: {e}"),
            }
        })?;

        let mut model_file =
            std::fs::File::open(&self.model_path).map_err(EmbeddingError::from)?;
        let model_content = candle_core::quantized::gguf_file::Content::read(&mut model_file)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("failed to read GGUF content: {e}"),
            })?;

        let model = LocalEmbeddingModel::from_gguf(model_content, &mut model_file, &device, self.max_seq_len)
            .map_err(|e| EmbeddingError::ModelLoadFailed {
                reason: format!("failed to load Qwen2 model: {e}"),
            })?;

        if self.embedding_dim > model.config().hidden_size {
            return Err(EmbeddingError::InvalidConfig {
                reason: format!(
                    "embedding_dim ({}) exceeds model hidden_size ({})",
                    self.embedding_dim,
                    model.config().hidden_size
                ),
            });
        }

        info!(
            model_path = %self.model_path.display(),
            embedding_dim = self.embedding_dim,
            hidden_size = model.config().hidden_size,
            "local embedding model loaded"
        );

        Ok(Loaded {
            model: Mutex::new(model),
            tokenizer,
            device,
        })
    }

    fn embed_one(&self, text: &str, loaded: &Loaded) -> Result<Vec<f32>, EmbeddingError> {
        let encoding =
            loaded
                .tokenizer
                .encode(text, true)
                .map_err(|e| EmbeddingError::TokenizationFailed {
                    reason: e.to_string(),
                })?;

        let mut tokens: Vec<u32> = encoding.get_ids().to_vec();
        if tokens.is_empty() {
            return Ok(vec![0.0; self.embedding_dim]);
        }
        if tokens.len() > self.max_seq_len {
            tokens.truncate(self.max_seq_len);
        }

        let input_ids = Tensor::new(&tokens[..], &loaded.device)
            .and_then(|t| t.unsqueeze(0))
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("failed to build input tensor: {e}"),
            })?;

        let hidden_states = loaded
            .model
            .lock()
            .forward(&input_ids)
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("transformer forward pass failed: {e}"),
            })?;

        let last_idx = tokens.len() - 1;
        let mut embedding = hidden_states
            .i((0, last_idx, ..self.embedding_dim))
            .and_then(|t| t.to_vec1::<f32>())
            .map_err(|e| EmbeddingError::InferenceFailed {
                reason: format!("failed to extract embedding: {e}"),
            })?;

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut embedding {
                *x /= norm;
            }
        }
        Ok(embedding)
    }
}

impl EmbedProvider for LocalProvider {
    fn provider_id(&self) -> &str {
        "local"
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let loaded = self.ensure_loaded()?;
        texts.iter().map(|t| self.embed_one(t, &loaded)).collect()
    }
}
