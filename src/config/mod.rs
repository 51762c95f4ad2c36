//! Resolved engine configuration.
//!
//! The core receives a resolved [`Config`] value; it never reads the environment itself
//! in its primary entry points. [`Config::from_env`] is provided as a convenience for
//! binaries and tests that want to build one from environment variables, matching the
//! recognized option table.

pub mod error;

#[cfg(test)]
mod tests;

pub use error::ConfigError;

use std::env;

use crate::constants;

/// Which embedding provider variant leads the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimaryProvider {
    Remote,
    Local,
    Mock,
}

impl PrimaryProvider {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "remote" => Ok(Self::Remote),
            "local" => Ok(Self::Local),
            "mock" => Ok(Self::Mock),
            other => Err(ConfigError::UnknownProvider {
                value: other.to_string(),
            }),
        }
    }
}

/// Vector index distance metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Cosine,
    Euclid,
    Dot,
}

impl Metric {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "cosine" => Ok(Self::Cosine),
            "euclid" => Ok(Self::Euclid),
            "dot" => Ok(Self::Dot),
            other => Err(ConfigError::UnknownMetric {
                value: other.to_string(),
            }),
        }
    }
}

/// Router search strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Auto,
    VectorOnly,
    LexicalOnly,
    Hybrid,
}

impl Strategy {
    fn parse(value: &str) -> Result<Self, ConfigError> {
        match value {
            "auto" => Ok(Self::Auto),
            "vector-only" => Ok(Self::VectorOnly),
            "lexical-only" => Ok(Self::LexicalOnly),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(ConfigError::UnknownStrategy {
                value: other.to_string(),
            }),
        }
    }
}

/// Remote-API embedding provider credentials.
#[derive(Debug, Clone)]
pub struct RemoteProviderConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Local-model embedding provider identifier.
#[derive(Debug, Clone)]
pub struct LocalProviderConfig {
    pub model_name: String,
    /// Path to the GGUF model file.
    pub model_path: std::path::PathBuf,
    /// Path to `tokenizer.json`; defaults to a sibling of `model_path`.
    pub tokenizer_path: std::path::PathBuf,
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub primary_provider: PrimaryProvider,
    pub remote: Option<RemoteProviderConfig>,
    pub local: Option<LocalProviderConfig>,
    pub timeout_sec: u64,
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            primary_provider: PrimaryProvider::Remote,
            remote: None,
            local: None,
            timeout_sec: constants::DEFAULT_EMBEDDING_TIMEOUT_SEC,
            batch_size: constants::DEFAULT_EMBEDDING_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub embedding_ttl_sec: u64,
    pub embedding_backend_url: Option<String>,
    pub results_ttl_sec: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            embedding_ttl_sec: constants::DEFAULT_EMBEDDING_CACHE_TTL_SEC,
            embedding_backend_url: None,
            results_ttl_sec: constants::DEFAULT_RESULT_CACHE_TTL_SEC,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VectorConfig {
    pub dimension: usize,
    pub metric: Metric,
    pub hnsw_m: u64,
    pub hnsw_ef_construct: u64,
    pub collection_name: String,
    pub store_url: String,
    pub api_key: Option<String>,
    pub timeout_sec: u64,
    pub batch_size: usize,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimension: constants::DEFAULT_EMBEDDING_DIM,
            metric: Metric::Cosine,
            hnsw_m: constants::DEFAULT_HNSW_M,
            hnsw_ef_construct: constants::DEFAULT_HNSW_EF_CONSTRUCT,
            collection_name: String::new(),
            store_url: String::new(),
            api_key: None,
            timeout_sec: constants::DEFAULT_VECTOR_TIMEOUT_SEC,
            batch_size: constants::DEFAULT_VECTOR_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub strategy: Strategy,
    pub confidence_threshold: f32,
    pub weight_vector: f32,
    pub weight_lexical: f32,
    pub enable_cache: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Auto,
            confidence_threshold: constants::DEFAULT_CONFIDENCE_THRESHOLD,
            weight_vector: constants::DEFAULT_VECTOR_WEIGHT,
            weight_lexical: constants::DEFAULT_LEXICAL_WEIGHT,
            enable_cache: true,
        }
    }
}

/// The fully resolved configuration record handed to the orchestrator at construction.
#[derive(Debug, Clone)]
pub struct Config {
    pub embedding: EmbeddingConfig,
    pub cache: CacheConfig,
    pub vector: VectorConfig,
    pub router: RouterConfig,
    pub search_deadline_sec: u64,
    pub lexical_max_vocab_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            cache: CacheConfig::default(),
            vector: VectorConfig::default(),
            router: RouterConfig::default(),
            search_deadline_sec: constants::DEFAULT_SEARCH_DEADLINE_SEC,
            lexical_max_vocab_size: constants::DEFAULT_LEXICAL_MAX_VOCAB_SIZE,
        }
    }
}

impl Config {
    const ENV_PRIMARY_PROVIDER: &'static str = "RAGCORE_EMBEDDING_PRIMARY_PROVIDER";
    const ENV_REMOTE_API_KEY: &'static str = "RAGCORE_EMBEDDING_REMOTE_API_KEY";
    const ENV_REMOTE_BASE_URL: &'static str = "RAGCORE_EMBEDDING_REMOTE_BASE_URL";
    const ENV_REMOTE_MODEL: &'static str = "RAGCORE_EMBEDDING_REMOTE_MODEL";
    const ENV_LOCAL_MODEL_NAME: &'static str = "RAGCORE_EMBEDDING_LOCAL_MODEL_NAME";
    const ENV_LOCAL_MODEL_PATH: &'static str = "RAGCORE_EMBEDDING_LOCAL_MODEL_PATH";
    const ENV_LOCAL_TOKENIZER_PATH: &'static str = "RAGCORE_EMBEDDING_LOCAL_TOKENIZER_PATH";
    const ENV_EMBEDDING_TIMEOUT_SEC: &'static str = "RAGCORE_EMBEDDING_TIMEOUT_SEC";
    const ENV_EMBEDDING_BATCH_SIZE: &'static str = "RAGCORE_EMBEDDING_BATCH_SIZE";
    const ENV_CACHE_EMBEDDING_TTL_SEC: &'static str = "RAGCORE_CACHE_EMBEDDING_TTL_SEC";
    const ENV_CACHE_EMBEDDING_BACKEND_URL: &'static str = "RAGCORE_CACHE_EMBEDDING_BACKEND_URL";
    const ENV_CACHE_RESULTS_TTL_SEC: &'static str = "RAGCORE_CACHE_RESULTS_TTL_SEC";
    const ENV_VECTOR_DIMENSION: &'static str = "RAGCORE_VECTOR_DIMENSION";
    const ENV_VECTOR_METRIC: &'static str = "RAGCORE_VECTOR_METRIC";
    const ENV_VECTOR_HNSW_M: &'static str = "RAGCORE_VECTOR_HNSW_M";
    const ENV_VECTOR_HNSW_EF_CONSTRUCT: &'static str = "RAGCORE_VECTOR_HNSW_EF_CONSTRUCT";
    const ENV_VECTOR_COLLECTION_NAME: &'static str = "RAGCORE_VECTOR_COLLECTION_NAME";
    const ENV_VECTOR_STORE_URL: &'static str = "RAGCORE_VECTOR_STORE_URL";
    const ENV_VECTOR_API_KEY: &'static str = "RAGCORE_VECTOR_API_KEY";
    const ENV_VECTOR_TIMEOUT_SEC: &'static str = "RAGCORE_VECTOR_TIMEOUT_SEC";
    const ENV_VECTOR_BATCH_SIZE: &'static str = "RAGCORE_VECTOR_BATCH_SIZE";
    const ENV_ROUTER_STRATEGY: &'static str = "RAGCORE_ROUTER_STRATEGY";
    const ENV_ROUTER_CONFIDENCE_THRESHOLD: &'static str = "RAGCORE_ROUTER_CONFIDENCE_THRESHOLD";
    const ENV_ROUTER_WEIGHT_VECTOR: &'static str = "RAGCORE_ROUTER_WEIGHT_VECTOR";
    const ENV_ROUTER_WEIGHT_LEXICAL: &'static str = "RAGCORE_ROUTER_WEIGHT_LEXICAL";
    const ENV_SEARCH_DEADLINE_SEC: &'static str = "RAGCORE_SEARCH_DEADLINE_SEC";
    const ENV_LEXICAL_MAX_VOCAB_SIZE: &'static str = "RAGCORE_LEXICAL_MAX_VOCAB_SIZE";

    /// Builds a [`Config`] from recognized environment variables, falling back to the
    /// documented defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let primary_provider = match env::var(Self::ENV_PRIMARY_PROVIDER) {
            Ok(v) => PrimaryProvider::parse(&v)?,
            Err(_) => defaults.embedding.primary_provider,
        };

        let remote = Self::parse_remote_from_env()?;
        let local = Self::parse_optional_string_from_env(Self::ENV_LOCAL_MODEL_NAME).map(
            |model_name| {
                let model_path = Self::parse_optional_string_from_env(Self::ENV_LOCAL_MODEL_PATH)
                    .map(std::path::PathBuf::from)
                    .unwrap_or_default();
                let tokenizer_path =
                    Self::parse_optional_string_from_env(Self::ENV_LOCAL_TOKENIZER_PATH)
                        .map(std::path::PathBuf::from)
                        .unwrap_or_else(|| {
                            model_path
                                .parent()
                                .map(|p| p.join("tokenizer.json"))
                                .unwrap_or_default()
                        });
                LocalProviderConfig {
                    model_name,
                    model_path,
                    tokenizer_path,
                }
            },
        );

        let embedding = EmbeddingConfig {
            primary_provider,
            remote,
            local,
            timeout_sec: Self::parse_u64_from_env(
                Self::ENV_EMBEDDING_TIMEOUT_SEC,
                defaults.embedding.timeout_sec,
            ),
            batch_size: Self::parse_usize_from_env(
                Self::ENV_EMBEDDING_BATCH_SIZE,
                defaults.embedding.batch_size,
            ),
        };

        let cache = CacheConfig {
            embedding_ttl_sec: Self::parse_u64_from_env(
                Self::ENV_CACHE_EMBEDDING_TTL_SEC,
                defaults.cache.embedding_ttl_sec,
            ),
            embedding_backend_url: Self::parse_optional_string_from_env(
                Self::ENV_CACHE_EMBEDDING_BACKEND_URL,
            ),
            results_ttl_sec: Self::parse_u64_from_env(
                Self::ENV_CACHE_RESULTS_TTL_SEC,
                defaults.cache.results_ttl_sec,
            ),
        };

        let metric = match env::var(Self::ENV_VECTOR_METRIC) {
            Ok(v) => Metric::parse(&v)?,
            Err(_) => defaults.vector.metric,
        };

        let vector = VectorConfig {
            dimension: Self::parse_usize_from_env(
                Self::ENV_VECTOR_DIMENSION,
                defaults.vector.dimension,
            ),
            metric,
            hnsw_m: Self::parse_u64_from_env(Self::ENV_VECTOR_HNSW_M, defaults.vector.hnsw_m),
            hnsw_ef_construct: Self::parse_u64_from_env(
                Self::ENV_VECTOR_HNSW_EF_CONSTRUCT,
                defaults.vector.hnsw_ef_construct,
            ),
            collection_name: Self::parse_string_from_env(
                Self::ENV_VECTOR_COLLECTION_NAME,
                defaults.vector.collection_name,
            ),
            store_url: Self::parse_string_from_env(
                Self::ENV_VECTOR_STORE_URL,
                defaults.vector.store_url,
            ),
            api_key: Self::parse_optional_string_from_env(Self::ENV_VECTOR_API_KEY),
            timeout_sec: Self::parse_u64_from_env(
                Self::ENV_VECTOR_TIMEOUT_SEC,
                defaults.vector.timeout_sec,
            ),
            batch_size: Self::parse_usize_from_env(
                Self::ENV_VECTOR_BATCH_SIZE,
                defaults.vector.batch_size,
            ),
        };

        let strategy = match env::var(Self::ENV_ROUTER_STRATEGY) {
            Ok(v) => Strategy::parse(&v)?,
            Err(_) => defaults.router.strategy,
        };

        let router = RouterConfig {
            strategy,
            confidence_threshold: Self::parse_f32_from_env(
                Self::ENV_ROUTER_CONFIDENCE_THRESHOLD,
                defaults.router.confidence_threshold,
            ),
            weight_vector: Self::parse_f32_from_env(
                Self::ENV_ROUTER_WEIGHT_VECTOR,
                defaults.router.weight_vector,
            ),
            weight_lexical: Self::parse_f32_from_env(
                Self::ENV_ROUTER_WEIGHT_LEXICAL,
                defaults.router.weight_lexical,
            ),
            enable_cache: defaults.router.enable_cache,
        };

        Ok(Self {
            embedding,
            cache,
            vector,
            router,
            search_deadline_sec: Self::parse_u64_from_env(
                Self::ENV_SEARCH_DEADLINE_SEC,
                defaults.search_deadline_sec,
            ),
            lexical_max_vocab_size: Self::parse_usize_from_env(
                Self::ENV_LEXICAL_MAX_VOCAB_SIZE,
                defaults.lexical_max_vocab_size,
            ),
        })
    }

    fn parse_remote_from_env() -> Result<Option<RemoteProviderConfig>, ConfigError> {
        let api_key = env::var(Self::ENV_REMOTE_API_KEY).ok();
        let base_url = env::var(Self::ENV_REMOTE_BASE_URL).ok();
        let model = env::var(Self::ENV_REMOTE_MODEL).ok();

        match (api_key, base_url, model) {
            (None, None, None) => Ok(None),
            (Some(api_key), Some(base_url), Some(model)) => Ok(Some(RemoteProviderConfig {
                api_key,
                base_url,
                model,
            })),
            _ => Ok(None),
        }
    }

    /// Validates cross-field invariants that the core — not a config loader — is
    /// responsible for checking, because only the core knows both the declared vector
    /// dimension and the provider's actual output dimension.
    pub fn validate(&self, provider_output_dim: usize) -> Result<(), ConfigError> {
        if self.vector.dimension == 0 {
            return Err(ConfigError::InvalidDimension {
                dim: self.vector.dimension,
            });
        }

        if self.vector.dimension != provider_output_dim {
            return Err(ConfigError::DimensionMismatch {
                collection_dim: self.vector.dimension,
                provider_dim: provider_output_dim,
            });
        }

        if self.vector.collection_name.is_empty() {
            return Err(ConfigError::MissingCollectionName);
        }

        if self.vector.store_url.is_empty() {
            return Err(ConfigError::MissingStoreUrl);
        }

        if matches!(self.embedding.primary_provider, PrimaryProvider::Remote) {
            let remote = self
                .embedding
                .remote
                .as_ref()
                .ok_or(ConfigError::MissingRemoteField { field: "api-key" })?;
            if remote.api_key.is_empty() {
                return Err(ConfigError::MissingRemoteField { field: "api-key" });
            }
            if remote.base_url.is_empty() {
                return Err(ConfigError::MissingRemoteField { field: "base-url" });
            }
            if remote.model.is_empty() {
                return Err(ConfigError::MissingRemoteField { field: "model" });
            }
        }

        Ok(())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        env::var(var_name).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_usize_from_env(var_name: &str, default: usize) -> usize {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn parse_f32_from_env(var_name: &str, default: f32) -> f32 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }
}
