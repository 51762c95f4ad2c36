use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
/// Errors surfaced by [`super::RagOrchestrator`]. Indexing failures propagate (§7); search
/// failures never reach this type — they degrade in place via [`crate::router::QueryResult`].
pub enum OrchestratorError {
    #[error("embedding failed during indexing: {reason}")]
    EmbeddingFailed { reason: String },

    #[error("vector upsert failed during indexing: {reason}")]
    UpsertFailed { reason: String },

    #[error("vector delete failed: {reason}")]
    DeleteFailed { reason: String },

    #[error("declared collection dimension ({collection_dim}) does not match provider output dimension ({provider_dim})")]
    DimensionMismatch { collection_dim: usize, provider_dim: usize },

    /// Any other `Config::validate` failure (missing collection name, missing store url,
    /// missing remote credentials) — fatal at startup, before any backend is touched.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<ConfigError> for OrchestratorError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::DimensionMismatch { collection_dim, provider_dim } => {
                OrchestratorError::DimensionMismatch { collection_dim, provider_dim }
            }
            other => OrchestratorError::InvalidConfig { reason: other.to_string() },
        }
    }
}
