//! Configuration error types.

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable was not set.
    #[error("missing required environment variable: {name}")]
    MissingEnvVar { name: &'static str },

    /// The embedding dimension is not usable (zero).
    #[error("invalid vector dimension: {dim}")]
    InvalidDimension { dim: usize },

    /// The declared provider output dimension does not match the vector collection's
    /// dimension — per the data model invariant, this is a fatal startup error.
    #[error("vector dimension {collection_dim} does not match provider output dimension {provider_dim}")]
    DimensionMismatch {
        collection_dim: usize,
        provider_dim: usize,
    },

    /// `embedding.primary-provider` names a provider not in `{remote, local, mock}`.
    #[error("unknown embedding provider '{value}'; expected remote, local, or mock")]
    UnknownProvider { value: String },

    /// `vector.metric` names a metric not in `{cosine, euclid, dot}`.
    #[error("unknown vector metric '{value}'; expected cosine, euclid, or dot")]
    UnknownMetric { value: String },

    /// `router.strategy` names a strategy not in `{auto, vector-only, lexical-only, hybrid}`.
    #[error("unknown router strategy '{value}'")]
    UnknownStrategy { value: String },

    /// The remote provider was selected but is missing required credentials.
    #[error("embedding.remote.{field} is required when primary-provider=remote")]
    MissingRemoteField { field: &'static str },

    /// `vector.collection-name` was not set.
    #[error("vector.collection-name is required")]
    MissingCollectionName,

    /// `vector.store-url` was not set.
    #[error("vector.store-url is required")]
    MissingStoreUrl,
}
