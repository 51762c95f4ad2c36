//! Cross-cutting, shared constants.
//!
//! Prefer deriving secondary constants (e.g. byte sizes) from primary ones to avoid drift.
//!
//! # Dimension Invariants
//!
//! The embedding dimension is a runtime invariant shared across the embedding chain,
//! vector index, and cache. If you need runtime-configurable dimensions:
//!
//! 1. Use [`DimConfig`] to pass dimensions through initialization
//! 2. Use [`validate_embedding_dim`] at module boundaries to catch mismatches early
//! 3. The compile-time constants remain as defaults and for static size calculations

pub const DEFAULT_EMBEDDING_DIM: usize = 1536;
pub const EMBEDDING_F32_BYTES: usize = DEFAULT_EMBEDDING_DIM * 4;

pub const DEFAULT_EMBEDDING_TIMEOUT_SEC: u64 = 10;
pub const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 50;

pub const DEFAULT_EMBEDDING_CACHE_TTL_SEC: u64 = 604_800;
pub const DEFAULT_RESULT_CACHE_TTL_SEC: u64 = 86_400;

pub const DEFAULT_VECTOR_TIMEOUT_SEC: u64 = 30;
pub const DEFAULT_VECTOR_BATCH_SIZE: usize = 100;
pub const DEFAULT_HNSW_M: u64 = 16;
pub const DEFAULT_HNSW_EF_CONSTRUCT: u64 = 100;

pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.70;
pub const DEFAULT_VECTOR_WEIGHT: f32 = 0.7;
pub const DEFAULT_LEXICAL_WEIGHT: f32 = 0.3;

pub const DEFAULT_SEARCH_DEADLINE_SEC: u64 = 5;
pub const DEFAULT_LEXICAL_MAX_VOCAB_SIZE: usize = 5000;

/// Runtime dimension configuration shared by the embedding chain and vector index.
///
/// The [`validate`](DimConfig::validate) method ensures the dimension is usable; the
/// orchestrator additionally checks it against the declared provider output dimension
/// via [`validate_embedding_dim`] since a mismatch there is a fatal startup error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    /// The embedding vector dimension (number of floats).
    pub embedding_dim: usize,
}

impl Default for DimConfig {
    fn default() -> Self {
        Self {
            embedding_dim: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl DimConfig {
    /// Creates a new dimension configuration with the specified embedding dimension.
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    /// Validates that this configuration is usable.
    ///
    /// Returns an error if `embedding_dim` is zero.
    pub fn validate(&self) -> Result<(), DimValidationError> {
        if self.embedding_dim == 0 {
            return Err(DimValidationError::ZeroDimension);
        }
        Ok(())
    }

    /// Returns the number of bytes needed for an F32 representation.
    pub fn f32_bytes(&self) -> usize {
        self.embedding_dim * 4
    }
}

/// Error returned when dimension validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DimValidationError {
    /// Embedding dimension cannot be zero.
    ZeroDimension,
    /// Runtime dimension does not match expected dimension.
    DimensionMismatch { expected: usize, actual: usize },
}

impl std::fmt::Display for DimValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroDimension => write!(f, "embedding dimension cannot be zero"),
            Self::DimensionMismatch { expected, actual } => {
                write!(
                    f,
                    "dimension mismatch: expected {}, got {}",
                    expected, actual
                )
            }
        }
    }
}

impl std::error::Error for DimValidationError {}

/// Validates that a runtime embedding dimension matches the expected dimension.
///
/// Use this at module boundaries to catch dimension mismatches early — per the data
/// model invariant, a vector store whose declared dimension doesn't match the
/// embedding provider's output dimension is a fatal startup error, not a runtime one.
///
/// # Example
///
/// ```
/// use ragcore::constants::{validate_embedding_dim, DEFAULT_EMBEDDING_DIM};
///
/// let provider_dim = 1536;
/// validate_embedding_dim(provider_dim, DEFAULT_EMBEDDING_DIM).unwrap();
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual != expected {
        return Err(DimValidationError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dim_config_default() {
        let config = DimConfig::default();
        assert_eq!(config.embedding_dim, DEFAULT_EMBEDDING_DIM);
    }

    #[test]
    fn test_dim_config_validate_success() {
        let config = DimConfig::new(8);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dim_config_validate_zero() {
        let config = DimConfig::new(0);
        assert_eq!(config.validate(), Err(DimValidationError::ZeroDimension));
    }

    #[test]
    fn test_dim_config_byte_calculations() {
        let config = DimConfig::new(1536);
        assert_eq!(config.f32_bytes(), EMBEDDING_F32_BYTES);
    }

    #[test]
    fn test_validate_embedding_dim_match() {
        assert!(validate_embedding_dim(1536, 1536).is_ok());
    }

    #[test]
    fn test_validate_embedding_dim_mismatch() {
        assert_eq!(
            validate_embedding_dim(768, 1536),
            Err(DimValidationError::DimensionMismatch {
                expected: 1536,
                actual: 768
            })
        );
    }

    #[test]
    fn test_error_display() {
        let err = DimValidationError::ZeroDimension;
        assert_eq!(err.to_string(), "embedding dimension cannot be zero");

        let err = DimValidationError::DimensionMismatch {
            expected: 1536,
            actual: 768,
        };
        assert!(err.to_string().contains("1536"));
        assert!(err.to_string().contains("768"));
    }
}
