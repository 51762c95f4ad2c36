use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by embedding providers and the chain that drives them.
pub enum EmbeddingError {
    /// Local-model file was not found on disk.
    #[error("embedding model not found at path: {path}")]
    ModelNotFound {
        /// Missing model path.
        path: PathBuf,
    },

    /// Local-model failed to load.
    #[error("failed to load embedding model: {reason}")]
    ModelLoadFailed {
        /// Error message.
        reason: String,
    },

    /// Requested compute device is unavailable.
    #[error("{device} device unavailable: {reason}")]
    DeviceUnavailable {
        /// Device name (e.g. "cuda", "metal").
        device: String,
        /// Error message.
        reason: String,
    },

    /// Local-model inference failed.
    #[error("embedding inference failed: {reason}")]
    InferenceFailed {
        /// Error message.
        reason: String,
    },

    /// Tokenization failed.
    #[error("tokenization failed: {reason}")]
    TokenizationFailed {
        /// Error message.
        reason: String,
    },

    /// Provider configuration is invalid (missing api key, empty model name, ...).
    #[error("invalid provider configuration: {reason}")]
    InvalidConfig {
        /// Error message.
        reason: String,
    },

    /// The remote-API provider rejected our credentials.
    #[error("provider '{provider}' rejected credentials: {message}")]
    AuthRejected {
        /// Provider id.
        provider: String,
        /// Upstream error message.
        message: String,
    },

    /// The remote-API provider returned a non-2xx status.
    #[error("provider '{provider}' returned HTTP {status}: {message}")]
    HttpStatus {
        /// Provider id.
        provider: String,
        /// HTTP status code.
        status: u16,
        /// Response body or error message.
        message: String,
    },

    /// The call exceeded its configured timeout.
    #[error("provider '{provider}' timed out")]
    Timeout {
        /// Provider id.
        provider: String,
    },

    /// Could not reach the provider at all (DNS, connection reset, ...).
    #[error("provider '{provider}' unreachable: {message}")]
    ConnectionFailed {
        /// Provider id.
        provider: String,
        /// Error message.
        message: String,
    },

    /// The provider's response did not match the request (wrong item count, bad shape).
    #[error("provider '{provider}' response shape mismatch: expected {expected}, got {actual}")]
    ResponseShapeMismatch {
        /// Provider id.
        provider: String,
        /// Expected count.
        expected: usize,
        /// Actual count.
        actual: usize,
    },

    /// Caller asked to embed an empty text.
    #[error("cannot embed empty text")]
    EmptyText,

    /// Every provider in the chain failed (should never happen: the mock provider is terminal
    /// and always succeeds by construction).
    #[error("embedding chain exhausted: all providers failed")]
    ChainExhausted,
}

impl From<candle_core::Error> for EmbeddingError {
    fn from(err: candle_core::Error) -> Self {
        EmbeddingError::InferenceFailed {
            reason: err.to_string(),
        }
    }
}

impl From<std::io::Error> for EmbeddingError {
    fn from(err: std::io::Error) -> Self {
        EmbeddingError::ModelLoadFailed {
            reason: err.to_string(),
        }
    }
}
