use thiserror::Error;

/// Errors from a cache backend.
///
/// Every operation that returns this error is, by contract (see [`crate::cache`] module docs),
/// swallowed by the caller and treated as a miss or no-op — it is never propagated to the
/// engine's caller. The type exists so backends can log a reason, not so callers can branch.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached.
    #[error("cache backend unreachable: {message}")]
    Unreachable {
        /// Error message.
        message: String,
    },

    /// The backend rejected the operation (e.g. OOM, eviction policy, serialization).
    #[error("cache operation failed: {message}")]
    OperationFailed {
        /// Error message.
        message: String,
    },
}
