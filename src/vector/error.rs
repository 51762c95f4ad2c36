use thiserror::Error;

#[derive(Debug, Error)]
/// Errors returned by vector index operations.
pub enum VectorError {
    /// Could not reach the store at all.
    #[error("failed to connect to vector store at '{url}': {message}")]
    ConnectionFailed { url: String, message: String },

    /// Collection creation or existence check failed.
    #[error("failed to create collection '{collection}': {message}")]
    CreateCollectionFailed {
        collection: String,
        message: String,
    },

    /// Collection does not exist and could not be lazily created.
    #[error("collection not found: {collection}")]
    CollectionNotFound { collection: String },

    /// Upsert failed mid-batch.
    #[error("failed to upsert points to '{collection}': {message}")]
    UpsertFailed {
        collection: String,
        message: String,
    },

    /// Search request failed.
    #[error("failed to search in '{collection}': {message}")]
    SearchFailed {
        collection: String,
        message: String,
    },

    /// A vector in the batch did not match the collection's declared dimension.
    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    /// Delete request failed.
    #[error("failed to delete points from '{collection}': {message}")]
    DeleteFailed {
        collection: String,
        message: String,
    },

    /// The search call exceeded its deadline.
    #[error("search in '{collection}' timed out")]
    Timeout { collection: String },
}
