use thiserror::Error;

#[derive(Debug, Error)]
/// Errors surfaced by the router when a strategy cannot be satisfied at all.
///
/// Most downstream failures (vector-store outages, embedding timeouts) are absorbed by
/// [`super::Router::query`]'s fallback logic and never reach this type — it exists for the
/// handful of cases that must propagate: a caller-requested strategy whose prerequisite
/// component is entirely unavailable.
pub enum RouterError {
    #[error("embedding chain exhausted while computing query vector: {reason}")]
    EmbeddingFailed { reason: String },
}
