//! Embedding Provider Chain: an ordered, non-empty list of providers behind a shared cache,
//! always terminated by a deterministic mock fallback so the chain can never be empty.

pub mod chain;
/// Device selection (CPU / Metal / CUDA).
pub mod device;
mod error;
pub mod health;
/// In-process sentence-embedding model (Qwen2/GGUF).
pub mod local;
pub mod mock;
pub mod provider;
pub mod remote;

pub use chain::{EmbedResult, EmbeddingChain, ProviderMetrics};
pub use error::EmbeddingError;
pub use health::ProviderHealth;
pub use local::LocalProvider;
pub use mock::MockProvider;
pub use provider::{EmbedProvider, Provider};
pub use remote::RemoteProvider;
