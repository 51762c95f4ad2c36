//! Vector Index: a facade over an external ANN store (Qdrant by default).
//!
//! One process holds exactly one active collection. String `chunk-id`s are mapped to the
//! store's numeric point ids via a content hash — see [`model::chunk_id_to_point_id`].

pub mod client;
pub mod error;
pub mod model;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::{CollectionInfo, EqualityFilter, QdrantVectorIndex, VectorIndex, VectorStore};
pub use error::VectorError;
pub use model::{ChunkRecord, SearchHit, chunk_id_to_point_id, rescale_cosine};
#[cfg(any(test, feature = "mock"))]
pub use mock::{MockVectorIndex, cosine_similarity};
