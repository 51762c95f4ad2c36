//! Records and results exchanged with the vector index.
//!
//! Point ids in the underlying ANN store are `u64`; callers address records by a string
//! `chunk-id`. [`chunk_id_to_point_id`] derives the numeric id from a content hash of the
//! string, and the original string is always carried in the record's payload so it can be
//! recovered on search without a reverse lookup.

use std::collections::HashMap;

use serde_json::Value;

use crate::hashing::hash_to_u64;

/// Rescales a raw cosine similarity from `[-1, 1]` to `[0, 1]`, so scores are comparable
/// against a `[0, 1]`-range confidence threshold and combine sanely in weighted merges.
pub fn rescale_cosine(score: f32) -> f32 {
    (score + 1.0) / 2.0
}

/// A chunk of text and its embedding, ready to be upserted into the index.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    pub chunk_id: String,
    pub vector: Vec<f32>,
    pub payload: HashMap<String, Value>,
}

impl ChunkRecord {
    pub fn new(chunk_id: impl Into<String>, vector: Vec<f32>, payload: HashMap<String, Value>) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            vector,
            payload,
        }
    }

    /// The numeric point id this record is stored under.
    pub fn point_id(&self) -> u64 {
        chunk_id_to_point_id(&self.chunk_id)
    }
}

/// A single hit returned from a vector or lexical search, or their merge.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk_id: String,
    pub score: f64,
    pub payload: HashMap<String, Value>,
}

/// Derives the store's numeric point id from a chunk-id via a stable content hash.
///
/// String ids are not native to the ANN store's point-id space, so every record and every
/// delete-by-id call passes through this function; two distinct chunk-ids collapsing to the
/// same point id would silently overwrite one another, which is why [`hash_to_u64`] is a
/// full 64-bit BLAKE3-derived hash rather than a short rolling one.
pub fn chunk_id_to_point_id(chunk_id: &str) -> u64 {
    hash_to_u64(chunk_id.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_id_is_deterministic() {
        assert_eq!(
            chunk_id_to_point_id("doc-1#p3"),
            chunk_id_to_point_id("doc-1#p3")
        );
    }

    #[test]
    fn point_id_differs_for_distinct_ids() {
        assert_ne!(chunk_id_to_point_id("a"), chunk_id_to_point_id("b"));
    }

    #[test]
    fn record_point_id_matches_chunk_id_hash() {
        let record = ChunkRecord::new("chunk-7", vec![0.1, 0.2], HashMap::new());
        assert_eq!(record.point_id(), chunk_id_to_point_id("chunk-7"));
    }
}
