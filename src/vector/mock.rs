//! In-memory [`VectorIndex`] used by tests and the `mock` feature.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::client::{CollectionInfo, EqualityFilter, VectorIndex};
use super::error::VectorError;
use super::model::{ChunkRecord, SearchHit, rescale_cosine};
use crate::config::Metric;

#[derive(Default, Clone)]
struct StoredPoint {
    vector: Vec<f32>,
    payload: HashMap<String, serde_json::Value>,
}

#[derive(Default)]
struct MockCollection {
    dimension: u64,
    points: HashMap<u64, (String, StoredPoint)>,
}

/// Thread-safe in-memory vector index with brute-force cosine/dot/euclid search.
#[derive(Default)]
pub struct MockVectorIndex {
    collections: RwLock<HashMap<String, MockCollection>>,
}

impl MockVectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn point_count(&self, collection: &str) -> Option<usize> {
        self.collections
            .read()
            .get(collection)
            .map(|c| c.points.len())
    }
}

impl VectorIndex for MockVectorIndex {
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: u64,
        _metric: Metric,
        _hnsw_m: u64,
        _hnsw_ef_construct: u64,
    ) -> Result<(), VectorError> {
        self.collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| MockCollection {
                dimension,
                points: HashMap::new(),
            });
        Ok(())
    }

    async fn upsert(
        &self,
        collection: &str,
        records: Vec<ChunkRecord>,
        _wait: bool,
    ) -> Result<(), VectorError> {
        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| VectorError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        for record in records {
            if record.vector.len() as u64 != coll.dimension {
                return Err(VectorError::InvalidDimension {
                    expected: coll.dimension as usize,
                    actual: record.vector.len(),
                });
            }
            let point_id = record.point_id();
            coll.points.insert(
                point_id,
                (
                    record.chunk_id,
                    StoredPoint {
                        vector: record.vector,
                        payload: record.payload,
                    },
                ),
            );
        }

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        k: u64,
        filter: Option<EqualityFilter>,
    ) -> Result<Vec<SearchHit>, VectorError> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| VectorError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        let mut hits: Vec<SearchHit> = coll
            .points
            .values()
            .filter(|(_, p)| match &filter {
                None => true,
                Some(f) => p
                    .payload
                    .get(&f.field)
                    .and_then(|v| v.as_str())
                    .is_some_and(|v| v == f.value),
            })
            .map(|(chunk_id, p)| SearchHit {
                chunk_id: chunk_id.clone(),
                score: rescale_cosine(cosine_similarity(&query, &p.vector)) as f64,
                payload: p.payload.clone(),
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(k as usize);
        Ok(hits)
    }

    async fn delete(&self, collection: &str, chunk_ids: &[String]) -> Result<(), VectorError> {
        let mut collections = self.collections.write();
        let coll = collections
            .get_mut(collection)
            .ok_or_else(|| VectorError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        for id in chunk_ids {
            let point_id = super::model::chunk_id_to_point_id(id);
            coll.points.remove(&point_id);
        }

        Ok(())
    }

    async fn info(&self, collection: &str) -> Result<CollectionInfo, VectorError> {
        let collections = self.collections.read();
        let coll = collections
            .get(collection)
            .ok_or_else(|| VectorError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        Ok(CollectionInfo {
            name: collection.to_string(),
            dimension: coll.dimension,
            point_count: coll.points.len() as u64,
        })
    }
}

/// Cosine similarity, zero for zero-norm or mismatched-length vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_and_search_round_trips() {
        let index = MockVectorIndex::new();
        index
            .ensure_collection("docs", 3, Metric::Cosine, 16, 100)
            .await
            .unwrap();

        index
            .upsert(
                "docs",
                vec![ChunkRecord::new("c1", vec![1.0, 0.0, 0.0], HashMap::new())],
                true,
            )
            .await
            .unwrap();

        let hits = index
            .search("docs", vec![1.0, 0.0, 0.0], 5, None)
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "c1");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn rejects_dimension_mismatch() {
        let index = MockVectorIndex::new();
        index
            .ensure_collection("docs", 3, Metric::Cosine, 16, 100)
            .await
            .unwrap();

        let err = index
            .upsert(
                "docs",
                vec![ChunkRecord::new("c1", vec![1.0, 0.0], HashMap::new())],
                true,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, VectorError::InvalidDimension { .. }));
    }

    #[tokio::test]
    async fn delete_removes_point() {
        let index = MockVectorIndex::new();
        index
            .ensure_collection("docs", 2, Metric::Cosine, 16, 100)
            .await
            .unwrap();
        index
            .upsert(
                "docs",
                vec![ChunkRecord::new("c1", vec![1.0, 0.0], HashMap::new())],
                true,
            )
            .await
            .unwrap();
        index.delete("docs", &["c1".to_string()]).await.unwrap();
        assert_eq!(index.point_count("docs"), Some(0));
    }

    #[tokio::test]
    async fn search_applies_equality_filter() {
        let index = MockVectorIndex::new();
        index
            .ensure_collection("docs", 2, Metric::Cosine, 16, 100)
            .await
            .unwrap();

        let mut payload_a = HashMap::new();
        payload_a.insert("tag".to_string(), serde_json::Value::String("a".into()));
        let mut payload_b = HashMap::new();
        payload_b.insert("tag".to_string(), serde_json::Value::String("b".into()));

        index
            .upsert(
                "docs",
                vec![
                    ChunkRecord::new("c1", vec![1.0, 0.0], payload_a),
                    ChunkRecord::new("c2", vec![1.0, 0.0], payload_b),
                ],
                true,
            )
            .await
            .unwrap();

        let hits = index
            .search(
                "docs",
                vec![1.0, 0.0],
                5,
                Some(EqualityFilter {
                    field: "tag".to_string(),
                    value: "a".to_string(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "c1");
    }
}
