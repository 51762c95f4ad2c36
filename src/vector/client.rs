//! Qdrant-backed vector index facade.

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use qdrant_client::Qdrant;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, PointStruct, SearchPointsBuilder,
    UpsertPointsBuilder, VectorParamsBuilder,
};

use super::error::VectorError;
use super::model::{ChunkRecord, SearchHit};
use crate::config::Metric;

impl From<Metric> for Distance {
    fn from(metric: Metric) -> Self {
        match metric {
            Metric::Cosine => Distance::Cosine,
            Metric::Euclid => Distance::Euclid,
            Metric::Dot => Distance::Dot,
        }
    }
}

/// A single `field == value` equality filter applied after the ANN search; matching the
/// data-model invariant that filters may cause a search to return fewer than `k` hits.
#[derive(Debug, Clone)]
pub struct EqualityFilter {
    pub field: String,
    pub value: String,
}

/// Collection metadata returned by [`VectorIndex::info`].
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub name: String,
    pub dimension: u64,
    pub point_count: u64,
}

/// The operations the router and orchestrator need from a vector store, independent of
/// the concrete backend wired in behind it.
pub trait VectorIndex: Send + Sync {
    fn ensure_collection(
        &self,
        name: &str,
        dimension: u64,
        metric: Metric,
        hnsw_m: u64,
        hnsw_ef_construct: u64,
    ) -> impl Future<Output = Result<(), VectorError>> + Send;

    fn upsert(
        &self,
        collection: &str,
        records: Vec<ChunkRecord>,
        wait: bool,
    ) -> impl Future<Output = Result<(), VectorError>> + Send;

    fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        k: u64,
        filter: Option<EqualityFilter>,
    ) -> impl Future<Output = Result<Vec<SearchHit>, VectorError>> + Send;

    fn delete(
        &self,
        collection: &str,
        chunk_ids: &[String],
    ) -> impl Future<Output = Result<(), VectorError>> + Send;

    fn info(&self, collection: &str) -> impl Future<Output = Result<CollectionInfo, VectorError>> + Send;
}

/// Wraps a direct Qdrant client.
#[derive(Clone)]
pub struct QdrantVectorIndex {
    client: Qdrant,
    url: String,
    timeout: Duration,
}

impl QdrantVectorIndex {
    /// Connects with the given per-call deadline (`config.vector.timeout_sec`).
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self, VectorError> {
        let client = Qdrant::from_url(url)
            .build()
            .map_err(|e| VectorError::ConnectionFailed {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            url: url.to_string(),
            timeout,
        })
    }

    async fn with_timeout<T>(
        &self,
        collection: &str,
        future: impl Future<Output = Result<T, VectorError>>,
    ) -> Result<T, VectorError> {
        match tokio::time::timeout(self.timeout, future).await {
            Ok(result) => result,
            Err(_) => Err(VectorError::Timeout { collection: collection.to_string() }),
        }
    }

    pub async fn health_check(&self) -> Result<(), VectorError> {
        self.client
            .health_check()
            .await
            .map_err(|e| VectorError::ConnectionFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}

impl QdrantVectorIndex {
    async fn ensure_collection_inner(
        &self,
        name: &str,
        dimension: u64,
        metric: Metric,
        hnsw_m: u64,
        hnsw_ef_construct: u64,
    ) -> Result<(), VectorError> {
        let exists =
            self.client
                .collection_exists(name)
                .await
                .map_err(|e| VectorError::CreateCollectionFailed {
                    collection: name.to_string(),
                    message: e.to_string(),
                })?;

        if exists {
            return Ok(());
        }

        let vectors_config = VectorParamsBuilder::new(dimension, metric.into())
            .hnsw_config(qdrant_client::qdrant::HnswConfigDiffBuilder::default().m(hnsw_m).ef_construct(hnsw_ef_construct));

        self.client
            .create_collection(
                CreateCollectionBuilder::new(name)
                    .vectors_config(vectors_config)
                    .on_disk_payload(true),
            )
            .await
            .map_err(|e| VectorError::CreateCollectionFailed {
                collection: name.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn upsert_inner(
        &self,
        collection: &str,
        records: Vec<ChunkRecord>,
        wait: bool,
    ) -> Result<(), VectorError> {
        if records.is_empty() {
            return Ok(());
        }

        let points: Vec<PointStruct> = records
            .into_iter()
            .map(|r| {
                let point_id = r.point_id();
                let mut payload: HashMap<String, qdrant_client::qdrant::Value> = r
                    .payload
                    .into_iter()
                    .map(|(k, v)| (k, json_value_to_qdrant(v)))
                    .collect();
                payload.insert("chunk_id".to_string(), r.chunk_id.clone().into());
                PointStruct::new(point_id, r.vector, payload)
            })
            .collect();

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(wait))
            .await
            .map_err(|e| VectorError::UpsertFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn search_inner(
        &self,
        collection: &str,
        query: Vec<f32>,
        k: u64,
        filter: Option<EqualityFilter>,
    ) -> Result<Vec<SearchHit>, VectorError> {
        let mut builder = SearchPointsBuilder::new(collection, query, k).with_payload(true);

        if let Some(f) = filter {
            builder = builder.filter(Filter::must([Condition::matches(f.field, f.value)]));
        }

        let response = self
            .client
            .search_points(builder)
            .await
            .map_err(|e| VectorError::SearchFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(response
            .result
            .into_iter()
            .filter_map(scored_point_to_hit)
            .collect())
    }

    async fn delete_inner(&self, collection: &str, chunk_ids: &[String]) -> Result<(), VectorError> {
        if chunk_ids.is_empty() {
            return Ok(());
        }

        use qdrant_client::qdrant::{DeletePointsBuilder, PointsIdsList};

        let ids = chunk_ids
            .iter()
            .map(|id| super::model::chunk_id_to_point_id(id).into())
            .collect();

        self.client
            .delete_points(
                DeletePointsBuilder::new(collection)
                    .points(PointsIdsList { ids })
                    .wait(true),
            )
            .await
            .map_err(|e| VectorError::DeleteFailed {
                collection: collection.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn info_inner(&self, collection: &str) -> Result<CollectionInfo, VectorError> {
        let info = self
            .client
            .collection_info(collection)
            .await
            .map_err(|_| VectorError::CollectionNotFound {
                collection: collection.to_string(),
            })?;

        let point_count = info.result.and_then(|r| r.points_count).unwrap_or(0);

        Ok(CollectionInfo {
            name: collection.to_string(),
            dimension: 0,
            point_count,
        })
    }
}

impl VectorIndex for QdrantVectorIndex {
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: u64,
        metric: Metric,
        hnsw_m: u64,
        hnsw_ef_construct: u64,
    ) -> Result<(), VectorError> {
        self.with_timeout(name, self.ensure_collection_inner(name, dimension, metric, hnsw_m, hnsw_ef_construct)).await
    }

    async fn upsert(&self, collection: &str, records: Vec<ChunkRecord>, wait: bool) -> Result<(), VectorError> {
        self.with_timeout(collection, self.upsert_inner(collection, records, wait)).await
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        k: u64,
        filter: Option<EqualityFilter>,
    ) -> Result<Vec<SearchHit>, VectorError> {
        self.with_timeout(collection, self.search_inner(collection, query, k, filter)).await
    }

    async fn delete(&self, collection: &str, chunk_ids: &[String]) -> Result<(), VectorError> {
        self.with_timeout(collection, self.delete_inner(collection, chunk_ids)).await
    }

    async fn info(&self, collection: &str) -> Result<CollectionInfo, VectorError> {
        self.with_timeout(collection, self.info_inner(collection)).await
    }
}

fn json_value_to_qdrant(value: serde_json::Value) -> qdrant_client::qdrant::Value {
    match value {
        serde_json::Value::Null => qdrant_client::qdrant::Value::from(false),
        serde_json::Value::Bool(b) => b.into(),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                i.into()
            } else {
                n.as_f64().unwrap_or(0.0).into()
            }
        }
        serde_json::Value::String(s) => s.into(),
        _ => value.to_string().into(),
    }
}

fn scored_point_to_hit(point: qdrant_client::qdrant::ScoredPoint) -> Option<SearchHit> {
    let chunk_id = point
        .payload
        .get("chunk_id")
        .and_then(|v| v.as_str().map(|s| s.to_string()))?;

    let payload = point
        .payload
        .into_iter()
        .filter(|(k, _)| k != "chunk_id")
        .map(|(k, v)| (k, qdrant_value_to_json(v)))
        .collect();

    Some(SearchHit {
        chunk_id,
        score: super::model::rescale_cosine(point.score) as f64,
        payload,
    })
}

fn qdrant_value_to_json(value: qdrant_client::qdrant::Value) -> serde_json::Value {
    if let Some(s) = value.as_str() {
        return serde_json::Value::String(s.to_string());
    }
    if let Some(i) = value.as_integer() {
        return serde_json::Value::from(i);
    }
    if let Some(b) = value.as_bool() {
        return serde_json::Value::Bool(b);
    }
    serde_json::Value::Null
}

/// The closed set of vector index backends this crate supports, dispatched the same way as
/// [`crate::cache::Backend`] and [`crate::embedding::Provider`] so the router never needs a
/// boxed trait object over `VectorIndex`'s return-position-`impl Future` methods.
pub enum VectorStore {
    Qdrant(QdrantVectorIndex),
    #[cfg(any(test, feature = "mock"))]
    Mock(super::mock::MockVectorIndex),
}

impl VectorIndex for VectorStore {
    async fn ensure_collection(
        &self,
        name: &str,
        dimension: u64,
        metric: Metric,
        hnsw_m: u64,
        hnsw_ef_construct: u64,
    ) -> Result<(), VectorError> {
        match self {
            VectorStore::Qdrant(v) => v.ensure_collection(name, dimension, metric, hnsw_m, hnsw_ef_construct).await,
            #[cfg(any(test, feature = "mock"))]
            VectorStore::Mock(v) => v.ensure_collection(name, dimension, metric, hnsw_m, hnsw_ef_construct).await,
        }
    }

    async fn upsert(&self, collection: &str, records: Vec<ChunkRecord>, wait: bool) -> Result<(), VectorError> {
        match self {
            VectorStore::Qdrant(v) => v.upsert(collection, records, wait).await,
            #[cfg(any(test, feature = "mock"))]
            VectorStore::Mock(v) => v.upsert(collection, records, wait).await,
        }
    }

    async fn search(
        &self,
        collection: &str,
        query: Vec<f32>,
        k: u64,
        filter: Option<EqualityFilter>,
    ) -> Result<Vec<SearchHit>, VectorError> {
        match self {
            VectorStore::Qdrant(v) => v.search(collection, query, k, filter).await,
            #[cfg(any(test, feature = "mock"))]
            VectorStore::Mock(v) => v.search(collection, query, k, filter).await,
        }
    }

    async fn delete(&self, collection: &str, chunk_ids: &[String]) -> Result<(), VectorError> {
        match self {
            VectorStore::Qdrant(v) => v.delete(collection, chunk_ids).await,
            #[cfg(any(test, feature = "mock"))]
            VectorStore::Mock(v) => v.delete(collection, chunk_ids).await,
        }
    }

    async fn info(&self, collection: &str) -> Result<CollectionInfo, VectorError> {
        match self {
            VectorStore::Qdrant(v) => v.info(collection).await,
            #[cfg(any(test, feature = "mock"))]
            VectorStore::Mock(v) => v.info(collection).await,
        }
    }
}
