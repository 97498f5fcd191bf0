use async_trait::async_trait;
use common::helper::error_chain_fmt;

use crate::domain::entities::index_point::{
    DistanceMetric, IndexPoint, ScoredPoint, SearchQuery, StoredPoint,
};

/// Vector store holding the items points
///
/// An implementation is bound to a single collection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Creates the collection if it does not exist yet.
    ///
    /// Fails with `ConfigurationMismatch` if it exists with another dimension or metric.
    async fn ensure_collection(
        &self,
        dimension: u64,
        distance: DistanceMetric,
    ) -> Result<(), VectorIndexError>;

    /// Returns the points found among `ids`, unknown ids are skipped
    async fn retrieve(
        &self,
        ids: Vec<String>,
        with_vector: bool,
        with_payload: bool,
    ) -> Result<Vec<StoredPoint>, VectorIndexError>;

    /// Nearest neighbors of the query vector, by descending similarity
    async fn search(&self, query: SearchQuery) -> Result<Vec<ScoredPoint>, VectorIndexError>;

    /// Inserts or overwrites points by id.
    ///
    /// With `wait`, only returns once the backend has applied the write.
    async fn upsert(&self, points: Vec<IndexPoint>, wait: bool) -> Result<(), VectorIndexError>;
}

#[derive(thiserror::Error)]
pub enum VectorIndexError {
    #[error("Error from the vector index: {0}")]
    BackendError(String),
    #[error("The collection {collection} does not match the configuration: {reason}")]
    ConfigurationMismatch { collection: String, reason: String },
    #[error("Invalid point returned by the vector index: {0}")]
    InvalidPoint(String),
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),
}

impl std::fmt::Debug for VectorIndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
