use std::{num::NonZeroUsize, sync::Arc};

use common::helper::error_chain_fmt;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::{
    domain::entities::{
        index_point::IndexPoint,
        item::{BulkIngestItem, Item},
    },
    ports::{
        embedding_provider::{EmbeddingProvider, EmbeddingProviderError},
        vector_index::{VectorIndex, VectorIndexError},
    },
};

pub const DEFAULT_BATCH_SIZE: usize = 500;

/// Turns items into index points and writes them to the vector index.
///
/// The only writer of the index.
pub struct IngestItemsUseCase {
    embeddings_provider: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndex>,
    batch_size: NonZeroUsize,
    wait_for_single_upsert: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct BulkIngestReport {
    /// Number of items written to the index
    pub count: usize,
    pub rejected: Vec<RejectedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedItem {
    pub id: String,
    pub reason: String,
}

impl IngestItemsUseCase {
    pub fn new(
        embeddings_provider: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            embeddings_provider,
            vector_index,
            batch_size: NonZeroUsize::new(DEFAULT_BATCH_SIZE).unwrap_or(NonZeroUsize::MIN),
            wait_for_single_upsert: false,
        }
    }

    pub fn with_batch_size(mut self, batch_size: NonZeroUsize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// When false, a single upsert is acknowledged as soon as the backend received it
    pub fn with_wait_for_single_upsert(mut self, wait: bool) -> Self {
        self.wait_for_single_upsert = wait;
        self
    }

    /// Indexes one item, overwriting any point with the same id
    #[tracing::instrument(name = "Upserting an item", skip(self, item), fields(item_id = %item.id))]
    pub async fn upsert(&self, item: Item) -> Result<(), IngestItemsError> {
        self.index_items(vec![item], self.wait_for_single_upsert)
            .await
    }

    /// Indexes many raw items, batch after batch, in input order.
    ///
    /// Malformed or invalid items are rejected one by one and reported. Each batch is
    /// acknowledged by the index before the next one is encoded, and the executor is yielded
    /// to between batches so that concurrent queries are served during a large ingestion.
    ///
    /// A failing batch stops the ingestion: the batches written before it stay written.
    #[tracing::instrument(name = "Bulk ingesting items", skip(self, items), fields(nb_items = items.len()))]
    pub async fn bulk_ingest(
        &self,
        items: Vec<JsonValue>,
    ) -> Result<BulkIngestReport, IngestItemsError> {
        let mut report = BulkIngestReport::default();
        let mut items = items.into_iter();
        let mut batch_index = 0;

        loop {
            let batch: Vec<JsonValue> = items.by_ref().take(self.batch_size.get()).collect();
            if batch.is_empty() {
                break;
            }

            let mut valid_items = Vec::with_capacity(batch.len());
            for raw_item in batch {
                match BulkIngestItem::parse(raw_item) {
                    Ok(item) => valid_items.push(item),
                    Err(error) => {
                        warn!(?error, "Rejecting an item");
                        report.rejected.push(RejectedItem {
                            id: error.item_id().to_string(),
                            reason: error.to_string(),
                        });
                    }
                }
            }

            if !valid_items.is_empty() {
                let nb_valid_items = valid_items.len();

                self.index_items(valid_items, true)
                    .await
                    .map_err(|source| IngestItemsError::BatchAborted {
                        batch_index,
                        committed: report.count,
                        source: Box::new(source),
                    })?;

                report.count += nb_valid_items;
                info!(batch_index, nb_valid_items, "Batch committed");
            }

            batch_index += 1;
            tokio::task::yield_now().await;
        }

        info!(
            count = report.count,
            nb_rejected = report.rejected.len(),
            "Bulk ingestion done ✅"
        );
        Ok(report)
    }

    async fn index_items(&self, items: Vec<Item>, wait: bool) -> Result<(), IngestItemsError> {
        let signatures: Vec<String> = items.iter().map(Item::signature).collect();

        let vectors = self.embeddings_provider.encode(signatures).await?;
        if vectors.len() != items.len() {
            return Err(IngestItemsError::EmbeddingsCountMismatch {
                expected: items.len(),
                actual: vectors.len(),
            });
        }

        let expected_dimension = self.embeddings_provider.dimension();
        if let Some(vector) = vectors.iter().find(|v| v.len() != expected_dimension) {
            return Err(IngestItemsError::DimensionMismatch {
                expected: expected_dimension,
                actual: vector.len(),
            });
        }

        let points: Vec<IndexPoint> = items
            .into_iter()
            .zip(vectors)
            .map(|(item, vector)| IndexPoint::new(item, vector))
            .collect();

        self.vector_index.upsert(points, wait).await?;
        Ok(())
    }
}

#[derive(thiserror::Error)]
pub enum IngestItemsError {
    #[error(transparent)]
    EmbeddingProviderError(#[from] EmbeddingProviderError),
    #[error(transparent)]
    VectorIndexError(#[from] VectorIndexError),
    #[error("Encoded vector has {actual} dimensions, the collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Expected {expected} vectors from the embeddings provider, got {actual}")]
    EmbeddingsCountMismatch { expected: usize, actual: usize },
    #[error("Bulk ingestion aborted at batch {batch_index}, {committed} items were already committed")]
    BatchAborted {
        batch_index: usize,
        committed: usize,
        #[source]
        source: Box<IngestItemsError>,
    },
}

impl IngestItemsError {
    /// The error that actually failed the ingestion, through any aborted batch
    pub fn root_cause(&self) -> &IngestItemsError {
        match self {
            IngestItemsError::BatchAborted { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

impl std::fmt::Debug for IngestItemsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
