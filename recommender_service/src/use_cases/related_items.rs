use std::sync::Arc;

use common::helper::error_chain_fmt;
use tracing::info;

use crate::{
    domain::entities::{
        index_point::{PayloadFilter, SearchQuery, CHANNEL_KEY},
        related_result::RelatedResult,
    },
    ports::vector_index::{VectorIndex, VectorIndexError},
};

pub const DEFAULT_NB_RELATED: usize = 10;
/// Larger `k` values are lowered to this one
pub const MAX_NB_RELATED: usize = 100;

/// Recommends items related to an anchor item, by nearest-neighbor search on its vector.
///
/// Read-only: it never writes to the index.
pub struct RelatedItemsUseCase {
    vector_index: Arc<dyn VectorIndex>,
}

impl RelatedItemsUseCase {
    pub fn new(vector_index: Arc<dyn VectorIndex>) -> Self {
        Self { vector_index }
    }

    /// Returns at most `k` items related to `content_id`, by descending similarity.
    ///
    /// `k` is capped to `MAX_NB_RELATED`.
    ///
    /// The anchor item itself is never part of the results. With `same_channel`, only items
    /// from the anchor channel are searched, if the anchor has one.
    #[tracing::instrument(name = "Finding related items", skip(self))]
    pub async fn execute(
        &self,
        content_id: &str,
        k: usize,
        same_channel: Option<bool>,
    ) -> Result<Vec<RelatedResult>, RelatedItemsError> {
        let k = k.min(MAX_NB_RELATED);

        let anchor = self
            .vector_index
            .retrieve(vec![content_id.to_string()], true, true)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| RelatedItemsError::NotFound(content_id.to_string()))?;

        let anchor_vector = anchor
            .vector
            .ok_or_else(|| RelatedItemsError::NotFound(content_id.to_string()))?;

        let filter = match (same_channel, anchor.payload.get(CHANNEL_KEY)) {
            (Some(true), Some(channel)) if !channel.is_null() => Some(PayloadFilter::Equals {
                key: CHANNEL_KEY.to_string(),
                value: channel.clone(),
            }),
            _ => None,
        };

        // The anchor is almost always its own closest match: one more candidate is requested
        let limit = (k + 1).max(2) as u64;

        let candidates = self
            .vector_index
            .search(SearchQuery {
                vector: anchor_vector,
                limit,
                filter,
            })
            .await?;

        let related: Vec<RelatedResult> = candidates
            .into_iter()
            .filter(|candidate| candidate.id != content_id)
            .take(k)
            .map(RelatedResult::from)
            .collect();

        info!(nb_related = related.len(), "Found related items");
        Ok(related)
    }
}

#[derive(thiserror::Error)]
pub enum RelatedItemsError {
    #[error("Content {0} not found or has no vector")]
    NotFound(String),
    #[error(transparent)]
    VectorIndexError(#[from] VectorIndexError),
}

impl std::fmt::Debug for RelatedItemsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
