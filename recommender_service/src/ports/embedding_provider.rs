use async_trait::async_trait;
use common::helper::error_chain_fmt;

use crate::domain::entities::index_point::Embeddings;

/// Maps free texts to fixed-dimension vectors
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector produced by `encode`
    fn dimension(&self) -> usize;

    /// Encodes each text independently: one vector per text, in the same order
    async fn encode(&self, texts: Vec<String>) -> Result<Vec<Embeddings>, EmbeddingProviderError>;
}

#[derive(thiserror::Error)]
pub enum EmbeddingProviderError {
    #[error("Embeddings model error: {0}")]
    ModelError(String),
    #[error("The embeddings runner is not running")]
    RunnerStopped,
    #[error("Expected {expected} embeddings from the model, got {actual}")]
    UnexpectedOutput { expected: usize, actual: usize },
}

impl std::fmt::Debug for EmbeddingProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}
