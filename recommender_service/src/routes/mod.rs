mod bulk_ingest;
mod health_check;
mod related;
mod upsert;

pub use bulk_ingest::*;
pub use health_check::*;
pub use related::*;
pub use upsert::*;

use actix_web::http::StatusCode;

use crate::ports::{
    embedding_provider::EmbeddingProviderError, vector_index::VectorIndexError,
};

/// A backend that failed or timed out is worth retrying, a misconfigured one is not
fn vector_index_status_code(error: &VectorIndexError) -> StatusCode {
    match error {
        VectorIndexError::BackendError(_) => StatusCode::SERVICE_UNAVAILABLE,
        VectorIndexError::ConfigurationMismatch { .. }
        | VectorIndexError::InvalidPoint(_)
        | VectorIndexError::UnsupportedFilter(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn embedding_provider_status_code(error: &EmbeddingProviderError) -> StatusCode {
    match error {
        EmbeddingProviderError::ModelError(_) | EmbeddingProviderError::RunnerStopped => {
            StatusCode::SERVICE_UNAVAILABLE
        }
        EmbeddingProviderError::UnexpectedOutput { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
