use actix_web::{
    http::{header::ContentType, StatusCode},
    web, HttpResponse, ResponseError,
};
use serde_json::{json, Value as JsonValue};

use super::{embedding_provider_status_code, vector_index_status_code};
use crate::use_cases::ingest_items::{IngestItemsError, IngestItemsUseCase};

/// Responds once every batch is committed, with the number of ingested items
/// and the items that were rejected
///
/// Items are read one by one: a malformed item is rejected without failing the request.
#[tracing::instrument(
    name = "Bulk ingest handler",
    skip(body, ingest_items),
    fields(nb_items = body.len())
)]
pub async fn bulk_ingest(
    body: web::Json<Vec<JsonValue>>,
    ingest_items: web::Data<IngestItemsUseCase>,
) -> Result<HttpResponse, IngestItemsError> {
    let report = ingest_items.bulk_ingest(body.into_inner()).await?;

    Ok(HttpResponse::Ok().json(json!({
        "status": "ok",
        "count": report.count,
        "rejected": report.rejected,
    })))
}

impl ResponseError for IngestItemsError {
    fn status_code(&self) -> StatusCode {
        match self.root_cause() {
            IngestItemsError::EmbeddingProviderError(error) => {
                embedding_provider_status_code(error)
            }
            IngestItemsError::VectorIndexError(error) => vector_index_status_code(error),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[tracing::instrument(name = "Response error from ingestion handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
