use actix_web::{
    http::{header::ContentType, StatusCode},
    web, HttpResponse, ResponseError,
};
use common::helper::error_chain_fmt;
use serde_json::json;

use crate::{
    domain::entities::item::{Item, ItemError, UpsertItem},
    use_cases::ingest_items::{IngestItemsError, IngestItemsUseCase},
};

#[tracing::instrument(
    name = "Upsert item handler",
    skip(body, ingest_items),
    fields(content_id = %body.content_id)
)]
pub async fn upsert(
    body: web::Json<UpsertItem>,
    ingest_items: web::Data<IngestItemsUseCase>,
) -> Result<HttpResponse, UpsertError> {
    let item = Item::try_from(body.into_inner())?;

    ingest_items.upsert(item).await?;

    Ok(HttpResponse::Ok().json(json!({ "status": "ok" })))
}

#[derive(thiserror::Error)]
pub enum UpsertError {
    #[error(transparent)]
    ValidationError(#[from] ItemError),
    #[error(transparent)]
    IngestionError(#[from] IngestItemsError),
}

impl std::fmt::Debug for UpsertError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for UpsertError {
    fn status_code(&self) -> StatusCode {
        match self {
            UpsertError::ValidationError(_) => StatusCode::BAD_REQUEST,
            UpsertError::IngestionError(error) => error.status_code(),
        }
    }

    #[tracing::instrument(name = "Response error from upsert handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
