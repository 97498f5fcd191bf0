use actix_web::{
    http::{header::ContentType, StatusCode},
    web, HttpResponse, ResponseError,
};
use serde::Deserialize;
use serde_json::json;

use super::vector_index_status_code;
use crate::use_cases::related_items::{RelatedItemsError, RelatedItemsUseCase, DEFAULT_NB_RELATED};

#[derive(Debug, Deserialize)]
pub struct RelatedQueryParams {
    /// Negative values are handled as 0
    k: Option<i64>,
    same_channel: Option<bool>,
}

#[tracing::instrument(name = "Related items handler", skip(related_items))]
pub async fn related(
    content_id: web::Path<String>,
    params: web::Query<RelatedQueryParams>,
    related_items: web::Data<RelatedItemsUseCase>,
) -> Result<HttpResponse, RelatedItemsError> {
    let k = params
        .k
        .map(|k| usize::try_from(k.max(0)).unwrap_or(usize::MAX))
        .unwrap_or(DEFAULT_NB_RELATED);

    let related = related_items
        .execute(&content_id, k, params.same_channel)
        .await?;

    Ok(HttpResponse::Ok().json(related))
}

impl ResponseError for RelatedItemsError {
    fn status_code(&self) -> StatusCode {
        match self {
            RelatedItemsError::NotFound(_) => StatusCode::NOT_FOUND,
            RelatedItemsError::VectorIndexError(error) => vector_index_status_code(error),
        }
    }

    #[tracing::instrument(name = "Response error from related handler", skip(self), fields(error = %self))]
    fn error_response(&self) -> HttpResponse<actix_web::body::BoxBody> {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .json(json!({ "error": self.to_string() }))
    }
}
