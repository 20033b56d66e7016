//! Route for generating the whole catalog's gallery in one call.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::Json as ResponseJson,
    routing::post,
};
use db::models::gallery_image::{BatchGenerateGallery, BatchGenerateResponse};
use tracing::warn;

use crate::{DeploymentImpl, error::ApiError};

/// POST /functions/v1/batch-generate-gallery
/// 200 once the input parses, with per-item failures in the body. A missing
/// gateway key is a 500 before any item runs.
pub async fn batch_generate_gallery(
    State(deployment): State<DeploymentImpl>,
    payload: Result<Json<BatchGenerateGallery>, JsonRejection>,
) -> Result<ResponseJson<BatchGenerateResponse>, ApiError> {
    let Json(payload) = payload.map_err(|rejection| {
        warn!(reason = %rejection.body_text(), "Rejected batch request");
        ApiError::BadRequest("existingImageUrls object is required".to_string())
    })?;

    let response = deployment.batch().run(&payload).await?;
    Ok(ResponseJson(response))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route(
        "/functions/v1/batch-generate-gallery",
        post(batch_generate_gallery),
    )
}
