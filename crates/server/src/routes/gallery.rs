//! Routes for single-angle gallery generation and the gallery record set.

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::gallery_image::{GalleryImageRecord, GalleryImageResponse, GenerateGalleryImage};

use crate::{DeploymentImpl, error::ApiError};

/// POST /functions/v1/generate-product-images
/// Return the stored image for the angle, generating it first if needed
pub async fn generate_product_image(
    State(deployment): State<DeploymentImpl>,
    payload: Result<Json<GenerateGalleryImage>, JsonRejection>,
) -> Result<ResponseJson<GalleryImageResponse>, ApiError> {
    let Json(payload) = payload?;
    let outcome = deployment.generator().generate(payload).await?;
    Ok(ResponseJson(GalleryImageResponse::from(&outcome)))
}

/// GET /rest/v1/product_gallery_images/{product_id}
pub async fn list_gallery_images(
    State(deployment): State<DeploymentImpl>,
    Path(product_id): Path<String>,
) -> Result<ResponseJson<Vec<GalleryImageRecord>>, ApiError> {
    let records = deployment.generator().list(&product_id).await?;
    Ok(ResponseJson(records))
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new()
        .route(
            "/functions/v1/generate-product-images",
            post(generate_product_image),
        )
        .route(
            "/rest/v1/product_gallery_images/{product_id}",
            get(list_gallery_images),
        )
}
