//! Public reads of the gallery bucket.

use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use services::services::storage::GALLERY_BUCKET;

use crate::{DeploymentImpl, error::ApiError};

/// GET /storage/v1/object/public/product-gallery/{product_id}/{file}
pub async fn get_gallery_object(
    State(deployment): State<DeploymentImpl>,
    Path((product_id, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let key = format!("{product_id}/{file}");
    let object = deployment
        .storage()
        .download(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound("Object not found".to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, object.content_type),
            (
                header::CACHE_CONTROL,
                "public, max-age=3600".to_string(),
            ),
        ],
        object.bytes,
    )
        .into_response())
}

pub fn router(_deployment: &DeploymentImpl) -> Router<DeploymentImpl> {
    Router::new().route(
        &format!("/storage/v1/object/public/{GALLERY_BUCKET}/{{product_id}}/{{file}}"),
        get(get_gallery_object),
    )
}
