use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::models::gallery_image::ErrorResponse;
use services::services::{gallery_generator::GalleryError, storage::StorageError};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Gallery(#[from] GalleryError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            ApiError::Gallery(e) => match e {
                GalleryError::Validation(message) => (StatusCode::BAD_REQUEST, message.clone()),
                GalleryError::RateLimited => (StatusCode::TOO_MANY_REQUESTS, e.to_string()),
                GalleryError::QuotaExceeded => (StatusCode::PAYMENT_REQUIRED, e.to_string()),
                GalleryError::Configuration | GalleryError::Generation(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
                }
                GalleryError::Upstream(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to generate image".to_string(),
                ),
                GalleryError::Storage(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to store generated image".to_string(),
                ),
                GalleryError::Database(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to query gallery images".to_string(),
                ),
            },
            ApiError::Storage(StorageError::InvalidKey(_)) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ApiError::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to read stored object".to_string(),
            ),
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone()),
            ApiError::NotFound(message) => (StatusCode::NOT_FOUND, message.clone()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        if status.is_server_error() {
            error!(status = status.as_u16(), error = %self, "Request failed");
        }
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use services::services::image_api::ImageApiError;

    use super::*;

    #[test]
    fn gallery_errors_map_to_statuses() {
        let cases = [
            (GalleryError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (GalleryError::Configuration, StatusCode::INTERNAL_SERVER_ERROR),
            (GalleryError::RateLimited, StatusCode::TOO_MANY_REQUESTS),
            (GalleryError::QuotaExceeded, StatusCode::PAYMENT_REQUIRED),
            (
                GalleryError::Upstream(ImageApiError::Timeout),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                GalleryError::Generation("No image generated".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(ApiError::from(error).status_and_message().0, status);
        }
    }

    #[test]
    fn upstream_details_are_not_leaked() {
        let (_, message) = ApiError::from(GalleryError::Upstream(ImageApiError::Http {
            status: 500,
            body: "internal trace".into(),
        }))
        .status_and_message();
        assert_eq!(message, "Failed to generate image");
    }
}
