//! HTTP collaborators the gallery talks to: the canonical image host, the
//! gallery records table and the single-angle generation function.

use std::time::Duration;

use async_trait::async_trait;
use db::models::gallery_image::{
    ErrorResponse, GalleryImageRecord, GalleryImageResponse, GenerateGalleryImage,
};
use reqwest::{Client, RequestBuilder, Response, header};
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },
    #[error("json error: {0}")]
    Serde(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ClientError::Serde(e.to_string())
        } else {
            ClientError::Transport(e.to_string())
        }
    }
}

/// Fetches the canonical product photo as an inline data URL.
#[async_trait]
pub trait CanonicalImageSource: Send + Sync {
    async fn fetch_data_url(&self, image_url: &str) -> Result<String, ClientError>;
}

#[async_trait]
pub trait GalleryRecordSource: Send + Sync {
    async fn list(&self, product_id: &str) -> Result<Vec<GalleryImageRecord>, ClientError>;
}

#[async_trait]
pub trait AngleImageGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerateGalleryImage,
    ) -> Result<GalleryImageResponse, ClientError>;
}

/// Talks to the gallery server over its public HTTP surface.
#[derive(Debug, Clone)]
pub struct GalleryHttpClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
}

impl GalleryHttpClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key).header("apikey", key),
            None => request,
        }
    }

    async fn check(response: Response) -> Result<Response, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        Err(ClientError::Http {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl CanonicalImageSource for GalleryHttpClient {
    async fn fetch_data_url(&self, image_url: &str) -> Result<String, ClientError> {
        if image_url.starts_with("data:") {
            return Ok(image_url.to_string());
        }
        let response = Self::check(self.http.get(image_url).send().await?).await?;
        let mime_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap_or_default()
            .to_string();
        let bytes = response.bytes().await?;
        debug!(image_url, bytes = bytes.len(), "Fetched canonical image");
        Ok(utils::data_url::encode(&mime_type, &bytes))
    }
}

#[async_trait]
impl GalleryRecordSource for GalleryHttpClient {
    async fn list(&self, product_id: &str) -> Result<Vec<GalleryImageRecord>, ClientError> {
        let url = format!("{}/rest/v1/product_gallery_images/{product_id}", self.base_url);
        let response = Self::check(self.authorized(self.http.get(url)).send().await?).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl AngleImageGenerator for GalleryHttpClient {
    async fn generate(
        &self,
        request: &GenerateGalleryImage,
    ) -> Result<GalleryImageResponse, ClientError> {
        let url = format!("{}/functions/v1/generate-product-images", self.base_url);
        let response = Self::check(
            self.authorized(self.http.post(url))
                .json(request)
                .send()
                .await?,
        )
        .await?;
        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inline_images_are_passed_through() {
        let client = GalleryHttpClient::new("http://127.0.0.1:1/", None).unwrap();
        assert_eq!(client.base_url, "http://127.0.0.1:1");
        let data_url = "data:image/png;base64,aGVsbG8=";
        assert_eq!(client.fetch_data_url(data_url).await.unwrap(), data_url);
    }
}
