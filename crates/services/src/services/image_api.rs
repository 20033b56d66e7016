//! Client for the chat-completions image generation gateway.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

pub const DEFAULT_API_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash-image-preview";

#[derive(Debug, Clone, Error)]
pub enum ImageApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("timeout")]
    Timeout,
    #[error("rate limited")]
    RateLimited,
    #[error("payment required")]
    PaymentRequired,
    #[error("http {status}: {body}")]
    Http { status: u16, body: String },
    #[error("json error: {0}")]
    Serde(String),
    #[error("no image in response")]
    NoImage,
    #[error("missing api key: AI_GATEWAY_API_KEY environment variable not set")]
    MissingApiKey,
}

/// Multimodal model that re-renders an existing product photo.
#[async_trait]
pub trait ImageGenerationApi: Send + Sync {
    /// Send `instruction` together with the inline image and return the first
    /// image of the response, as a data URL.
    async fn edit_image(
        &self,
        instruction: &str,
        image_data_url: &str,
    ) -> Result<String, ImageApiError>;

    /// Whether credentials are present. Requests fail with
    /// [`ImageApiError::MissingApiKey`] when this is `false`.
    fn is_configured(&self) -> bool {
        true
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    modalities: [&'static str; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Debug, Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

impl<'a> ChatRequest<'a> {
    fn image_edit(model: &'a str, instruction: &'a str, image_data_url: &'a str) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: instruction },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image_data_url,
                        },
                    },
                ],
            }],
            modalities: ["image", "text"],
        }
    }
}

/// Response from the gateway
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub images: Vec<ResponseImage>,
}

#[derive(Debug, Deserialize)]
pub struct ResponseImage {
    pub image_url: ResponseImageUrl,
}

#[derive(Debug, Deserialize)]
pub struct ResponseImageUrl {
    pub url: String,
}

impl ChatResponse {
    /// First embedded image of the first choice
    pub fn first_image(&self) -> Option<&str> {
        self.choices
            .first()?
            .message
            .images
            .iter()
            .map(|image| image.image_url.url.trim())
            .find(|url| !url.is_empty())
    }
}

/// Gateway client
#[derive(Debug, Clone)]
pub struct GatewayImageClient {
    http: Client,
    api_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl GatewayImageClient {
    const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

    /// Create a client. A missing key is only reported when a request is made,
    /// so cached lookups keep working on a misconfigured deployment.
    pub fn new(
        api_url: Option<String>,
        api_key: Option<SecretString>,
        model: Option<String>,
    ) -> Result<Self, ImageApiError> {
        let http = Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .user_agent(concat!("product-gallery/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImageApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            api_url: api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            api_key,
            model: model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_request(&self, request: &ChatRequest<'_>) -> Result<ChatResponse, ImageApiError> {
        let api_key = self.api_key.as_ref().ok_or(ImageApiError::MissingApiKey)?;

        let res = self
            .http
            .post(&self.api_url)
            .bearer_auth(api_key.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        match res.status() {
            s if s.is_success() => res
                .json::<ChatResponse>()
                .await
                .map_err(|e| ImageApiError::Serde(e.to_string())),
            StatusCode::TOO_MANY_REQUESTS => Err(ImageApiError::RateLimited),
            StatusCode::PAYMENT_REQUIRED => Err(ImageApiError::PaymentRequired),
            s => {
                let status = s.as_u16();
                let body = res.text().await.unwrap_or_default();
                error!(status, body = %body, "Image gateway error");
                Err(ImageApiError::Http { status, body })
            }
        }
    }
}

#[async_trait]
impl ImageGenerationApi for GatewayImageClient {
    async fn edit_image(
        &self,
        instruction: &str,
        image_data_url: &str,
    ) -> Result<String, ImageApiError> {
        let request = ChatRequest::image_edit(&self.model, instruction, image_data_url);
        let response = self.send_request(&request).await?;

        match response.first_image() {
            Some(url) => Ok(url.to_string()),
            None => {
                debug!(
                    choices = response.choices.len(),
                    text = ?response.choices.first().and_then(|c| c.message.content.as_deref()),
                    "No image in gateway response"
                );
                Err(ImageApiError::NoImage)
            }
        }
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

fn map_reqwest_error(e: reqwest::Error) -> ImageApiError {
    if e.is_timeout() {
        ImageApiError::Timeout
    } else {
        ImageApiError::Transport(e.to_string())
    }
}
