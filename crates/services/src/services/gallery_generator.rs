//! Single-angle gallery image generation: lookup, synthesize, store, record.

use std::{str::FromStr, sync::Arc};

use db::models::gallery_image::{
    Angle, GalleryImageRecord, GalleryImageResponse, GenerateGalleryImage,
};
use thiserror::Error;
use tracing::{info, warn};

use super::{
    gallery_repository::GalleryRepository,
    image_api::{ImageApiError, ImageGenerationApi},
    prompts::edit_instruction,
    storage::{BlobStorage, StorageError, gallery_object_key},
};

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("{0}")]
    Validation(String),
    #[error("API key not configured")]
    Configuration,
    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited,
    #[error("Payment required. Please add credits.")]
    QuotaExceeded,
    #[error("image gateway error: {0}")]
    Upstream(ImageApiError),
    #[error("{0}")]
    Generation(String),
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ImageApiError> for GalleryError {
    fn from(e: ImageApiError) -> Self {
        match e {
            ImageApiError::MissingApiKey => Self::Configuration,
            ImageApiError::RateLimited => Self::RateLimited,
            ImageApiError::PaymentRequired => Self::QuotaExceeded,
            ImageApiError::NoImage => Self::Generation("No image generated".to_string()),
            other => Self::Upstream(other),
        }
    }
}

/// A validated single-angle generation request
#[derive(Debug, Clone)]
pub struct AngleImageRequest {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub angle: Angle,
    /// Canonical image as a data URL
    pub existing_image: String,
}

impl TryFrom<GenerateGalleryImage> for AngleImageRequest {
    type Error = GalleryError;

    fn try_from(body: GenerateGalleryImage) -> Result<Self, Self::Error> {
        fn present(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        let product_id = present(body.product_id);
        let product_name = present(body.product_name);
        let category = present(body.category);
        let angle = present(body.angle);
        let existing_image = present(body.existing_image_url);

        let missing: Vec<&str> = [
            ("productId", product_id.is_none()),
            ("productName", product_name.is_none()),
            ("category", category.is_none()),
            ("angle", angle.is_none()),
            ("existingImageUrl", existing_image.is_none()),
        ]
        .into_iter()
        .filter_map(|(name, absent)| absent.then_some(name))
        .collect();

        let (
            Some(product_id),
            Some(product_name),
            Some(category),
            Some(angle),
            Some(existing_image),
        ) = (product_id, product_name, category, angle, existing_image)
        else {
            return Err(GalleryError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        };

        let angle = Angle::from_str(angle.trim())
            .ok()
            .filter(|angle| angle.is_generatable())
            .ok_or_else(|| {
                GalleryError::Validation(format!(
                    "Invalid angle '{angle}': expected one of side, back, detail"
                ))
            })?;

        Ok(Self {
            product_id,
            product_name,
            category,
            angle,
            existing_image,
        })
    }
}

/// Non-fatal problem encountered while producing an image
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationWarning {
    /// The image was stored but its record could not be written
    DatabaseWrite(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub image_url: String,
    pub angle: Angle,
    pub cached: bool,
    pub warnings: Vec<GenerationWarning>,
}

impl From<&GenerationOutcome> for GalleryImageResponse {
    fn from(outcome: &GenerationOutcome) -> Self {
        Self {
            image_url: outcome.image_url.clone(),
            angle: outcome.angle,
            cached: outcome.cached.then_some(true),
        }
    }
}

/// Produces gallery images for one (product, angle) pair at a time
pub struct GalleryGenerator {
    repository: Arc<dyn GalleryRepository>,
    api: Arc<dyn ImageGenerationApi>,
    storage: Arc<dyn BlobStorage>,
}

impl GalleryGenerator {
    pub fn new(
        repository: Arc<dyn GalleryRepository>,
        api: Arc<dyn ImageGenerationApi>,
        storage: Arc<dyn BlobStorage>,
    ) -> Self {
        Self {
            repository,
            api,
            storage,
        }
    }

    pub fn repository(&self) -> &Arc<dyn GalleryRepository> {
        &self.repository
    }

    pub fn storage(&self) -> &Arc<dyn BlobStorage> {
        &self.storage
    }

    /// False when the image gateway has no credentials.
    pub fn is_configured(&self) -> bool {
        self.api.is_configured()
    }

    /// Validate the request body and generate the requested angle.
    pub async fn generate(
        &self,
        body: GenerateGalleryImage,
    ) -> Result<GenerationOutcome, GalleryError> {
        let request = AngleImageRequest::try_from(body)?;
        self.generate_angle(&request).await
    }

    pub async fn generate_angle(
        &self,
        request: &AngleImageRequest,
    ) -> Result<GenerationOutcome, GalleryError> {
        if let Some(existing) = self
            .repository
            .find(&request.product_id, request.angle)
            .await?
        {
            info!(
                product_id = %request.product_id,
                angle = %request.angle,
                "Gallery image already generated, returning stored URL"
            );
            return Ok(GenerationOutcome {
                image_url: existing.image_url,
                angle: request.angle,
                cached: true,
                warnings: Vec::new(),
            });
        }

        info!(
            product_id = %request.product_id,
            product_name = %request.product_name,
            angle = %request.angle,
            "Generating gallery image"
        );
        let image_url = self
            .synthesize(
                &request.product_id,
                &request.category,
                request.angle,
                &request.existing_image,
            )
            .await?;

        let mut warnings = Vec::new();
        if let Err(e) = self
            .repository
            .record(&request.product_id, request.angle, &image_url)
            .await
        {
            warn!(
                product_id = %request.product_id,
                angle = %request.angle,
                error = %e,
                "Stored gallery image but failed to record it"
            );
            warnings.push(GenerationWarning::DatabaseWrite(e.to_string()));
        }

        Ok(GenerationOutcome {
            image_url,
            angle: request.angle,
            cached: false,
            warnings,
        })
    }

    /// Ask the model for `angle`, upload the result and return its public URL.
    /// Nothing is recorded in the backing table.
    pub async fn synthesize(
        &self,
        product_id: &str,
        category: &str,
        angle: Angle,
        existing_image: &str,
    ) -> Result<String, GalleryError> {
        let instruction = edit_instruction(category, angle).ok_or_else(|| {
            GalleryError::Validation(format!("Angle '{angle}' is not generated"))
        })?;

        let generated = self.api.edit_image(&instruction, existing_image).await?;
        let image = utils::data_url::decode(&generated)
            .map_err(|e| GalleryError::Generation(format!("Undecodable generated image: {e}")))?;

        let key = gallery_object_key(product_id, angle);
        self.storage
            .upload(&key, image.bytes, "image/png", true)
            .await?;

        Ok(self.storage.public_url(&key))
    }

    /// All recorded images of a product
    pub async fn list(&self, product_id: &str) -> Result<Vec<GalleryImageRecord>, GalleryError> {
        Ok(self.repository.list(product_id).await?)
    }
}
