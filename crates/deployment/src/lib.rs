use std::sync::Arc;

use db::DBService;
use services::services::{
    batch_generator::BatchGenerator,
    gallery_generator::GalleryGenerator,
    gallery_repository::SqliteGalleryRepository,
    image_api::{GatewayImageClient, ImageApiError, ImageGenerationApi},
    rate_limiter::{RateLimitConfig, RateLimiter},
    storage::{BlobStorage, GALLERY_BUCKET, LocalBlobStorage},
};
use thiserror::Error;
use tracing::{info, warn};

pub mod config;

pub use config::{ConfigError, DeploymentConfig};

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("image gateway client: {0}")]
    ImageApi(#[from] ImageApiError),
    #[error("storage root: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything the HTTP surface needs, wired together once at startup.
#[derive(Clone)]
pub struct Deployment {
    config: Arc<DeploymentConfig>,
    db: DBService,
    storage: Arc<dyn BlobStorage>,
    generator: Arc<GalleryGenerator>,
    batch: Arc<BatchGenerator>,
}

impl Deployment {
    pub async fn new(config: DeploymentConfig) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;

        tokio::fs::create_dir_all(&config.storage_root).await?;
        let storage = Arc::new(LocalBlobStorage::new(
            &config.storage_root,
            GALLERY_BUCKET,
            config.public_base_url.clone(),
        ));

        if config.gateway_api_key.is_none() {
            warn!("AI_GATEWAY_API_KEY is not configured; image generation requests will fail");
        }
        let api = Arc::new(GatewayImageClient::new(
            config.gateway_url.clone(),
            config.gateway_api_key.clone(),
            config.image_model.clone(),
        )?);
        info!(model = %api.model(), storage_root = ?config.storage_root, "Gallery services ready");

        Ok(Self::from_parts(config, db, api, storage))
    }

    /// Assemble a deployment around caller-provided collaborators.
    pub fn from_parts(
        config: DeploymentConfig,
        db: DBService,
        api: Arc<dyn ImageGenerationApi>,
        storage: Arc<dyn BlobStorage>,
    ) -> Self {
        let repository = Arc::new(SqliteGalleryRepository::new(db.pool.clone()));
        let generator = Arc::new(GalleryGenerator::new(repository, api, storage.clone()));
        let limiter = RateLimiter::new(RateLimitConfig::every(
            config.batch_min_interval,
            config.batch_rate_limit_cooldown,
        ));
        let batch = Arc::new(BatchGenerator::new(generator.clone(), limiter));

        Self {
            config: Arc::new(config),
            db,
            storage,
            generator,
            batch,
        }
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn storage(&self) -> &Arc<dyn BlobStorage> {
        &self.storage
    }

    pub fn generator(&self) -> &Arc<GalleryGenerator> {
        &self.generator
    }

    pub fn batch(&self) -> &Arc<BatchGenerator> {
        &self.batch
    }
}
