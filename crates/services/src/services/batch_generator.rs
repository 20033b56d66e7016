//! Batch generation of gallery images for the whole catalog.

use std::sync::Arc;

use db::models::gallery_image::{
    Angle, BatchGenerateGallery, BatchGenerateResponse, BatchItemStatus,
};
use tracing::{debug, error, info, warn};

use super::{
    catalog::{BATCH_CATALOG, CatalogProduct},
    gallery_generator::{GalleryError, GalleryGenerator},
    rate_limiter::RateLimiter,
};

/// Walks every catalog product and generatable angle strictly in sequence.
pub struct BatchGenerator {
    generator: Arc<GalleryGenerator>,
    limiter: RateLimiter,
    catalog: Vec<CatalogProduct>,
}

impl BatchGenerator {
    pub fn new(generator: Arc<GalleryGenerator>, limiter: RateLimiter) -> Self {
        Self::with_catalog(generator, limiter, BATCH_CATALOG.to_vec())
    }

    pub fn with_catalog(
        generator: Arc<GalleryGenerator>,
        limiter: RateLimiter,
        catalog: Vec<CatalogProduct>,
    ) -> Self {
        Self {
            generator,
            limiter,
            catalog,
        }
    }

    pub fn catalog(&self) -> &[CatalogProduct] {
        &self.catalog
    }

    /// Run the batch to completion. Individual failures are tallied; only a
    /// missing gateway key fails the whole run, before any item is touched.
    pub async fn run(
        &self,
        request: &BatchGenerateGallery,
    ) -> Result<BatchGenerateResponse, GalleryError> {
        if !self.generator.is_configured() {
            error!("Image gateway key is not configured, refusing batch");
            return Err(GalleryError::Configuration);
        }

        let mut response = BatchGenerateResponse {
            success: true,
            ..Default::default()
        };

        for product in &self.catalog {
            let Some(existing_image) = request
                .existing_image_urls
                .get(product.id)
                .filter(|url| !url.trim().is_empty())
            else {
                debug!(product_id = %product.id, "No canonical image supplied, skipping product");
                continue;
            };

            for angle in Angle::GENERATABLE {
                let status = self.process(product, angle, existing_image).await;
                response.record(product.id, angle, status);
            }
        }

        info!(
            generated = response.generated,
            skipped = response.skipped,
            failed = response.failed,
            "Batch gallery generation complete"
        );
        Ok(response)
    }

    async fn process(
        &self,
        product: &CatalogProduct,
        angle: Angle,
        existing_image: &str,
    ) -> BatchItemStatus {
        let repository = self.generator.repository();

        match repository.find(product.id, angle).await {
            Ok(Some(_)) => {
                debug!(product_id = %product.id, angle = %angle, "Already generated, skipping");
                return BatchItemStatus::Skipped;
            }
            Ok(None) => {}
            Err(e) => {
                error!(product_id = %product.id, angle = %angle, error = %e, "Lookup failed");
                return BatchItemStatus::Failed;
            }
        }

        self.limiter.acquire().await;
        info!(product_id = %product.id, product_name = %product.name, angle = %angle, "Generating");

        let image_url = match self
            .generator
            .synthesize(product.id, product.category, angle, existing_image)
            .await
        {
            Ok(url) => url,
            Err(GalleryError::RateLimited) => {
                warn!(
                    product_id = %product.id,
                    angle = %angle,
                    cooldown_secs = self.limiter.config().cooldown.as_secs(),
                    "Rate limited, cooling down"
                );
                self.limiter.penalize().await;
                return BatchItemStatus::Failed;
            }
            Err(e) => {
                error!(product_id = %product.id, angle = %angle, error = %e, "Generation failed");
                return BatchItemStatus::Failed;
            }
        };

        match repository.record(product.id, angle, &image_url).await {
            Ok(_) => {
                info!(product_id = %product.id, angle = %angle, "Generated and stored");
                BatchItemStatus::Generated
            }
            Err(e) => {
                error!(product_id = %product.id, angle = %angle, error = %e, "Failed to record image");
                BatchItemStatus::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, time::Duration};

    use super::*;
    use crate::services::{
        image_api::ImageApiError,
        rate_limiter::RateLimitConfig,
        test_support::{MemoryBlobStorage, MemoryRepository, PNG_DATA_URL, StubImageApi},
    };

    fn catalog() -> Vec<CatalogProduct> {
        vec![
            CatalogProduct::new("velocity-pro", "Velocity Pro", "Shoes"),
            CatalogProduct::new("cloud-runner", "Cloud Runner", "Shoes"),
        ]
    }

    fn request(ids: &[&str]) -> BatchGenerateGallery {
        BatchGenerateGallery {
            existing_image_urls: ids
                .iter()
                .map(|id| (id.to_string(), PNG_DATA_URL.to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    fn batch(
        api: Arc<StubImageApi>,
        repository: Arc<MemoryRepository>,
        storage: Arc<MemoryBlobStorage>,
    ) -> BatchGenerator {
        let generator = Arc::new(GalleryGenerator::new(repository, api, storage));
        BatchGenerator::with_catalog(generator, RateLimiter::default(), catalog())
    }

    #[tokio::test(start_paused = true)]
    async fn counts_skipped_and_generated() {
        let api = Arc::new(StubImageApi::always_ok());
        let repository = Arc::new(MemoryRepository::default());
        repository.seed("velocity-pro", Angle::Side, "u1");
        repository.seed("cloud-runner", Angle::Detail, "u2");
        let storage = Arc::new(MemoryBlobStorage::default());

        let response = batch(api.clone(), repository.clone(), storage.clone())
            .run(&request(&["velocity-pro", "cloud-runner"]))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.skipped, 2);
        assert_eq!(response.generated + response.failed, 3 * 2 - 2);
        assert_eq!(response.generated, 4);
        assert_eq!(response.results.len(), 6);
        assert_eq!(api.calls(), 4);
        assert_eq!(repository.len(), 6);
        assert!(storage.contains("cloud-runner/side.png"));
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_the_batch() {
        let api = Arc::new(StubImageApi::scripted(vec![
            Err(ImageApiError::NoImage),
            Err(ImageApiError::Http {
                status: 500,
                body: "boom".into(),
            }),
        ]));
        let repository = Arc::new(MemoryRepository::default());
        let storage = Arc::new(MemoryBlobStorage::default());

        let response = batch(api.clone(), repository, storage)
            .run(&request(&["velocity-pro", "cloud-runner"]))
            .await
            .unwrap();

        assert_eq!(response.failed, 2);
        assert_eq!(response.generated, 4);
        assert_eq!(response.skipped, 0);
        assert_eq!(response.results[0].status, BatchItemStatus::Failed);
        assert_eq!(response.results[1].status, BatchItemStatus::Failed);
        assert_eq!(response.results[2].status, BatchItemStatus::Generated);
    }

    #[tokio::test(start_paused = true)]
    async fn record_failures_count_as_failed() {
        let api = Arc::new(StubImageApi::always_ok());
        let repository = Arc::new(MemoryRepository::failing_writes());
        let storage = Arc::new(MemoryBlobStorage::default());

        let response = batch(api, repository, storage)
            .run(&request(&["cloud-runner"]))
            .await
            .unwrap();

        assert_eq!(response.failed, 3);
        assert_eq!(response.generated, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn products_without_images_are_not_counted() {
        let api = Arc::new(StubImageApi::always_ok());
        let response = batch(
            api.clone(),
            Arc::new(MemoryRepository::default()),
            Arc::new(MemoryBlobStorage::default()),
        )
        .run(&request(&["cloud-runner", "not-in-catalog"]))
        .await
        .unwrap();

        assert_eq!(response.results.len(), 3);
        assert!(response.results.iter().all(|r| r.product_id == "cloud-runner"));
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn calls_are_paced_and_rate_limit_cools_down() {
        let api = Arc::new(StubImageApi::scripted(vec![
            Ok(PNG_DATA_URL.to_string()),
            Err(ImageApiError::RateLimited),
        ]));
        let generator = Arc::new(GalleryGenerator::new(
            Arc::new(MemoryRepository::default()),
            api.clone(),
            Arc::new(MemoryBlobStorage::default()),
        ));
        let limiter = RateLimiter::new(RateLimitConfig::every(
            Duration::from_secs(1),
            Duration::from_secs(10),
        ));
        let batch = BatchGenerator::with_catalog(generator, limiter, catalog());

        let response = batch.run(&request(&["velocity-pro"])).await.unwrap();

        assert_eq!(response.generated, 2);
        assert_eq!(response.failed, 1);
        let times = api.call_times();
        assert_eq!(times.len(), 3);
        assert!(times[1] - times[0] >= Duration::from_secs(1));
        assert!(times[2] - times[1] >= Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_images_are_skipped_without_calls() {
        let api = Arc::new(StubImageApi::always_ok());
        let mut body = request(&["cloud-runner"]);
        body.existing_image_urls
            .insert("velocity-pro".to_string(), "  ".to_string());

        let response = batch(
            api.clone(),
            Arc::new(MemoryRepository::default()),
            Arc::new(MemoryBlobStorage::default()),
        )
        .run(&body)
        .await
        .unwrap();

        assert_eq!(response.results.len(), 3);
        assert!(response.results.iter().all(|r| r.product_id == "cloud-runner"));
        assert_eq!(api.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_gateway_key_fails_before_any_item() {
        let api = Arc::new(StubImageApi::unconfigured());
        let repository = Arc::new(MemoryRepository::default());
        let storage = Arc::new(MemoryBlobStorage::default());
        let start = tokio::time::Instant::now();

        let err = batch(api.clone(), repository.clone(), storage.clone())
            .run(&request(&["velocity-pro", "cloud-runner"]))
            .await
            .unwrap_err();

        assert!(matches!(err, GalleryError::Configuration));
        assert_eq!(api.calls(), 0);
        assert_eq!(repository.len(), 0);
        assert!(storage.is_empty());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
