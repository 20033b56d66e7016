//! Access to the `product_gallery_images` backing table.

use async_trait::async_trait;
use db::models::gallery_image::{Angle, GalleryImageRecord};
use sqlx::SqlitePool;

#[async_trait]
pub trait GalleryRepository: Send + Sync {
    async fn find(
        &self,
        product_id: &str,
        angle: Angle,
    ) -> Result<Option<GalleryImageRecord>, sqlx::Error>;

    async fn list(&self, product_id: &str) -> Result<Vec<GalleryImageRecord>, sqlx::Error>;

    /// Insert the pair unless it is already recorded; returns the stored row.
    async fn record(
        &self,
        product_id: &str,
        angle: Angle,
        image_url: &str,
    ) -> Result<GalleryImageRecord, sqlx::Error>;
}

#[derive(Clone)]
pub struct SqliteGalleryRepository {
    pool: SqlitePool,
}

impl SqliteGalleryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GalleryRepository for SqliteGalleryRepository {
    async fn find(
        &self,
        product_id: &str,
        angle: Angle,
    ) -> Result<Option<GalleryImageRecord>, sqlx::Error> {
        GalleryImageRecord::find_by_product_and_angle(&self.pool, product_id, angle).await
    }

    async fn list(&self, product_id: &str) -> Result<Vec<GalleryImageRecord>, sqlx::Error> {
        GalleryImageRecord::find_by_product(&self.pool, product_id).await
    }

    async fn record(
        &self,
        product_id: &str,
        angle: Angle,
        image_url: &str,
    ) -> Result<GalleryImageRecord, sqlx::Error> {
        GalleryImageRecord::create(&self.pool, product_id, angle, image_url).await
    }
}
