use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use uuid::Uuid;

/// Photographic viewpoint of a product image.
#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, TS,
    EnumString, Display,
)]
#[sqlx(type_name = "angle", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Angle {
    Front,
    Side,
    Back,
    Detail,
}

impl Angle {
    /// Gallery order: canonical front image first.
    pub const ALL: [Angle; 4] = [Angle::Front, Angle::Side, Angle::Back, Angle::Detail];

    /// Angles that are synthesized; front is always the canonical image.
    pub const GENERATABLE: [Angle; 3] = [Angle::Side, Angle::Back, Angle::Detail];

    pub fn is_generatable(self) -> bool {
        self != Angle::Front
    }

    /// Position of this angle in [`Angle::ALL`].
    pub fn index(self) -> usize {
        match self {
            Angle::Front => 0,
            Angle::Side => 1,
            Angle::Back => 2,
            Angle::Detail => 3,
        }
    }
}

/// One generated image recorded for a (product, angle) pair
#[derive(Debug, Clone, FromRow, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImageRecord {
    pub id: Uuid,
    pub product_id: String,
    pub angle: Angle,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

/// Request body of the single-angle generator function.
///
/// Every field is optional on the wire so that absent fields surface as a
/// validation error rather than a deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GenerateGalleryImage {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub category: Option<String>,
    pub angle: Option<String>,
    /// Canonical product image as a data URL
    pub existing_image_url: Option<String>,
}

/// Successful response of the single-angle generator function
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct GalleryImageResponse {
    pub image_url: String,
    pub angle: Angle,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub cached: Option<bool>,
}

/// Request body of the batch generator function
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BatchGenerateGallery {
    /// Canonical image data URL per product id
    pub existing_image_urls: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BatchItemStatus {
    Generated,
    Skipped,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    pub product_id: String,
    pub angle: Angle,
    pub status: BatchItemStatus,
}

/// Response of the batch generator function
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct BatchGenerateResponse {
    pub success: bool,
    pub generated: u32,
    pub skipped: u32,
    pub failed: u32,
    pub results: Vec<BatchItemResult>,
}

impl BatchGenerateResponse {
    pub fn record(&mut self, product_id: &str, angle: Angle, status: BatchItemStatus) {
        match status {
            BatchItemStatus::Generated => self.generated += 1,
            BatchItemStatus::Skipped => self.skipped += 1,
            BatchItemStatus::Failed => self.failed += 1,
        }
        self.results.push(BatchItemResult {
            product_id: product_id.to_string(),
            angle,
            status,
        });
    }
}

/// Error body shared by every function endpoint
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct ErrorResponse {
    pub error: String,
}

impl GalleryImageRecord {
    pub async fn find_by_product_and_angle(
        pool: &SqlitePool,
        product_id: &str,
        angle: Angle,
    ) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, GalleryImageRecord>(
            r#"SELECT id, product_id, angle, image_url, created_at
               FROM product_gallery_images
               WHERE product_id = $1 AND angle = $2"#,
        )
        .bind(product_id)
        .bind(angle)
        .fetch_optional(pool)
        .await
    }

    pub async fn find_by_product(
        pool: &SqlitePool,
        product_id: &str,
    ) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, GalleryImageRecord>(
            r#"SELECT id, product_id, angle, image_url, created_at
               FROM product_gallery_images
               WHERE product_id = $1
               ORDER BY created_at ASC"#,
        )
        .bind(product_id)
        .fetch_all(pool)
        .await
    }

    /// Record an image for the pair. An existing record wins: the insert is
    /// ignored on conflict and the stored row is returned.
    pub async fn create(
        pool: &SqlitePool,
        product_id: &str,
        angle: Angle,
        image_url: &str,
    ) -> Result<Self, sqlx::Error> {
        let result = sqlx::query(
            r#"INSERT INTO product_gallery_images (id, product_id, angle, image_url, created_at)
               VALUES ($1, $2, $3, $4, $5)
               ON CONFLICT(product_id, angle) DO NOTHING"#,
        )
        .bind(Uuid::new_v4())
        .bind(product_id)
        .bind(angle)
        .bind(image_url)
        .bind(Utc::now())
        .execute(pool)
        .await?;

        if result.rows_affected() == 0 {
            tracing::debug!(
                product_id = %product_id,
                angle = %angle,
                "Gallery image already recorded, keeping existing row"
            );
        }

        Self::find_by_product_and_angle(pool, product_id, angle)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }
}
