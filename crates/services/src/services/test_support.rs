//! In-memory doubles for the gateway, the backing table and the bucket.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::Utc;
use db::models::gallery_image::{Angle, GalleryImageRecord};
use tokio::time::Instant;
use uuid::Uuid;

use super::{
    gallery_repository::GalleryRepository,
    image_api::{ImageApiError, ImageGenerationApi},
    storage::{BlobStorage, StorageError, StoredObject},
};

/// "hello" as a PNG data URL
pub const PNG_DATA_URL: &str = "data:image/png;base64,aGVsbG8=";

pub struct StubImageApi {
    script: Mutex<VecDeque<Result<String, ImageApiError>>>,
    fallback: Result<String, ImageApiError>,
    calls: Mutex<Vec<(String, Instant)>>,
    configured: bool,
}

impl StubImageApi {
    fn with(
        script: Vec<Result<String, ImageApiError>>,
        fallback: Result<String, ImageApiError>,
    ) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(Vec::new()),
            configured: true,
        }
    }

    pub fn always_ok() -> Self {
        Self::with(Vec::new(), Ok(PNG_DATA_URL.to_string()))
    }

    pub fn returning(url: &str) -> Self {
        Self::with(Vec::new(), Ok(url.to_string()))
    }

    pub fn failing_with(error: ImageApiError) -> Self {
        Self::with(Vec::new(), Err(error))
    }

    /// Gateway without credentials: every call fails with a missing key.
    pub fn unconfigured() -> Self {
        Self {
            configured: false,
            ..Self::failing_with(ImageApiError::MissingApiKey)
        }
    }

    /// Play `script` in order, then succeed.
    pub fn scripted(script: Vec<Result<String, ImageApiError>>) -> Self {
        Self::with(script, Ok(PNG_DATA_URL.to_string()))
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn instructions(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(i, _)| i.clone()).collect()
    }

    pub fn call_times(&self) -> Vec<Instant> {
        self.calls.lock().unwrap().iter().map(|(_, t)| *t).collect()
    }
}

#[async_trait]
impl ImageGenerationApi for StubImageApi {
    async fn edit_image(
        &self,
        instruction: &str,
        _image_data_url: &str,
    ) -> Result<String, ImageApiError> {
        self.calls
            .lock()
            .unwrap()
            .push((instruction.to_string(), Instant::now()));
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

#[derive(Default)]
pub struct MemoryRepository {
    rows: Mutex<BTreeMap<(String, Angle), GalleryImageRecord>>,
    fail_writes: bool,
    inserts: AtomicUsize,
}

impl MemoryRepository {
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn seed(&self, product_id: &str, angle: Angle, image_url: &str) {
        self.rows.lock().unwrap().insert(
            (product_id.to_string(), angle),
            GalleryImageRecord {
                id: Uuid::new_v4(),
                product_id: product_id.to_string(),
                angle,
                image_url: image_url.to_string(),
                created_at: Utc::now(),
            },
        );
    }

    pub fn inserts(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl GalleryRepository for MemoryRepository {
    async fn find(
        &self,
        product_id: &str,
        angle: Angle,
    ) -> Result<Option<GalleryImageRecord>, sqlx::Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .get(&(product_id.to_string(), angle))
            .cloned())
    }

    async fn list(&self, product_id: &str) -> Result<Vec<GalleryImageRecord>, sqlx::Error> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.product_id == product_id)
            .cloned()
            .collect())
    }

    async fn record(
        &self,
        product_id: &str,
        angle: Angle,
        image_url: &str,
    ) -> Result<GalleryImageRecord, sqlx::Error> {
        if self.fail_writes {
            return Err(sqlx::Error::Protocol("insert rejected".to_string()));
        }
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .entry((product_id.to_string(), angle))
            .or_insert_with(|| GalleryImageRecord {
                id: Uuid::new_v4(),
                product_id: product_id.to_string(),
                angle,
                image_url: image_url.to_string(),
                created_at: Utc::now(),
            });
        Ok(row.clone())
    }
}

#[derive(Default)]
pub struct MemoryBlobStorage {
    objects: Mutex<BTreeMap<String, StoredObject>>,
    fail: bool,
}

impl MemoryBlobStorage {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.objects.lock().unwrap().contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.lock().unwrap().is_empty()
    }
}

#[async_trait]
impl BlobStorage for MemoryBlobStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        _upsert: bool,
    ) -> Result<(), StorageError> {
        if self.fail {
            return Err(StorageError::Io(std::io::Error::other("disk full")));
        }
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        Ok(self.objects.lock().unwrap().get(key).cloned())
    }

    fn public_url(&self, key: &str) -> String {
        format!("memory://product-gallery/{key}")
    }
}
