//! Blob storage for generated gallery images.

use std::{
    io::Write,
    path::{Component, Path, PathBuf},
};

use async_trait::async_trait;
use db::models::gallery_image::Angle;
use thiserror::Error;
use tracing::debug;

/// Bucket holding every generated gallery image
pub const GALLERY_BUCKET: &str = "product-gallery";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid object key: {0}")]
    InvalidKey(String),
    #[error("object already exists: {0}")]
    AlreadyExists(String),
}

/// A stored object read back from the bucket
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store `bytes` under `key`. With `upsert` an existing object is replaced,
    /// otherwise the upload fails with [`StorageError::AlreadyExists`].
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError>;

    async fn download(&self, key: &str) -> Result<Option<StoredObject>, StorageError>;

    /// Stable public URL of `key`; does not check that the object exists.
    fn public_url(&self, key: &str) -> String;
}

/// Deterministic object key of a generated image
pub fn gallery_object_key(product_id: &str, angle: Angle) -> String {
    format!("{product_id}/{angle}.png")
}

/// Bucket stored as a directory tree on the local filesystem
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    bucket: String,
    root: PathBuf,
    public_base_url: String,
}

impl LocalBlobStorage {
    /// Objects of `bucket` live under `storage_root/bucket`.
    pub fn new(
        storage_root: impl AsRef<Path>,
        bucket: impl Into<String>,
        public_base_url: impl Into<String>,
    ) -> Self {
        let bucket = bucket.into();
        Self {
            root: storage_root.as_ref().join(&bucket),
            bucket,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError> {
        let path = self.object_path(key)?;
        if !upsert && tokio::fs::try_exists(&path).await? {
            return Err(StorageError::AlreadyExists(key.to_string()));
        }
        let parent = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());
        tokio::fs::create_dir_all(&parent).await?;

        let size = bytes.len();
        let target = path;
        // Per-upload staging file beside the target; the last rename wins.
        tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut staging = tempfile::Builder::new()
                .prefix(".")
                .suffix(".upload")
                .tempfile_in(&parent)?;
            staging.write_all(&bytes)?;
            let persisted = if upsert {
                staging.persist(&target)
            } else {
                staging.persist_noclobber(&target)
            };
            persisted.map(drop).map_err(|e| e.error)
        })
        .await
        .map_err(std::io::Error::other)?
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => StorageError::AlreadyExists(key.to_string()),
            _ => StorageError::Io(e),
        })?;

        debug!(
            bucket = %self.bucket,
            key = %key,
            content_type = %content_type,
            size,
            "Stored object"
        );
        Ok(())
    }

    async fn download(&self, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let path = self.object_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(StoredObject {
                bytes,
                content_type: mime_guess::from_path(&path)
                    .first_or_octet_stream()
                    .to_string(),
            })),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.public_base_url, self.bucket, key
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage(dir: &tempfile::TempDir) -> LocalBlobStorage {
        LocalBlobStorage::new(dir.path(), GALLERY_BUCKET, "http://localhost:8787/")
    }

    #[test]
    fn object_key_is_deterministic() {
        assert_eq!(gallery_object_key("cloud-runner", Angle::Side), "cloud-runner/side.png");
    }

    #[test]
    fn public_url_points_at_bucket() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            storage(&dir).public_url("cloud-runner/back.png"),
            "http://localhost:8787/storage/v1/object/public/product-gallery/cloud-runner/back.png"
        );
    }

    #[tokio::test]
    async fn upload_overwrites_with_upsert() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        storage
            .upload("p/side.png", vec![1, 2], "image/png", true)
            .await
            .unwrap();
        storage
            .upload("p/side.png", vec![3], "image/png", true)
            .await
            .unwrap();

        let object = storage.download("p/side.png").await.unwrap().unwrap();
        assert_eq!(object.bytes, vec![3]);
        assert_eq!(object.content_type, "image/png");
    }

    #[tokio::test]
    async fn upload_without_upsert_refuses_existing_object() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        storage.upload("p/back.png", vec![1], "image/png", false).await.unwrap();
        let err = storage
            .upload("p/back.png", vec![2], "image/png", false)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_upserts_of_one_key_all_succeed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = std::sync::Arc::new(storage(&dir));

        for round in 0..20u8 {
            let key = format!("p{round}/side.png");
            let uploads: Vec<_> = (0..4u8)
                .map(|writer| {
                    let storage = storage.clone();
                    let key = key.clone();
                    tokio::spawn(async move {
                        storage
                            .upload(&key, vec![writer; 256 * 1024], "image/png", true)
                            .await
                    })
                })
                .collect();
            for upload in uploads {
                upload.await.unwrap().unwrap();
            }

            let object = storage.download(&key).await.unwrap().unwrap();
            assert_eq!(object.bytes.len(), 256 * 1024);
            assert!(object.bytes.iter().all(|b| *b == object.bytes[0]));

            let product_dir = dir.path().join(GALLERY_BUCKET).join(format!("p{round}"));
            let leftovers: Vec<_> = std::fs::read_dir(product_dir)
                .unwrap()
                .map(|entry| entry.unwrap().file_name())
                .collect();
            assert_eq!(leftovers, vec![std::ffi::OsString::from("side.png")]);
        }
    }

    #[tokio::test]
    async fn rejects_keys_escaping_the_bucket() {
        let dir = tempfile::tempdir().unwrap();
        let storage = storage(&dir);
        for key in ["../etc/passwd", "/abs.png", "", "a/../../b.png"] {
            let err = storage.upload(key, vec![1], "image/png", true).await.unwrap_err();
            assert!(matches!(err, StorageError::InvalidKey(_)), "{key}");
        }
        assert!(storage.download("missing/side.png").await.unwrap().is_none());
    }
}
