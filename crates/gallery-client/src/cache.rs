//! File-backed JSON cache of finished galleries, keyed per product and color.

use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Entries older than this are discarded on read.
pub const CACHE_TTL_MILLIS: i64 = 24 * 60 * 60 * 1000;
pub const DEFAULT_COLOR: &str = "black";

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache encoding: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct CachedGallery {
    images: Vec<String>,
    timestamp: i64,
}

pub fn cache_key(product_id: &str, color: Option<&str>) -> String {
    format!(
        "product_gallery_{product_id}_{}",
        color.unwrap_or(DEFAULT_COLOR)
    )
}

pub struct LocalGalleryCache {
    path: Option<PathBuf>,
    payload: Mutex<Option<Map<String, Value>>>,
}

impl LocalGalleryCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            payload: Mutex::new(None),
        }
    }

    /// Cache that lives only as long as the process.
    pub fn ephemeral() -> Self {
        Self {
            path: None,
            payload: Mutex::new(None),
        }
    }

    /// Four URLs in angle order, if a fresh entry exists. Stale or
    /// malformed entries are removed.
    pub fn get(&self, key: &str, now_millis: i64) -> Option<[String; 4]> {
        let mut guard = self.payload.lock().unwrap_or_else(|e| e.into_inner());
        let payload = self.ensure_loaded(&mut guard);
        let raw = payload.get(key)?.clone();

        let fresh = serde_json::from_value::<CachedGallery>(raw)
            .ok()
            .filter(|entry| now_millis - entry.timestamp < CACHE_TTL_MILLIS)
            .and_then(|entry| <[String; 4]>::try_from(entry.images).ok());

        if fresh.is_none() {
            debug!(key, "Dropping stale gallery cache entry");
            payload.remove(key);
            if let Err(e) = self.persist(payload) {
                debug!(key, error = %e, "Failed to persist cache eviction");
            }
        }
        fresh
    }

    pub fn put(&self, key: &str, images: &[String; 4], now_millis: i64) -> Result<(), CacheError> {
        let entry = serde_json::to_value(CachedGallery {
            images: images.to_vec(),
            timestamp: now_millis,
        })?;
        let mut guard = self.payload.lock().unwrap_or_else(|e| e.into_inner());
        let payload = self.ensure_loaded(&mut guard);
        payload.insert(key.to_string(), entry);
        self.persist(payload)
    }

    fn ensure_loaded<'a>(
        &self,
        slot: &'a mut Option<Map<String, Value>>,
    ) -> &'a mut Map<String, Value> {
        slot.get_or_insert_with(|| {
            self.path
                .as_deref()
                .and_then(read_json_object)
                .unwrap_or_default()
        })
    }

    fn persist(&self, payload: &Map<String, Value>) -> Result<(), CacheError> {
        match &self.path {
            Some(path) => write_json_object(path, payload),
            None => Ok(()),
        }
    }
}

fn read_json_object(path: &Path) -> Option<Map<String, Value>> {
    let raw = std::fs::read_to_string(path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    parsed.as_object().cloned()
}

fn write_json_object(path: &Path, payload: &Map<String, Value>) -> Result<(), CacheError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(
        path,
        serde_json::to_string_pretty(&Value::Object(payload.clone()))?,
    )?;
    Ok(())
}
