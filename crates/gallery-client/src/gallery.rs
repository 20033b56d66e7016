//! Per-product gallery state: four angle slots, the selected image and the
//! progress of generation, published through a `watch` channel.

use std::sync::Arc;

use db::models::gallery_image::{Angle, GenerateGalleryImage};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{
    cache::{LocalGalleryCache, cache_key},
    clock::{Clock, SystemClock},
    http::{AngleImageGenerator, CanonicalImageSource, GalleryHttpClient, GalleryRecordSource},
};

pub const GENERATE_ERROR: &str = "Failed to generate";
pub const BASE_IMAGE_ERROR: &str = "Failed to load base image";

#[derive(Debug, Clone, Copy, Default)]
pub struct GalleryConfig {
    /// Start generating as soon as the probes miss
    pub auto_generate: bool,
}

#[derive(Debug, Clone)]
pub struct GalleryProduct {
    pub product_id: String,
    pub product_name: String,
    pub category: String,
    pub main_image: String,
    pub color: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryImage {
    pub angle: Angle,
    pub url: String,
    pub is_loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Probing,
    Generating,
    Done,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryView {
    pub images: Vec<GalleryImage>,
    pub selected: String,
    pub state: GenerationState,
}

impl GalleryView {
    pub fn is_generating(&self) -> bool {
        self.state == GenerationState::Generating
    }

    pub fn has_generated(&self) -> bool {
        self.state == GenerationState::Done
    }

    pub fn image(&self, angle: Angle) -> &GalleryImage {
        &self.images[angle.index()]
    }
}

/// External collaborators of a gallery.
#[derive(Clone)]
pub struct GalleryBackend {
    pub images: Arc<dyn CanonicalImageSource>,
    pub records: Arc<dyn GalleryRecordSource>,
    pub generator: Arc<dyn AngleImageGenerator>,
    pub cache: Arc<LocalGalleryCache>,
    pub clock: Arc<dyn Clock>,
}

impl GalleryBackend {
    pub fn http(client: GalleryHttpClient, cache: Arc<LocalGalleryCache>) -> Self {
        let client = Arc::new(client);
        Self {
            images: client.clone(),
            records: client.clone(),
            generator: client,
            cache,
            clock: Arc::new(SystemClock),
        }
    }
}

pub struct ProductGallery {
    product: GalleryProduct,
    config: GalleryConfig,
    backend: GalleryBackend,
    view: watch::Sender<GalleryView>,
}

impl ProductGallery {
    pub fn new(product: GalleryProduct, config: GalleryConfig, backend: GalleryBackend) -> Self {
        let images = Angle::ALL
            .into_iter()
            .map(|angle| GalleryImage {
                angle,
                url: product.main_image.clone(),
                is_loading: config.auto_generate && angle.is_generatable(),
                error: None,
            })
            .collect();
        let (view, _) = watch::channel(GalleryView {
            images,
            selected: product.main_image.clone(),
            state: GenerationState::Idle,
        });
        Self {
            product,
            config,
            backend,
            view,
        }
    }

    /// Create the gallery and run the initial probe.
    pub async fn mount(
        product: GalleryProduct,
        config: GalleryConfig,
        backend: GalleryBackend,
    ) -> Self {
        let gallery = Self::new(product, config, backend);
        gallery.load().await;
        gallery
    }

    pub fn subscribe(&self) -> watch::Receiver<GalleryView> {
        self.view.subscribe()
    }

    pub fn view(&self) -> GalleryView {
        self.view.borrow().clone()
    }

    pub fn product(&self) -> &GalleryProduct {
        &self.product
    }

    /// Initial probe. With auto generation this is a full `generate()`;
    /// otherwise only the local cache is consulted.
    pub async fn load(&self) {
        if self.config.auto_generate {
            self.generate().await;
            return;
        }
        if !self.transition(&[GenerationState::Idle], GenerationState::Probing) {
            return;
        }
        match self.cached_urls() {
            Some(urls) => self.adopt(urls),
            None => self.view.send_modify(|v| v.state = GenerationState::Idle),
        }
    }

    /// Probe the caches and, on a miss, generate the missing angles.
    /// Returns `false` when a pass is already running or has finished.
    pub async fn generate(&self) -> bool {
        if !self.transition(
            &[GenerationState::Idle, GenerationState::Failed],
            GenerationState::Probing,
        ) {
            debug!(product_id = %self.product.product_id, "Gallery busy or complete, ignoring");
            return false;
        }

        if let Some(urls) = self.cached_urls() {
            self.adopt(urls);
            return true;
        }
        if let Some(urls) = self.remote_urls().await {
            info!(product_id = %self.product.product_id, "Using stored gallery images");
            self.adopt(urls);
            return true;
        }

        self.run_generation().await;
        true
    }

    /// Point the main view at `angle`. Loading slots cannot be selected.
    pub fn select(&self, angle: Angle) -> bool {
        self.view.send_if_modified(|v| {
            let slot = &v.images[angle.index()];
            if slot.is_loading {
                return false;
            }
            v.selected = slot.url.clone();
            true
        })
    }

    fn transition(&self, from: &[GenerationState], to: GenerationState) -> bool {
        self.view.send_if_modified(|v| {
            if from.contains(&v.state) {
                v.state = to;
                true
            } else {
                false
            }
        })
    }

    fn key(&self) -> String {
        cache_key(&self.product.product_id, self.product.color.as_deref())
    }

    fn cached_urls(&self) -> Option<[String; 4]> {
        self.backend
            .cache
            .get(&self.key(), self.backend.clock.now_millis())
    }

    async fn remote_urls(&self) -> Option<[String; 4]> {
        let records = match self.backend.records.list(&self.product.product_id).await {
            Ok(records) => records,
            Err(e) => {
                warn!(product_id = %self.product.product_id, error = %e, "Gallery lookup failed");
                return None;
            }
        };

        let mut urls: [Option<String>; 4] = Default::default();
        urls[Angle::Front.index()] = Some(self.product.main_image.clone());
        for record in records {
            if record.angle.is_generatable() {
                urls[record.angle.index()] = Some(record.image_url);
            }
        }
        let [front, side, back, detail] = urls;
        Some([front?, side?, back?, detail?])
    }

    fn adopt(&self, urls: [String; 4]) {
        self.view.send_modify(|v| {
            for (slot, url) in v.images.iter_mut().zip(urls) {
                slot.url = url;
                slot.is_loading = false;
                slot.error = None;
            }
            v.state = GenerationState::Done;
        });
    }

    async fn run_generation(&self) {
        let main_image = self.product.main_image.clone();
        self.view.send_modify(|v| {
            v.state = GenerationState::Generating;
            for slot in &mut v.images {
                slot.url = main_image.clone();
                slot.is_loading = slot.angle.is_generatable();
                slot.error = None;
            }
        });

        let encoded = match self.backend.images.fetch_data_url(&main_image).await {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(product_id = %self.product.product_id, error = %e, "Could not load base image");
                self.view.send_modify(|v| {
                    for slot in v.images.iter_mut().filter(|s| s.angle.is_generatable()) {
                        slot.is_loading = false;
                        slot.error = Some(BASE_IMAGE_ERROR.to_string());
                    }
                    v.state = GenerationState::Failed;
                });
                return;
            }
        };

        let mut urls = [(); 4].map(|_| main_image.clone());
        for angle in Angle::GENERATABLE {
            let request = GenerateGalleryImage {
                product_id: Some(self.product.product_id.clone()),
                product_name: Some(self.product.product_name.clone()),
                category: Some(self.product.category.clone()),
                angle: Some(angle.to_string()),
                existing_image_url: Some(encoded.clone()),
            };

            let (url, error) = match self.backend.generator.generate(&request).await {
                Ok(response) => (response.image_url, None),
                Err(e) => {
                    warn!(
                        product_id = %self.product.product_id,
                        angle = %angle,
                        error = %e,
                        "Angle generation failed, keeping base image"
                    );
                    (main_image.clone(), Some(GENERATE_ERROR.to_string()))
                }
            };
            urls[angle.index()] = url.clone();
            self.view.send_modify(|v| {
                let slot = &mut v.images[angle.index()];
                slot.url = url;
                slot.is_loading = false;
                slot.error = error;
            });
        }

        if let Err(e) = self
            .backend
            .cache
            .put(&self.key(), &urls, self.backend.clock.now_millis())
        {
            debug!(error = %e, "Failed to cache gallery");
        }
        self.view.send_modify(|v| v.state = GenerationState::Done);
        info!(product_id = %self.product.product_id, "Gallery generation finished");
    }
}
