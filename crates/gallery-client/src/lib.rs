//! Client side of the product gallery: cache probing, sequential per-angle
//! generation through the server functions, and a reactive view of the slots.

pub mod cache;
pub mod clock;
pub mod gallery;
pub mod http;

pub use cache::LocalGalleryCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use gallery::{
    GalleryBackend, GalleryConfig, GalleryImage, GalleryProduct, GalleryView, GenerationState,
    ProductGallery,
};
pub use http::{
    AngleImageGenerator, CanonicalImageSource, ClientError, GalleryHttpClient, GalleryRecordSource,
};
