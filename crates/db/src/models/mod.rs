pub mod gallery_image;
