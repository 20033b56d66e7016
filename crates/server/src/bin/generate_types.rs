//! Writes TypeScript declarations of the gallery wire types for the storefront.

use std::path::PathBuf;

use anyhow::Context;
use db::models::gallery_image::{
    Angle, BatchGenerateGallery, BatchGenerateResponse, BatchItemResult, BatchItemStatus,
    ErrorResponse, GalleryImageRecord, GalleryImageResponse, GenerateGalleryImage,
};
use ts_rs::TS;

fn generate_types_content() -> String {
    let decls = [
        Angle::decl(),
        GalleryImageRecord::decl(),
        GenerateGalleryImage::decl(),
        GalleryImageResponse::decl(),
        BatchGenerateGallery::decl(),
        BatchItemStatus::decl(),
        BatchItemResult::decl(),
        BatchGenerateResponse::decl(),
        ErrorResponse::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|decl| format!("export {decl}"))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("// This file was generated by `generate_types`. Do not edit.\n\n{body}\n")
}

fn main() -> anyhow::Result<()> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("shared/gallery-types.ts"));

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(&path, generate_types_content())
        .with_context(|| format!("failed to write {}", path.display()))?;

    println!("Wrote {}", path.display());
    Ok(())
}
