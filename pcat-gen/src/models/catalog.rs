//! Catalog artifacts
//!
//! [`CatalogUrlSet`] is the ordered 9-URL aggregate produced by the
//! orchestrator, [`ComposedCatalog`] the 3×3 raster built from it and
//! [`ExportedArtifact`] a named byte payload derived from the raster.

use crate::error::{CatalogError, CatalogResult};
use crate::models::scene::{CATALOG_SIZE, GRID_COLUMNS};
use image::RgbaImage;
use serde::{Deserialize, Serialize};

/// Ordered set of exactly 9 tile URLs
///
/// Slot `3 * scene + placement` holds the result for that scene/placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogUrlSet {
    urls: Vec<String>,
}

impl CatalogUrlSet {
    /// Create a URL set, rejecting anything other than exactly 9 URLs
    pub fn new(urls: Vec<String>) -> CatalogResult<Self> {
        if urls.len() != CATALOG_SIZE {
            return Err(CatalogError::InvalidCatalogSize {
                expected: CATALOG_SIZE,
                actual: urls.len(),
            });
        }
        Ok(Self { urls })
    }

    /// URL for a scene (row) and placement (column)
    pub fn slot(&self, scene_index: usize, placement_index: usize) -> Option<&str> {
        if placement_index >= GRID_COLUMNS {
            return None;
        }
        self.urls
            .get(scene_index * GRID_COLUMNS + placement_index)
            .map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.urls
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn into_vec(self) -> Vec<String> {
        self.urls
    }
}

/// Composed 3×3 catalog raster
///
/// Only the grid compositor constructs this, after every tile has been
/// painted. Immutable afterwards.
#[derive(Debug, Clone)]
pub struct ComposedCatalog {
    tile_size: u32,
    image: RgbaImage,
    png: Vec<u8>,
}

impl ComposedCatalog {
    pub(crate) fn new(tile_size: u32, image: RgbaImage, png: Vec<u8>) -> Self {
        Self {
            tile_size,
            image,
            png,
        }
    }

    /// Raster width in pixels (`3 × tile_size`)
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Raster height in pixels (`3 × tile_size`)
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Decoded RGBA pixels
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Lossless PNG encoding of the raster
    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }
}

/// Export encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Raster image (PNG)
    Png,
    /// Single-page document (PDF)
    Pdf,
}

impl ExportFormat {
    /// Download file name for this encoding
    pub fn file_name(self) -> &'static str {
        match self {
            ExportFormat::Png => "product-catalog-3x3.png",
            ExportFormat::Pdf => "product-catalog-3x3.pdf",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Pdf => "application/pdf",
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportFormat::Png => write!(f, "PNG"),
            ExportFormat::Pdf => write!(f, "PDF"),
        }
    }
}

/// Encoded catalog ready to be written or downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedArtifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ExportedArtifact {
    pub fn new(format: ExportFormat, bytes: Vec<u8>) -> Self {
        Self {
            format,
            file_name: format.file_name().to_string(),
            bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("https://cdn.example/{}.png", i)).collect()
    }

    #[test]
    fn test_url_set_requires_nine() {
        for n in [0, 8, 10] {
            match CatalogUrlSet::new(urls(n)) {
                Err(CatalogError::InvalidCatalogSize { expected, actual }) => {
                    assert_eq!(expected, 9);
                    assert_eq!(actual, n);
                }
                other => panic!("expected size error for {}, got {:?}", n, other),
            }
        }
        assert_eq!(CatalogUrlSet::new(urls(9)).unwrap().len(), 9);
    }

    #[test]
    fn test_slot_mapping() {
        let set = CatalogUrlSet::new(urls(9)).unwrap();
        assert_eq!(set.slot(0, 0), Some("https://cdn.example/0.png"));
        assert_eq!(set.slot(1, 2), Some("https://cdn.example/5.png"));
        assert_eq!(set.slot(2, 1), Some("https://cdn.example/7.png"));
        assert_eq!(set.slot(3, 0), None);
        assert_eq!(set.slot(0, 3), None);
    }

    #[test]
    fn test_artifact_file_names() {
        let png = ExportedArtifact::new(ExportFormat::Png, vec![1, 2, 3]);
        assert_eq!(png.file_name, "product-catalog-3x3.png");
        let pdf = ExportedArtifact::new(ExportFormat::Pdf, Vec::new());
        assert_eq!(pdf.file_name, "product-catalog-3x3.pdf");
        assert_eq!(ExportFormat::Pdf.mime_type(), "application/pdf");
    }
}
