//! Grid compositor
//!
//! Combines 9 tile images into a single `(3t)×(3t)` RGBA raster.
//!
//! Image at linear index `i` lands at row `i / 3`, column `i % 3`, i.e. at
//! `(col × t, row × t)`, resized exactly to `t×t` (stretched, never
//! letterboxed). All 9 loads run concurrently; painting happens once on the
//! blocking pool after every load has succeeded.

use crate::error::{CatalogError, CatalogResult};
use crate::models::{ComposedCatalog, CATALOG_SIZE, GRID_COLUMNS};
use crate::services::image_source::ImageSource;
use futures::future::try_join_all;
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use pcat_common::config::MAX_TILE_SIZE;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Resampling filter for tiles (deterministic, reasonably fast)
const TILE_FILTER: FilterType = FilterType::Triangle;

/// Paints catalog tiles into a 3×3 grid
pub struct GridCompositor {
    source: Arc<dyn ImageSource>,
}

impl GridCompositor {
    pub fn new(source: Arc<dyn ImageSource>) -> Self {
        Self { source }
    }

    /// Load all 9 images and compose them at `tile_size`
    ///
    /// Fails with `InvalidCatalogSize` before any load when `urls` does not
    /// hold exactly 9 entries, and with `ImageDecode` when any single load
    /// fails. No partially painted raster is ever returned.
    #[instrument(skip(self, urls), fields(urls = urls.len()))]
    pub async fn compose_catalog(
        &self,
        urls: &[String],
        tile_size: u32,
    ) -> CatalogResult<ComposedCatalog> {
        if urls.len() != CATALOG_SIZE {
            return Err(CatalogError::InvalidCatalogSize {
                expected: CATALOG_SIZE,
                actual: urls.len(),
            });
        }
        let side = canvas_side(tile_size)?;

        let images = try_join_all(urls.iter().enumerate().map(|(index, url)| {
            let source = Arc::clone(&self.source);
            async move {
                match source.load(url).await {
                    Ok(image) => {
                        debug!(index, width = image.width(), height = image.height(), "Tile loaded");
                        Ok(image)
                    }
                    Err(e) => {
                        warn!(index, url = %url, error = %e, "Tile failed to load");
                        Err(CatalogError::ImageDecode {
                            index,
                            url: url.clone(),
                            source: e,
                        })
                    }
                }
            }
        }))
        .await?;

        let (canvas, png) = tokio::task::spawn_blocking(move || {
            let canvas = paint_grid(&images, tile_size, side);
            encode_png(&canvas).map(|png| (canvas, png))
        })
        .await
        .map_err(|e| CatalogError::Internal(format!("composition task failed: {}", e)))??;

        info!(
            width = canvas.width(),
            height = canvas.height(),
            png_bytes = png.len(),
            "Catalog composed"
        );

        Ok(ComposedCatalog::new(tile_size, canvas, png))
    }
}

/// Edge length of the composed canvas, rejecting zero, overflowing and
/// oversized tiles before anything is allocated
pub fn canvas_side(tile_size: u32) -> CatalogResult<u32> {
    if tile_size == 0 || tile_size > MAX_TILE_SIZE {
        return Err(CatalogError::InvalidTileSize(tile_size));
    }
    tile_size
        .checked_mul(GRID_COLUMNS as u32)
        .ok_or(CatalogError::InvalidTileSize(tile_size))
}

/// Top-left destination pixel of the tile at linear `index`
///
/// `tile_size` must already have passed [`canvas_side`].
pub fn tile_origin(index: usize, tile_size: u32) -> (u32, u32) {
    let row = (index / GRID_COLUMNS) as u32;
    let col = (index % GRID_COLUMNS) as u32;
    (col * tile_size, row * tile_size)
}

/// Allocate the canvas once and copy every resized tile into its cell
fn paint_grid(images: &[DynamicImage], tile_size: u32, side: u32) -> RgbaImage {
    let mut canvas = RgbaImage::new(side, side);

    for (index, image) in images.iter().enumerate() {
        let tile = image.resize_exact(tile_size, tile_size, TILE_FILTER).to_rgba8();
        let (x, y) = tile_origin(index, tile_size);
        imageops::replace(&mut canvas, &tile, i64::from(x), i64::from(y));
    }

    canvas
}

/// Lossless PNG encoding of the canvas
fn encode_png(canvas: &RgbaImage) -> CatalogResult<Vec<u8>> {
    let mut buffer = Vec::new();
    canvas
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| CatalogError::ExportEncoding {
            format: crate::models::ExportFormat::Png,
            message: e.to_string(),
        })?;
    Ok(buffer)
}
