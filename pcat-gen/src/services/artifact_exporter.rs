//! Artifact exporter
//!
//! Turns a [`ComposedCatalog`] into its two download encodings: the PNG raster
//! and a single-page PDF whose page is exactly the raster's pixel size.
//!
//! The PDF is built directly with `lopdf`: one page, one image XObject
//! (zlib-compressed DeviceRGB, plus a DeviceGray soft mask when the raster
//! carries transparency) painted full-bleed. No Info dictionary is written,
//! so the bytes depend only on the pixels.

use crate::error::{CatalogError, CatalogResult};
use crate::models::{ComposedCatalog, ExportFormat, ExportedArtifact};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbaImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::Write;
use tracing::{debug, info};

const PDF_VERSION: &str = "1.5";

/// Resource name of the embedded raster
const IMAGE_RESOURCE: &str = "Im0";

/// Encodes composed catalogs for download
#[derive(Debug, Clone, Default)]
pub struct ArtifactExporter;

impl ArtifactExporter {
    pub fn new() -> Self {
        Self
    }

    /// PNG encoding of the catalog
    pub fn to_raster_bytes(&self, catalog: &ComposedCatalog) -> Vec<u8> {
        catalog.png_bytes().to_vec()
    }

    /// Single-page PDF embedding the catalog at one unit per pixel
    pub fn to_document_bytes(&self, catalog: &ComposedCatalog) -> CatalogResult<Vec<u8>> {
        build_pdf(catalog.image()).map_err(|message| CatalogError::ExportEncoding {
            format: ExportFormat::Pdf,
            message,
        })
    }

    /// Encode the catalog in one format
    pub fn export(
        &self,
        catalog: &ComposedCatalog,
        format: ExportFormat,
    ) -> CatalogResult<ExportedArtifact> {
        let bytes = match format {
            ExportFormat::Png => self.to_raster_bytes(catalog),
            ExportFormat::Pdf => self.to_document_bytes(catalog)?,
        };
        debug!(%format, bytes = bytes.len(), "Artifact encoded");
        Ok(ExportedArtifact::new(format, bytes))
    }

    /// Both encodings, PNG first; document encoding runs on the blocking pool
    pub async fn export_all(
        &self,
        catalog: &ComposedCatalog,
    ) -> CatalogResult<(ExportedArtifact, ExportedArtifact)> {
        let raster = self.export(catalog, ExportFormat::Png)?;

        let exporter = self.clone();
        let owned = catalog.clone();
        let document = tokio::task::spawn_blocking(move || exporter.export(&owned, ExportFormat::Pdf))
            .await
            .map_err(|e| CatalogError::Internal(format!("export task failed: {}", e)))??;

        info!(
            png_bytes = raster.bytes.len(),
            pdf_bytes = document.bytes.len(),
            "Catalog exported"
        );
        Ok((raster, document))
    }
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).map_err(|e| e.to_string())?;
    encoder.finish().map_err(|e| e.to_string())
}

fn image_stream(
    width: i64,
    height: i64,
    color_space: &str,
    samples: &[u8],
) -> Result<Stream, String> {
    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => width,
        "Height" => height,
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8_i64,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, deflate(samples)?))
}

fn build_pdf(image: &RgbaImage) -> Result<Vec<u8>, String> {
    let width = i64::from(image.width());
    let height = i64::from(image.height());

    let pixel_count = (image.width() as usize) * (image.height() as usize);
    let mut rgb = Vec::with_capacity(pixel_count * 3);
    let mut alpha = Vec::with_capacity(pixel_count);
    for pixel in image.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel.0[3]);
    }
    let translucent = alpha.iter().any(|&a| a < u8::MAX);

    let mut doc = Document::with_version(PDF_VERSION);
    let pages_id = doc.new_object_id();

    let mut raster = image_stream(width, height, "DeviceRGB", &rgb)?;
    if translucent {
        let mask_id = doc.add_object(image_stream(width, height, "DeviceGray", &alpha)?);
        raster.dict.set("SMask", mask_id);
    }
    let image_id = doc.add_object(raster);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        content.encode().map_err(|e| e.to_string())?,
    ));

    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ],
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_RESOURCE => image_id,
            },
        },
        "Contents" => content_id,
    });

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => 1_i64,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).map_err(|e| e.to_string())?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;

    fn catalog(tile_size: u32, pixel: Rgba<u8>) -> ComposedCatalog {
        let side = tile_size * 3;
        let image = RgbaImage::from_pixel(side, side, pixel);
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();
        ComposedCatalog::new(tile_size, image, png)
    }

    fn media_box(bytes: &[u8]) -> Vec<i64> {
        let doc = Document::load_mem(bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();
        let page = doc.get_object(page_id).unwrap().as_dict().unwrap();
        page.get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_i64().unwrap())
            .collect()
    }

    #[test]
    fn test_document_page_matches_pixels() {
        let catalog = catalog(7, Rgba([10, 20, 30, 255]));
        let bytes = ArtifactExporter::new().to_document_bytes(&catalog).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert_eq!(media_box(&bytes), vec![0, 0, 21, 21]);
    }

    #[test]
    fn test_document_is_deterministic() {
        let catalog = catalog(4, Rgba([200, 100, 50, 255]));
        let exporter = ArtifactExporter::new();
        assert_eq!(
            exporter.to_document_bytes(&catalog).unwrap(),
            exporter.to_document_bytes(&catalog).unwrap()
        );
    }

    #[test]
    fn test_soft_mask_only_when_translucent() {
        let exporter = ArtifactExporter::new();

        let opaque = exporter
            .to_document_bytes(&catalog(2, Rgba([1, 2, 3, 255])))
            .unwrap();
        let translucent = exporter
            .to_document_bytes(&catalog(2, Rgba([1, 2, 3, 128])))
            .unwrap();

        let has_smask = |bytes: &[u8]| {
            let doc = Document::load_mem(bytes).unwrap();
            doc.objects.values().any(|object| match object {
                Object::Stream(stream) => stream.dict.has(b"SMask"),
                _ => false,
            })
        };
        assert!(!has_smask(&opaque));
        assert!(has_smask(&translucent));
    }

    #[test]
    fn test_raster_is_png() {
        let catalog = catalog(3, Rgba([0, 0, 0, 255]));
        let artifact = ArtifactExporter::new()
            .export(&catalog, ExportFormat::Png)
            .unwrap();

        assert_eq!(artifact.file_name, "product-catalog-3x3.png");
        let decoded = image::load_from_memory(&artifact.bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (9, 9));
    }

    #[tokio::test]
    async fn test_export_all_names_both_files() {
        let catalog = catalog(2, Rgba([9, 9, 9, 255]));
        let (raster, document) = ArtifactExporter::new().export_all(&catalog).await.unwrap();

        assert_eq!(raster.format, ExportFormat::Png);
        assert_eq!(document.format, ExportFormat::Pdf);
        assert_eq!(document.file_name, "product-catalog-3x3.pdf");
        assert_eq!(media_box(&document.bytes), vec![0, 0, 6, 6]);
    }
}
