//! Catalog workflow
//!
//! The pipeline drives a caller-owned session through generation,
//! composition and export.

pub mod pipeline;

pub use pipeline::{
    resolve_product_url, run_catalog_pipeline, CatalogOutput, CatalogPipeline, PipelineConfig,
    PLACEHOLDER_IMAGE_URL,
};
