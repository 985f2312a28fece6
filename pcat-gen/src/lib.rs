//! pcat-gen library interface
//!
//! Generates a 3×3 product catalog: three remote scene generations, one
//! composed raster, PNG and PDF encodings.

pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{CatalogError, CatalogResult};
pub use crate::models::{CatalogUrlSet, ComposedCatalog, ExportFormat, ExportedArtifact, PipelineSession};
pub use crate::workflow::{run_catalog_pipeline, CatalogOutput, CatalogPipeline, PipelineConfig};
