//! Service modules for catalog generation
//!
//! - `generation_client`: remote scene generation (Bria lifestyle shots)
//! - `catalog_orchestrator`: sequential scene calls → ordered 9-URL set
//! - `image_source`: tile fetch and decode
//! - `grid_compositor`: 3×3 raster composition
//! - `artifact_exporter`: PNG and PDF encodings

pub mod artifact_exporter;
pub mod catalog_orchestrator;
pub mod generation_client;
pub mod grid_compositor;
pub mod image_source;

pub use artifact_exporter::ArtifactExporter;
pub use catalog_orchestrator::CatalogOrchestrator;
pub use generation_client::{
    parse_generation_response, BriaClient, GenerationClientConfig, GenerationRecord,
    GenerationRequest, GenerationResult, RemoteGenerationError, SceneGenerator,
};
pub use grid_compositor::{tile_origin, GridCompositor};
pub use image_source::{decode_image_bytes, HttpImageSource, ImageSource, ImageSourceError};
