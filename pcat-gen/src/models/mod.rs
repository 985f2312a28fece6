//! Data models for pcat-gen
//!
//! - Fixed scene/placement configuration
//! - Catalog URL set, composed raster and exported artifacts
//! - Caller-owned pipeline session (state machine)

pub mod catalog;
pub mod pipeline_session;
pub mod scene;

pub use catalog::{CatalogUrlSet, ComposedCatalog, ExportFormat, ExportedArtifact};
pub use pipeline_session::{PipelineSession, StateTransition};
pub use scene::{SceneConfig, CATALOG_SIZE, GRID_COLUMNS, PLACEMENTS, SCENES, SCENE_COUNT};
