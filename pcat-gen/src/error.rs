//! Error types for pcat-gen
//!
//! Every pipeline stage fails fast with a [`CatalogError`]; the first error
//! is propagated unchanged to the caller.

use crate::models::ExportFormat;
use crate::services::{ImageSourceError, RemoteGenerationError};
use pcat_common::PipelineState;
use thiserror::Error;

/// Catalog pipeline error type
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Remote generation call failed for a scene
    #[error(transparent)]
    RemoteGeneration(#[from] RemoteGenerationError),

    /// Composition input did not contain exactly 9 URLs
    #[error("Invalid catalog size: expected {expected} URLs, got {actual}")]
    InvalidCatalogSize { expected: usize, actual: usize },

    /// One of the 9 tiles could not be fetched or decoded
    #[error("Failed to decode image {index} ({url}): {source}")]
    ImageDecode {
        index: usize,
        url: String,
        #[source]
        source: ImageSourceError,
    },

    /// Raster or document encoding failed
    #[error("{format} export failed: {message}")]
    ExportEncoding {
        format: ExportFormat,
        message: String,
    },

    /// Tile size of zero, or one whose canvas would be too large
    #[error("Invalid tile size: {0} (must be between 1 and {max})", max = pcat_common::config::MAX_TILE_SIZE)]
    InvalidTileSize(u32),

    /// Product image URL is not a syntactically valid URL
    #[error("Invalid product image URL '{url}': {reason}")]
    InvalidProductUrl { url: String, reason: String },

    /// Run cancelled by the host (treated as a failure of that stage)
    #[error("Pipeline cancelled while {stage}")]
    Cancelled { stage: PipelineState },

    /// Pipeline started on a session that has not been reset
    #[error("Pipeline session is {0}, reset it to idle before running")]
    SessionNotIdle(PipelineState),

    /// State machine violation
    #[error("Invalid pipeline transition: {from} -> {to}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },

    /// Blocking worker failed (panic or runtime shutdown)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    /// Failure tag reported to callers
    pub fn kind(&self) -> &'static str {
        match self {
            CatalogError::RemoteGeneration(_) => "RemoteGenerationError",
            CatalogError::InvalidCatalogSize { .. } => "InvalidCatalogSizeError",
            CatalogError::ImageDecode { .. } => "ImageDecodeError",
            CatalogError::ExportEncoding { .. } => "ExportEncodingError",
            CatalogError::InvalidTileSize(_) => "InvalidTileSizeError",
            CatalogError::InvalidProductUrl { .. } => "InvalidProductUrlError",
            CatalogError::Cancelled { .. } => "CancelledError",
            CatalogError::SessionNotIdle(_) => "SessionNotIdleError",
            CatalogError::InvalidTransition { .. } => "InvalidTransitionError",
            CatalogError::Internal(_) => "InternalError",
        }
    }

    /// Scene name for scene-attributed errors
    pub fn scene(&self) -> Option<&str> {
        match self {
            CatalogError::RemoteGeneration(e) => Some(e.scene()),
            _ => None,
        }
    }
}

/// Result type for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;
