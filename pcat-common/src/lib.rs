//! # PCAT Common Library
//!
//! Shared code for the product catalog generator:
//! - Error type used by configuration loading
//! - Configuration loading and tiered setting resolution
//! - Pipeline event types and the broadcast `EventBus`

pub mod config;
pub mod error;
pub mod events;

pub use error::{Error, Result};
pub use events::{CatalogEvent, EventBus, PipelineState};
