//! Test Helper Utilities
//!
//! Shared utilities for testing pcat-gen

#![allow(dead_code)]

pub mod fake_server;
pub mod fakes;
pub mod image_fixtures;

// Re-export commonly used items
pub use fake_server::{FakeBriaServer, ScriptedReply};
pub use fakes::{InMemoryImageSource, ScriptedGenerator, SceneScript};
pub use image_fixtures::{png_bytes, shade_for};
