//! Fixed scene configuration
//!
//! Scenes are catalog rows, placements are catalog columns. Both lists are
//! compiled in and never change at runtime.

use serde::Serialize;

/// Placement identifiers shared by every scene, in column order
pub const PLACEMENTS: [&str; 3] = ["left_center", "center_horizontal", "right_center"];

/// Number of tiles per catalog row (one per placement)
pub const GRID_COLUMNS: usize = PLACEMENTS.len();

/// Number of scenes (catalog rows)
pub const SCENE_COUNT: usize = 3;

/// Number of tiles in a complete catalog
pub const CATALOG_SIZE: usize = SCENE_COUNT * PLACEMENTS.len();

/// A generation scene (one catalog row)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SceneConfig {
    /// Unique scene identifier, used in errors and logs
    pub name: &'static str,
    /// Free-text scene prompt sent to the generation service
    pub description: &'static str,
}

/// The three catalog scenes, in row order
pub static SCENES: [SceneConfig; SCENE_COUNT] = [
    SceneConfig {
        name: "kitchen",
        description: "A cozy home kitchen with a warm wooden counter, ceramic mug, plants, \
                      and soft natural morning window light.",
    },
    SceneConfig {
        name: "patio",
        description: "A rustic wooden outdoor patio table at golden hour, with string lights \
                      hanging and warm soft sunset glow.",
    },
    SceneConfig {
        name: "studio",
        description: "A minimalist studio setup with a neutral beige backdrop, soft diffused \
                      side lighting, ecommerce photography style.",
    },
];

impl SceneConfig {
    /// Placement set requested for this scene
    pub fn placements(&self) -> &'static [&'static str] {
        &PLACEMENTS
    }

    /// Look up a scene by name
    pub fn by_name(name: &str) -> Option<&'static SceneConfig> {
        SCENES.iter().find(|s| s.name == name)
    }
}
