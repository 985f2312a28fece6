//! Catalog orchestrator
//!
//! Drives a [`SceneGenerator`] across the fixed scene list and assembles the
//! ordered 9-URL [`CatalogUrlSet`].
//!
//! # Ordering
//! Scenes are requested strictly one after another, in declared order. Scene
//! *k+1* is not requested until scene *k* has returned, so slot
//! `3 * scene + placement` is correct by construction.
//!
//! # Failure policy
//! Fail-fast, all-or-nothing: the first failing scene aborts the remaining
//! scenes and its error is returned unchanged. No partial URL set escapes.

use crate::error::CatalogResult;
use crate::models::{CatalogUrlSet, SceneConfig, CATALOG_SIZE, SCENES};
use crate::services::generation_client::{RemoteGenerationError, SceneGenerator};
use pcat_common::events::{CatalogEvent, EventBus};
use std::sync::Arc;
use tracing::{error, info};

/// Builds the catalog URL set scene by scene
pub struct CatalogOrchestrator {
    generator: Arc<dyn SceneGenerator>,
    event_bus: Option<EventBus>,
}

impl CatalogOrchestrator {
    pub fn new(generator: Arc<dyn SceneGenerator>) -> Self {
        Self {
            generator,
            event_bus: None,
        }
    }

    /// Emit per-scene progress on the given bus
    pub fn with_events(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Request every scene in order and concatenate the results
    pub async fn build_catalog(&self, product_image_url: &str) -> CatalogResult<CatalogUrlSet> {
        let mut urls = Vec::with_capacity(CATALOG_SIZE);

        for (scene_index, scene) in SCENES.iter().enumerate() {
            self.emit(CatalogEvent::SceneStarted {
                scene: scene.name.to_string(),
                scene_index,
                total_scenes: SCENES.len(),
            });

            let scene_urls = match self.generate_scene(product_image_url, scene).await {
                Ok(scene_urls) => scene_urls,
                Err(e) => {
                    error!(
                        scene = scene.name,
                        scene_index,
                        error = %e,
                        "Scene generation failed, aborting remaining scenes"
                    );
                    return Err(e.into());
                }
            };

            info!(
                scene = scene.name,
                scene_index,
                urls = scene_urls.len(),
                "Scene complete"
            );
            self.emit(CatalogEvent::SceneCompleted {
                scene: scene.name.to_string(),
                scene_index,
                urls: scene_urls.clone(),
            });

            urls.extend(scene_urls);
        }

        CatalogUrlSet::new(urls)
    }

    /// One scene call, re-validating the result count
    async fn generate_scene(
        &self,
        product_image_url: &str,
        scene: &SceneConfig,
    ) -> Result<Vec<String>, RemoteGenerationError> {
        let result = self.generator.generate(product_image_url, scene).await?;

        let expected = scene.placements().len();
        if result.len() != expected {
            return Err(RemoteGenerationError::ResultCount {
                scene: scene.name.to_string(),
                expected,
                actual: result.len(),
            });
        }

        Ok(result.urls())
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }
}
