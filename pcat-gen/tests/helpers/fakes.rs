//! In-process collaborators
//!
//! `ScriptedGenerator` stands in for the remote generation API and
//! `InMemoryImageSource` for the image CDN. Both record every call.

use super::image_fixtures::png_bytes;
use image::DynamicImage;
use pcat_gen::models::SceneConfig;
use pcat_gen::services::{
    decode_image_bytes, GenerationRecord, GenerationResult, ImageSource, ImageSourceError,
    RemoteGenerationError, SceneGenerator,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Behaviour of one scene
#[derive(Debug, Clone)]
pub enum SceneScript {
    /// Return exactly these URLs
    Urls(Vec<String>),
    /// Fail with a network error
    NetworkError,
    /// Fail with an API error
    ApiError(u16),
}

/// Scene generator driven by per-scene scripts
///
/// Scenes without a script get `https://cdn.test/<scene>/<placement>.png`.
pub struct ScriptedGenerator {
    scripts: HashMap<String, SceneScript>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_scene(mut self, scene: &str, script: SceneScript) -> Self {
        self.scripts.insert(scene.to_string(), script);
        self
    }

    /// Default URL for a scene/placement pair
    pub fn default_url(scene: &str, placement: &str) -> String {
        format!("https://cdn.test/{}/{}.png", scene, placement)
    }

    /// Scene names in call order
    pub fn scene_calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(scene, _)| scene.clone())
            .collect()
    }

    /// Product image URLs in call order
    pub fn product_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, url)| url.clone())
            .collect()
    }
}

#[async_trait::async_trait]
impl SceneGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        product_image_url: &str,
        scene: &SceneConfig,
    ) -> Result<GenerationResult, RemoteGenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((scene.name.to_string(), product_image_url.to_string()));

        let urls = match self.scripts.get(scene.name) {
            Some(SceneScript::Urls(urls)) => urls.clone(),
            Some(SceneScript::NetworkError) => {
                return Err(RemoteGenerationError::Network {
                    scene: scene.name.to_string(),
                    message: "connection reset".to_string(),
                })
            }
            Some(SceneScript::ApiError(status)) => {
                return Err(RemoteGenerationError::Api {
                    scene: scene.name.to_string(),
                    status: *status,
                    body: "{\"error\":\"scripted\"}".to_string(),
                })
            }
            None => scene
                .placements()
                .iter()
                .map(|p| Self::default_url(scene.name, p))
                .collect(),
        };

        Ok(GenerationResult {
            scene: scene.name.to_string(),
            records: urls
                .into_iter()
                .map(|url| GenerationRecord {
                    url,
                    metadata: Vec::new(),
                })
                .collect(),
        })
    }
}

/// Image source serving a solid fixture per URL
///
/// URLs listed as broken fail to decode. Counts every load attempt.
pub struct InMemoryImageSource {
    broken: HashSet<String>,
    loads: AtomicUsize,
}

impl InMemoryImageSource {
    pub fn new() -> Self {
        Self {
            broken: HashSet::new(),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn with_broken(mut self, url: &str) -> Self {
        self.broken.insert(url.to_string());
        self
    }

    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ImageSource for InMemoryImageSource {
    async fn load(&self, url: &str) -> Result<DynamicImage, ImageSourceError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.broken.contains(url) {
            return decode_image_bytes(b"corrupt tile");
        }
        decode_image_bytes(&png_bytes(url))
    }
}
