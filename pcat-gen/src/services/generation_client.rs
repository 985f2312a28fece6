//! Remote generation client
//!
//! Issues one "lifestyle shot by text" request per scene and normalizes the
//! response into an ordered list of result URLs, one per requested placement.
//!
//! Result row *i* belongs to placement *i* of the request. The caller receives
//! either the full list or a [`RemoteGenerationError`]; partial result sets are
//! never returned.

use crate::error::{CatalogError, CatalogResult};
use crate::models::SceneConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub use pcat_common::config::DEFAULT_ENDPOINT_URL;

const USER_AGENT: &str = concat!("pcat/", env!("CARGO_PKG_VERSION"));

/// Header carrying the API token
const API_TOKEN_HEADER: &str = "api_token";

const GENERATION_MODE: &str = "high_control";
const PLACEMENT_TYPE: &str = "manual_placement";
const SHOT_SIZE: [u32; 2] = [1000, 1000];

/// Results requested per listed placement
const RESULTS_PER_PLACEMENT: u32 = 1;

/// Remote generation errors (always scene-attributed)
#[derive(Debug, Error)]
pub enum RemoteGenerationError {
    #[error("Network error for scene '{scene}': {message}")]
    Network { scene: String, message: String },

    #[error("API error {status} for scene '{scene}': {body}")]
    Api {
        scene: String,
        status: u16,
        body: String,
    },

    #[error("Malformed response for scene '{scene}': {message}")]
    MalformedResponse {
        scene: String,
        message: String,
        body: String,
    },

    #[error("Scene '{scene}' returned {actual} results, expected {expected}")]
    ResultCount {
        scene: String,
        expected: usize,
        actual: usize,
    },
}

impl RemoteGenerationError {
    /// Name of the scene whose call failed
    pub fn scene(&self) -> &str {
        match self {
            RemoteGenerationError::Network { scene, .. }
            | RemoteGenerationError::Api { scene, .. }
            | RemoteGenerationError::MalformedResponse { scene, .. }
            | RemoteGenerationError::ResultCount { scene, .. } => scene,
        }
    }

    /// Raw response body, when one was received
    pub fn response_body(&self) -> Option<&str> {
        match self {
            RemoteGenerationError::Api { body, .. }
            | RemoteGenerationError::MalformedResponse { body, .. } => Some(body),
            _ => None,
        }
    }
}

/// Request body for one scene
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest<'a> {
    pub image_url: &'a str,
    pub mode: &'static str,
    pub scene_description: &'a str,
    pub placement_type: &'static str,
    pub manual_placement_selection: &'a [&'static str],
    pub shot_size: [u32; 2],
    pub optimize_description: bool,
    pub num_results: u32,
    pub sync: bool,
}

impl<'a> GenerationRequest<'a> {
    /// Build the synchronous request for a scene
    pub fn for_scene(product_image_url: &'a str, scene: &'a SceneConfig) -> Self {
        Self {
            image_url: product_image_url,
            mode: GENERATION_MODE,
            scene_description: scene.description,
            placement_type: PLACEMENT_TYPE,
            manual_placement_selection: scene.placements(),
            shot_size: SHOT_SIZE,
            optimize_description: true,
            num_results: RESULTS_PER_PLACEMENT,
            sync: true,
        }
    }
}

/// One result row
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRecord {
    /// Output image URL (first field of the row)
    pub url: String,
    /// Remaining row fields (seed, request id); not interpreted
    pub metadata: Vec<serde_json::Value>,
}

/// Ordered results for one scene
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResult {
    pub scene: String,
    pub records: Vec<GenerationRecord>,
}

impl GenerationResult {
    /// Result URLs in placement order
    pub fn urls(&self) -> Vec<String> {
        self.records.iter().map(|r| r.url.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Response envelope: `{ "result": [[url, seed, request_id], ...] }`
#[derive(Debug, Deserialize)]
struct RawGenerationResponse {
    result: Option<Vec<serde_json::Value>>,
}

/// Normalize a success response body into ordered results
///
/// Fails when the body is not the expected JSON shape, when a row has no URL
/// in its first field, or when the row count differs from the placement count.
pub fn parse_generation_response(
    scene: &SceneConfig,
    body: &str,
) -> Result<GenerationResult, RemoteGenerationError> {
    let malformed = |message: String| RemoteGenerationError::MalformedResponse {
        scene: scene.name.to_string(),
        message,
        body: body.to_string(),
    };

    let raw: RawGenerationResponse =
        serde_json::from_str(body).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;
    let rows = raw
        .result
        .ok_or_else(|| malformed("missing 'result' array".to_string()))?;

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.into_iter().enumerate() {
        let mut fields = match row {
            serde_json::Value::Array(fields) if !fields.is_empty() => fields,
            other => {
                return Err(malformed(format!(
                    "result row {} is not a non-empty array: {}",
                    index, other
                )))
            }
        };
        let url = match fields.remove(0) {
            serde_json::Value::String(url) => url,
            other => {
                return Err(malformed(format!(
                    "result row {} has no URL in its first field: {}",
                    index, other
                )))
            }
        };
        reqwest::Url::parse(&url)
            .map_err(|e| malformed(format!("result row {} URL '{}' is invalid: {}", index, url, e)))?;

        records.push(GenerationRecord {
            url,
            metadata: fields,
        });
    }

    let expected = scene.placements().len();
    if records.len() != expected {
        return Err(RemoteGenerationError::ResultCount {
            scene: scene.name.to_string(),
            expected,
            actual: records.len(),
        });
    }

    Ok(GenerationResult {
        scene: scene.name.to_string(),
        records,
    })
}

/// Generates the placement images for one scene
///
/// Implementations must return results in placement order.
#[async_trait::async_trait]
pub trait SceneGenerator: Send + Sync {
    async fn generate(
        &self,
        product_image_url: &str,
        scene: &SceneConfig,
    ) -> Result<GenerationResult, RemoteGenerationError>;
}

/// Explicit client configuration (never read from the environment here)
#[derive(Clone)]
pub struct GenerationClientConfig {
    pub api_token: String,
    pub endpoint_url: String,
    /// Per-request timeout; `None` leaves the request unbounded
    pub request_timeout: Option<Duration>,
}

impl GenerationClientConfig {
    pub fn new(api_token: impl Into<String>, endpoint_url: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            endpoint_url: endpoint_url.into(),
            request_timeout: None,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for GenerationClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationClientConfig")
            .field("api_token", &"<redacted>")
            .field("endpoint_url", &self.endpoint_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// HTTP client for the Bria product lifestyle-shot endpoint
pub struct BriaClient {
    http_client: reqwest::Client,
    config: GenerationClientConfig,
}

impl BriaClient {
    pub fn new(config: GenerationClientConfig) -> CatalogResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| CatalogError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        if config.api_token.trim().is_empty() {
            warn!("Generation client created with an empty API token");
        }

        Ok(Self {
            http_client,
            config,
        })
    }

    pub fn endpoint_url(&self) -> &str {
        &self.config.endpoint_url
    }
}

#[async_trait::async_trait]
impl SceneGenerator for BriaClient {
    async fn generate(
        &self,
        product_image_url: &str,
        scene: &SceneConfig,
    ) -> Result<GenerationResult, RemoteGenerationError> {
        let request = GenerationRequest::for_scene(product_image_url, scene);

        debug!(
            scene = scene.name,
            placements = ?scene.placements(),
            endpoint = %self.config.endpoint_url,
            "Requesting scene generation"
        );

        let network_error = |e: reqwest::Error| RemoteGenerationError::Network {
            scene: scene.name.to_string(),
            message: e.to_string(),
        };

        let response = self
            .http_client
            .post(&self.config.endpoint_url)
            .header(API_TOKEN_HEADER, &self.config.api_token)
            .json(&request)
            .send()
            .await
            .map_err(network_error)?;

        let status = response.status();
        let body = response.text().await.map_err(network_error)?;

        if !status.is_success() {
            warn!(
                scene = scene.name,
                status = status.as_u16(),
                "Generation API returned an error status"
            );
            return Err(RemoteGenerationError::Api {
                scene: scene.name.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let result = parse_generation_response(scene, &body)?;

        info!(
            scene = scene.name,
            results = result.len(),
            "Scene generation successful"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SCENES;
    use serde_json::json;

    fn kitchen() -> &'static SceneConfig {
        &SCENES[0]
    }

    #[test]
    fn test_request_body_shape() {
        let request = GenerationRequest::for_scene("https://img.example/p.png", kitchen());
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["image_url"], "https://img.example/p.png");
        assert_eq!(value["mode"], "high_control");
        assert_eq!(value["scene_description"], kitchen().description);
        assert_eq!(value["placement_type"], "manual_placement");
        assert_eq!(
            value["manual_placement_selection"],
            json!(["left_center", "center_horizontal", "right_center"])
        );
        assert_eq!(value["shot_size"], json!([1000, 1000]));
        assert_eq!(value["optimize_description"], true);
        assert_eq!(value["num_results"], 1);
        assert_eq!(value["sync"], true);
    }

    #[test]
    fn test_parse_keeps_row_order_and_metadata() {
        let body = json!({
            "result": [
                ["https://cdn.example/a.png", 11, "req-a"],
                ["https://cdn.example/b.png", 22, "req-b"],
                ["https://cdn.example/c.png", 33, "req-c"]
            ]
        })
        .to_string();

        let result = parse_generation_response(kitchen(), &body).unwrap();
        assert_eq!(result.scene, "kitchen");
        assert_eq!(
            result.urls(),
            vec![
                "https://cdn.example/a.png",
                "https://cdn.example/b.png",
                "https://cdn.example/c.png"
            ]
        );
        assert_eq!(result.records[1].metadata, vec![json!(22), json!("req-b")]);
    }

    #[test]
    fn test_parse_count_mismatch() {
        let body = json!({ "result": [["https://cdn.example/a.png"]] }).to_string();
        match parse_generation_response(kitchen(), &body) {
            Err(RemoteGenerationError::ResultCount {
                scene,
                expected,
                actual,
            }) => {
                assert_eq!(scene, "kitchen");
                assert_eq!(expected, 3);
                assert_eq!(actual, 1);
            }
            other => panic!("expected count mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_extra_rows_rejected() {
        let body = json!({
            "result": [
                ["https://cdn.example/a.png", 1, "r1"],
                ["https://cdn.example/b.png", 2, "r2"],
                ["https://cdn.example/c.png", 3, "r3"],
                ["https://cdn.example/d.png", 4, "r4"]
            ]
        })
        .to_string();

        match parse_generation_response(&SCENES[1], &body) {
            Err(RemoteGenerationError::ResultCount {
                scene,
                expected,
                actual,
            }) => {
                assert_eq!(scene, "patio");
                assert_eq!(expected, 3);
                assert_eq!(actual, 4);
            }
            other => panic!("expected count mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_malformed_bodies() {
        let cases = [
            "not json".to_string(),
            json!({ "status": "ok" }).to_string(),
            json!({ "result": [42, 43, 44] }).to_string(),
            json!({ "result": [[], [], []] }).to_string(),
            json!({ "result": [[1], [2], [3]] }).to_string(),
            json!({ "result": [["not a url"], ["x"], ["y"]] }).to_string(),
        ];

        for body in cases {
            let err = parse_generation_response(kitchen(), &body).unwrap_err();
            assert!(
                matches!(err, RemoteGenerationError::MalformedResponse { .. }),
                "body {} gave {:?}",
                body,
                err
            );
            assert_eq!(err.scene(), "kitchen");
            assert_eq!(err.response_body(), Some(body.as_str()));
        }
    }

    #[test]
    fn test_config_debug_redacts_token() {
        let config = GenerationClientConfig::new("super-secret", DEFAULT_ENDPOINT_URL);
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_client_creation() {
        let config = GenerationClientConfig::new("token", DEFAULT_ENDPOINT_URL)
            .with_request_timeout(Some(Duration::from_secs(30)));
        let client = BriaClient::new(config).unwrap();
        assert_eq!(client.endpoint_url(), DEFAULT_ENDPOINT_URL);
    }
}
