//! Image fetch-and-decode collaborator
//!
//! The grid compositor loads every tile through [`ImageSource`].
//! [`HttpImageSource`] downloads over HTTP and decodes on the blocking pool.

use crate::error::{CatalogError, CatalogResult};
use image::DynamicImage;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("pcat/", env!("CARGO_PKG_VERSION"));

/// Image load errors
#[derive(Debug, Error)]
pub enum ImageSourceError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Unsupported or corrupt image data: {0}")]
    Decode(String),

    #[error("Image not available: {0}")]
    Unavailable(String),
}

/// Loads a decodable image from a URL
#[async_trait::async_trait]
pub trait ImageSource: Send + Sync {
    async fn load(&self, url: &str) -> Result<DynamicImage, ImageSourceError>;
}

/// Decode encoded image bytes (format sniffed from the data)
pub fn decode_image_bytes(bytes: &[u8]) -> Result<DynamicImage, ImageSourceError> {
    image::load_from_memory(bytes).map_err(|e| ImageSourceError::Decode(e.to_string()))
}

/// Downloads images over HTTP
pub struct HttpImageSource {
    http_client: reqwest::Client,
}

impl HttpImageSource {
    pub fn new(request_timeout: Option<Duration>) -> CatalogResult<Self> {
        let mut builder = reqwest::Client::builder().user_agent(USER_AGENT);
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder
            .build()
            .map_err(|e| CatalogError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http_client })
    }
}

#[async_trait::async_trait]
impl ImageSource for HttpImageSource {
    async fn load(&self, url: &str) -> Result<DynamicImage, ImageSourceError> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ImageSourceError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageSourceError::Status(status.as_u16()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageSourceError::Network(e.to_string()))?;

        debug!(url, bytes = bytes.len(), "Downloaded image");

        tokio::task::spawn_blocking(move || decode_image_bytes(&bytes))
            .await
            .map_err(|e| ImageSourceError::Decode(format!("decode task failed: {}", e)))?
    }
}
