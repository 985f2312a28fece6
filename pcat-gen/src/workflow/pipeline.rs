//! Catalog pipeline
//!
//! Runs one catalog generation end to end against a caller-owned
//! [`PipelineSession`]:
//!
//! - **Generating**: scene calls through the [`CatalogOrchestrator`]
//! - **Assembling**: 3×3 composition, then PNG and PDF encodings
//! - **Ready**: everything produced; the output is handed back
//!
//! # Error Handling
//! Fail-fast. The first error moves the session to `Failed`, is logged and
//! broadcast as `SessionFailed`, and is returned unchanged. Cancellation is
//! a failure of whichever stage was running.
//!
//! # Example
//! ```rust,ignore
//! let pipeline = CatalogPipeline::new(generator, image_source, PipelineConfig::default());
//! let mut session = PipelineSession::new();
//! let output = pipeline.run(&mut session, Some("https://cdn.example/product.png")).await?;
//! ```

use crate::error::{CatalogError, CatalogResult};
use crate::models::{CatalogUrlSet, ComposedCatalog, ExportedArtifact, PipelineSession};
use crate::services::{
    ArtifactExporter, BriaClient, CatalogOrchestrator, GenerationClientConfig, GridCompositor,
    HttpImageSource, ImageSource, SceneGenerator,
};
use chrono::Utc;
use pcat_common::config::DEFAULT_TILE_SIZE;
use pcat_common::events::{CatalogEvent, EventBus};
use pcat_common::PipelineState;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Product image used when the caller supplies none
pub const PLACEHOLDER_IMAGE_URL: &str = "https://d1ei2xrl63k822.cloudfront.net/api/res_crop/939bdc64-ece8-4490-8856-bf86538dafc7.png?Expires=1764628941&Signature=BDGDxAIPXyZuY0awEceHPj2AUl2KMTyjTQ0tv~LYc9n9erNMRuJ-YXw7DVfpdywdEBPUJkPgOiD6FJgfCQeu1HQyfHUCsZ6fwGneHRSW5fTjmb-bSnS2Vrk4mwIWINOWDI~W3sdidu6rFBkIKYA2ga9QmTEdeFbomF7DV1DDwKzcdq0O8250Flvi~IDhpNy8zhZwOep-gaRiz-qfaVZNS1e5SnUdj8fDWfJopURAABLhdYJYA-iFyLldrEUGp7CylJVEOoRyESv7F8FmpK5gqfcZvwrBA~gTWeH13shMqhqKZdWySnhSq0y90QJVm02EOJokpWK59bK5buUDtAcgag__&Key-Pair-Id=K2UXO1NPZVKO7N";

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Edge length of one grid cell in pixels
    pub tile_size: u32,
    /// Substituted for a missing or blank product image URL
    pub placeholder_image_url: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            placeholder_image_url: PLACEHOLDER_IMAGE_URL.to_string(),
        }
    }
}

/// Everything a successful run produces
#[derive(Debug, Clone)]
pub struct CatalogOutput {
    /// The 9 generated URLs in slot order
    pub urls: CatalogUrlSet,
    /// The composed raster
    pub catalog: ComposedCatalog,
    /// PNG encoding
    pub raster: ExportedArtifact,
    /// Single-page PDF encoding
    pub document: ExportedArtifact,
}

/// Catalog pipeline orchestrator
pub struct CatalogPipeline {
    orchestrator: CatalogOrchestrator,
    compositor: GridCompositor,
    exporter: ArtifactExporter,
    config: PipelineConfig,
    event_bus: Option<EventBus>,
}

impl CatalogPipeline {
    pub fn new(
        generator: Arc<dyn SceneGenerator>,
        image_source: Arc<dyn ImageSource>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            orchestrator: CatalogOrchestrator::new(generator),
            compositor: GridCompositor::new(image_source),
            exporter: ArtifactExporter::new(),
            config,
            event_bus: None,
        }
    }

    /// Broadcast session and scene progress on the given bus
    pub fn with_events(mut self, event_bus: EventBus) -> Self {
        self.orchestrator = self.orchestrator.with_events(event_bus.clone());
        self.event_bus = Some(event_bus);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run to completion without external cancellation
    pub async fn run(
        &self,
        session: &mut PipelineSession,
        product_image_url: Option<&str>,
    ) -> CatalogResult<CatalogOutput> {
        self.run_with_cancel(session, product_image_url, &CancellationToken::new())
            .await
    }

    /// Run, aborting the current stage as soon as `cancel` fires
    ///
    /// The session must be `Idle`. On success it ends `Ready`, otherwise
    /// `Failed` with the error text in `last_error`.
    pub async fn run_with_cancel(
        &self,
        session: &mut PipelineSession,
        product_image_url: Option<&str>,
        cancel: &CancellationToken,
    ) -> CatalogResult<CatalogOutput> {
        if session.state != PipelineState::Idle {
            warn!(
                session_id = %session.session_id,
                state = %session.state,
                "Refusing to run on a session that is not idle"
            );
            return Err(CatalogError::SessionNotIdle(session.state));
        }

        match self.execute(session, product_image_url, cancel).await {
            Ok(output) => Ok(output),
            Err(e) => {
                self.record_failure(session, &e);
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        session: &mut PipelineSession,
        product_image_url: Option<&str>,
        cancel: &CancellationToken,
    ) -> CatalogResult<CatalogOutput> {
        let product_image_url =
            resolve_product_url(product_image_url, &self.config.placeholder_image_url)?;
        session.product_image_url = Some(product_image_url.clone());

        info!(
            session_id = %session.session_id,
            product_image_url = %product_image_url,
            tile_size = self.config.tile_size,
            "Starting catalog pipeline"
        );
        self.emit(CatalogEvent::SessionStarted {
            session_id: session.session_id,
            product_image_url: product_image_url.clone(),
            timestamp: Utc::now(),
        });

        self.advance(session, PipelineState::Generating)?;
        let urls = race(
            cancel,
            PipelineState::Generating,
            self.orchestrator.build_catalog(&product_image_url),
        )
        .await?;

        self.advance(session, PipelineState::Assembling)?;
        let catalog = race(
            cancel,
            PipelineState::Assembling,
            self.compositor
                .compose_catalog(urls.as_slice(), self.config.tile_size),
        )
        .await?;
        self.emit(CatalogEvent::CompositionCompleted {
            width: catalog.width(),
            height: catalog.height(),
        });

        let (raster, document) = race(
            cancel,
            PipelineState::Assembling,
            self.exporter.export_all(&catalog),
        )
        .await?;

        self.advance(session, PipelineState::Ready)?;

        let duration_ms = session
            .duration()
            .map(|d| d.num_milliseconds().max(0) as u64)
            .unwrap_or(0);
        info!(
            session_id = %session.session_id,
            duration_ms,
            width = catalog.width(),
            height = catalog.height(),
            "Catalog pipeline completed"
        );
        self.emit(CatalogEvent::SessionCompleted {
            session_id: session.session_id,
            duration_ms,
            timestamp: Utc::now(),
        });

        Ok(CatalogOutput {
            urls,
            catalog,
            raster,
            document,
        })
    }

    /// Transition and announce the new state
    fn advance(&self, session: &mut PipelineSession, new_state: PipelineState) -> CatalogResult<()> {
        let transition = session.transition_to(new_state)?;
        info!(
            session_id = %transition.session_id,
            old_state = %transition.old_state,
            new_state = %transition.new_state,
            "{}",
            new_state.status_text()
        );
        self.emit(CatalogEvent::StateChanged {
            session_id: transition.session_id,
            old_state: transition.old_state,
            new_state: transition.new_state,
            timestamp: transition.transitioned_at,
        });
        Ok(())
    }

    fn record_failure(&self, session: &mut PipelineSession, e: &CatalogError) {
        let failed_in = session.state;
        error!(
            session_id = %session.session_id,
            state = %failed_in,
            kind = e.kind(),
            scene = e.scene().unwrap_or("-"),
            error = %e,
            "Catalog pipeline failed"
        );

        match session.fail(e) {
            Ok(transition) => self.emit(CatalogEvent::StateChanged {
                session_id: transition.session_id,
                old_state: transition.old_state,
                new_state: transition.new_state,
                timestamp: transition.transitioned_at,
            }),
            Err(transition_error) => {
                warn!(error = %transition_error, "Could not mark session failed");
            }
        }

        self.emit(CatalogEvent::SessionFailed {
            session_id: session.session_id,
            failed_in,
            error_message: e.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn emit(&self, event: CatalogEvent) {
        if let Some(bus) = &self.event_bus {
            bus.emit_lossy(event);
        }
    }
}

/// Race a stage against cancellation, dropping the stage future if cancelled
async fn race<T>(
    cancel: &CancellationToken,
    stage: PipelineState,
    work: impl Future<Output = CatalogResult<T>>,
) -> CatalogResult<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!(%stage, "Pipeline cancelled");
            Err(CatalogError::Cancelled { stage })
        }
        result = work => result,
    }
}

/// Apply the placeholder for a missing or blank URL and check syntax otherwise
pub fn resolve_product_url(
    product_image_url: Option<&str>,
    placeholder: &str,
) -> CatalogResult<String> {
    let candidate = match product_image_url.map(str::trim) {
        Some(url) if !url.is_empty() => url,
        _ => return Ok(placeholder.to_string()),
    };

    reqwest::Url::parse(candidate).map_err(|e| CatalogError::InvalidProductUrl {
        url: candidate.to_string(),
        reason: e.to_string(),
    })?;

    Ok(candidate.to_string())
}

/// Run one catalog against the Bria endpoint with HTTP tile loading
///
/// Credentials come only from `client_config`; the request timeout it carries
/// also applies to tile downloads.
pub async fn run_catalog_pipeline(
    client_config: GenerationClientConfig,
    session: &mut PipelineSession,
    product_image_url: Option<&str>,
) -> CatalogResult<CatalogOutput> {
    let image_source = HttpImageSource::new(client_config.request_timeout)?;
    let generator = BriaClient::new(client_config)?;
    let pipeline = CatalogPipeline::new(
        Arc::new(generator),
        Arc::new(image_source),
        PipelineConfig::default(),
    );
    pipeline.run(session, product_image_url).await
}
