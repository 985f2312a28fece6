//! pcat - 3×3 product catalog generator
//!
//! Generates three lifestyle scenes for a product image, composes the nine
//! results into one grid and writes it as PNG and PDF.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use pcat_common::config::{
    default_config_path, is_valid_value, load_toml_config, CliOverrides, SettingsResolver,
    TomlConfig, DEFAULT_LOG_LEVEL, ENV_LOG_LEVEL,
};
use pcat_common::events::{CatalogEvent, EventBus};
use pcat_gen::services::{BriaClient, GenerationClientConfig, HttpImageSource};
use pcat_gen::{CatalogPipeline, PipelineConfig, PipelineSession};
use tokio::signal;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{
    layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Command-line arguments for pcat
#[derive(Parser, Debug)]
#[command(name = "pcat")]
#[command(about = "Generate a 3x3 lifestyle catalog for a product image")]
#[command(version)]
struct Args {
    /// Product image URL (placeholder product when omitted)
    #[arg(short, long)]
    image_url: Option<String>,

    /// Directory the PNG and PDF are written to
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Edge length of one grid cell in pixels
    #[arg(short, long)]
    tile_size: Option<u32>,

    /// Configuration file (TOML)
    #[arg(short, long, env = "PCAT_CONFIG")]
    config: Option<PathBuf>,

    /// Bria API token
    #[arg(long)]
    api_token: Option<String>,

    /// Generation endpoint URL
    #[arg(long)]
    endpoint: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[arg(long)]
    request_timeout_secs: Option<u64>,

    /// Overall deadline in seconds; the run is cancelled when it expires
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Log filter (e.g. "info", "pcat_gen=debug")
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Provisional filter so config loading is logged; replaced once settings resolve
    let log_filter = init_tracing(pick_log_level(
        args.log_level.clone(),
        std::env::var(ENV_LOG_LEVEL).ok(),
    ));
    info!("Starting pcat v{}", env!("CARGO_PKG_VERSION"));

    let toml_config = match args.config.clone().or_else(default_config_path) {
        Some(path) => load_toml_config(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TomlConfig::default(),
    };

    let settings = SettingsResolver::new(toml_config)
        .resolve(&CliOverrides {
            api_token: args.api_token.clone(),
            endpoint_url: args.endpoint.clone(),
            tile_size: args.tile_size,
            output_dir: args.output_dir.clone(),
            request_timeout_secs: args.request_timeout_secs,
            log_level: args.log_level.clone(),
        })
        .context("Failed to resolve settings")?;

    if let Err(e) = log_filter.reload(build_filter(&settings.log_level)) {
        warn!(error = %e, "Could not apply configured log level");
    }

    info!(
        endpoint = %settings.endpoint_url,
        tile_size = settings.tile_size,
        output_dir = %settings.output_dir.display(),
        "Settings resolved"
    );

    let client_config =
        GenerationClientConfig::new(settings.api_token.clone(), settings.endpoint_url.clone())
            .with_request_timeout(settings.request_timeout);
    let generator = BriaClient::new(client_config)?;
    let image_source = HttpImageSource::new(settings.request_timeout)?;

    let event_bus = EventBus::new(100);
    let events = event_bus.subscribe();
    let progress = tokio::spawn(log_progress(events));

    let pipeline = CatalogPipeline::new(
        Arc::new(generator),
        Arc::new(image_source),
        PipelineConfig {
            tile_size: settings.tile_size,
            ..PipelineConfig::default()
        },
    )
    .with_events(event_bus);

    let cancel = CancellationToken::new();
    spawn_cancel_triggers(cancel.clone(), args.timeout_secs.map(Duration::from_secs));

    let mut session = PipelineSession::new();
    let result = pipeline
        .run_with_cancel(&mut session, args.image_url.as_deref(), &cancel)
        .await;

    // Dropping the pipeline closes the bus so the progress task ends
    drop(pipeline);
    let _ = progress.await;

    let output = result.with_context(|| format!("Catalog generation failed ({})", session.state))?;

    for (slot, url) in output.urls.iter().enumerate() {
        println!("{}: {}", slot, url);
    }

    tokio::fs::create_dir_all(&settings.output_dir)
        .await
        .with_context(|| format!("Failed to create {}", settings.output_dir.display()))?;
    for artifact in [&output.raster, &output.document] {
        let path = settings.output_dir.join(&artifact.file_name);
        tokio::fs::write(&path, &artifact.bytes)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(
            format = %artifact.format,
            mime = artifact.format.mime_type(),
            path = %path.display(),
            "Wrote artifact"
        );
    }

    Ok(())
}

/// Level used until settings are resolved: command line, then `PCAT_LOG_LEVEL`
fn pick_log_level(cli: Option<String>, env: Option<String>) -> String {
    cli.into_iter()
        .chain(env)
        .find(|l| is_valid_value(l))
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}

/// `EnvFilter` for a directive, falling back to the default level when it
/// does not parse
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

/// Install the global subscriber behind a reloadable filter
fn init_tracing(level: String) -> reload::Handle<EnvFilter, Registry> {
    let (filter, handle) = reload::Layer::new(build_filter(&level));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    handle
}

/// Log user-facing progress until the bus closes
///
/// A lagging receiver skips the dropped events and keeps going. Returns the
/// number of events seen.
async fn log_progress(mut events: broadcast::Receiver<CatalogEvent>) -> usize {
    let mut seen = 0;
    loop {
        match events.recv().await {
            Ok(event) => {
                seen += 1;
                match event {
                    CatalogEvent::StateChanged { new_state, .. } => {
                        info!("{}", new_state.status_text())
                    }
                    CatalogEvent::SceneStarted {
                        scene,
                        scene_index,
                        total_scenes,
                    } => info!("Scene {}/{}: {}", scene_index + 1, total_scenes, scene),
                    _ => {}
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Progress display fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
    seen
}

/// Cancel the run on Ctrl+C or when the overall deadline expires
fn spawn_cancel_triggers(cancel: CancellationToken, deadline: Option<Duration>) {
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Received Ctrl+C, cancelling");
            on_signal.cancel();
        }
    });

    if let Some(deadline) = deadline {
        tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!(deadline_secs = deadline.as_secs(), "Deadline expired, cancelling");
            cancel.cancel();
        });
    }
}
