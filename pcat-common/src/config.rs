//! Configuration loading and tiered setting resolution
//!
//! Every setting is resolved with the same priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! The API token is the exception to step 4: it has no compiled default and
//! resolution fails with a configuration error when no source provides one.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Remote generation endpoint used when nothing else is configured
pub const DEFAULT_ENDPOINT_URL: &str =
    "https://engine.prod.bria-api.com/v1/product/lifestyle_shot_by_text";

/// Catalog tile edge length in pixels (composed catalog is 3× this)
pub const DEFAULT_TILE_SIZE: u32 = 512;

/// Largest accepted tile edge; keeps the composed canvas at 6144×6144 or less
pub const MAX_TILE_SIZE: u32 = 2048;

/// Default log level for the `pcat` binary
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Primary environment variable for the API token
pub const ENV_API_TOKEN: &str = "PCAT_API_TOKEN";
/// Fallback environment variable for the API token
pub const ENV_LEGACY_API_TOKEN: &str = "BRIA_API_TOKEN";
/// Environment variable for the generation endpoint
pub const ENV_ENDPOINT_URL: &str = "PCAT_ENDPOINT_URL";
/// Environment variable for the tile size
pub const ENV_TILE_SIZE: &str = "PCAT_TILE_SIZE";
/// Environment variable for the export output directory
pub const ENV_OUTPUT_DIR: &str = "PCAT_OUTPUT_DIR";
/// Environment variable for the log level
pub const ENV_LOG_LEVEL: &str = "PCAT_LOG_LEVEL";

/// Logging section of the TOML config
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// TOML configuration file contents
///
/// All fields are optional so a partial (or empty) file is valid.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// API token for the remote generation service
    pub api_token: Option<String>,
    /// Generation endpoint URL
    pub endpoint_url: Option<String>,
    /// Tile edge length in pixels
    pub tile_size: Option<u32>,
    /// Directory the exported artifacts are written to
    pub output_dir: Option<PathBuf>,
    /// Per-request HTTP timeout in seconds (no timeout when absent)
    pub request_timeout_secs: Option<u64>,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Compiled-in fallback values
#[derive(Debug, Clone)]
pub struct CompiledDefaults {
    pub endpoint_url: String,
    pub tile_size: u32,
    pub output_dir: PathBuf,
    pub log_level: String,
}

impl Default for CompiledDefaults {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            tile_size: DEFAULT_TILE_SIZE,
            output_dir: PathBuf::from("."),
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Default config file location: `<config_dir>/pcat/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pcat").join("config.toml"))
}

/// Load TOML configuration
///
/// A missing file is not an error: a warning is logged and defaults are
/// returned. An unreadable or malformed file is a configuration error.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read TOML failed: {}", e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse TOML failed ({}): {}", path.display(), e)))?;

    debug!("Loaded config from {}", path.display());
    Ok(config)
}

/// Write TOML configuration, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Validate a configured value (non-empty, non-whitespace)
pub fn is_valid_value(value: &str) -> bool {
    !value.trim().is_empty()
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_token: Option<String>,
    pub endpoint_url: Option<String>,
    pub tile_size: Option<u32>,
    pub output_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

/// Fully resolved settings handed to the binary
#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub api_token: String,
    pub endpoint_url: String,
    pub tile_size: u32,
    pub output_dir: PathBuf,
    pub request_timeout: Option<Duration>,
    pub log_level: String,
}

/// Resolves settings across CLI → ENV → TOML → defaults
#[derive(Debug, Clone)]
pub struct SettingsResolver {
    toml: TomlConfig,
    defaults: CompiledDefaults,
}

impl SettingsResolver {
    pub fn new(toml: TomlConfig) -> Self {
        Self {
            toml,
            defaults: CompiledDefaults::default(),
        }
    }

    /// Resolve every setting
    pub fn resolve(&self, cli: &CliOverrides) -> Result<ResolvedSettings> {
        let api_token = self.resolve_api_token(cli.api_token.as_deref())?;

        let endpoint_url = first_valid([
            cli.endpoint_url.clone(),
            env_value(ENV_ENDPOINT_URL),
            self.toml.endpoint_url.clone(),
        ])
        .unwrap_or_else(|| self.defaults.endpoint_url.clone());

        let tile_size = match cli.tile_size {
            Some(size) => size,
            None => match env_value(ENV_TILE_SIZE) {
                Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                    Error::Config(format!("{} is not a valid tile size ({}): {}", ENV_TILE_SIZE, raw, e))
                })?,
                None => self.toml.tile_size.unwrap_or(self.defaults.tile_size),
            },
        };
        if tile_size == 0 || tile_size > MAX_TILE_SIZE {
            return Err(Error::Config(format!(
                "Tile size must be between 1 and {} (got {})",
                MAX_TILE_SIZE, tile_size
            )));
        }

        let output_dir = cli
            .output_dir
            .clone()
            .or_else(|| env_value(ENV_OUTPUT_DIR).map(PathBuf::from))
            .or_else(|| self.toml.output_dir.clone())
            .unwrap_or_else(|| self.defaults.output_dir.clone());

        let request_timeout = cli
            .request_timeout_secs
            .or(self.toml.request_timeout_secs)
            .map(Duration::from_secs);

        let log_level = first_valid([
            cli.log_level.clone(),
            env_value(ENV_LOG_LEVEL),
            Some(self.toml.logging.level.clone()),
        ])
        .unwrap_or_else(|| self.defaults.log_level.clone());

        Ok(ResolvedSettings {
            api_token,
            endpoint_url,
            tile_size,
            output_dir,
            request_timeout,
            log_level,
        })
    }

    /// Resolve the API token
    ///
    /// **Priority:** CLI → `PCAT_API_TOKEN` → `BRIA_API_TOKEN` → TOML
    pub fn resolve_api_token(&self, cli_token: Option<&str>) -> Result<String> {
        let candidates = [
            ("command line", cli_token.map(str::to_string)),
            ("environment", env_value(ENV_API_TOKEN)),
            ("environment (legacy)", env_value(ENV_LEGACY_API_TOKEN)),
            ("TOML", self.toml.api_token.clone()),
        ];

        let sources: Vec<&str> = candidates
            .iter()
            .filter(|(_, value)| value.as_deref().is_some_and(is_valid_value))
            .map(|(source, _)| *source)
            .collect();

        if sources.len() > 1 {
            warn!(
                "API token found in multiple sources: {}. Using {} (highest priority).",
                sources.join(", "),
                sources[0]
            );
        }

        for (source, value) in candidates {
            if let Some(token) = value.filter(|t| is_valid_value(t)) {
                info!(token_len = token.len(), "API token loaded from {}", source);
                return Ok(token.trim().to_string());
            }
        }

        Err(Error::Config(format!(
            "API token not configured. Please configure using one of:\n\
             1. Command line: --api-token <token>\n\
             2. Environment: {}=your-token-here\n\
             3. TOML config: {} (api_token = \"your-token\")",
            ENV_API_TOKEN,
            default_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "config.toml".to_string()),
        )))
    }
}

/// Read an environment variable, treating blank values as unset
fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| is_valid_value(v))
}

fn first_valid<const N: usize>(values: [Option<String>; N]) -> Option<String> {
    values
        .into_iter()
        .flatten()
        .find(|v| is_valid_value(v))
        .map(|v| v.trim().to_string())
}
