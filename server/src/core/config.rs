use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::domain::traces::{DEFAULT_MIN_WIDTH_PERCENT, TraceViewOptions, WaterfallOptions};
use crate::utils::path::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_CURRENCY, DEFAULT_EXCHANGE_RATE, DEFAULT_HOST,
    DEFAULT_INGEST_MAX_BODY_BYTES, DEFAULT_PORT, DEFAULT_TURN_WINDOW_SECS, MAX_MIN_WIDTH_PERCENT,
};

// =============================================================================
// File Config Structs (for JSON parsing)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Call ingestion configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct IngestFileConfig {
    pub max_body_bytes: Option<usize>,
}

/// Trace view configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TracesFileConfig {
    pub turn_window_secs: Option<f64>,
    pub min_width_percent: Option<f64>,
}

/// Pricing configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PricingFileConfig {
    pub file: Option<String>,
    pub currency: Option<String>,
    pub exchange_rate: Option<f64>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub ingest: Option<IngestFileConfig>,
    pub traces: Option<TracesFileConfig>,
    pub pricing: Option<PricingFileConfig>,
    pub debug: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        // Server
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
            if server.port.is_some() {
                tracing::trace!(port = ?server.port, "Merging server.port");
                current.port = server.port;
            }
        }

        // Ingest
        if let Some(ingest) = other.ingest {
            let current = self.ingest.get_or_insert_with(IngestFileConfig::default);
            if ingest.max_body_bytes.is_some() {
                tracing::trace!(
                    max_body_bytes = ?ingest.max_body_bytes,
                    "Merging ingest.max_body_bytes"
                );
                current.max_body_bytes = ingest.max_body_bytes;
            }
        }

        // Traces
        if let Some(traces) = other.traces {
            let current = self.traces.get_or_insert_with(TracesFileConfig::default);
            if traces.turn_window_secs.is_some() {
                tracing::trace!(
                    turn_window_secs = ?traces.turn_window_secs,
                    "Merging traces.turn_window_secs"
                );
                current.turn_window_secs = traces.turn_window_secs;
            }
            if traces.min_width_percent.is_some() {
                tracing::trace!(
                    min_width_percent = ?traces.min_width_percent,
                    "Merging traces.min_width_percent"
                );
                current.min_width_percent = traces.min_width_percent;
            }
        }

        // Pricing
        if let Some(pricing) = other.pricing {
            let current = self.pricing.get_or_insert_with(PricingFileConfig::default);
            if pricing.file.is_some() {
                tracing::trace!(file = ?pricing.file, "Merging pricing.file");
                current.file = pricing.file;
            }
            if pricing.currency.is_some() {
                tracing::trace!(currency = ?pricing.currency, "Merging pricing.currency");
                current.currency = pricing.currency;
            }
            if pricing.exchange_rate.is_some() {
                tracing::trace!(
                    exchange_rate = ?pricing.exchange_rate,
                    "Merging pricing.exchange_rate"
                );
                current.exchange_rate = pricing.exchange_rate;
            }
        }

        // Debug
        if other.debug.is_some() {
            tracing::trace!(debug = ?other.debug, "Merging debug");
            self.debug = other.debug;
        }
    }
}

// =============================================================================
// Runtime Config Structs (final merged configuration)
// =============================================================================

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Call ingestion configuration
#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub max_body_bytes: usize,
}

/// Trace view defaults; the trace endpoint may override both per request
#[derive(Debug, Clone)]
pub struct TracesConfig {
    pub turn_window_secs: f64,
    pub min_width_percent: f64,
}

impl TracesConfig {
    pub fn view_options(&self) -> TraceViewOptions {
        TraceViewOptions {
            turn_window_ms: self.turn_window_secs * 1000.0,
            waterfall: WaterfallOptions {
                min_width_percent: self.min_width_percent,
                ..WaterfallOptions::default()
            },
        }
    }
}

/// Pricing configuration
#[derive(Debug, Clone)]
pub struct PricingConfig {
    /// Replaces the embedded pricing table when set
    pub file: Option<PathBuf>,
    pub currency: String,
    pub exchange_rate: f64,
}

/// Final application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub ingest: IngestConfig,
    pub traces: TracesConfig,
    pub pricing: PricingConfig,
    pub debug: bool,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.voxtrace/voxtrace.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.voxtrace/voxtrace.json) - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        Self::layer(cli, file_config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn layer(cli: &CliConfig, file_config: FileConfig) -> Result<Self> {
        let file_server = file_config.server.unwrap_or_default();
        let file_ingest = file_config.ingest.unwrap_or_default();
        let file_traces = file_config.traces.unwrap_or_default();
        let file_pricing = file_config.pricing.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let port = cli.port.or(file_server.port).unwrap_or(DEFAULT_PORT);

        let max_body_bytes = cli
            .ingest_max_body_bytes
            .or(file_ingest.max_body_bytes)
            .unwrap_or(DEFAULT_INGEST_MAX_BODY_BYTES);

        let traces = TracesConfig {
            turn_window_secs: cli
                .turn_window_secs
                .or(file_traces.turn_window_secs)
                .unwrap_or(DEFAULT_TURN_WINDOW_SECS),
            min_width_percent: cli
                .min_width_percent
                .or(file_traces.min_width_percent)
                .unwrap_or(DEFAULT_MIN_WIDTH_PERCENT),
        };

        // pricing.file: CLI path as given, file config path expanded
        let pricing_file = cli
            .pricing_file
            .clone()
            .or_else(|| file_pricing.file.as_deref().map(expand_path));

        let pricing = PricingConfig {
            file: pricing_file,
            currency: cli
                .currency
                .clone()
                .or(file_pricing.currency)
                .map(|c| c.trim().to_uppercase())
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            exchange_rate: cli
                .exchange_rate
                .or(file_pricing.exchange_rate)
                .unwrap_or(DEFAULT_EXCHANGE_RATE),
        };

        let debug = cli.debug || file_config.debug.unwrap_or(false);

        let config = Self {
            server: ServerConfig { host, port },
            ingest: IngestConfig { max_body_bytes },
            traces,
            pricing,
            debug,
        };

        // Validate configuration
        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            port = config.server.port,
            debug = config.debug,
            ingest_max_body_bytes = config.ingest.max_body_bytes,
            turn_window_secs = config.traces.turn_window_secs,
            min_width_percent = config.traces.min_width_percent,
            pricing_file = ?config.pricing.file,
            currency = %config.pricing.currency,
            exchange_rate = config.pricing.exchange_rate,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Validate the configuration for consistency and correctness
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }

        // Port must be non-zero (port 0 would cause a random bind)
        if self.server.port == 0 {
            anyhow::bail!("Configuration error: server.port must be greater than 0");
        }

        if self.ingest.max_body_bytes == 0 {
            anyhow::bail!("Configuration error: ingest.max_body_bytes must be greater than 0");
        }

        if !(self.traces.turn_window_secs.is_finite() && self.traces.turn_window_secs > 0.0) {
            anyhow::bail!(
                "Configuration error: traces.turn_window_secs must be greater than 0 (got {})",
                self.traces.turn_window_secs
            );
        }

        let min_width = self.traces.min_width_percent;
        if !(min_width > 0.0 && min_width <= MAX_MIN_WIDTH_PERCENT) {
            anyhow::bail!(
                "Configuration error: traces.min_width_percent must be in (0, {}] (got {})",
                MAX_MIN_WIDTH_PERCENT,
                min_width
            );
        }

        if self.pricing.currency.is_empty() {
            anyhow::bail!("Configuration error: pricing.currency must not be empty");
        }

        if !(self.pricing.exchange_rate.is_finite() && self.pricing.exchange_rate > 0.0) {
            anyhow::bail!(
                "Configuration error: pricing.exchange_rate must be greater than 0 (got {})",
                self.pricing.exchange_rate
            );
        }

        if is_all_interfaces(&self.server.host) {
            tracing::warn!(
                host = %self.server.host,
                "Ingestion endpoint is unauthenticated and bound to all interfaces"
            );
        }

        Ok(())
    }
}

/// Get the profile config path (~/.voxtrace/voxtrace.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}

/// Check if host binds to all network interfaces
pub(crate) fn is_all_interfaces(host: &str) -> bool {
    matches!(host, "0.0.0.0" | "::" | "[::]")
}
