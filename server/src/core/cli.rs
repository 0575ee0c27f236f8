use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    ENV_CONFIG, ENV_CURRENCY, ENV_DEBUG, ENV_EXCHANGE_RATE, ENV_HOST, ENV_INGEST_MAX_BODY_BYTES,
    ENV_MIN_WIDTH_PERCENT, ENV_PORT, ENV_PRICING_FILE, ENV_TURN_WINDOW_SECS,
};

#[derive(Parser)]
#[command(name = "voxtrace")]
#[command(version, about = "Voice agent call telemetry server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// Server port
    #[arg(long, short = 'p', global = true, env = ENV_PORT)]
    pub port: Option<u16>,

    /// Enable debug logging
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Maximum accepted body size for call ingestion, in bytes
    #[arg(long, global = true, env = ENV_INGEST_MAX_BODY_BYTES)]
    pub ingest_max_body_bytes: Option<usize>,

    /// Window for matching traces to conversation turns, in seconds
    #[arg(long, global = true, env = ENV_TURN_WINDOW_SECS)]
    pub turn_window_secs: Option<f64>,

    /// Minimum waterfall bar width, in percent of the timeline
    #[arg(long, global = true, env = ENV_MIN_WIDTH_PERCENT)]
    pub min_width_percent: Option<f64>,

    /// Pricing table file replacing the embedded one
    #[arg(long, global = true, env = ENV_PRICING_FILE)]
    pub pricing_file: Option<PathBuf>,

    /// Currency code costs are reported in
    #[arg(long, global = true, env = ENV_CURRENCY)]
    pub currency: Option<String>,

    /// Multiplier from pricing table currency to the reported currency
    #[arg(long, global = true, env = ENV_EXCHANGE_RATE)]
    pub exchange_rate: Option<f64>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Analyze a call payload file and print the result, without storing it
    Inspect {
        /// Payload JSON file, plain or compressed envelope
        payload: PathBuf,

        /// Turn matching window override, in seconds
        #[arg(long)]
        window_secs: Option<f64>,
    },
    /// System maintenance commands
    System {
        #[command(subcommand)]
        command: SystemCommands,
    },
}

#[derive(Subcommand, Clone, Debug)]
pub enum SystemCommands {
    /// Delete local data directory (database included). Requires confirmation.
    Prune {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub debug: bool,
    pub config: Option<PathBuf>,
    pub ingest_max_body_bytes: Option<usize>,
    pub turn_window_secs: Option<f64>,
    pub min_width_percent: Option<f64>,
    pub pricing_file: Option<PathBuf>,
    pub currency: Option<String>,
    pub exchange_rate: Option<f64>,
}

impl Cli {
    fn into_parts(self) -> (CliConfig, Option<Commands>) {
        let config = CliConfig {
            host: self.host,
            port: self.port,
            debug: self.debug,
            config: self.config,
            ingest_max_body_bytes: self.ingest_max_body_bytes,
            turn_window_secs: self.turn_window_secs,
            min_width_percent: self.min_width_percent,
            pricing_file: self.pricing_file,
            currency: self.currency,
            exchange_rate: self.exchange_rate,
        };
        (config, self.command)
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    Cli::parse().into_parts()
}
