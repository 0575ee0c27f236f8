//! Core application

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::api::ApiServer;
use crate::core::banner;
use crate::core::cli::{self, CliConfig, Commands, SystemCommands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::core::storage::AppStorage;
use crate::data::{CallLogRecord, SqliteService};
use crate::domain::calls::{CallIngestPipeline, analyze_call, decode_payload};
use crate::domain::critical_path::CriticalPathAnalysis;
use crate::domain::metrics::CallCosts;
use crate::domain::pricing::PricingService;
use crate::domain::traces::{CallTraceView, build_call_trace_view};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub storage: AppStorage,
    pub database: Arc<SqliteService>,
    pub pricing: Arc<PricingService>,
    pub pipeline: Arc<CallIngestPipeline>,
}

/// Output of `voxtrace inspect`
#[derive(Serialize)]
struct InspectReport {
    call: CallLogRecord,
    costs: CallCosts,
    critical_path: CriticalPathAnalysis,
    span_count: usize,
    trace: CallTraceView,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();

        let (cli_config, command) = cli::parse();
        Self::init_logging(cli_config.debug);

        tracing::debug!("Application starting");
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::System {
                command: system_cmd,
            }) => Self::handle_system_command(system_cmd),
            Some(Commands::Inspect {
                payload,
                window_secs,
            }) => Self::inspect(&cli_config, &payload, window_secs),
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config).await?;
                Self::start_server(app).await
            }
        }
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        let storage = AppStorage::init().await?;

        let database = Arc::new(
            SqliteService::init(&storage)
                .await
                .context("Failed to initialize database")?,
        );
        let pricing = Arc::new(Self::init_pricing(&config)?);
        let pipeline = Arc::new(CallIngestPipeline::new(
            database.clone(),
            pricing.clone(),
            config.ingest.max_body_bytes,
        ));
        let shutdown = ShutdownService::new(database.clone());

        Ok(Self {
            shutdown,
            config,
            storage,
            database,
            pricing,
            pipeline,
        })
    }

    fn init_pricing(config: &AppConfig) -> Result<PricingService> {
        PricingService::init(
            config.pricing.file.as_deref(),
            &config.pricing.currency,
            config.pricing.exchange_rate,
        )
        .context("Failed to initialize pricing service")
    }

    /// Analyze a payload file offline and print the result as JSON
    fn inspect(cli: &CliConfig, payload_path: &Path, window_secs: Option<f64>) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let pricing = Self::init_pricing(&config)?;

        let mut options = config.traces.view_options();
        if let Some(window_secs) = window_secs {
            if !(window_secs.is_finite() && window_secs > 0.0) {
                anyhow::bail!("--window-secs must be greater than 0 (got {})", window_secs);
            }
            options.turn_window_ms = window_secs * 1000.0;
        }

        let body = std::fs::read(payload_path)
            .with_context(|| format!("Failed to read payload file: {}", payload_path.display()))?;
        let payload = decode_payload(&body, config.ingest.max_body_bytes)
            .with_context(|| format!("Invalid payload: {}", payload_path.display()))?;

        let analysis = analyze_call(payload, &pricing);
        let trace = build_call_trace_view(&analysis.spans, &analysis.record.turns, &options);

        let report = InspectReport {
            span_count: analysis.spans.len(),
            call: analysis.record,
            costs: analysis.costs,
            critical_path: analysis.critical_path,
            trace,
        };

        println!("{}", serde_json::to_string_pretty(&report)?);
        Ok(())
    }

    fn handle_system_command(cmd: SystemCommands) -> Result<()> {
        match cmd {
            SystemCommands::Prune { yes } => Self::prune_data(yes),
        }
    }

    fn prune_data(skip_confirm: bool) -> Result<()> {
        let data_dir = AppStorage::resolve_data_dir();

        if !data_dir.exists() {
            println!(
                "Nothing to prune. Data directory does not exist: {}",
                data_dir.display()
            );
            return Ok(());
        }

        let data_dir = data_dir.canonicalize().unwrap_or(data_dir);

        println!("This will permanently delete the local data directory:");
        println!("  {}", data_dir.display());
        println!();
        println!(
            "Make sure the server is not running. \
             Deleting data while the server is running will cause data corruption."
        );

        if !skip_confirm {
            print!("\nContinue? [y/N] ");
            std::io::Write::flush(&mut std::io::stdout())?;

            let mut input = String::new();
            std::io::stdin().read_line(&mut input)?;

            if !matches!(input.trim().to_lowercase().as_str(), "y" | "yes") {
                println!("Aborted.");
                return Ok(());
            }
        }

        std::fs::remove_dir_all(&data_dir)
            .with_context(|| format!("Failed to delete data directory: {}", data_dir.display()))?;
        println!("Pruned: {}", data_dir.display());
        Ok(())
    }

    fn init_logging(debug: bool) {
        let default_filter = if debug {
            format!("info,{}=debug", APP_NAME_LOWER)
        } else {
            format!("info,{}=info", APP_NAME_LOWER)
        };

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        app.start_background_tasks().await;

        banner::print_banner(&app.config, &app.storage.data_dir().display().to_string());

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }

    pub async fn start_background_tasks(&self) {
        self.shutdown
            .register(
                self.database
                    .start_checkpoint_task(self.shutdown.subscribe()),
            )
            .await;

        tracing::debug!("Background tasks started");
    }
}
