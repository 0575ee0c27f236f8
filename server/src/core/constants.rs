// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and platform directories)
pub const APP_NAME: &str = "VoxTrace";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "voxtrace";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".voxtrace";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "voxtrace.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "VOXTRACE_CONFIG";

// =============================================================================
// Environment Variables - Debug
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "VOXTRACE_DEBUG";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "VOXTRACE_HOST";

/// Environment variable for server port
pub const ENV_PORT: &str = "VOXTRACE_PORT";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "VOXTRACE_LOG";

// =============================================================================
// Environment Variables - Ingestion, Traces, Pricing
// =============================================================================

pub const ENV_INGEST_MAX_BODY_BYTES: &str = "VOXTRACE_INGEST_MAX_BODY_BYTES";
pub const ENV_TURN_WINDOW_SECS: &str = "VOXTRACE_TURN_WINDOW_SECS";
pub const ENV_MIN_WIDTH_PERCENT: &str = "VOXTRACE_MIN_WIDTH_PERCENT";
pub const ENV_PRICING_FILE: &str = "VOXTRACE_PRICING_FILE";
pub const ENV_CURRENCY: &str = "VOXTRACE_CURRENCY";
pub const ENV_EXCHANGE_RATE: &str = "VOXTRACE_EXCHANGE_RATE";

// =============================================================================
// Server Defaults
// =============================================================================

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default server port
pub const DEFAULT_PORT: u16 = 5390;

/// Default request body limit for call ingestion (32 MiB)
pub const DEFAULT_INGEST_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

// =============================================================================
// Trace View Defaults
// =============================================================================

/// Default turn matching window in seconds
pub const DEFAULT_TURN_WINDOW_SECS: f64 = 30.0;

/// Upper bound for the waterfall minimum bar width
pub const MAX_MIN_WIDTH_PERCENT: f64 = 5.0;

// =============================================================================
// Pricing Defaults
// =============================================================================

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_EXCHANGE_RATE: f64 = 1.0;

// =============================================================================
// Environment Variables - Storage
// =============================================================================

/// Environment variable to override data directory
pub const ENV_DATA_DIR: &str = "VOXTRACE_DATA_DIR";

// =============================================================================
// SQLite Database
// =============================================================================

/// SQLite database filename
pub const SQLITE_DB_FILENAME: &str = "voxtrace.db";

/// SQLite connection pool max connections
pub const SQLITE_MAX_CONNECTIONS: u32 = 5;

/// SQLite busy timeout in seconds
pub const SQLITE_BUSY_TIMEOUT_SECS: u64 = 30;

/// SQLite cache size (negative = KB, so -64000 = 64MB)
pub const SQLITE_CACHE_SIZE: &str = "-64000";

/// Pages between automatic WAL checkpoints
pub const SQLITE_WAL_AUTOCHECKPOINT: &str = "1000";

/// Interval of the background WAL checkpoint task
pub const SQLITE_CHECKPOINT_INTERVAL_SECS: u64 = 300;

// =============================================================================
// Shutdown
// =============================================================================

/// Maximum time to wait for background tasks on shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
