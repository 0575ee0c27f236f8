//! SQLite schema definitions
//!
//! Initial schema with all tables. Later changes go through `migrations`.

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Complete schema SQL
pub const SCHEMA: &str = r#"
-- =============================================================================
-- Infrastructure: Schema version tracking
-- =============================================================================
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    version INTEGER NOT NULL,
    applied_at INTEGER NOT NULL,
    description TEXT
);

CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at INTEGER NOT NULL,
    checksum TEXT NOT NULL,
    execution_time_ms INTEGER,
    success INTEGER NOT NULL DEFAULT 1
);

-- =============================================================================
-- 1. Call logs (one row per completed call)
-- Times in epoch milliseconds; JSON columns stored as TEXT
-- =============================================================================
CREATE TABLE IF NOT EXISTS call_logs (
    call_id TEXT PRIMARY KEY CHECK(length(call_id) >= 1),
    agent_id TEXT NOT NULL CHECK(length(agent_id) >= 1),
    customer_number TEXT,
    call_ended_reason TEXT,
    transcript_type TEXT,
    transcript_json TEXT,
    metadata TEXT,
    dynamic_variables TEXT,
    call_started_at REAL,
    call_ended_at REAL,
    duration_seconds REAL,
    avg_latency REAL,
    latency_breakdown TEXT NOT NULL DEFAULT '{}',
    turns TEXT NOT NULL DEFAULT '[]',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_call_logs_agent ON call_logs(agent_id, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_call_logs_started ON call_logs(call_started_at DESC);

-- =============================================================================
-- 2. Call costs
-- No FK to call_logs: each write succeeds or fails on its own
-- =============================================================================
CREATE TABLE IF NOT EXISTS call_costs (
    call_id TEXT PRIMARY KEY,
    total_llm_cost REAL NOT NULL DEFAULT 0,
    total_tts_cost REAL NOT NULL DEFAULT 0,
    total_stt_cost REAL NOT NULL DEFAULT 0,
    currency TEXT NOT NULL,
    llm_match TEXT NOT NULL,
    tts_match TEXT NOT NULL,
    stt_match TEXT NOT NULL,
    created_at INTEGER NOT NULL
);

-- =============================================================================
-- 3. Trace summaries
-- =============================================================================
CREATE TABLE IF NOT EXISTS trace_summaries (
    call_id TEXT PRIMARY KEY,
    total_spans INTEGER NOT NULL CHECK(total_spans >= 0),
    performance_summary TEXT,
    span_summary TEXT,
    critical_path TEXT,
    created_at INTEGER NOT NULL
);

-- =============================================================================
-- 4. Trace spans
-- =============================================================================
CREATE TABLE IF NOT EXISTS trace_spans (
    call_id TEXT NOT NULL,
    span_index INTEGER NOT NULL,
    span_id TEXT NOT NULL,
    trace_id TEXT,
    parent_span_id TEXT,
    name TEXT NOT NULL,
    operation_type TEXT NOT NULL,
    captured_at REAL NOT NULL,
    duration_ms REAL NOT NULL CHECK(duration_ms >= 0),
    attributes TEXT NOT NULL DEFAULT '{}',
    request_id TEXT,
    request_id_source TEXT,
    start_marker INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (call_id, span_index)
);

CREATE INDEX IF NOT EXISTS idx_trace_spans_trace ON trace_spans(call_id, trace_id);
"#;
