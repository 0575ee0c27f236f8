//! Records written and read through `CallRepository`

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::domain::critical_path::CriticalPathAnalysis;
use crate::domain::metrics::LatencyBreakdown;
use crate::domain::traces::ConversationTurn;

// ============================================================================
// Call log
// ============================================================================

/// One completed call with its latency aggregate
///
/// Timestamps are epoch milliseconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallLogRecord {
    pub call_id: String,
    pub agent_id: String,
    pub customer_number: Option<String>,
    pub call_ended_reason: Option<String>,
    pub transcript_type: Option<String>,
    pub transcript_json: Option<JsonValue>,
    pub metadata: Option<JsonValue>,
    pub dynamic_variables: Option<JsonValue>,
    pub call_started_at: Option<f64>,
    pub call_ended_at: Option<f64>,
    pub duration_seconds: Option<f64>,
    /// Mean end-to-end turn latency in seconds
    pub avg_latency: Option<f64>,
    pub latency_breakdown: LatencyBreakdown,
    /// Normalized turns, kept for the trace view
    pub turns: Vec<ConversationTurn>,
}

/// Stored call log (unix seconds for row timestamps)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLogRow {
    #[serde(flatten)]
    pub record: CallLogRecord,
    pub created_at: i64,
    pub updated_at: i64,
}

// ============================================================================
// Trace summary
// ============================================================================

/// Per-call span statistics, written only when raw spans were present
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceSummaryRecord {
    pub call_id: String,
    pub total_spans: i64,
    pub performance_summary: Option<JsonValue>,
    pub span_summary: Option<JsonValue>,
    pub critical_path: Option<CriticalPathAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceSummaryRow {
    #[serde(flatten)]
    pub record: TraceSummaryRecord,
    pub created_at: i64,
}
