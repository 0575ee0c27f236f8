//! Repository trait for call persistence
//!
//! The ingestion pipeline and HTTP handlers only see this trait. Each method
//! is one independent write or read; callers decide how to combine failures.

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::types::{CallLogRecord, CallLogRow, TraceSummaryRecord, TraceSummaryRow};
use crate::domain::metrics::CallCosts;
use crate::domain::traces::Span;

#[async_trait]
pub trait CallRepository: Send + Sync {
    // ==================== Writes ====================

    /// Insert or replace the call log
    async fn upsert_call_log(&self, record: &CallLogRecord) -> Result<(), DataError>;

    /// Insert or replace the call's cost triple
    async fn upsert_call_costs(&self, call_id: &str, costs: &CallCosts) -> Result<(), DataError>;

    /// Insert or replace the call's trace summary
    async fn upsert_trace_summary(&self, record: &TraceSummaryRecord) -> Result<(), DataError>;

    /// Replace all spans stored for a call. Returns the number written.
    async fn replace_trace_spans(&self, call_id: &str, spans: &[Span]) -> Result<u64, DataError>;

    // ==================== Reads ====================

    async fn get_call_log(&self, call_id: &str) -> Result<Option<CallLogRow>, DataError>;

    async fn get_call_costs(&self, call_id: &str) -> Result<Option<CallCosts>, DataError>;

    async fn get_trace_summary(&self, call_id: &str)
    -> Result<Option<TraceSummaryRow>, DataError>;

    /// Spans in their original ingestion order
    async fn list_trace_spans(&self, call_id: &str) -> Result<Vec<Span>, DataError>;
}
