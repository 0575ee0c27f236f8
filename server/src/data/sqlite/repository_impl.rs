//! CallRepository implementation for SQLite

use async_trait::async_trait;

use crate::data::error::DataError;
use crate::data::traits::CallRepository;
use crate::data::types::{CallLogRecord, CallLogRow, TraceSummaryRecord, TraceSummaryRow};
use crate::domain::metrics::CallCosts;
use crate::domain::traces::Span;

use super::SqliteService;
use super::repositories::{call_cost, call_log, trace};

#[async_trait]
impl CallRepository for SqliteService {
    // ==================== Writes ====================

    async fn upsert_call_log(&self, record: &CallLogRecord) -> Result<(), DataError> {
        call_log::upsert_call_log(self.pool(), record)
            .await
            .map_err(Into::into)
    }

    async fn upsert_call_costs(&self, call_id: &str, costs: &CallCosts) -> Result<(), DataError> {
        call_cost::upsert_call_costs(self.pool(), call_id, costs)
            .await
            .map_err(Into::into)
    }

    async fn upsert_trace_summary(&self, record: &TraceSummaryRecord) -> Result<(), DataError> {
        trace::upsert_trace_summary(self.pool(), record)
            .await
            .map_err(Into::into)
    }

    async fn replace_trace_spans(&self, call_id: &str, spans: &[Span]) -> Result<u64, DataError> {
        trace::replace_trace_spans(self.pool(), call_id, spans)
            .await
            .map_err(Into::into)
    }

    // ==================== Reads ====================

    async fn get_call_log(&self, call_id: &str) -> Result<Option<CallLogRow>, DataError> {
        call_log::get_call_log(self.pool(), call_id)
            .await
            .map_err(Into::into)
    }

    async fn get_call_costs(&self, call_id: &str) -> Result<Option<CallCosts>, DataError> {
        call_cost::get_call_costs(self.pool(), call_id)
            .await
            .map_err(Into::into)
    }

    async fn get_trace_summary(
        &self,
        call_id: &str,
    ) -> Result<Option<TraceSummaryRow>, DataError> {
        trace::get_trace_summary(self.pool(), call_id)
            .await
            .map_err(Into::into)
    }

    async fn list_trace_spans(&self, call_id: &str) -> Result<Vec<Span>, DataError> {
        trace::list_trace_spans(self.pool(), call_id)
            .await
            .map_err(Into::into)
    }
}
