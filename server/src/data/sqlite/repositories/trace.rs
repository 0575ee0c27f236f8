//! Trace summary and span repository for SQLite operations

use serde_json::{Map as JsonMap, Value as JsonValue};
use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{TraceSummaryRecord, TraceSummaryRow};
use crate::domain::traces::{OperationType, Span};
use crate::utils::json::json_to_opt_string;

use super::parse_json_column;

// ============================================================================
// Trace summaries
// ============================================================================

pub async fn upsert_trace_summary(
    pool: &SqlitePool,
    record: &TraceSummaryRecord,
) -> Result<(), SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let critical_path = record
        .critical_path
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO trace_summaries (
            call_id, total_spans, performance_summary, span_summary, critical_path, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.call_id)
    .bind(record.total_spans)
    .bind(record.performance_summary.as_ref().and_then(json_to_opt_string))
    .bind(record.span_summary.as_ref().and_then(json_to_opt_string))
    .bind(critical_path)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

type TraceSummaryTuple = (
    String,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
    i64,
);

pub async fn get_trace_summary(
    pool: &SqlitePool,
    call_id: &str,
) -> Result<Option<TraceSummaryRow>, SqliteError> {
    let row = sqlx::query_as::<_, TraceSummaryTuple>(
        r#"
        SELECT call_id, total_spans, performance_summary, span_summary, critical_path, created_at
        FROM trace_summaries WHERE call_id = ?
        "#,
    )
    .bind(call_id)
    .fetch_optional(pool)
    .await?;

    let Some((call_id, total_spans, performance_summary, span_summary, critical_path, created_at)) =
        row
    else {
        return Ok(None);
    };

    Ok(Some(TraceSummaryRow {
        record: TraceSummaryRecord {
            call_id,
            total_spans,
            performance_summary: parse_json_column(performance_summary)?,
            span_summary: parse_json_column(span_summary)?,
            critical_path: critical_path
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
        },
        created_at,
    }))
}

// ============================================================================
// Spans
// ============================================================================

/// Replace all spans of a call in one transaction
pub async fn replace_trace_spans(
    pool: &SqlitePool,
    call_id: &str,
    spans: &[Span],
) -> Result<u64, SqliteError> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM trace_spans WHERE call_id = ?")
        .bind(call_id)
        .execute(&mut *tx)
        .await?;

    let mut written = 0;
    for (index, span) in spans.iter().enumerate() {
        let attributes = serde_json::to_string(&span.attributes)?;
        let result = sqlx::query(
            r#"
            INSERT INTO trace_spans (
                call_id, span_index, span_id, trace_id, parent_span_id, name, operation_type,
                captured_at, duration_ms, attributes, request_id, request_id_source, start_marker
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(call_id)
        .bind(index as i64)
        .bind(&span.span_id)
        .bind(&span.trace_id)
        .bind(&span.parent_span_id)
        .bind(&span.name)
        .bind(span.operation_type.as_str())
        .bind(span.captured_at)
        .bind(span.duration_ms)
        .bind(attributes)
        .bind(&span.request_id)
        .bind(&span.request_id_source)
        .bind(span.start_marker)
        .execute(&mut *tx)
        .await?;
        written += result.rows_affected();
    }

    tx.commit().await?;
    Ok(written)
}

type SpanTuple = (
    String,
    Option<String>,
    Option<String>,
    String,
    String,
    f64,
    f64,
    String,
    Option<String>,
    Option<String>,
    bool,
);

/// Spans of a call in ingestion order
pub async fn list_trace_spans(pool: &SqlitePool, call_id: &str) -> Result<Vec<Span>, SqliteError> {
    let rows = sqlx::query_as::<_, SpanTuple>(
        r#"
        SELECT span_id, trace_id, parent_span_id, name, operation_type, captured_at,
               duration_ms, attributes, request_id, request_id_source, start_marker
        FROM trace_spans WHERE call_id = ?
        ORDER BY span_index
        "#,
    )
    .bind(call_id)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(
            |(
                span_id,
                trace_id,
                parent_span_id,
                name,
                operation_type,
                captured_at,
                duration_ms,
                attributes,
                request_id,
                request_id_source,
                start_marker,
            )|
             -> Result<Span, SqliteError> {
                let attributes: JsonMap<String, JsonValue> = serde_json::from_str(&attributes)?;
                Ok(Span {
                    span_id,
                    trace_id,
                    parent_span_id,
                    captured_at,
                    duration_ms,
                    name,
                    operation_type: OperationType::parse(&operation_type),
                    attributes,
                    request_id,
                    request_id_source,
                    start_marker,
                })
            },
        )
        .collect()
}
