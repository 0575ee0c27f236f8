//! Call log repository for SQLite operations

use sqlx::SqlitePool;

use crate::data::sqlite::SqliteError;
use crate::data::types::{CallLogRecord, CallLogRow};
use crate::utils::json::json_to_opt_string;

use super::parse_json_column;

/// Insert or replace a call log. `created_at` survives re-ingestion.
pub async fn upsert_call_log(pool: &SqlitePool, record: &CallLogRecord) -> Result<(), SqliteError> {
    let now = chrono::Utc::now().timestamp();
    let latency_breakdown = serde_json::to_string(&record.latency_breakdown)?;
    let turns = serde_json::to_string(&record.turns)?;

    sqlx::query(
        r#"
        INSERT INTO call_logs (
            call_id, agent_id, customer_number, call_ended_reason, transcript_type,
            transcript_json, metadata, dynamic_variables, call_started_at, call_ended_at,
            duration_seconds, avg_latency, latency_breakdown, turns, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(call_id) DO UPDATE SET
            agent_id = excluded.agent_id,
            customer_number = excluded.customer_number,
            call_ended_reason = excluded.call_ended_reason,
            transcript_type = excluded.transcript_type,
            transcript_json = excluded.transcript_json,
            metadata = excluded.metadata,
            dynamic_variables = excluded.dynamic_variables,
            call_started_at = excluded.call_started_at,
            call_ended_at = excluded.call_ended_at,
            duration_seconds = excluded.duration_seconds,
            avg_latency = excluded.avg_latency,
            latency_breakdown = excluded.latency_breakdown,
            turns = excluded.turns,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&record.call_id)
    .bind(&record.agent_id)
    .bind(&record.customer_number)
    .bind(&record.call_ended_reason)
    .bind(&record.transcript_type)
    .bind(record.transcript_json.as_ref().and_then(json_to_opt_string))
    .bind(record.metadata.as_ref().and_then(json_to_opt_string))
    .bind(record.dynamic_variables.as_ref().and_then(json_to_opt_string))
    .bind(record.call_started_at)
    .bind(record.call_ended_at)
    .bind(record.duration_seconds)
    .bind(record.avg_latency)
    .bind(latency_breakdown)
    .bind(turns)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

type CallLogTuple = (
    String,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    String,
    String,
    i64,
    i64,
);

/// Get a call log by call ID
pub async fn get_call_log(
    pool: &SqlitePool,
    call_id: &str,
) -> Result<Option<CallLogRow>, SqliteError> {
    let row = sqlx::query_as::<_, CallLogTuple>(
        r#"
        SELECT call_id, agent_id, customer_number, call_ended_reason, transcript_type,
               transcript_json, metadata, dynamic_variables, call_started_at, call_ended_at,
               duration_seconds, avg_latency, latency_breakdown, turns, created_at, updated_at
        FROM call_logs WHERE call_id = ?
        "#,
    )
    .bind(call_id)
    .fetch_optional(pool)
    .await?;

    let Some((
        call_id,
        agent_id,
        customer_number,
        call_ended_reason,
        transcript_type,
        transcript_json,
        metadata,
        dynamic_variables,
        call_started_at,
        call_ended_at,
        duration_seconds,
        avg_latency,
        latency_breakdown,
        turns,
        created_at,
        updated_at,
    )) = row
    else {
        return Ok(None);
    };

    Ok(Some(CallLogRow {
        record: CallLogRecord {
            call_id,
            agent_id,
            customer_number,
            call_ended_reason,
            transcript_type,
            transcript_json: parse_json_column(transcript_json)?,
            metadata: parse_json_column(metadata)?,
            dynamic_variables: parse_json_column(dynamic_variables)?,
            call_started_at,
            call_ended_at,
            duration_seconds,
            avg_latency,
            latency_breakdown: serde_json::from_str(&latency_breakdown)?,
            turns: serde_json::from_str(&turns)?,
        },
        created_at,
        updated_at,
    }))
}
