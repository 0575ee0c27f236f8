//! Call-completion payload as sent by the voice agent SDK

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::domain::critical_path::CriticalPathSpan;
use crate::domain::metrics::{ModelSelection, TurnMetricsSample, UsageInput};
use crate::utils::compression::{EnvelopeError, decode_envelope, is_compressed_envelope};
use crate::utils::json::{
    deserialize_lenient, deserialize_lenient_f64, deserialize_lenient_vec, deserialize_opt_id,
};
use crate::utils::time::TimestampValue;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Failed to decode compressed payload: {0}")]
    Decompression(#[from] EnvelopeError),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid payload: {0}")]
    InvalidPayload(String),
}

impl IngestError {
    /// Machine-readable error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            IngestError::MissingField(_) => "MISSING_FIELD",
            _ => "INVALID_PAYLOAD",
        }
    }
}

/// A span as it arrives on the wire, before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSpan {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub span_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub trace_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub parent_span_id: Option<String>,
    #[serde(
        default,
        alias = "timestamp",
        alias = "start_time",
        deserialize_with = "deserialize_lenient"
    )]
    pub captured_at: Option<TimestampValue>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub duration_ms: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub operation_type: Option<String>,
    #[serde(default)]
    pub attributes: Option<JsonValue>,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub request_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub request_id_source: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub start_marker: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryData {
    #[serde(default, deserialize_with = "deserialize_lenient_vec")]
    pub session_traces: Vec<RawSpan>,
    #[serde(default)]
    pub performance_metrics: Option<JsonValue>,
    /// Kept verbatim for the trace summary; `critical_path` is read from it
    #[serde(default)]
    pub span_summary: Option<JsonValue>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallPayload {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub call_id: String,
    #[serde(default, deserialize_with = "deserialize_id")]
    pub agent_id: String,
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub customer_number: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub call_ended_reason: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub transcript_type: Option<String>,
    #[serde(default)]
    pub transcript_json: Option<JsonValue>,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
    #[serde(default)]
    pub dynamic_variables: Option<JsonValue>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub call_started_at: Option<TimestampValue>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub call_ended_at: Option<TimestampValue>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub duration_seconds: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_vec")]
    pub transcript_with_metrics: Vec<TurnMetricsSample>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub usage: Option<UsageInput>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub model_config: ModelSelection,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub telemetry_data: TelemetryData,
    /// Some SDK versions send spans at the top level
    #[serde(default, deserialize_with = "deserialize_lenient_vec")]
    pub session_traces: Vec<RawSpan>,
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(deserialize_opt_id(deserializer)?.unwrap_or_default())
}

impl CallPayload {
    /// Raw spans; top-level `session_traces` win when present
    pub fn raw_spans(&self) -> &[RawSpan] {
        if self.session_traces.is_empty() {
            &self.telemetry_data.session_traces
        } else {
            &self.session_traces
        }
    }

    /// `telemetry_data.span_summary.critical_path`, empty when absent or malformed
    pub fn critical_path(&self) -> Vec<CriticalPathSpan> {
        let Some(path) = self
            .telemetry_data
            .span_summary
            .as_ref()
            .and_then(|s| s.get("critical_path"))
            .filter(|p| !p.is_null())
        else {
            return Vec::new();
        };

        serde_json::from_value(path.clone()).unwrap_or_else(|e| {
            tracing::debug!(
                call_id = %self.call_id,
                error = %e,
                "Ignoring malformed critical path"
            );
            Vec::new()
        })
    }

    fn validate(self) -> Result<Self, IngestError> {
        if self.call_id.is_empty() {
            return Err(IngestError::MissingField("call_id"));
        }
        if self.agent_id.is_empty() {
            return Err(IngestError::MissingField("agent_id"));
        }
        Ok(self)
    }
}

/// Decode a request body, unwrapping a compressed envelope if present
///
/// `max_decompressed_bytes` caps the inflated size of an envelope's `data`.
/// Only unparsable JSON, a non-object document or missing ids are errors;
/// optional fields of the wrong shape are dropped.
pub fn decode_payload(
    body: &[u8],
    max_decompressed_bytes: usize,
) -> Result<CallPayload, IngestError> {
    let value: JsonValue =
        serde_json::from_slice(body).map_err(|e| IngestError::InvalidJson(e.to_string()))?;
    decode_payload_value(value, max_decompressed_bytes)
}

pub fn decode_payload_value(
    value: JsonValue,
    max_decompressed_bytes: usize,
) -> Result<CallPayload, IngestError> {
    let value = if is_compressed_envelope(&value) {
        decode_envelope(&value, max_decompressed_bytes)?
    } else {
        value
    };

    if !value.is_object() {
        return Err(IngestError::InvalidPayload(
            "expected a JSON object".to_string(),
        ));
    }

    let payload: CallPayload =
        serde_json::from_value(value).map_err(|e| IngestError::InvalidPayload(e.to_string()))?;
    payload.validate()
}
