//! Wire records to domain records
//!
//! Timestamps become epoch milliseconds here and nowhere else.

use serde_json::{Map as JsonMap, Value as JsonValue};

use super::payload::RawSpan;
use crate::domain::metrics::TurnMetricsSample;
use crate::domain::traces::{ConversationTurn, OperationType, Span};
use crate::utils::string::non_empty;

/// Normalize raw spans. Missing times fall back to `fallback_ms` (call start), then 0.
pub fn normalize_spans(raw: &[RawSpan], fallback_ms: Option<f64>) -> Vec<Span> {
    raw.iter()
        .enumerate()
        .map(|(index, span)| normalize_span(index, span, fallback_ms))
        .collect()
}

fn normalize_span(index: usize, raw: &RawSpan, fallback_ms: Option<f64>) -> Span {
    let span_id = raw
        .span_id
        .clone()
        .unwrap_or_else(|| format!("span-{}", index));

    let captured_at = raw
        .captured_at
        .as_ref()
        .and_then(|ts| ts.to_epoch_millis())
        .or(fallback_ms)
        .unwrap_or(0.0);

    let operation_type = raw
        .operation_type
        .as_deref()
        .map(OperationType::parse)
        .unwrap_or_default();

    let name = non_empty(raw.name.clone()).unwrap_or_else(|| operation_type.to_string());

    Span {
        span_id,
        trace_id: raw.trace_id.clone(),
        parent_span_id: raw.parent_span_id.clone(),
        captured_at,
        duration_ms: raw.duration_ms.unwrap_or(0.0).max(0.0),
        name,
        operation_type,
        attributes: attributes_map(raw.attributes.as_ref()),
        request_id: raw.request_id.clone(),
        request_id_source: non_empty(raw.request_id_source.clone()),
        start_marker: raw.start_marker.unwrap_or(false),
    }
}

fn attributes_map(value: Option<&JsonValue>) -> JsonMap<String, JsonValue> {
    match value {
        Some(JsonValue::Object(map)) => map.clone(),
        None | Some(JsonValue::Null) => JsonMap::new(),
        Some(other) => {
            tracing::debug!(kind = ?other, "Span attributes are not an object, wrapping");
            let mut map = JsonMap::new();
            map.insert("value".to_string(), other.clone());
            map
        }
    }
}

/// Build conversation turns from per-turn metric samples
pub fn normalize_turns(
    samples: &[TurnMetricsSample],
    fallback_ms: Option<f64>,
) -> Vec<ConversationTurn> {
    samples
        .iter()
        .enumerate()
        .map(|(index, sample)| ConversationTurn {
            turn_id: sample
                .turn_id
                .clone()
                .unwrap_or_else(|| format!("turn-{}", index + 1)),
            user_transcript: non_empty(sample.user_transcript.clone()),
            agent_response: non_empty(sample.agent_response.clone()),
            timestamp: sample
                .timestamp
                .as_ref()
                .and_then(|ts| ts.to_epoch_millis())
                .or(fallback_ms)
                .unwrap_or(0.0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: JsonValue) -> RawSpan {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_seconds_and_millis_normalized() {
        let spans = normalize_spans(
            &[
                raw(json!({"span_id": "a", "captured_at": 1_700_000_000.5})),
                raw(json!({"span_id": "b", "captured_at": 1_700_000_000_500.0})),
                raw(json!({"span_id": "c", "timestamp": "2023-11-14T22:13:20.500Z"})),
            ],
            None,
        );
        assert_eq!(spans[0].captured_at, 1_700_000_000_500.0);
        assert_eq!(spans[1].captured_at, 1_700_000_000_500.0);
        assert_eq!(spans[2].captured_at, 1_700_000_000_500.0);
    }

    #[test]
    fn test_synthetic_ids_and_defaults() {
        let spans = normalize_spans(
            &[raw(json!({})), raw(json!({"span_id": "", "operation_type": "TTS"}))],
            Some(42.0),
        );
        assert_eq!(spans[0].span_id, "span-0");
        assert_eq!(spans[1].span_id, "span-1");
        assert_eq!(spans[0].name, "other");
        assert_eq!(spans[1].name, "tts");
        assert_eq!(spans[1].operation_type, OperationType::Tts);
        assert_eq!(spans[0].captured_at, 42.0);
        assert_eq!(spans[0].duration_ms, 0.0);
        assert!(spans[0].trace_id.is_none());
    }

    #[test]
    fn test_negative_duration_clamped() {
        let spans = normalize_spans(&[raw(json!({"duration_ms": -5}))], None);
        assert_eq!(spans[0].duration_ms, 0.0);
    }

    #[test]
    fn test_empty_parent_is_none() {
        let spans = normalize_spans(&[raw(json!({"trace_id": "t", "parent_span_id": ""}))], None);
        assert!(spans[0].parent_span_id.is_none());
    }

    #[test]
    fn test_attributes() {
        let spans = normalize_spans(
            &[
                raw(json!({"attributes": {"error": true}})),
                raw(json!({"attributes": "free text"})),
            ],
            None,
        );
        assert!(spans[0].is_error());
        assert_eq!(spans[1].attributes.get("value"), Some(&json!("free text")));
    }

    #[test]
    fn test_turns() {
        let samples: Vec<TurnMetricsSample> = serde_json::from_value(json!([
            {"turn_id": "t1", "user_transcript": "hi", "timestamp": 1_700_000_000},
            {"user_transcript": "", "agent_response": "hello"}
        ]))
        .unwrap();
        let turns = normalize_turns(&samples, Some(5.0));
        assert_eq!(turns[0].turn_id, "t1");
        assert_eq!(turns[0].timestamp, 1_700_000_000_000.0);
        assert_eq!(turns[1].turn_id, "turn-2");
        assert_eq!(turns[1].user_transcript, None);
        assert_eq!(turns[1].agent_response.as_deref(), Some("hello"));
        assert_eq!(turns[1].timestamp, 5.0);
    }
}
