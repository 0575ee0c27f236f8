//! Trace model types
//!
//! All timestamps are epoch milliseconds (`f64`), normalized at ingestion.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};

use crate::utils::string::contains_ignore_case;

/// Span names that mark the beginning of a trace
pub const START_MARKER_NAMES: &[&str] = &[
    "session_start",
    "call_start",
    "conversation_start",
    "turn_start",
    "agent_session",
];

/// Attribute key that tags a span's role in the trace
pub const SPAN_ROLE_ATTRIBUTE: &str = "span.role";

/// Pipeline stage a span belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    Stt,
    Llm,
    Tts,
    Tool,
    UserInteraction,
    AssistantInteraction,
    #[default]
    #[serde(other)]
    Other,
}

impl OperationType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            OperationType::Stt => "stt",
            OperationType::Llm => "llm",
            OperationType::Tts => "tts",
            OperationType::Tool => "tool",
            OperationType::UserInteraction => "user_interaction",
            OperationType::AssistantInteraction => "assistant_interaction",
            OperationType::Other => "other",
        }
    }

    /// Parse a stored or reported operation type; unknown values map to `Other`
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "stt" => OperationType::Stt,
            "llm" => OperationType::Llm,
            "tts" => OperationType::Tts,
            "tool" => OperationType::Tool,
            "user_interaction" => OperationType::UserInteraction,
            "assistant_interaction" => OperationType::AssistantInteraction,
            _ => OperationType::Other,
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single timed unit of pipeline work
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub span_id: String,
    pub trace_id: Option<String>,
    pub parent_span_id: Option<String>,
    pub captured_at: f64,
    pub duration_ms: f64,
    pub name: String,
    pub operation_type: OperationType,
    #[serde(default)]
    pub attributes: JsonMap<String, JsonValue>,
    pub request_id: Option<String>,
    pub request_id_source: Option<String>,
    #[serde(default)]
    pub start_marker: bool,
}

impl Span {
    pub fn end_time(&self) -> f64 {
        self.captured_at + self.duration_ms
    }

    /// True if the span reports a failure through its attributes
    pub fn is_error(&self) -> bool {
        if self.attributes.get("error").and_then(JsonValue::as_bool) == Some(true) {
            return true;
        }
        ["status", "otel.status_code"].iter().any(|key| {
            self.attributes
                .get(*key)
                .and_then(JsonValue::as_str)
                .is_some_and(|s| s.eq_ignore_ascii_case("error"))
        })
    }

    /// Explicit start tag set by the emitting SDK
    pub fn has_start_tag(&self) -> bool {
        self.start_marker
            || self
                .attributes
                .get(SPAN_ROLE_ATTRIBUTE)
                .and_then(JsonValue::as_str)
                .is_some_and(|s| s.eq_ignore_ascii_case("start"))
    }

    /// Name-based start detection for data captured before explicit tags existed
    pub fn has_start_name(&self) -> bool {
        let name = self.name.to_lowercase();
        START_MARKER_NAMES.contains(&name.as_str()) || contains_ignore_case(&name, "start")
    }
}

/// One exchange of the conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub turn_id: String,
    pub user_transcript: Option<String>,
    pub agent_response: Option<String>,
    pub timestamp: f64,
}

/// Which rule picked the root span of a trace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RootReason {
    NoParent,
    StartMarker,
    Earliest,
}

/// All spans sharing one trace id
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceGroup {
    pub trace_id: String,
    /// Sorted by `captured_at`
    pub spans: Vec<Span>,
    pub root_span: Span,
    pub root_reason: RootReason,
    #[serde(skip)]
    pub(crate) root_index: usize,
    pub start_time: f64,
    pub end_time: f64,
    pub duration_ms: f64,
    pub span_count: usize,
    pub error_count: usize,
    pub operation_summary: String,
}

/// A conversation turn (or a stand-in for unclaimed traces) with its pipeline activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationTurnWithTraces {
    pub turn_id: String,
    pub user_transcript: Option<String>,
    pub agent_response: Option<String>,
    pub timestamp: f64,
    pub matched_traces: Vec<TraceGroup>,
    pub unmatched_spans: Vec<Span>,
    pub is_synthetic: bool,
}

#[cfg(test)]
pub(crate) fn test_span(span_id: &str, trace_id: Option<&str>, captured_at: f64) -> Span {
    Span {
        span_id: span_id.to_string(),
        trace_id: trace_id.map(str::to_string),
        parent_span_id: None,
        captured_at,
        duration_ms: 100.0,
        name: format!("op_{span_id}"),
        operation_type: OperationType::Other,
        attributes: JsonMap::new(),
        request_id: None,
        request_id_source: None,
        start_marker: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_operation_type_serde() {
        let op: OperationType = serde_json::from_value(json!("user_interaction")).unwrap();
        assert_eq!(op, OperationType::UserInteraction);
        let op: OperationType = serde_json::from_value(json!("vad")).unwrap();
        assert_eq!(op, OperationType::Other);
        assert_eq!(serde_json::to_value(OperationType::Tts).unwrap(), json!("tts"));
    }

    #[test]
    fn test_operation_type_parse() {
        assert_eq!(OperationType::parse(" LLM "), OperationType::Llm);
        assert_eq!(OperationType::parse("whatever"), OperationType::Other);
        assert_eq!(OperationType::AssistantInteraction.to_string(), "assistant_interaction");
    }

    #[test]
    fn test_error_detection() {
        let mut span = test_span("s1", Some("t1"), 0.0);
        assert!(!span.is_error());

        span.attributes.insert("error".into(), json!(true));
        assert!(span.is_error());

        span.attributes.clear();
        span.attributes.insert("status".into(), json!("ERROR"));
        assert!(span.is_error());

        span.attributes.clear();
        span.attributes.insert("otel.status_code".into(), json!("Error"));
        assert!(span.is_error());

        span.attributes.clear();
        span.attributes.insert("error".into(), json!("false"));
        assert!(!span.is_error());
    }

    #[test]
    fn test_start_detection() {
        let mut span = test_span("s1", Some("t1"), 0.0);
        assert!(!span.has_start_tag());
        assert!(!span.has_start_name());

        span.name = "agent_session".into();
        assert!(span.has_start_name());

        span.name = "pipeline.startup".into();
        assert!(span.has_start_name());

        span.attributes.insert(SPAN_ROLE_ATTRIBUTE.into(), json!("start"));
        assert!(span.has_start_tag());

        span.attributes.clear();
        span.start_marker = true;
        assert!(span.has_start_tag());
    }

    #[test]
    fn test_end_time() {
        let span = test_span("s1", None, 1_000.0);
        assert_eq!(span.end_time(), 1_100.0);
    }
}
