//! Time-window alignment of traces to conversation turns

use super::types::{ConversationTurn, ConversationTurnWithTraces, Span, TraceGroup};
use crate::utils::string::truncate_id;

/// Default matching window around a turn timestamp
pub const DEFAULT_TURN_WINDOW_MS: f64 = 30_000.0;

/// Characters of the trace id kept in synthetic turn ids
pub const SYNTHETIC_TURN_ID_CHARS: usize = 8;

/// Output of [`match_traces_to_turns`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnAlignment {
    /// Real and synthetic entries, ordered by timestamp
    pub turns: Vec<ConversationTurnWithTraces>,
    /// Orphan spans that fell outside every turn window
    pub unclaimed_spans: Vec<Span>,
}

/// Align trace groups (and orphan spans) to turns.
///
/// Turns are visited chronologically and each one claims every unclaimed
/// trace whose start lies within `window_ms` of the turn timestamp. Traces
/// left over become synthetic single-trace entries, so nothing is dropped.
pub fn match_traces_to_turns(
    traces: &[TraceGroup],
    orphaned_spans: &[Span],
    turns: &[ConversationTurn],
    window_ms: f64,
) -> TurnAlignment {
    let window = if window_ms.is_finite() {
        window_ms.max(0.0)
    } else {
        DEFAULT_TURN_WINDOW_MS
    };

    let mut sorted_turns: Vec<&ConversationTurn> = turns.iter().collect();
    sorted_turns.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let mut trace_claimed = vec![false; traces.len()];
    let mut span_claimed = vec![false; orphaned_spans.len()];
    let mut entries = Vec::with_capacity(sorted_turns.len() + traces.len());

    for turn in sorted_turns {
        let within = |t: f64| (t - turn.timestamp).abs() <= window;

        let mut matched_traces = Vec::new();
        for (idx, trace) in traces.iter().enumerate() {
            if !trace_claimed[idx] && within(trace.start_time) {
                trace_claimed[idx] = true;
                matched_traces.push(trace.clone());
            }
        }

        let mut unmatched_spans = Vec::new();
        for (idx, span) in orphaned_spans.iter().enumerate() {
            if !span_claimed[idx] && within(span.captured_at) {
                span_claimed[idx] = true;
                unmatched_spans.push(span.clone());
            }
        }

        entries.push(ConversationTurnWithTraces {
            turn_id: turn.turn_id.clone(),
            user_transcript: turn.user_transcript.clone(),
            agent_response: turn.agent_response.clone(),
            timestamp: turn.timestamp,
            matched_traces,
            unmatched_spans,
            is_synthetic: false,
        });
    }

    for (idx, trace) in traces.iter().enumerate() {
        if !trace_claimed[idx] {
            entries.push(synthetic_entry(trace));
        }
    }

    entries.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    let unclaimed_spans: Vec<Span> = orphaned_spans
        .iter()
        .zip(&span_claimed)
        .filter(|(_, claimed)| !**claimed)
        .map(|(span, _)| span.clone())
        .collect();

    tracing::trace!(
        entries = entries.len(),
        unclaimed_spans = unclaimed_spans.len(),
        window_ms = window,
        "Aligned traces to turns"
    );

    TurnAlignment {
        turns: entries,
        unclaimed_spans,
    }
}

fn synthetic_entry(trace: &TraceGroup) -> ConversationTurnWithTraces {
    ConversationTurnWithTraces {
        turn_id: format!(
            "trace-{}",
            truncate_id(&trace.trace_id, SYNTHETIC_TURN_ID_CHARS)
        ),
        user_transcript: None,
        agent_response: None,
        timestamp: trace.start_time,
        matched_traces: vec![trace.clone()],
        unmatched_spans: Vec::new(),
        is_synthetic: true,
    }
}
