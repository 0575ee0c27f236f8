//! Combined per-call trace view: grouping, turn alignment and waterfall

use serde::Serialize;

use super::grouping::group_spans;
use super::turns::{DEFAULT_TURN_WINDOW_MS, match_traces_to_turns};
use super::types::{ConversationTurn, ConversationTurnWithTraces, Span};
use super::waterfall::{WaterfallLayout, WaterfallOptions, build_waterfall};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceViewOptions {
    pub turn_window_ms: f64,
    pub waterfall: WaterfallOptions,
}

impl Default for TraceViewOptions {
    fn default() -> Self {
        Self {
            turn_window_ms: DEFAULT_TURN_WINDOW_MS,
            waterfall: WaterfallOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallTraceView {
    pub trace_count: usize,
    pub turns: Vec<ConversationTurnWithTraces>,
    pub waterfall: WaterfallLayout,
    /// Spans without a trace id that no turn window claimed
    pub orphaned_spans: Vec<Span>,
}

/// Build everything the timeline view renders for one call
pub fn build_call_trace_view(
    spans: &[Span],
    turns: &[ConversationTurn],
    options: &TraceViewOptions,
) -> CallTraceView {
    let grouping = group_spans(spans);
    let waterfall = build_waterfall(&grouping.traces, &options.waterfall);
    let alignment = match_traces_to_turns(
        &grouping.traces,
        &grouping.orphaned_spans,
        turns,
        options.turn_window_ms,
    );

    CallTraceView {
        trace_count: grouping.traces.len(),
        turns: alignment.turns,
        waterfall,
        orphaned_spans: alignment.unclaimed_spans,
    }
}
