//! Span grouping and trace-level derivation

use std::collections::HashMap;

use serde::Serialize;

use super::types::{RootReason, Span, TraceGroup};

/// Output of [`group_spans`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SpanGrouping {
    /// Ordered by trace start time
    pub traces: Vec<TraceGroup>,
    /// Spans without a trace id, in chronological order
    pub orphaned_spans: Vec<Span>,
}

/// Partition spans by trace id.
///
/// Every span with a trace id lands in exactly one group; the rest are
/// returned as orphans. Group membership order follows `captured_at`.
pub fn group_spans(spans: &[Span]) -> SpanGrouping {
    let mut buckets: HashMap<&str, Vec<Span>> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    let mut orphaned_spans = Vec::new();

    for span in spans {
        match span.trace_id.as_deref() {
            Some(trace_id) => {
                let bucket = buckets.entry(trace_id).or_insert_with(|| {
                    order.push(trace_id);
                    Vec::new()
                });
                bucket.push(span.clone());
            }
            None => orphaned_spans.push(span.clone()),
        }
    }

    let mut traces: Vec<TraceGroup> = order
        .into_iter()
        .filter_map(|trace_id| {
            let members = buckets.remove(trace_id)?;
            build_trace_group(trace_id.to_string(), members)
        })
        .collect();

    traces.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    orphaned_spans.sort_by(|a, b| a.captured_at.total_cmp(&b.captured_at));

    tracing::trace!(
        traces = traces.len(),
        orphans = orphaned_spans.len(),
        "Grouped spans"
    );

    SpanGrouping {
        traces,
        orphaned_spans,
    }
}

/// Build a trace group from its member spans. Returns `None` for an empty list.
pub fn build_trace_group(trace_id: String, mut spans: Vec<Span>) -> Option<TraceGroup> {
    spans.sort_by(|a, b| a.captured_at.total_cmp(&b.captured_at));

    let (root_index, root_reason) = select_root(&spans)?;

    let start_time = spans
        .iter()
        .map(|s| s.captured_at)
        .fold(f64::INFINITY, f64::min);
    let end_time = spans
        .iter()
        .map(Span::end_time)
        .fold(f64::NEG_INFINITY, f64::max)
        .max(start_time);

    Some(TraceGroup {
        trace_id,
        root_span: spans[root_index].clone(),
        root_reason,
        root_index,
        start_time,
        end_time,
        duration_ms: (end_time - start_time).max(0.0),
        span_count: spans.len(),
        error_count: spans.iter().filter(|s| s.is_error()).count(),
        operation_summary: operation_summary(&spans),
        spans,
    })
}

/// Pick the root of a chronologically sorted span list.
///
/// First match wins: a span with no parent, then an explicitly tagged start
/// span, then a span whose name marks a start, then the earliest span.
pub fn select_root(spans: &[Span]) -> Option<(usize, RootReason)> {
    if spans.is_empty() {
        return None;
    }
    if let Some(idx) = spans.iter().position(|s| s.parent_span_id.is_none()) {
        return Some((idx, RootReason::NoParent));
    }
    if let Some(idx) = spans.iter().position(Span::has_start_tag) {
        return Some((idx, RootReason::StartMarker));
    }
    if let Some(idx) = spans.iter().position(Span::has_start_name) {
        return Some((idx, RootReason::StartMarker));
    }
    Some((0, RootReason::Earliest))
}

/// Per-type span counts in first-appearance order, e.g. `"2 llm • 1 tts"`
pub fn operation_summary(spans: &[Span]) -> String {
    let mut counts: Vec<(&'static str, usize)> = Vec::new();
    for span in spans {
        let op = span.operation_type.as_str();
        match counts.iter_mut().find(|(name, _)| *name == op) {
            Some((_, count)) => *count += 1,
            None => counts.push((op, 1)),
        }
    }
    counts
        .iter()
        .map(|(op, count)| format!("{} {}", count, op))
        .collect::<Vec<_>>()
        .join(" • ")
}
