//! Gantt-style waterfall layout
//!
//! Positions are percentages of one shared timeline spanning every trace of
//! the call. Each trace contributes a header row followed by its spans in
//! depth-first order; `rowIndex` runs contiguously across all traces.

use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

use super::hierarchy::build_hierarchy;
use super::types::{OperationType, Span, TraceGroup};
use crate::utils::time::format_duration_ms;

/// Minimum row width so sub-millisecond spans stay visible
pub const DEFAULT_MIN_WIDTH_PERCENT: f64 = 0.5;

/// Default number of timeline markers (including both ends)
pub const DEFAULT_MARKER_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterfallOptions {
    pub min_width_percent: f64,
    pub marker_count: usize,
}

impl Default for WaterfallOptions {
    fn default() -> Self {
        Self {
            min_width_percent: DEFAULT_MIN_WIDTH_PERCENT,
            marker_count: DEFAULT_MARKER_COUNT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowType {
    TraceHeader,
    Span,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaterfallRow {
    pub id: String,
    #[serde(rename = "type")]
    pub row_type: RowType,
    pub name: String,
    #[serde(rename = "startTime")]
    pub start_time: f64,
    pub duration: f64,
    #[serde(rename = "startPercent")]
    pub start_percent: f64,
    #[serde(rename = "widthPercent")]
    pub width_percent: f64,
    pub level: usize,
    #[serde(rename = "rowIndex")]
    pub row_index: usize,
    pub trace_id: String,
    pub operation_type: OperationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<JsonMap<String, JsonValue>>,
    pub has_error: bool,
    /// Parent missing from the trace; rendered at depth 1
    pub detached: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineMarker {
    pub percent: f64,
    pub offset_ms: f64,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WaterfallLayout {
    pub rows: Vec<WaterfallRow>,
    pub timeline_start: f64,
    pub timeline_end: f64,
    pub total_duration: f64,
    pub markers: Vec<TimelineMarker>,
}

/// Shared timeline bounds in epoch milliseconds
#[derive(Debug, Clone, Copy, PartialEq)]
struct Timeline {
    start: f64,
    end: f64,
    floor: f64,
}

impl Timeline {
    fn total(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    /// `(startPercent, widthPercent)` for an interval on this timeline
    fn position(&self, start: f64, duration: f64) -> (f64, f64) {
        let total = self.total();
        if total <= 0.0 || !total.is_finite() {
            return (0.0, self.floor);
        }
        let start_percent = ((start - self.start) / total * 100.0).clamp(0.0, 100.0);
        let width_percent = (duration.max(0.0) / total * 100.0).max(self.floor).min(100.0);
        (start_percent, width_percent)
    }
}

/// Build the waterfall for a set of trace groups
pub fn build_waterfall(traces: &[TraceGroup], options: &WaterfallOptions) -> WaterfallLayout {
    if traces.is_empty() {
        return WaterfallLayout::default();
    }

    let floor = options.min_width_percent.clamp(0.0, 100.0);
    let timeline = Timeline {
        start: traces
            .iter()
            .map(|t| t.start_time)
            .fold(f64::INFINITY, f64::min),
        end: traces
            .iter()
            .map(|t| t.end_time)
            .fold(f64::NEG_INFINITY, f64::max),
        floor,
    };

    let mut rows = Vec::new();
    for trace in traces {
        let (start_percent, width_percent) = timeline.position(trace.start_time, trace.duration_ms);
        rows.push(WaterfallRow {
            id: format!("trace-{}", trace.trace_id),
            row_type: RowType::TraceHeader,
            name: trace.root_span.name.clone(),
            start_time: trace.start_time,
            duration: trace.duration_ms,
            start_percent,
            width_percent,
            level: 0,
            row_index: rows.len(),
            trace_id: trace.trace_id.clone(),
            operation_type: trace.root_span.operation_type,
            span_count: Some(trace.span_count),
            error_count: Some(trace.error_count),
            operation_summary: Some(trace.operation_summary.clone()),
            span_id: None,
            parent_span_id: None,
            request_id: None,
            attributes: None,
            has_error: trace.error_count > 0,
            detached: false,
        });

        for node in build_hierarchy(trace) {
            rows.push(span_row(
                &trace.trace_id,
                node.span,
                node.level + 1,
                node.detached,
                rows.len(),
                &timeline,
            ));
        }
    }

    let total_duration = timeline.total();
    WaterfallLayout {
        markers: timeline_markers(total_duration, options.marker_count),
        rows,
        timeline_start: timeline.start,
        timeline_end: timeline.end,
        total_duration,
    }
}

fn span_row(
    trace_id: &str,
    span: &Span,
    level: usize,
    detached: bool,
    row_index: usize,
    timeline: &Timeline,
) -> WaterfallRow {
    let (start_percent, width_percent) = timeline.position(span.captured_at, span.duration_ms);
    WaterfallRow {
        id: format!("{}:{}", trace_id, span.span_id),
        row_type: RowType::Span,
        name: span.name.clone(),
        start_time: span.captured_at,
        duration: span.duration_ms,
        start_percent,
        width_percent,
        level,
        row_index,
        trace_id: trace_id.to_string(),
        operation_type: span.operation_type,
        span_count: None,
        error_count: None,
        operation_summary: None,
        span_id: Some(span.span_id.clone()),
        parent_span_id: span.parent_span_id.clone(),
        request_id: span.request_id.clone(),
        attributes: Some(span.attributes.clone()),
        has_error: span.is_error(),
        detached,
    }
}

/// Evenly spaced markers from 0% to 100% of the timeline
pub fn timeline_markers(total_duration: f64, count: usize) -> Vec<TimelineMarker> {
    if count == 0 {
        return Vec::new();
    }
    if total_duration <= 0.0 || count == 1 {
        return vec![TimelineMarker {
            percent: 0.0,
            offset_ms: 0.0,
            label: format_duration_ms(0.0),
        }];
    }
    let steps = (count - 1) as f64;
    (0..count)
        .map(|i| {
            let fraction = i as f64 / steps;
            let offset_ms = total_duration * fraction;
            TimelineMarker {
                percent: fraction * 100.0,
                offset_ms,
                label: format_duration_ms(offset_ms),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_degenerate_timeline() {
        let timeline = Timeline {
            start: 5_000.0,
            end: 5_000.0,
            floor: 0.5,
        };
        assert_eq!(timeline.position(5_000.0, 0.0), (0.0, 0.5));
    }

    #[test]
    fn test_position_clamps() {
        let timeline = Timeline {
            start: 0.0,
            end: 1_000.0,
            floor: 0.5,
        };
        assert_eq!(timeline.position(-100.0, 10_000.0), (0.0, 100.0));
        assert_eq!(timeline.position(2_000.0, 0.0), (100.0, 0.5));
        assert_eq!(timeline.position(250.0, 500.0), (25.0, 50.0));
    }

    #[test]
    fn test_timeline_markers() {
        let markers = timeline_markers(2_000.0, 5);
        let percents: Vec<f64> = markers.iter().map(|m| m.percent).collect();
        assert_eq!(percents, vec![0.0, 25.0, 50.0, 75.0, 100.0]);
        assert_eq!(markers[2].label, "1s");
        assert_eq!(markers[1].label, "500ms");
        assert_eq!(markers[4].offset_ms, 2_000.0);
    }

    #[test]
    fn test_timeline_markers_degenerate() {
        assert!(timeline_markers(1_000.0, 0).is_empty());
        let markers = timeline_markers(0.0, 5);
        assert_eq!(markers.len(), 1);
        assert_eq!(markers[0].label, "0ms");
    }

    #[test]
    fn test_empty_layout() {
        let layout = build_waterfall(&[], &WaterfallOptions::default());
        assert_eq!(layout, WaterfallLayout::default());
        assert_eq!(layout.total_duration, 0.0);
    }
}
