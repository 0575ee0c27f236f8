//! Trace grouping engine and waterfall layout
//!
//! Pure transforms over one call's spans:
//! - `grouping` - partition by trace id, pick roots, derive timing
//! - `hierarchy` - depth-first nesting under each root
//! - `turns` - align traces to conversation turns by time window
//! - `waterfall` - shared-timeline row positions for rendering
//! - `view` - all of the above for one call

pub mod grouping;
pub mod hierarchy;
pub mod turns;
pub mod types;
pub mod view;
pub mod waterfall;


pub use grouping::{SpanGrouping, group_spans};
pub use hierarchy::{HierarchyNode, build_hierarchy};
pub use turns::{DEFAULT_TURN_WINDOW_MS, TurnAlignment, match_traces_to_turns};
pub use types::{
    ConversationTurn, ConversationTurnWithTraces, OperationType, RootReason, Span, TraceGroup,
};
pub use view::{CallTraceView, TraceViewOptions, build_call_trace_view};
pub use waterfall::{
    DEFAULT_MIN_WIDTH_PERCENT, RowType, WaterfallLayout, WaterfallOptions, WaterfallRow,
    build_waterfall,
};
