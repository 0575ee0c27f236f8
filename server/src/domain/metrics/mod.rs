//! Ingestion-time call aggregates
//!
//! - `latency` - per-turn STT/LLM/TTS/EOU latency reduced to call averages
//! - `cost` - usage counters priced per category

pub mod cost;
pub mod latency;

pub use cost::{CallCosts, ModelSelection, UsageInput, UsageRecord, aggregate_costs};
pub use latency::{
    LatencyBreakdown, TurnLatency, TurnMetricsSample, average_latency, latency_breakdown,
};
