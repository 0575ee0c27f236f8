//! Domain logic for voice-agent call telemetry
//!
//! - `calls` - ingestion boundary: decode, normalize, persist
//! - `critical_path` - bottleneck detection over the reported critical path
//! - `metrics` - latency and cost aggregates per call
//! - `pricing` - provider/model rate tables
//! - `traces` - span grouping, turn alignment and waterfall layout

pub mod calls;
pub mod critical_path;
pub mod metrics;
pub mod pricing;
pub mod traces;

pub use calls::{CallIngestPipeline, IngestError, IngestOutcome};
pub use pricing::PricingService;
