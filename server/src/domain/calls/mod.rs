//! Call ingestion boundary
//!
//! - `payload` - wire format, envelope decoding, required-field checks
//! - `normalize` - raw spans and turn samples to domain records
//! - `pipeline` - aggregates plus best-effort persistence

pub mod normalize;
pub mod payload;
pub mod pipeline;

pub use payload::{CallPayload, IngestError, RawSpan, decode_payload, decode_payload_value};
pub use pipeline::{CallAnalysis, CallIngestPipeline, IngestOutcome, PersistOutcome, analyze_call};
