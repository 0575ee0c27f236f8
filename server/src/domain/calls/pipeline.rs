//! Call ingestion pipeline
//!
//! Decode → analyze → persist. Analysis is pure and shared with the offline
//! `inspect` command; persistence runs the four writes concurrently and
//! reports each one instead of failing the request.

use std::sync::Arc;

use serde::Serialize;

use super::normalize::{normalize_spans, normalize_turns};
use super::payload::{CallPayload, IngestError, decode_payload};
use crate::data::{CallLogRecord, CallRepository, DataError, TraceSummaryRecord};
use crate::domain::critical_path::{CriticalPathAnalysis, analyze_critical_path};
use crate::domain::metrics::{CallCosts, LatencyBreakdown, aggregate_costs, latency_breakdown};
use crate::domain::pricing::PricingService;
use crate::domain::traces::Span;

/// Everything derived from one payload, before persistence
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallAnalysis {
    pub record: CallLogRecord,
    pub costs: CallCosts,
    pub critical_path: CriticalPathAnalysis,
    pub spans: Vec<Span>,
    /// Present only when the payload carried raw spans
    pub trace_summary: Option<TraceSummaryRecord>,
}

/// Compute aggregates and normalize spans and turns
pub fn analyze_call(payload: CallPayload, pricing: &PricingService) -> CallAnalysis {
    let call_started_at = payload
        .call_started_at
        .as_ref()
        .and_then(|ts| ts.to_epoch_millis());
    let call_ended_at = payload
        .call_ended_at
        .as_ref()
        .and_then(|ts| ts.to_epoch_millis());

    let latency: LatencyBreakdown = latency_breakdown(&payload.transcript_with_metrics);
    let costs = aggregate_costs(payload.usage.as_ref(), &payload.model_config, pricing);
    let critical_path = analyze_critical_path(&payload.critical_path());
    let spans = normalize_spans(payload.raw_spans(), call_started_at);
    let turns = normalize_turns(&payload.transcript_with_metrics, call_started_at);

    let trace_summary = (!spans.is_empty()).then(|| TraceSummaryRecord {
        call_id: payload.call_id.clone(),
        total_spans: spans.len() as i64,
        performance_summary: payload.telemetry_data.performance_metrics.clone(),
        span_summary: payload.telemetry_data.span_summary.clone(),
        critical_path: Some(critical_path.clone()),
    });

    let duration_seconds =
        payload
            .duration_seconds
            .or_else(|| match (call_started_at, call_ended_at) {
                (Some(start), Some(end)) if end >= start => Some((end - start) / 1000.0),
                _ => None,
            });

    let record = CallLogRecord {
        call_id: payload.call_id,
        agent_id: payload.agent_id,
        customer_number: payload.customer_number,
        call_ended_reason: payload.call_ended_reason,
        transcript_type: payload.transcript_type,
        transcript_json: payload.transcript_json,
        metadata: payload.metadata,
        dynamic_variables: payload.dynamic_variables,
        call_started_at,
        call_ended_at,
        duration_seconds,
        avg_latency: latency.avg_latency,
        latency_breakdown: latency,
        turns,
    };

    CallAnalysis {
        record,
        costs,
        critical_path,
        spans,
        trace_summary,
    }
}

/// Per-step persistence result; `None` means the step did not apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PersistOutcome {
    pub call_log: bool,
    pub costs: bool,
    pub trace_summary: Option<bool>,
    pub spans: Option<bool>,
}

impl PersistOutcome {
    pub fn all_ok(&self) -> bool {
        self.call_log
            && self.costs
            && self.trace_summary != Some(false)
            && self.spans != Some(false)
    }
}

/// Response body of a successful ingestion
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestOutcome {
    pub call_id: String,
    pub avg_latency: Option<f64>,
    pub latency: LatencyBreakdown,
    pub costs: CallCosts,
    pub critical_path: CriticalPathAnalysis,
    pub span_count: usize,
    pub persisted: PersistOutcome,
}

pub struct CallIngestPipeline {
    repository: Arc<dyn CallRepository>,
    pricing: Arc<PricingService>,
    /// Ceiling for a compressed envelope once inflated
    max_payload_bytes: usize,
}

impl CallIngestPipeline {
    pub fn new(
        repository: Arc<dyn CallRepository>,
        pricing: Arc<PricingService>,
        max_payload_bytes: usize,
    ) -> Self {
        Self {
            repository,
            pricing,
            max_payload_bytes,
        }
    }

    /// Decode a request body and ingest it
    pub async fn ingest_bytes(&self, body: &[u8]) -> Result<IngestOutcome, IngestError> {
        let payload = decode_payload(body, self.max_payload_bytes)?;
        Ok(self.ingest(payload).await)
    }

    pub async fn ingest(&self, payload: CallPayload) -> IngestOutcome {
        let analysis = analyze_call(payload, &self.pricing);
        let persisted = self.persist(&analysis).await;

        if persisted.all_ok() {
            tracing::debug!(
                call_id = %analysis.record.call_id,
                spans = analysis.spans.len(),
                avg_latency = ?analysis.record.avg_latency,
                "Call ingested"
            );
        }

        IngestOutcome {
            call_id: analysis.record.call_id,
            avg_latency: analysis.record.avg_latency,
            latency: analysis.record.latency_breakdown,
            costs: analysis.costs,
            critical_path: analysis.critical_path,
            span_count: analysis.spans.len(),
            persisted,
        }
    }

    async fn persist(&self, analysis: &CallAnalysis) -> PersistOutcome {
        let call_id = analysis.record.call_id.as_str();
        let repo = &self.repository;

        let (call_log, costs, trace_summary, spans) = tokio::join!(
            async { step_ok("call_log", call_id, repo.upsert_call_log(&analysis.record).await) },
            async {
                step_ok(
                    "costs",
                    call_id,
                    repo.upsert_call_costs(call_id, &analysis.costs).await,
                )
            },
            async {
                match &analysis.trace_summary {
                    Some(summary) => Some(step_ok(
                        "trace_summary",
                        call_id,
                        repo.upsert_trace_summary(summary).await,
                    )),
                    None => None,
                }
            },
            async {
                if analysis.spans.is_empty() {
                    return None;
                }
                let result = repo.replace_trace_spans(call_id, &analysis.spans).await;
                Some(step_ok("spans", call_id, result.map(|_| ())))
            },
        );

        PersistOutcome {
            call_log,
            costs,
            trace_summary,
            spans,
        }
    }
}

fn step_ok(step: &'static str, call_id: &str, result: Result<(), DataError>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(call_id, step, error = %e, "Failed to persist call data");
            false
        }
    }
}
