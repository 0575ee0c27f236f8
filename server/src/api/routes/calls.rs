//! Call ingestion and call read endpoints

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::decompression::RequestDecompressionLayer;
use validator::Validate;

use crate::api::extractors::{CallPath, ValidatedQuery};
use crate::api::types::{ApiError, validate_min_width_percent, validate_window_secs};
use crate::core::config::TracesConfig;
use crate::data::{CallLogRow, CallRepository, TraceSummaryRow};
use crate::domain::calls::{CallIngestPipeline, IngestOutcome};
use crate::domain::metrics::CallCosts;
use crate::domain::traces::{CallTraceView, build_call_trace_view};

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct CallsApiState {
    pub pipeline: Arc<CallIngestPipeline>,
    pub repository: Arc<dyn CallRepository>,
    pub traces: TracesConfig,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

#[derive(Debug, Serialize)]
pub struct CallSummaryResponse {
    #[serde(flatten)]
    pub call: CallLogRow,
    pub costs: Option<CallCosts>,
    pub trace_summary: Option<TraceSummaryRow>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct TraceQuery {
    /// Turn matching window override, in seconds
    #[validate(custom(function = "validate_window_secs"))]
    pub window_secs: Option<f64>,
    /// Waterfall minimum bar width override, in percent
    #[validate(custom(function = "validate_min_width_percent"))]
    pub min_width_percent: Option<f64>,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(state: CallsApiState, max_body_bytes: usize) -> Router<()> {
    let ingest = Router::new()
        .route("/", post(ingest_call))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestDecompressionLayer::new());

    Router::new()
        .route("/{call_id}", get(get_call))
        .route("/{call_id}/trace", get(get_call_trace))
        .merge(ingest)
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Ingest a call-completion payload (plain, compressed envelope or gzip body)
pub async fn ingest_call(
    State(state): State<CallsApiState>,
    body: Bytes,
) -> Result<Json<IngestOutcome>, ApiError> {
    let outcome = state.pipeline.ingest_bytes(&body).await?;
    if !outcome.persisted.all_ok() {
        tracing::warn!(
            call_id = %outcome.call_id,
            persisted = ?outcome.persisted,
            "Call ingested with persistence failures"
        );
    }
    Ok(Json(outcome))
}

/// Persisted call log with costs and trace summary
pub async fn get_call(
    State(state): State<CallsApiState>,
    path: CallPath,
) -> Result<Json<CallSummaryResponse>, ApiError> {
    let repo = &state.repository;
    let (call, costs, trace_summary) = tokio::try_join!(
        repo.get_call_log(&path.call_id),
        repo.get_call_costs(&path.call_id),
        repo.get_trace_summary(&path.call_id),
    )
    .map_err(ApiError::from_data)?;

    let call = call.ok_or_else(|| call_not_found(&path.call_id))?;

    Ok(Json(CallSummaryResponse {
        call,
        costs,
        trace_summary,
    }))
}

/// Trace groups aligned to turns plus the waterfall layout
pub async fn get_call_trace(
    State(state): State<CallsApiState>,
    path: CallPath,
    ValidatedQuery(query): ValidatedQuery<TraceQuery>,
) -> Result<Json<CallTraceView>, ApiError> {
    let repo = &state.repository;
    let (call, spans) = tokio::try_join!(
        repo.get_call_log(&path.call_id),
        repo.list_trace_spans(&path.call_id),
    )
    .map_err(ApiError::from_data)?;

    let call = call.ok_or_else(|| call_not_found(&path.call_id))?;

    let mut options = state.traces.view_options();
    if let Some(window_secs) = query.window_secs {
        options.turn_window_ms = window_secs * 1000.0;
    }
    if let Some(min_width) = query.min_width_percent {
        options.waterfall.min_width_percent = min_width;
    }

    Ok(Json(build_call_trace_view(
        &spans,
        &call.record.turns,
        &options,
    )))
}

fn call_not_found(call_id: &str) -> ApiError {
    ApiError::not_found("CALL_NOT_FOUND", format!("Call not found: {}", call_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use serde_json::{Value as JsonValue, json};
    use tower::ServiceExt;

    use crate::data::SqliteService;
    use crate::domain::pricing::PricingService;

    async fn test_router(max_body_bytes: usize) -> Router<()> {
        let repository: Arc<dyn CallRepository> = Arc::new(SqliteService::init_for_test().await);
        let pricing = Arc::new(PricingService::init_for_test());
        let state = CallsApiState {
            pipeline: Arc::new(CallIngestPipeline::new(
                repository.clone(),
                pricing,
                max_body_bytes,
            )),
            repository,
            traces: TracesConfig {
                turn_window_secs: 30.0,
                min_width_percent: 0.5,
            },
        };
        Router::new().nest("/api/v1/calls", routes(state, max_body_bytes))
    }

    fn sample_payload() -> JsonValue {
        json!({
            "call_id": "call-1",
            "agent_id": "agent-1",
            "call_started_at": 1_700_000_000,
            "transcript_with_metrics": [{
                "turn_id": "turn-1",
                "user_transcript": "hi",
                "timestamp": 1_700_000_001,
                "stt_metrics": {"duration": 0},
                "llm_metrics": {"ttft": 0.5},
                "tts_metrics": {"ttfb": 0.1, "duration": 1.0},
                "eou_metrics": {"end_of_utterance_delay": 0.2}
            }],
            "usage": {"llm_prompt_tokens": 1000, "llm_completion_tokens": 100},
            "model_config": {"llm_provider": "openai", "llm_model": "gpt-4o-mini"},
            "telemetry_data": {
                "session_traces": [
                    {"span_id": "s1", "trace_id": "t1", "name": "turn start", "captured_at": 1_700_000_001.0, "duration_ms": 1500, "operation_type": "llm"},
                    {"span_id": "s2", "trace_id": "t1", "parent_span_id": "s1", "captured_at": 1_700_000_001.2, "duration_ms": 400, "operation_type": "tts"},
                    {"span_id": "s3", "captured_at": 1_700_000_002.0, "duration_ms": 10}
                ],
                "span_summary": {"critical_path": [{"duration_ms": 1200}, {"duration_ms": 300}]}
            }
        })
    }

    async fn send(router: &Router<()>, request: Request<Body>) -> Response {
        router.clone().oneshot(request).await.unwrap()
    }

    async fn body_json(response: Response) -> JsonValue {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/calls")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_ingest_then_read() {
        let router = test_router(1024 * 1024).await;

        let response = send(&router, post_json(sample_payload().to_string().into_bytes())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["call_id"], "call-1");
        assert!((outcome["avg_latency"].as_f64().unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(outcome["span_count"], 3);
        assert_eq!(outcome["critical_path"]["total_duration_ms"], 1500.0);
        assert_eq!(outcome["persisted"]["call_log"], true);
        assert_eq!(outcome["persisted"]["spans"], true);

        let response = send(&router, get("/api/v1/calls/call-1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let summary = body_json(response).await;
        assert_eq!(summary["agent_id"], "agent-1");
        assert!((summary["avg_latency"].as_f64().unwrap() - 2.0).abs() < 1e-9);
        assert!(summary["costs"]["total_llm_cost"].as_f64().unwrap() > 0.0);
        assert_eq!(summary["trace_summary"]["total_spans"], 3);
    }

    #[tokio::test]
    async fn test_trace_view() {
        let router = test_router(1024 * 1024).await;
        send(&router, post_json(sample_payload().to_string().into_bytes())).await;

        let response = send(&router, get("/api/v1/calls/call-1/trace")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let view = body_json(response).await;
        assert_eq!(view["trace_count"], 1);
        assert_eq!(view["turns"].as_array().unwrap().len(), 1);
        assert_eq!(view["waterfall"]["rows"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_trace_view_query_validation() {
        let router = test_router(1024 * 1024).await;
        send(&router, post_json(sample_payload().to_string().into_bytes())).await;

        let response = send(
            &router,
            get("/api/v1/calls/call-1/trace?window_secs=5&min_width_percent=2"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = send(&router, get("/api/v1/calls/call-1/trace?min_width_percent=9")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

        let response = send(&router, get("/api/v1/calls/call-1/trace?window_secs=abc")).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "QUERY_PARSE_ERROR");
    }

    #[tokio::test]
    async fn test_unknown_call_is_404() {
        let router = test_router(1024).await;

        let response = send(&router, get("/api/v1/calls/missing")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "CALL_NOT_FOUND");

        let response = send(&router, get("/api/v1/calls/missing/trace")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_payloads_rejected() {
        let router = test_router(1024).await;

        let response = send(&router, post_json(b"{oops".to_vec())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_PAYLOAD");

        let response = send(&router, post_json(br#"{"agent_id": "a"}"#.to_vec())).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "MISSING_FIELD");

        // Nothing was persisted
        let response = send(&router, get("/api/v1/calls/a")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_optional_fields_accepted() {
        let router = test_router(1024 * 1024).await;
        let mut payload = sample_payload();
        payload["usage"] = json!("n/a");
        payload["telemetry_data"]["session_traces"][0]["name"] = json!(5);

        let response = send(&router, post_json(payload.to_string().into_bytes())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let outcome = body_json(response).await;
        assert_eq!(outcome["persisted"]["call_log"], true);
        assert_eq!(outcome["span_count"], 3);
        assert_eq!(outcome["costs"]["total_llm_cost"], 0.0);

        let response = send(&router, get("/api/v1/calls/call-1")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_body_limit() {
        let router = test_router(64).await;
        let mut payload = sample_payload();
        payload["metadata"] = json!({"padding": "x".repeat(256)});

        let response = send(&router, post_json(payload.to_string().into_bytes())).await;
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_gzip_request_body() {
        let router = test_router(1024 * 1024).await;

        let mut encoder =
            flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        encoder
            .write_all(sample_payload().to_string().as_bytes())
            .unwrap();
        let compressed = encoder.finish().unwrap();

        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/calls")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_ENCODING, "gzip")
            .body(Body::from(compressed))
            .unwrap();

        let response = send(&router, request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["call_id"], "call-1");
    }

    #[tokio::test]
    async fn test_invalid_call_id() {
        let router = test_router(1024).await;
        let long_id = "a".repeat(300);
        let response = send(&router, get(&format!("/api/v1/calls/{}", long_id))).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "INVALID_CALL_ID");
    }
}
