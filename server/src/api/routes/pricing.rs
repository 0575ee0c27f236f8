//! Pricing API endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::api::extractors::ValidatedJson;
use crate::api::types::ApiError;
use crate::domain::metrics::{CallCosts, ModelSelection, UsageInput, aggregate_costs};
use crate::domain::pricing::PricingService;

// ============================================================================
// State
// ============================================================================

#[derive(Clone)]
pub struct PricingApiState {
    pub pricing: Arc<PricingService>,
}

// ============================================================================
// Request/Response DTOs
// ============================================================================

/// Usage and model selection in the same shape as a call payload
#[derive(Debug, Deserialize, Validate)]
pub struct CalculateCostRequest {
    #[validate(length(min = 1, max = 256))]
    pub llm_provider: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub llm_model: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub tts_provider: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub tts_model: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub stt_provider: Option<String>,
    #[validate(length(min = 1, max = 256))]
    pub stt_model: Option<String>,
    #[serde(default)]
    pub usage: Option<UsageInput>,
}

#[derive(Debug, Serialize)]
pub struct CalculateCostResponse {
    #[serde(flatten)]
    pub costs: CallCosts,
    pub total_cost: f64,
}

// ============================================================================
// Routes
// ============================================================================

pub fn routes(pricing: Arc<PricingService>) -> Router<()> {
    let state = PricingApiState { pricing };
    Router::new()
        .route("/calculate", post(calculate_cost))
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Price usage without ingesting a call
pub async fn calculate_cost(
    State(state): State<PricingApiState>,
    ValidatedJson(req): ValidatedJson<CalculateCostRequest>,
) -> Result<Json<CalculateCostResponse>, ApiError> {
    let models = ModelSelection {
        llm_provider: req.llm_provider,
        llm_model: req.llm_model,
        tts_provider: req.tts_provider,
        tts_model: req.tts_model,
        stt_provider: req.stt_provider,
        stt_model: req.stt_model,
    };

    let costs = aggregate_costs(req.usage.as_ref(), &models, &state.pricing);
    let total_cost = costs.total();

    Ok(Json(CalculateCostResponse { costs, total_cost }))
}
