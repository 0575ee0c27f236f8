//! Per-call cost aggregation
//!
//! Usage arrives either as one record or a list of records (one per agent
//! session segment). Counters are summed, then priced per category.

use serde::{Deserialize, Serialize};

use crate::domain::pricing::{CategoryCost, LlmUsage, MatchType, PricingService};
use crate::utils::json::deserialize_lenient_f64;

/// Usage counters reported by the agent SDK
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub llm_prompt_tokens: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub llm_prompt_cached_tokens: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub llm_completion_tokens: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub tts_characters_count: Option<f64>,
    /// Seconds of audio sent to STT
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub stt_audio_duration: Option<f64>,
}

impl UsageRecord {
    fn add(&mut self, other: &UsageRecord) {
        fn sum(a: Option<f64>, b: Option<f64>) -> Option<f64> {
            match (a, b) {
                (None, None) => None,
                (a, b) => Some(a.unwrap_or(0.0) + b.unwrap_or(0.0)),
            }
        }
        self.llm_prompt_tokens = sum(self.llm_prompt_tokens, other.llm_prompt_tokens);
        self.llm_prompt_cached_tokens =
            sum(self.llm_prompt_cached_tokens, other.llm_prompt_cached_tokens);
        self.llm_completion_tokens = sum(self.llm_completion_tokens, other.llm_completion_tokens);
        self.tts_characters_count = sum(self.tts_characters_count, other.tts_characters_count);
        self.stt_audio_duration = sum(self.stt_audio_duration, other.stt_audio_duration);
    }

    fn llm_usage(&self) -> LlmUsage {
        LlmUsage {
            prompt_tokens: self.llm_prompt_tokens.unwrap_or(0.0),
            cached_tokens: self.llm_prompt_cached_tokens.unwrap_or(0.0),
            completion_tokens: self.llm_completion_tokens.unwrap_or(0.0),
        }
    }
}

/// `usage` payload field: a single record or a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UsageInput {
    Many(Vec<UsageRecord>),
    Single(UsageRecord),
}

impl UsageInput {
    /// Sum of all records
    pub fn total(&self) -> UsageRecord {
        match self {
            UsageInput::Single(record) => record.clone(),
            UsageInput::Many(records) => {
                records.iter().fold(UsageRecord::default(), |mut acc, r| {
                    acc.add(r);
                    acc
                })
            }
        }
    }
}

/// Provider and model per pipeline stage (`model_config` payload field)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    #[serde(default)]
    pub llm_provider: Option<String>,
    #[serde(default)]
    pub llm_model: Option<String>,
    #[serde(default)]
    pub tts_provider: Option<String>,
    #[serde(default)]
    pub tts_model: Option<String>,
    #[serde(default)]
    pub stt_provider: Option<String>,
    #[serde(default)]
    pub stt_model: Option<String>,
}

/// Cost triple persisted per call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallCosts {
    pub total_llm_cost: f64,
    pub total_tts_cost: f64,
    pub total_stt_cost: f64,
    pub currency: String,
    pub llm_match: MatchType,
    pub tts_match: MatchType,
    pub stt_match: MatchType,
}

impl CallCosts {
    pub fn total(&self) -> f64 {
        self.total_llm_cost + self.total_tts_cost + self.total_stt_cost
    }
}

/// Price a call's usage. Missing usage yields zero costs.
pub fn aggregate_costs(
    usage: Option<&UsageInput>,
    models: &ModelSelection,
    pricing: &PricingService,
) -> CallCosts {
    let usage = usage.map(UsageInput::total).unwrap_or_default();

    let llm = pricing.llm_cost(
        models.llm_provider.as_deref(),
        models.llm_model.as_deref(),
        &usage.llm_usage(),
    );
    let tts = pricing.tts_cost(
        models.tts_provider.as_deref(),
        models.tts_model.as_deref(),
        usage.tts_characters_count.unwrap_or(0.0),
    );
    let stt = pricing.stt_cost(
        models.stt_provider.as_deref(),
        models.stt_model.as_deref(),
        usage.stt_audio_duration.unwrap_or(0.0),
    );

    CallCosts::from_parts(llm, tts, stt, pricing.currency())
}

impl CallCosts {
    fn from_parts(llm: CategoryCost, tts: CategoryCost, stt: CategoryCost, currency: &str) -> Self {
        Self {
            total_llm_cost: llm.amount,
            total_tts_cost: tts.amount,
            total_stt_cost: stt.amount,
            currency: currency.to_string(),
            llm_match: llm.match_type,
            tts_match: tts.match_type,
            stt_match: stt.match_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn models() -> ModelSelection {
        ModelSelection {
            llm_provider: Some("openai".to_string()),
            llm_model: Some("gpt-4o-mini".to_string()),
            tts_provider: Some("cartesia".to_string()),
            tts_model: Some("sonic-2".to_string()),
            stt_provider: Some("deepgram".to_string()),
            stt_model: Some("nova-3".to_string()),
        }
    }

    #[test]
    fn test_single_and_list_usage_parse() {
        let single: UsageInput =
            serde_json::from_value(json!({"llm_prompt_tokens": 100})).unwrap();
        assert!(matches!(single, UsageInput::Single(_)));

        let many: UsageInput = serde_json::from_value(json!([
            {"llm_prompt_tokens": 100, "tts_characters_count": 10},
            {"llm_prompt_tokens": "50", "stt_audio_duration": 2.5}
        ]))
        .unwrap();
        let total = many.total();
        assert_eq!(total.llm_prompt_tokens, Some(150.0));
        assert_eq!(total.tts_characters_count, Some(10.0));
        assert_eq!(total.stt_audio_duration, Some(2.5));
        assert_eq!(total.llm_completion_tokens, None);
    }

    #[test]
    fn test_list_and_single_price_the_same() {
        let pricing = PricingService::init_for_test();
        let record = json!({
            "llm_prompt_tokens": 1000,
            "llm_completion_tokens": 200,
            "tts_characters_count": 500,
            "stt_audio_duration": 30
        });
        let single: UsageInput = serde_json::from_value(record.clone()).unwrap();
        let many: UsageInput = serde_json::from_value(json!([record])).unwrap();
        assert_eq!(
            aggregate_costs(Some(&single), &models(), &pricing),
            aggregate_costs(Some(&many), &models(), &pricing)
        );
    }

    #[test]
    fn test_costs_per_category() {
        let pricing = PricingService::init_for_test();
        let usage: UsageInput = serde_json::from_value(json!({
            "llm_prompt_tokens": 1_000_000,
            "llm_completion_tokens": 1_000_000,
            "tts_characters_count": 1_000_000,
            "stt_audio_duration": 60
        }))
        .unwrap();
        let costs = aggregate_costs(Some(&usage), &models(), &pricing);
        assert!(approx(costs.total_llm_cost, 0.75));
        assert!(approx(costs.total_tts_cost, 50.0));
        assert!(approx(costs.total_stt_cost, 0.0077));
        assert_eq!(costs.currency, "USD");
        assert_eq!(costs.llm_match, MatchType::Exact);
        assert!(approx(costs.total(), 50.7577));
    }

    #[test]
    fn test_missing_usage_is_zero() {
        let pricing = PricingService::init_for_test();
        let costs = aggregate_costs(None, &models(), &pricing);
        assert_eq!(costs.total(), 0.0);
    }

    #[test]
    fn test_unknown_models_cost_zero() {
        let pricing = PricingService::init_for_test();
        let usage = UsageInput::Single(UsageRecord {
            llm_prompt_tokens: Some(5000.0),
            ..Default::default()
        });
        let costs = aggregate_costs(Some(&usage), &ModelSelection::default(), &pricing);
        assert_eq!(costs.total_llm_cost, 0.0);
        assert_eq!(costs.llm_match, MatchType::NotFound);
    }
}
