//! Pricing service for voice pipeline cost calculation
//!
//! Rates come from an embedded table, optionally replaced by a JSON file of
//! the same shape:
//! - LLM: per million input/output tokens, plus a cached-input rate
//! - TTS: per million characters
//! - STT: per minute of audio
//!
//! Lookup order per category:
//! 1. Exact `provider/model` key
//! 2. Model under any provider
//! 3. Model family (`-latest` and date suffixes stripped)
//! 4. Provider default (`provider/*`)
//!
//! Costs are converted from the table currency with the configured exchange rate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Embedded pricing data (compile-time)
const EMBEDDED_PRICING_JSON: &str = include_str!("../../../data/pricing.json");

/// Model segment of a provider default key (`deepgram/*`)
const PROVIDER_DEFAULT_MODEL: &str = "*";

const TOKENS_PER_MILLION: f64 = 1_000_000.0;
const CHARACTERS_PER_MILLION: f64 = 1_000_000.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

// ============================================================================
// ERROR TYPE
// ============================================================================

#[derive(Error, Debug)]
pub enum PricingError {
    #[error("Failed to parse pricing data: {0}")]
    ParseError(String),
    #[error("Failed to read pricing file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid {category} rate '{key}': {reason}")]
    InvalidRate {
        category: &'static str,
        key: String,
        reason: String,
    },
}

// ============================================================================
// RATES
// ============================================================================

/// How a rate was found, reported alongside each cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// `provider/model` key
    Exact,
    /// Same model listed under another provider
    ModelOnly,
    /// Base model with suffixes stripped
    Family,
    /// `provider/*` fallback
    ProviderDefault,
    #[default]
    NotFound,
}

impl MatchType {
    pub const fn as_str(self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::ModelOnly => "model_only",
            MatchType::Family => "family",
            MatchType::ProviderDefault => "provider_default",
            MatchType::NotFound => "not_found",
        }
    }

    /// Parse a stored match type; unknown values map to `NotFound`
    pub fn parse(value: &str) -> Self {
        match value {
            "exact" => MatchType::Exact,
            "model_only" => MatchType::ModelOnly,
            "family" => MatchType::Family,
            "provider_default" => MatchType::ProviderDefault,
            _ => MatchType::NotFound,
        }
    }

    /// Confidence (0.0-1.0) that the applied rate is the billed one
    pub fn confidence(self) -> f64 {
        match self {
            MatchType::Exact => 1.0,
            MatchType::ModelOnly => 0.9,
            MatchType::Family => 0.8,
            MatchType::ProviderDefault => 0.5,
            MatchType::NotFound => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LlmRate {
    pub input_per_million: f64,
    pub output_per_million: f64,
    /// Defaults to the input rate
    #[serde(default)]
    pub cached_input_per_million: Option<f64>,
}

impl LlmRate {
    /// Cost in table currency. `cached_tokens` is the cached share of `prompt_tokens`.
    pub fn cost(&self, prompt_tokens: f64, cached_tokens: f64, completion_tokens: f64) -> f64 {
        let prompt = prompt_tokens.max(0.0);
        let cached = cached_tokens.max(0.0).min(prompt);
        let cached_rate = self
            .cached_input_per_million
            .unwrap_or(self.input_per_million);
        ((prompt - cached) * self.input_per_million
            + cached * cached_rate
            + completion_tokens.max(0.0) * self.output_per_million)
            / TOKENS_PER_MILLION
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TtsRate {
    pub per_million_characters: f64,
}

impl TtsRate {
    pub fn cost(&self, characters: f64) -> f64 {
        characters.max(0.0) * self.per_million_characters / CHARACTERS_PER_MILLION
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SttRate {
    pub per_minute: f64,
}

impl SttRate {
    pub fn cost(&self, audio_seconds: f64) -> f64 {
        audio_seconds.max(0.0) / SECONDS_PER_MINUTE * self.per_minute
    }
}

trait Rate {
    fn values(&self) -> Vec<f64>;

    fn validate(&self) -> Result<(), String> {
        match self.values().into_iter().find(|v| !v.is_finite() || *v < 0.0) {
            Some(v) => Err(format!("rate must be a non-negative number, got {}", v)),
            None => Ok(()),
        }
    }
}

impl Rate for LlmRate {
    fn values(&self) -> Vec<f64> {
        let mut values = vec![self.input_per_million, self.output_per_million];
        values.extend(self.cached_input_per_million);
        values
    }
}

impl Rate for TtsRate {
    fn values(&self) -> Vec<f64> {
        vec![self.per_million_characters]
    }
}

impl Rate for SttRate {
    fn values(&self) -> Vec<f64> {
        vec![self.per_minute]
    }
}

// ============================================================================
// RATE TABLE
// ============================================================================

/// Raw pricing document as stored on disk
#[derive(Debug, Deserialize)]
struct PricingDocument {
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    llm: BTreeMap<String, LlmRate>,
    #[serde(default)]
    tts: BTreeMap<String, TtsRate>,
    #[serde(default)]
    stt: BTreeMap<String, SttRate>,
}

/// Rates of one category keyed by lowercase `provider/model`
#[derive(Debug)]
pub struct RateTable<T> {
    entries: BTreeMap<String, T>,
    /// Model name to the first (alphabetical) key listing it
    by_model: BTreeMap<String, String>,
}

/// Normalize keys, validate rates and index model names
fn build_rate_table<T: Rate>(
    category: &'static str,
    raw: BTreeMap<String, T>,
) -> Result<RateTable<T>, PricingError> {
    let mut entries = BTreeMap::new();
    let mut by_model = BTreeMap::new();

    for (key, rate) in raw {
        let key = key.trim().to_lowercase();
        rate.validate()
            .map_err(|reason| PricingError::InvalidRate {
                category,
                key: key.clone(),
                reason,
            })?;
        if let Some((_, model)) = key.split_once('/')
            && model != PROVIDER_DEFAULT_MODEL
        {
            by_model
                .entry(model.to_string())
                .or_insert_with(|| key.clone());
        }
        entries.insert(key, rate);
    }

    Ok(RateTable { entries, by_model })
}

impl<T> RateTable<T> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a rate with multi-strategy fallback
    pub fn lookup(&self, provider: Option<&str>, model: Option<&str>) -> Option<(&T, MatchType)> {
        let mut provider = provider.map(normalize_provider).filter(|p| !p.is_empty());
        let mut model = model
            .map(|m| m.trim().to_lowercase())
            .filter(|m| !m.is_empty());

        // SDKs sometimes send "provider/model" in the model field
        if let Some((prefix, rest)) = model.as_deref().and_then(|m| m.split_once('/'))
            && !rest.is_empty()
        {
            if provider.is_none() {
                provider = Some(normalize_provider(prefix));
            }
            model = Some(rest.to_string());
        }

        let provider = provider.as_deref();

        if let Some(model) = model.as_deref() {
            if let Some(rate) = provider.and_then(|p| self.get(p, model)) {
                return Some((rate, MatchType::Exact));
            }
            if let Some(rate) = self.model_only(model) {
                return Some((rate, MatchType::ModelOnly));
            }

            let family = strip_date_suffix(normalize_model_name(model));
            if family != model {
                if let Some(rate) = provider.and_then(|p| self.get(p, family)) {
                    return Some((rate, MatchType::Family));
                }
                if let Some(rate) = self.model_only(family) {
                    return Some((rate, MatchType::Family));
                }
            }
        }

        provider
            .and_then(|p| self.get(p, PROVIDER_DEFAULT_MODEL))
            .map(|rate| (rate, MatchType::ProviderDefault))
    }

    fn get(&self, provider: &str, model: &str) -> Option<&T> {
        self.entries.get(&format!("{}/{}", provider, model))
    }

    fn model_only(&self, model: &str) -> Option<&T> {
        self.by_model
            .get(model)
            .and_then(|key| self.entries.get(key))
    }
}

// ============================================================================
// NAME NORMALIZATION
// ============================================================================

/// Map SDK provider labels onto table provider names
fn normalize_provider(provider: &str) -> String {
    let lower = provider.trim().to_lowercase();
    let mapped = match lower.as_str() {
        "gemini" | "google_genai" | "google-genai" | "vertex_ai" | "vertexai" => "google",
        "azure_openai" | "azure-openai" => "azure",
        "eleven_labs" | "11labs" | "eleven-labs" => "elevenlabs",
        "assembly_ai" | "assembly-ai" => "assemblyai",
        "sarvamai" => "sarvam",
        _ => return lower,
    };
    mapped.to_string()
}

/// Strip `-latest` / `:latest` suffixes
fn normalize_model_name(model: &str) -> &str {
    model
        .trim_end_matches("-latest")
        .trim_end_matches(":latest")
}

/// Strip a trailing release date
///
/// - `claude-3-5-sonnet-20241022` → `claude-3-5-sonnet`
/// - `gpt-4o-2024-11-20` → `gpt-4o`
/// - `gpt-3.5-turbo-0125` → `gpt-3.5-turbo`
fn strip_date_suffix(model: &str) -> &str {
    let bytes = model.as_bytes();
    let digits = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);

    // -YYYY-MM-DD
    if bytes.len() > 11 {
        let at = bytes.len() - 11;
        if bytes[at] == b'-'
            && bytes[at + 5] == b'-'
            && bytes[at + 8] == b'-'
            && digits(at + 1..at + 5)
            && digits(at + 6..at + 8)
            && digits(at + 9..at + 11)
        {
            return &model[..at];
        }
    }

    // -YYYYMMDD or -MMDD
    if let Some(pos) = model.rfind('-') {
        let tail = &model[pos + 1..];
        if (tail.len() == 8 || tail.len() == 4) && tail.bytes().all(|b| b.is_ascii_digit()) {
            return &model[..pos];
        }
    }

    model
}

// ============================================================================
// PRICING SERVICE
// ============================================================================

/// One category's cost with the way its rate was matched
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CategoryCost {
    pub amount: f64,
    pub match_type: MatchType,
}

/// LLM token usage for one call
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LlmUsage {
    pub prompt_tokens: f64,
    pub cached_tokens: f64,
    pub completion_tokens: f64,
}

impl LlmUsage {
    pub fn is_empty(&self) -> bool {
        self.prompt_tokens <= 0.0 && self.completion_tokens <= 0.0
    }
}

#[derive(Debug)]
pub struct PricingService {
    llm: RateTable<LlmRate>,
    tts: RateTable<TtsRate>,
    stt: RateTable<SttRate>,
    table_currency: String,
    currency: String,
    exchange_rate: f64,
}

impl PricingService {
    /// Load pricing from `file` or the embedded table
    pub fn init(
        file: Option<&Path>,
        currency: &str,
        exchange_rate: f64,
    ) -> Result<Self, PricingError> {
        let (json, source) = match file {
            Some(path) => {
                let json = std::fs::read_to_string(path).map_err(|source| PricingError::Io {
                    path: path.to_path_buf(),
                    source,
                })?;
                (json, path.display().to_string())
            }
            None => (EMBEDDED_PRICING_JSON.to_string(), "embedded".to_string()),
        };

        let service = Self::from_json_str(&json, currency, exchange_rate)?;
        tracing::debug!(
            source = %source,
            llm = service.llm.len(),
            tts = service.tts.len(),
            stt = service.stt.len(),
            table_currency = %service.table_currency,
            currency = %service.currency,
            exchange_rate = service.exchange_rate,
            "Pricing initialized"
        );
        Ok(service)
    }

    pub fn from_json_str(
        json: &str,
        currency: &str,
        exchange_rate: f64,
    ) -> Result<Self, PricingError> {
        let doc: PricingDocument =
            serde_json::from_str(json).map_err(|e| PricingError::ParseError(e.to_string()))?;

        if !exchange_rate.is_finite() || exchange_rate <= 0.0 {
            return Err(PricingError::ParseError(format!(
                "exchange rate must be positive, got {}",
                exchange_rate
            )));
        }

        let llm = build_rate_table("llm", doc.llm)?;
        let tts = build_rate_table("tts", doc.tts)?;
        let stt = build_rate_table("stt", doc.stt)?;
        if llm.is_empty() && tts.is_empty() && stt.is_empty() {
            tracing::warn!("Pricing table has no rates; all costs will be zero");
        }

        Ok(Self {
            llm,
            tts,
            stt,
            table_currency: doc.currency.unwrap_or_else(|| "USD".to_string()),
            currency: currency.to_uppercase(),
            exchange_rate,
        })
    }

    /// Embedded table in USD
    #[cfg(test)]
    pub fn init_for_test() -> Self {
        Self::from_json_str(EMBEDDED_PRICING_JSON, "USD", 1.0).unwrap()
    }

    /// Currency costs are reported in
    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn llm_cost(
        &self,
        provider: Option<&str>,
        model: Option<&str>,
        usage: &LlmUsage,
    ) -> CategoryCost {
        self.priced("llm", &self.llm, provider, model, !usage.is_empty(), |rate| {
            rate.cost(
                usage.prompt_tokens,
                usage.cached_tokens,
                usage.completion_tokens,
            )
        })
    }

    pub fn tts_cost(
        &self,
        provider: Option<&str>,
        model: Option<&str>,
        characters: f64,
    ) -> CategoryCost {
        self.priced("tts", &self.tts, provider, model, characters > 0.0, |rate| {
            rate.cost(characters)
        })
    }

    pub fn stt_cost(
        &self,
        provider: Option<&str>,
        model: Option<&str>,
        audio_seconds: f64,
    ) -> CategoryCost {
        self.priced("stt", &self.stt, provider, model, audio_seconds > 0.0, |rate| {
            rate.cost(audio_seconds)
        })
    }

    fn priced<T>(
        &self,
        category: &'static str,
        table: &RateTable<T>,
        provider: Option<&str>,
        model: Option<&str>,
        has_usage: bool,
        cost: impl Fn(&T) -> f64,
    ) -> CategoryCost {
        match table.lookup(provider, model) {
            Some((rate, match_type)) => CategoryCost {
                amount: if has_usage {
                    cost(rate) * self.exchange_rate
                } else {
                    0.0
                },
                match_type,
            },
            None => {
                if has_usage {
                    tracing::debug!(
                        category,
                        provider = ?provider,
                        model = ?model,
                        "No pricing found, cost recorded as zero"
                    );
                }
                CategoryCost::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_embedded_table_parses() {
        let service = PricingService::init_for_test();
        assert!(service.llm.len() > 5);
        assert!(service.tts.len() > 5);
        assert!(service.stt.len() > 5);
        assert_eq!(service.currency(), "USD");
    }

    #[test]
    fn test_lookup_exact() {
        let service = PricingService::init_for_test();
        let (rate, match_type) = service.llm.lookup(Some("openai"), Some("gpt-4o")).unwrap();
        assert_eq!(match_type, MatchType::Exact);
        assert_eq!(rate.input_per_million, 2.5);
    }

    #[test]
    fn test_lookup_provider_in_model_field() {
        let service = PricingService::init_for_test();
        let (_, match_type) = service.llm.lookup(None, Some("OpenAI/GPT-4o")).unwrap();
        assert_eq!(match_type, MatchType::Exact);
    }

    #[test]
    fn test_lookup_model_only() {
        let service = PricingService::init_for_test();
        let (_, match_type) = service.llm.lookup(Some("azure"), Some("gpt-4o-mini")).unwrap();
        assert_eq!(match_type, MatchType::ModelOnly);
        let (_, match_type) = service.stt.lookup(None, Some("nova-3")).unwrap();
        assert_eq!(match_type, MatchType::ModelOnly);
    }

    #[test]
    fn test_lookup_family() {
        let service = PricingService::init_for_test();
        let (rate, match_type) = service
            .llm
            .lookup(Some("openai"), Some("gpt-4o-2024-08-06"))
            .unwrap();
        assert_eq!(match_type, MatchType::Family);
        assert_eq!(rate.input_per_million, 2.5);

        let (_, match_type) = service
            .llm
            .lookup(Some("anthropic"), Some("claude-3-5-sonnet-20241022"))
            .unwrap();
        assert_eq!(match_type, MatchType::Family);

        let (_, match_type) = service
            .llm
            .lookup(None, Some("claude-3-5-haiku-latest"))
            .unwrap();
        assert_eq!(match_type, MatchType::Family);
    }

    #[test]
    fn test_lookup_provider_default() {
        let service = PricingService::init_for_test();
        let (_, match_type) = service
            .tts
            .lookup(Some("ElevenLabs"), Some("some_new_voice_model"))
            .unwrap();
        assert_eq!(match_type, MatchType::ProviderDefault);
        let (_, match_type) = service.stt.lookup(Some("deepgram"), None).unwrap();
        assert_eq!(match_type, MatchType::ProviderDefault);
    }

    #[test]
    fn test_lookup_not_found() {
        let service = PricingService::init_for_test();
        assert!(service.llm.lookup(Some("acme"), Some("mystery-1")).is_none());
        assert!(service.llm.lookup(None, None).is_none());
    }

    #[test]
    fn test_provider_aliases() {
        assert_eq!(normalize_provider("11labs"), "elevenlabs");
        assert_eq!(normalize_provider("Gemini"), "google");
        assert_eq!(normalize_provider("azure_openai"), "azure");
        assert_eq!(normalize_provider(" Deepgram "), "deepgram");
    }

    #[test]
    fn test_strip_date_suffix() {
        assert_eq!(strip_date_suffix("claude-3-5-sonnet-20241022"), "claude-3-5-sonnet");
        assert_eq!(strip_date_suffix("gpt-4o-2024-11-20"), "gpt-4o");
        assert_eq!(strip_date_suffix("gpt-3.5-turbo-0125"), "gpt-3.5-turbo");
        assert_eq!(strip_date_suffix("gpt-4o"), "gpt-4o");
        assert_eq!(strip_date_suffix("nova-3"), "nova-3");
    }

    #[test]
    fn test_llm_cost_with_cache() {
        let rate = LlmRate {
            input_per_million: 2.0,
            output_per_million: 8.0,
            cached_input_per_million: Some(0.5),
        };
        // 800 uncached * 2 + 200 cached * 0.5 + 500 * 8 = 1600 + 100 + 4000
        assert!(approx(rate.cost(1000.0, 200.0, 500.0), 5700.0 / 1_000_000.0));
        // Cached share never exceeds the prompt
        assert!(approx(rate.cost(100.0, 500.0, 0.0), 50.0 / 1_000_000.0));
    }

    #[test]
    fn test_tts_and_stt_units() {
        let tts = TtsRate {
            per_million_characters: 100.0,
        };
        assert!(approx(tts.cost(10_000.0), 1.0));
        let stt = SttRate { per_minute: 0.006 };
        assert!(approx(stt.cost(90.0), 0.009));
    }

    #[test]
    fn test_exchange_rate_applied() {
        let service =
            PricingService::from_json_str(EMBEDDED_PRICING_JSON, "eur", 0.5).unwrap();
        assert_eq!(service.currency(), "EUR");
        let cost = service.stt_cost(Some("openai"), Some("whisper-1"), 60.0);
        assert!(approx(cost.amount, 0.003));
        assert_eq!(cost.match_type, MatchType::Exact);
    }

    #[test]
    fn test_zero_usage_costs_nothing() {
        let service = PricingService::init_for_test();
        let cost = service.llm_cost(Some("openai"), Some("gpt-4o"), &LlmUsage::default());
        assert_eq!(cost.amount, 0.0);
        assert_eq!(cost.match_type, MatchType::Exact);
    }

    #[test]
    fn test_unknown_model_costs_nothing() {
        let service = PricingService::init_for_test();
        let cost = service.tts_cost(Some("acme"), Some("voice"), 1000.0);
        assert_eq!(cost, CategoryCost::default());
    }

    #[test]
    fn test_invalid_rate_rejected() {
        let json = r#"{"llm": {"x/y": {"input_per_million": -1, "output_per_million": 1}}}"#;
        let err = PricingService::from_json_str(json, "USD", 1.0).unwrap_err();
        assert!(matches!(err, PricingError::InvalidRate { .. }));
    }

    #[test]
    fn test_invalid_exchange_rate_rejected() {
        assert!(PricingService::from_json_str(EMBEDDED_PRICING_JSON, "USD", 0.0).is_err());
    }

    #[test]
    fn test_init_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prices.json");
        std::fs::write(
            &path,
            r#"{"currency": "USD", "stt": {"acme/ears": {"per_minute": 1.0}}}"#,
        )
        .unwrap();
        let service = PricingService::init(Some(&path), "USD", 1.0).unwrap();
        let cost = service.stt_cost(Some("acme"), Some("ears"), 30.0);
        assert!(approx(cost.amount, 0.5));
    }

    #[test]
    fn test_init_missing_file() {
        let err = PricingService::init(Some(Path::new("/nonexistent/prices.json")), "USD", 1.0)
            .unwrap_err();
        assert!(matches!(err, PricingError::Io { .. }));
    }
}
