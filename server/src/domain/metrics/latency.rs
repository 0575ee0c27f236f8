//! Per-turn latency aggregation
//!
//! Latency values are seconds, as reported by the voice pipeline SDK.

use serde::{Deserialize, Serialize};

use crate::utils::json::{deserialize_lenient, deserialize_lenient_f64, deserialize_opt_id};
use crate::utils::time::TimestampValue;

/// STT duration assumed when metrics exist but report no duration
pub const STT_FALLBACK_SECS: f64 = 0.2;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SttMetrics {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub duration: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub audio_duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmMetrics {
    /// Time to first token
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub ttft: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TtsMetrics {
    /// Time to first byte of audio
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub ttfb: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EouMetrics {
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub end_of_utterance_delay: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub transcription_delay: Option<f64>,
}

/// One entry of `transcript_with_metrics`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnMetricsSample {
    #[serde(default, deserialize_with = "deserialize_opt_id")]
    pub turn_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub user_transcript: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub agent_response: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub timestamp: Option<TimestampValue>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub stt_metrics: Option<SttMetrics>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub llm_metrics: Option<LlmMetrics>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub tts_metrics: Option<TtsMetrics>,
    #[serde(default, deserialize_with = "deserialize_lenient")]
    pub eou_metrics: Option<EouMetrics>,
}

/// Stage latencies of one turn, in seconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TurnLatency {
    pub stt: f64,
    pub llm: f64,
    pub tts_first_byte: f64,
    pub tts_duration: f64,
    pub eou: f64,
}

impl TurnLatency {
    pub fn from_sample(sample: &TurnMetricsSample) -> Self {
        let has_transcript = sample
            .user_transcript
            .as_deref()
            .is_some_and(|t| !t.is_empty());

        let stt = match (&sample.stt_metrics, has_transcript) {
            (Some(stt), true) => stt
                .duration
                .filter(|d| *d != 0.0)
                .unwrap_or(STT_FALLBACK_SECS),
            _ => 0.0,
        };

        let llm = sample.llm_metrics.as_ref();
        let tts = sample.tts_metrics.as_ref();
        let eou = sample.eou_metrics.as_ref();

        Self {
            stt,
            llm: llm.and_then(|m| m.ttft).unwrap_or(0.0),
            tts_first_byte: tts.and_then(|m| m.ttfb).unwrap_or(0.0),
            tts_duration: tts.and_then(|m| m.duration).unwrap_or(0.0),
            eou: eou.and_then(|m| m.end_of_utterance_delay).unwrap_or(0.0),
        }
    }

    pub fn tts(&self) -> f64 {
        self.tts_first_byte + self.tts_duration
    }

    pub fn total(&self) -> f64 {
        self.stt + self.llm + self.tts() + self.eou
    }
}

/// Call-level latency aggregate
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyBreakdown {
    /// Mean end-to-end latency over turns with a positive total
    pub avg_latency: Option<f64>,
    pub avg_stt: Option<f64>,
    pub avg_llm: Option<f64>,
    pub avg_tts: Option<f64>,
    pub avg_eou: Option<f64>,
    pub qualifying_turns: usize,
    pub total_turns: usize,
}

/// Aggregate per-turn samples. Turns whose total is not positive are excluded.
pub fn latency_breakdown(samples: &[TurnMetricsSample]) -> LatencyBreakdown {
    let qualifying: Vec<TurnLatency> = samples
        .iter()
        .map(TurnLatency::from_sample)
        .filter(|l| l.total() > 0.0)
        .collect();

    let mean = |f: fn(&TurnLatency) -> f64| -> Option<f64> {
        if qualifying.is_empty() {
            None
        } else {
            Some(qualifying.iter().map(f).sum::<f64>() / qualifying.len() as f64)
        }
    };

    LatencyBreakdown {
        avg_latency: mean(TurnLatency::total),
        avg_stt: mean(|l| l.stt),
        avg_llm: mean(|l| l.llm),
        avg_tts: mean(TurnLatency::tts),
        avg_eou: mean(|l| l.eou),
        qualifying_turns: qualifying.len(),
        total_turns: samples.len(),
    }
}

/// Mean end-to-end latency in seconds, or `None` when no turn qualifies
pub fn average_latency(samples: &[TurnMetricsSample]) -> Option<f64> {
    latency_breakdown(samples).avg_latency
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn sample(value: serde_json::Value) -> TurnMetricsSample {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_stt_fallback_turn() {
        let turn = sample(json!({
            "user_transcript": "hi",
            "stt_metrics": {"duration": 0},
            "llm_metrics": {"ttft": 0.5},
            "tts_metrics": {"ttfb": 0.1, "duration": 1.0},
            "eou_metrics": {"end_of_utterance_delay": 0.2}
        }));
        let latency = TurnLatency::from_sample(&turn);
        assert_eq!(latency.stt, STT_FALLBACK_SECS);
        assert!(approx(latency.total(), 2.0));
        assert!(approx(average_latency(&[turn]).unwrap(), 2.0));
    }

    #[test]
    fn test_stt_ignored_without_transcript() {
        let turn = sample(json!({
            "stt_metrics": {"duration": 0.4},
            "llm_metrics": {"ttft": 0.5}
        }));
        assert_eq!(TurnLatency::from_sample(&turn).stt, 0.0);

        let turn = sample(json!({
            "user_transcript": "",
            "stt_metrics": {"duration": 0.4}
        }));
        assert_eq!(TurnLatency::from_sample(&turn).stt, 0.0);
    }

    #[test]
    fn test_stt_uses_reported_duration() {
        let turn = sample(json!({
            "user_transcript": "hello",
            "stt_metrics": {"duration": 0.35}
        }));
        assert_eq!(TurnLatency::from_sample(&turn).stt, 0.35);

        let missing = sample(json!({
            "user_transcript": "hello",
            "stt_metrics": {}
        }));
        assert_eq!(TurnLatency::from_sample(&missing).stt, STT_FALLBACK_SECS);
    }

    #[test]
    fn test_no_metrics_is_null() {
        assert_eq!(average_latency(&[]), None);
        let empty = vec![sample(json!({})), sample(json!({"user_transcript": "hi"}))];
        assert_eq!(average_latency(&empty), None);
    }

    #[test]
    fn test_empty_turns_do_not_dilute_mean() {
        let samples = vec![
            sample(json!({"llm_metrics": {"ttft": 1.0}})),
            sample(json!({})),
            sample(json!({"llm_metrics": {"ttft": 3.0}})),
            sample(json!({"agent_response": "ok"})),
        ];
        let breakdown = latency_breakdown(&samples);
        assert!(approx(breakdown.avg_latency.unwrap(), 2.0));
        assert_eq!(breakdown.qualifying_turns, 2);
        assert_eq!(breakdown.total_turns, 4);
    }

    #[test]
    fn test_aggregate_is_mean_of_positive_totals() {
        let samples: Vec<TurnMetricsSample> = (0..10)
            .map(|i| {
                let ttft = (i % 4) as f64 * 0.25;
                sample(json!({"llm_metrics": {"ttft": ttft}}))
            })
            .collect();
        let totals: Vec<f64> = samples
            .iter()
            .map(|s| TurnLatency::from_sample(s).total())
            .filter(|t| *t > 0.0)
            .collect();
        let expected = totals.iter().sum::<f64>() / totals.len() as f64;
        assert!(approx(average_latency(&samples).unwrap(), expected));
    }

    #[test]
    fn test_stage_breakdown() {
        let samples = vec![
            sample(json!({
                "user_transcript": "a",
                "stt_metrics": {"duration": 0.2},
                "llm_metrics": {"ttft": 0.4},
                "tts_metrics": {"ttfb": 0.1, "duration": 0.5},
                "eou_metrics": {"end_of_utterance_delay": 0.3}
            })),
            sample(json!({
                "llm_metrics": {"ttft": 0.6},
                "tts_metrics": {"ttfb": 0.3}
            })),
        ];
        let b = latency_breakdown(&samples);
        assert!(approx(b.avg_stt.unwrap(), 0.1));
        assert!(approx(b.avg_llm.unwrap(), 0.5));
        assert!(approx(b.avg_tts.unwrap(), 0.45));
        assert!(approx(b.avg_eou.unwrap(), 0.15));
    }

    #[test]
    fn test_null_and_string_metrics_tolerated() {
        let turn = sample(json!({
            "turn_id": 3,
            "stt_metrics": null,
            "llm_metrics": {"ttft": "0.75"},
            "tts_metrics": {"ttfb": null}
        }));
        assert_eq!(turn.turn_id.as_deref(), Some("3"));
        assert_eq!(TurnLatency::from_sample(&turn).total(), 0.75);
    }
}
