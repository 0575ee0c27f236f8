//! Critical-path analysis
//!
//! Reduces the SDK-reported critical-path span sequence into a total, an
//! average step duration and the steps slow enough to be called bottlenecks.

use serde::{Deserialize, Serialize};

use crate::utils::json::deserialize_lenient_f64;

/// Steps strictly longer than this are bottlenecks
pub const BOTTLENECK_THRESHOLD_MS: f64 = 1000.0;

/// One step of the critical path as reported by the agent SDK
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathSpan {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub operation_type: Option<String>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub duration_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bottleneck {
    pub operation: Option<String>,
    #[serde(rename = "type")]
    pub operation_type: Option<String>,
    pub duration_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriticalPathAnalysis {
    pub total_duration_ms: f64,
    pub bottlenecks: Vec<Bottleneck>,
    pub avg_step_duration: f64,
}

/// Analyze a critical path. Missing durations count as zero.
pub fn analyze_critical_path(path: &[CriticalPathSpan]) -> CriticalPathAnalysis {
    let total_duration_ms: f64 = path.iter().map(|s| s.duration_ms.unwrap_or(0.0)).sum();

    let avg_step_duration = if path.is_empty() {
        0.0
    } else {
        total_duration_ms / path.len() as f64
    };

    let bottlenecks = path
        .iter()
        .filter_map(|s| {
            let duration_ms = s.duration_ms?;
            (duration_ms > BOTTLENECK_THRESHOLD_MS).then(|| Bottleneck {
                operation: s.name.clone(),
                operation_type: s.operation_type.clone(),
                duration_ms,
            })
        })
        .collect();

    CriticalPathAnalysis {
        total_duration_ms,
        bottlenecks,
        avg_step_duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn step(name: &str, duration_ms: Option<f64>) -> CriticalPathSpan {
        CriticalPathSpan {
            name: Some(name.to_string()),
            operation_type: Some("llm".to_string()),
            duration_ms,
        }
    }

    #[test]
    fn test_total_average_and_bottleneck() {
        let analysis = analyze_critical_path(&[step("a", Some(1200.0)), step("b", Some(300.0))]);
        assert_eq!(analysis.total_duration_ms, 1500.0);
        assert_eq!(analysis.avg_step_duration, 750.0);
        assert_eq!(analysis.bottlenecks.len(), 1);
        assert_eq!(analysis.bottlenecks[0].duration_ms, 1200.0);
        assert_eq!(analysis.bottlenecks[0].operation.as_deref(), Some("a"));
    }

    #[test]
    fn test_empty_path() {
        let analysis = analyze_critical_path(&[]);
        assert_eq!(analysis.total_duration_ms, 0.0);
        assert_eq!(analysis.avg_step_duration, 0.0);
        assert!(analysis.bottlenecks.is_empty());
    }

    #[test]
    fn test_threshold_is_strict() {
        let analysis = analyze_critical_path(&[step("edge", Some(1000.0))]);
        assert!(analysis.bottlenecks.is_empty());
    }

    #[test]
    fn test_missing_duration_counts_as_zero() {
        let analysis = analyze_critical_path(&[step("a", None), step("b", Some(400.0))]);
        assert_eq!(analysis.total_duration_ms, 400.0);
        assert_eq!(analysis.avg_step_duration, 200.0);
    }

    #[test]
    fn test_bottlenecks_keep_order() {
        let path = vec![
            step("first", Some(5000.0)),
            step("fast", Some(10.0)),
            step("second", Some(1001.0)),
            step("third", Some(2500.0)),
        ];
        let analysis = analyze_critical_path(&path);
        let names: Vec<_> = analysis
            .bottlenecks
            .iter()
            .map(|b| b.operation.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
        assert!(analysis.bottlenecks.iter().all(|b| b.duration_ms > 1000.0));
    }

    #[test]
    fn test_bottleneck_serializes_type_field() {
        let analysis = analyze_critical_path(&[step("slow", Some(2000.0))]);
        let value = serde_json::to_value(&analysis).unwrap();
        assert_eq!(
            value["bottlenecks"][0],
            json!({"operation": "slow", "type": "llm", "duration_ms": 2000.0})
        );
    }

    #[test]
    fn test_deserialize_loose_step() {
        let step: CriticalPathSpan =
            serde_json::from_value(json!({"name": "tts", "duration_ms": "42"})).unwrap();
        assert_eq!(step.duration_ms, Some(42.0));
        assert_eq!(step.operation_type, None);
    }
}
