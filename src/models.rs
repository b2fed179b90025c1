//! Data models for the debugging assistant.
//!
//! This module contains the core data structures shared by the parsing,
//! aggregation, caching and evaluation stages.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity level reported by a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Minor issues
    Low,
    /// Incorrect behavior
    Medium,
    /// Crashes or broken execution
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
        }
    }
}

impl Severity {
    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
        }
    }

    /// Parse a severity label as models tend to write it.
    ///
    /// Matching is case-insensitive; unknown labels yield `None`.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            _ => None,
        }
    }
}

/// Normalized answer produced from one model's output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalResponse {
    /// Root-cause explanation.
    pub explanation: String,
    /// Suggested fix or next debugging steps.
    pub suggestion: String,
    /// Confidence score, always within 0..=100.
    pub score: u8,
    /// Optional severity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Optional bug category, e.g. "null reference".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bug_type: Option<String>,
}

/// Outcome of a single model call.
#[derive(Debug, Clone, PartialEq)]
pub struct RawModelResult {
    pub model: String,
    pub text: Option<String>,
    pub latency_ms: f64,
    pub error: Option<String>,
}

impl RawModelResult {
    /// A successful call.
    pub fn success(model: impl Into<String>, text: impl Into<String>, latency_ms: f64) -> Self {
        Self {
            model: model.into(),
            text: Some(text.into()),
            latency_ms,
            error: None,
        }
    }

    /// A failed call.
    pub fn failure(model: impl Into<String>, error: impl Into<String>, latency_ms: f64) -> Self {
        Self {
            model: model.into(),
            text: None,
            latency_ms,
            error: Some(error.into()),
        }
    }
}

/// Structured view of a model's output, if one could be recovered.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedModelResult {
    pub model: String,
    pub data: Option<CanonicalResponse>,
    /// Whether the JSON needed textual repair before it parsed.
    pub used_repair: bool,
}

/// Reconciled answer plus provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedResponse {
    pub response: CanonicalResponse,
    /// Models whose output was valid, in query order.
    pub contributors: Vec<String>,
    /// Whether any contributor needed repair.
    pub used_repair: bool,
}

/// Which models to query when none are named explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Primary model only
    Quick,
    /// Primary and secondary models
    #[default]
    Detailed,
}

/// A request to explain a bug.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub code: String,
    pub error_message: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub mode: AnalysisMode,
    /// Explicit model list; overrides `mode` when present.
    #[serde(default)]
    pub models: Option<Vec<String>>,
}

/// Metadata about how a response was produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResponseMeta {
    pub models_used: Vec<String>,
    pub per_model_latency_ms: HashMap<String, f64>,
    pub total_latency_ms: f64,
    pub had_repair: bool,
    pub from_cache: bool,
    /// Heuristic completeness score of the final answer.
    pub quality_score: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backend_version: Option<String>,
}

/// The complete answer returned to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(flatten)]
    pub answer: CanonicalResponse,
    pub meta: ResponseMeta,
}

/// Single example in the evaluation dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationExample {
    pub code: String,
    pub error_message: String,
    pub gold_explanation: String,
    pub gold_suggestion: String,
    #[serde(default)]
    pub language: Option<String>,
}

/// Result of evaluating a single example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub example_id: usize,
    pub valid_json: bool,
    pub explanation_score: f64,
    pub suggestion_score: f64,
    pub overall_score: f64,
    pub latency_ms: f64,
    pub models_used: Vec<String>,
    pub per_model_latency_ms: HashMap<String, f64>,
    pub had_repair: bool,
    pub from_cache: bool,
}

/// Aggregate statistics for one model across an evaluation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub used_count: usize,
    pub mean_latency_ms: f64,
}

/// Summary statistics from an evaluation run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub total_examples: usize,
    pub valid_json_count: usize,
    /// Percentage of examples with valid output (0-100).
    pub valid_json_rate: f64,
    pub mean_explanation_score: f64,
    pub mean_suggestion_score: f64,
    pub mean_overall_score: f64,
    pub mean_latency_ms: f64,
    pub per_model_stats: HashMap<String, ModelStats>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
    }

    #[test]
    fn test_severity_parse_label() {
        assert_eq!(Severity::parse_label("high"), Some(Severity::High));
        assert_eq!(Severity::parse_label(" Medium "), Some(Severity::Medium));
        assert_eq!(Severity::parse_label("LOW"), Some(Severity::Low));
        assert_eq!(Severity::parse_label("critical"), None);
    }

    #[test]
    fn test_canonical_response_skips_absent_optionals() {
        let response = CanonicalResponse {
            explanation: "x is null".to_string(),
            suggestion: "check x".to_string(),
            score: 80,
            severity: None,
            bug_type: None,
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(!json.contains("severity"));
        assert!(!json.contains("bug_type"));
    }

    #[test]
    fn test_analyze_response_flattens_answer() {
        let response = AnalyzeResponse {
            answer: CanonicalResponse {
                explanation: "e".to_string(),
                suggestion: "s".to_string(),
                score: 50,
                severity: Some(Severity::High),
                bug_type: Some("type error".to_string()),
            },
            meta: ResponseMeta::default(),
        };
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["explanation"], "e");
        assert_eq!(value["severity"], "high");
        assert_eq!(value["meta"]["from_cache"], false);
    }

    #[test]
    fn test_request_defaults() {
        let request: AnalyzeRequest =
            serde_json::from_str(r#"{"code": "x = 1", "error_message": "oops"}"#).unwrap();
        assert_eq!(request.mode, AnalysisMode::Detailed);
        assert!(request.models.is_none());
        assert!(request.language.is_none());
    }
}
