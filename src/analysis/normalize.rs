//! Mapping parsed model JSON onto [`CanonicalResponse`], and the per-model
//! parse pipeline (extract, parse, repair, normalize).

use super::extract::{excerpt, extract_json_block, LOG_EXCERPT_CHARS};
use super::repair::repair_json;
use super::ParseError;
use crate::models::{CanonicalResponse, ParsedModelResult, RawModelResult, Severity};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Normalize an arbitrary parsed value into the canonical shape.
///
/// Missing or non-string `explanation`/`suggestion` become empty strings.
/// A missing `score` is 0; anything else must be numeric (or a numeric
/// string) and is truncated and clamped to 0..=100. `severity` and
/// `bug_type` are only carried when the model supplied them.
pub fn normalize_response(value: &Value) -> Result<CanonicalResponse, ParseError> {
    let object = value.as_object().ok_or(ParseError::NotAnObject)?;

    Ok(CanonicalResponse {
        explanation: string_field(object, "explanation"),
        suggestion: string_field(object, "suggestion"),
        score: coerce_score(object.get("score"))?,
        severity: object
            .get("severity")
            .and_then(Value::as_str)
            .and_then(Severity::parse_label),
        bug_type: object
            .get("bug_type")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from),
    })
}

fn string_field(object: &Map<String, Value>, key: &str) -> String {
    object
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn coerce_score(value: Option<&Value>) -> Result<u8, ParseError> {
    let raw = match value {
        None => return Ok(0),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match raw {
        Some(score) if score.is_finite() => Ok(score.trunc().clamp(0.0, 100.0) as u8),
        _ => Err(ParseError::InvalidScore(
            value.map(Value::to_string).unwrap_or_default(),
        )),
    }
}

/// Parse one model's raw text into a canonical response.
///
/// Returns the response and whether repair was needed to get there.
pub fn parse_model_output(text: &str) -> Result<(CanonicalResponse, bool), ParseError> {
    let block = extract_json_block(text).ok_or(ParseError::NoJsonFound)?;

    if let Ok(value) = serde_json::from_str::<Value>(block) {
        return normalize_response(&value).map(|response| (response, false));
    }

    let repaired = repair_json(block).ok_or(ParseError::Unrepairable)?;
    let value: Value = serde_json::from_str(&repaired).map_err(|_| ParseError::Unrepairable)?;
    normalize_response(&value).map(|response| (response, true))
}

/// Turn a raw model result into a parsed one, absorbing every failure.
pub fn parse_raw_result(raw: &RawModelResult) -> ParsedModelResult {
    let Some(text) = raw.text.as_deref() else {
        return ParsedModelResult {
            model: raw.model.clone(),
            data: None,
            used_repair: false,
        };
    };

    match parse_model_output(text) {
        Ok((data, used_repair)) => {
            if used_repair {
                debug!("Output of {} needed JSON repair", raw.model);
            }
            ParsedModelResult {
                model: raw.model.clone(),
                data: Some(data),
                used_repair,
            }
        }
        Err(err) => {
            match err {
                ParseError::NoJsonFound => warn!(
                    "Failed to extract JSON from {} output. First {} chars: {}",
                    raw.model,
                    LOG_EXCERPT_CHARS,
                    excerpt(text, LOG_EXCERPT_CHARS)
                ),
                _ => warn!("Discarding output of {}: {}", raw.model, err),
            }
            ParsedModelResult {
                model: raw.model.clone(),
                data: None,
                used_repair: false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults_for_missing_fields() {
        let response = normalize_response(&json!({})).unwrap();
        assert_eq!(response, CanonicalResponse::default());
    }

    #[test]
    fn test_non_string_text_fields_default_to_empty() {
        let response =
            normalize_response(&json!({"explanation": 42, "suggestion": ["a"], "score": 10}))
                .unwrap();
        assert_eq!(response.explanation, "");
        assert_eq!(response.suggestion, "");
        assert_eq!(response.score, 10);
    }

    #[test]
    fn test_score_is_clamped() {
        let high = normalize_response(&json!({"score": 150})).unwrap();
        let low = normalize_response(&json!({"score": -5})).unwrap();
        assert_eq!(high.score, 100);
        assert_eq!(low.score, 0);
    }

    #[test]
    fn test_score_is_truncated_and_coerced_from_strings() {
        assert_eq!(normalize_response(&json!({"score": 85.9})).unwrap().score, 85);
        assert_eq!(normalize_response(&json!({"score": "72"})).unwrap().score, 72);
        assert_eq!(normalize_response(&json!({"score": " 64.5 "})).unwrap().score, 64);
    }

    #[test]
    fn test_non_numeric_score_is_rejected() {
        for score in [json!("high"), json!(null), json!(true), json!({"v": 1}), json!("NaN")] {
            let result = normalize_response(&json!({"explanation": "e", "score": score}));
            assert!(matches!(result, Err(ParseError::InvalidScore(_))));
        }
    }

    #[test]
    fn test_optional_fields_not_synthesized() {
        let response = normalize_response(&json!({"explanation": "e"})).unwrap();
        assert!(response.severity.is_none());
        assert!(response.bug_type.is_none());

        let response =
            normalize_response(&json!({"severity": "High", "bug_type": "type error"})).unwrap();
        assert_eq!(response.severity, Some(Severity::High));
        assert_eq!(response.bug_type.as_deref(), Some("type error"));
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(matches!(
            normalize_response(&json!([1, 2])),
            Err(ParseError::NotAnObject)
        ));
    }

    #[test]
    fn test_parse_clean_output() {
        let text = r#"Here you go: {"explanation": "e", "suggestion": "s", "score": 90}"#;
        let (response, repaired) = parse_model_output(text).unwrap();
        assert!(!repaired);
        assert_eq!(response.score, 90);
    }

    #[test]
    fn test_parse_repaired_output() {
        let text = "```json\n{explanation: 'e', suggestion: 's', score: 40,}\n```";
        let (response, repaired) = parse_model_output(text).unwrap();
        assert!(repaired);
        assert_eq!(response.explanation, "e");
        assert_eq!(response.suggestion, "s");
        assert_eq!(response.score, 40);
    }

    #[test]
    fn test_parse_failures() {
        assert!(matches!(
            parse_model_output("I could not determine the cause."),
            Err(ParseError::NoJsonFound)
        ));
        assert!(matches!(
            parse_model_output("{explanation = nope}"),
            Err(ParseError::Unrepairable)
        ));
        assert!(matches!(
            parse_model_output(r#"{"explanation": "e", "score": "very"}"#),
            Err(ParseError::InvalidScore(_))
        ));
    }

    #[test]
    fn test_parse_raw_result_without_text() {
        let raw = RawModelResult::failure("m", "timeout", 30_000.0);
        let parsed = parse_raw_result(&raw);
        assert_eq!(parsed.model, "m");
        assert!(parsed.data.is_none());
        assert!(!parsed.used_repair);
    }

    #[test]
    fn test_parse_raw_result_with_garbage() {
        let raw = RawModelResult::success("m", "just prose", 10.0);
        assert!(parse_raw_result(&raw).data.is_none());
    }
}
