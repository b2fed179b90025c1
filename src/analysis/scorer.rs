//! Quality scoring for explanations.
//!
//! Two scores live here: a completeness heuristic attached to every live
//! response, and a word-overlap comparison against reference answers used
//! by offline evaluation. Both are lexical; nothing here measures meaning.

use crate::models::CanonicalResponse;
use std::collections::HashSet;

/// Completeness heuristic for a single response (0-100).
pub fn heuristic_score(response: &CanonicalResponse) -> u8 {
    let mut score: u32 = 0;

    if !response.explanation.is_empty() {
        score += 30;
        if response.explanation.chars().count() > 100 {
            score += 10;
        }
    }

    if !response.suggestion.is_empty() {
        score += 30;
        if response.suggestion.chars().count() > 50 {
            score += 10;
        }
    }

    if response.score <= 100 {
        score += 20;
    }

    if response.severity.is_some() {
        score += 10;
    }
    if response.bug_type.is_some() {
        score += 10;
    }

    score.min(100) as u8
}

/// Lexical scores of a prediction against a reference answer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverlapScores {
    pub explanation: f64,
    pub suggestion: f64,
    pub overall: f64,
}

/// Score `predicted` against the reference explanation and suggestion.
pub fn score_explanation(
    predicted: &CanonicalResponse,
    gold_explanation: &str,
    gold_suggestion: &str,
) -> OverlapScores {
    let explanation = word_overlap(&predicted.explanation, gold_explanation);
    let suggestion = word_overlap(&predicted.suggestion, gold_suggestion);

    OverlapScores {
        explanation,
        suggestion,
        overall: (explanation + suggestion) / 2.0,
    }
}

/// Share of the reference's distinct words found in the prediction (0-100).
pub fn word_overlap(predicted: &str, gold: &str) -> f64 {
    let gold_lower = gold.trim().to_lowercase();
    let gold_words: HashSet<&str> = gold_lower.split_whitespace().collect();
    if gold_words.is_empty() {
        return 0.0;
    }

    let predicted_lower = predicted.trim().to_lowercase();
    let predicted_words: HashSet<&str> = predicted_lower.split_whitespace().collect();

    let shared = gold_words.intersection(&predicted_words).count();
    shared as f64 / gold_words.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    #[test]
    fn test_heuristic_score_empty() {
        // Only the in-range score contributes.
        assert_eq!(heuristic_score(&CanonicalResponse::default()), 20);
    }

    #[test]
    fn test_heuristic_score_complete() {
        let response = CanonicalResponse {
            explanation: "e".repeat(120),
            suggestion: "s".repeat(60),
            score: 90,
            severity: Some(Severity::High),
            bug_type: Some("null reference".to_string()),
        };
        assert_eq!(heuristic_score(&response), 100);
    }

    #[test]
    fn test_heuristic_score_short_text() {
        let response = CanonicalResponse {
            explanation: "short".to_string(),
            suggestion: "fix".to_string(),
            score: 50,
            severity: None,
            bug_type: Some("type error".to_string()),
        };
        assert_eq!(heuristic_score(&response), 90);
    }

    #[test]
    fn test_word_overlap() {
        assert_eq!(word_overlap("The variable is null", "variable is NULL"), 100.0);
        assert_eq!(word_overlap("nothing shared", "variable is null"), 0.0);
        assert_eq!(word_overlap("anything", "   "), 0.0);
        assert_eq!(word_overlap("a b", "a b c d"), 50.0);
    }

    #[test]
    fn test_score_explanation_overall_is_mean() {
        let predicted = CanonicalResponse {
            explanation: "x is undefined".to_string(),
            suggestion: "declare x".to_string(),
            ..Default::default()
        };
        let scores = score_explanation(&predicted, "x is undefined", "initialize x first");
        assert_eq!(scores.explanation, 100.0);
        assert!((scores.suggestion - 100.0 / 3.0).abs() < 1e-9);
        assert!((scores.overall - (100.0 + 100.0 / 3.0) / 2.0).abs() < 1e-9);
    }
}
