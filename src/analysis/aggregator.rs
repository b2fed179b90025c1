//! Reconciling several models' answers into one.
//!
//! Policy:
//!
//! - no valid answers: a fixed fallback response
//! - one valid answer: returned as-is
//! - several: the first unrepaired answer (or the first answer if all were
//!   repaired) supplies the text, the score is the truncated mean of every
//!   valid score, and severity/bug type are decided by majority vote with
//!   ties going to the value seen first in query order.

use super::normalize::parse_raw_result;
use crate::models::{AggregatedResponse, CanonicalResponse, ParsedModelResult, RawModelResult};
use tracing::debug;

pub const FALLBACK_EXPLANATION: &str =
    "Unable to analyze the code. All models failed to produce valid responses.";
pub const FALLBACK_SUGGESTION: &str = "Please check your code and error message, and try again.";

/// The response used when no model produced usable output.
pub fn fallback_response() -> CanonicalResponse {
    CanonicalResponse {
        explanation: FALLBACK_EXPLANATION.to_string(),
        suggestion: FALLBACK_SUGGESTION.to_string(),
        score: 0,
        severity: None,
        bug_type: None,
    }
}

/// Whether `response` is the fallback rather than a model's answer.
pub fn is_fallback(response: &CanonicalResponse) -> bool {
    *response == fallback_response()
}

/// Reconcile parsed results (in query order) into one response.
///
/// Never fails: an empty valid set produces [`fallback_response`].
pub fn aggregate(parsed: &[ParsedModelResult]) -> AggregatedResponse {
    let valid: Vec<(&ParsedModelResult, &CanonicalResponse)> = parsed
        .iter()
        .filter_map(|p| p.data.as_ref().map(|data| (p, data)))
        .collect();

    let contributors: Vec<String> = valid.iter().map(|(p, _)| p.model.clone()).collect();
    let used_repair = valid.iter().any(|(p, _)| p.used_repair);

    let response = match valid.as_slice() {
        [] => {
            debug!("No valid model output; using fallback response");
            fallback_response()
        }
        [(_, only)] => (*only).clone(),
        _ => reconcile(&valid),
    };

    AggregatedResponse {
        response,
        contributors,
        used_repair,
    }
}

fn reconcile(valid: &[(&ParsedModelResult, &CanonicalResponse)]) -> CanonicalResponse {
    let Some(&(first, first_data)) = valid.first() else {
        return fallback_response();
    };

    let total: u32 = valid.iter().map(|(_, data)| u32::from(data.score)).sum();
    let mean = (total / valid.len() as u32) as u8;

    // Clean answers take precedence over repaired ones.
    let (base_model, base) = valid
        .iter()
        .find(|(p, _)| !p.used_repair)
        .map(|(p, data)| (p.model.as_str(), *data))
        .unwrap_or((first.model.as_str(), first_data));

    debug!(
        "Reconciling {} responses; base from {}, mean score {}",
        valid.len(),
        base_model,
        mean
    );

    let mut merged = base.clone();
    merged.score = mean;

    if let Some(severity) = majority_vote(valid.iter().filter_map(|(_, d)| d.severity)) {
        merged.severity = Some(severity);
    }
    if let Some(bug_type) = majority_vote(valid.iter().filter_map(|(_, d)| d.bug_type.clone())) {
        merged.bug_type = Some(bug_type);
    }

    merged
}

/// Most frequent value; ties go to the value encountered first.
pub fn majority_vote<T, I>(values: I) -> Option<T>
where
    T: PartialEq,
    I: IntoIterator<Item = T>,
{
    let mut tally: Vec<(T, usize)> = Vec::new();
    for value in values {
        match tally.iter_mut().find(|(seen, _)| *seen == value) {
            Some((_, count)) => *count += 1,
            None => tally.push((value, 1)),
        }
    }

    let mut winner: Option<(T, usize)> = None;
    for (value, count) in tally {
        if winner.as_ref().map_or(true, |(_, best)| count > *best) {
            winner = Some((value, count));
        }
    }
    winner.map(|(value, _)| value)
}

/// Parse every raw result and aggregate them.
///
/// Returns the per-model parse outcomes alongside the aggregate, both in the
/// order the models were queried.
pub fn process(raw_results: &[RawModelResult]) -> (Vec<ParsedModelResult>, AggregatedResponse) {
    let parsed: Vec<ParsedModelResult> = raw_results.iter().map(parse_raw_result).collect();
    let aggregated = aggregate(&parsed);
    (parsed, aggregated)
}
