//! Offline evaluation against a dataset of reference answers.
//!
//! Every example runs through the normal analysis pipeline and the answer is
//! scored by word overlap with the reference explanation and suggestion.

use crate::analysis::aggregator::is_fallback;
use crate::analysis::score_explanation;
use crate::llm::ModelCaller;
use crate::models::{
    AnalysisMode, AnalyzeRequest, EvaluationExample, EvaluationResult, EvaluationSummary,
    ModelStats,
};
use crate::pipeline::Analyzer;
use anyhow::{Context, Result};
use chrono::Utc;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// Settings for an evaluation run.
#[derive(Debug, Clone)]
pub struct EvalOptions {
    /// Examples evaluated at the same time.
    pub concurrency: usize,
    pub mode: AnalysisMode,
    pub models: Option<Vec<String>>,
    pub show_progress: bool,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            concurrency: 4,
            mode: AnalysisMode::Detailed,
            models: None,
            show_progress: true,
        }
    }
}

/// Everything written to the results file.
#[derive(Debug, Serialize)]
pub struct EvaluationReport {
    pub run_at: String,
    pub summary: EvaluationSummary,
    pub results: Vec<EvaluationResult>,
}

/// Load the dataset: a JSON array of examples.
pub fn load_dataset(path: &Path) -> Result<Vec<EvaluationExample>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse dataset: {}", path.display()))
}

/// Evaluate every example, `options.concurrency` at a time.
pub async fn run_evaluation<C: ModelCaller>(
    analyzer: &Analyzer<C>,
    dataset: &[EvaluationExample],
    options: &EvalOptions,
) -> Result<Vec<EvaluationResult>> {
    let progress = if options.show_progress {
        let pb = ProgressBar::new(dataset.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )
                .map_err(|e| anyhow::anyhow!("Invalid progress template: {}", e))?
                .progress_chars("#>-"),
        );
        Some(pb)
    } else {
        None
    };

    let indexed: Vec<(usize, &EvaluationExample)> = dataset.iter().enumerate().collect();
    let mut results = Vec::with_capacity(dataset.len());

    for chunk in indexed.chunks(options.concurrency.max(1)) {
        let futures = chunk
            .iter()
            .map(|(id, example)| evaluate_example(analyzer, *id, example, options));
        for result in join_all(futures).await {
            results.push(result);
            if let Some(ref pb) = progress {
                pb.inc(1);
            }
        }
    }

    if let Some(pb) = progress {
        pb.finish_and_clear();
    }

    Ok(results)
}

async fn evaluate_example<C: ModelCaller>(
    analyzer: &Analyzer<C>,
    example_id: usize,
    example: &EvaluationExample,
    options: &EvalOptions,
) -> EvaluationResult {
    let request = AnalyzeRequest {
        code: example.code.clone(),
        error_message: example.error_message.clone(),
        language: example.language.clone(),
        mode: options.mode,
        models: options.models.clone(),
    };

    match analyzer.analyze(&request).await {
        Ok(response) => {
            let answer = &response.answer;
            let valid_json = !answer.explanation.is_empty()
                && !answer.suggestion.is_empty()
                && !is_fallback(answer);
            let scores =
                score_explanation(answer, &example.gold_explanation, &example.gold_suggestion);

            EvaluationResult {
                example_id,
                valid_json,
                explanation_score: scores.explanation,
                suggestion_score: scores.suggestion,
                overall_score: scores.overall,
                latency_ms: response.meta.total_latency_ms,
                models_used: response.meta.models_used,
                per_model_latency_ms: response.meta.per_model_latency_ms,
                had_repair: response.meta.had_repair,
                from_cache: response.meta.from_cache,
            }
        }
        Err(e) => {
            warn!("Example {} failed: {}", example_id, e);
            EvaluationResult {
                example_id,
                valid_json: false,
                explanation_score: 0.0,
                suggestion_score: 0.0,
                overall_score: 0.0,
                latency_ms: 0.0,
                models_used: Vec::new(),
                per_model_latency_ms: HashMap::new(),
                had_repair: false,
                from_cache: false,
            }
        }
    }
}

/// Aggregate per-example results.
pub fn summarize(results: &[EvaluationResult]) -> EvaluationSummary {
    let total = results.len();
    if total == 0 {
        return EvaluationSummary::default();
    }

    let mean = |f: fn(&EvaluationResult) -> f64| results.iter().map(f).sum::<f64>() / total as f64;
    let valid_json_count = results.iter().filter(|r| r.valid_json).count();

    let mut latencies: HashMap<String, Vec<f64>> = HashMap::new();
    let mut used: HashMap<String, usize> = HashMap::new();
    for result in results {
        for model in &result.models_used {
            *used.entry(model.clone()).or_default() += 1;
        }
        for (model, latency) in &result.per_model_latency_ms {
            latencies.entry(model.clone()).or_default().push(*latency);
        }
    }

    let mut per_model_stats = HashMap::new();
    for model in used.keys().chain(latencies.keys()) {
        if per_model_stats.contains_key(model) {
            continue;
        }
        let samples = latencies.get(model).map(Vec::as_slice).unwrap_or(&[]);
        let mean_latency_ms = if samples.is_empty() {
            0.0
        } else {
            samples.iter().sum::<f64>() / samples.len() as f64
        };
        per_model_stats.insert(
            model.clone(),
            ModelStats {
                used_count: used.get(model).copied().unwrap_or(0),
                mean_latency_ms,
            },
        );
    }

    EvaluationSummary {
        total_examples: total,
        valid_json_count,
        valid_json_rate: valid_json_count as f64 / total as f64 * 100.0,
        mean_explanation_score: mean(|r| r.explanation_score),
        mean_suggestion_score: mean(|r| r.suggestion_score),
        mean_overall_score: mean(|r| r.overall_score),
        mean_latency_ms: mean(|r| r.latency_ms),
        per_model_stats,
    }
}

/// Write summary and results as pretty JSON.
pub fn save_results(
    path: &Path,
    summary: &EvaluationSummary,
    results: &[EvaluationResult],
) -> Result<()> {
    let report = EvaluationReport {
        run_at: Utc::now().to_rfc3339(),
        summary: summary.clone(),
        results: results.to_vec(),
    };

    let content = serde_json::to_string_pretty(&report).context("Failed to serialize results")?;
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write results to {}", path.display()))?;

    info!("Saved {} evaluation results to {}", results.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::ScriptedCaller;

    fn result(id: usize, valid: bool, score: f64, models: &[(&str, f64)]) -> EvaluationResult {
        EvaluationResult {
            example_id: id,
            valid_json: valid,
            explanation_score: score,
            suggestion_score: score / 2.0,
            overall_score: score * 0.75,
            latency_ms: 100.0,
            models_used: models.iter().map(|(m, _)| m.to_string()).collect(),
            per_model_latency_ms: models.iter().map(|(m, l)| (m.to_string(), *l)).collect(),
            had_repair: false,
            from_cache: false,
        }
    }

    #[test]
    fn test_summarize_empty() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_examples, 0);
        assert_eq!(summary.valid_json_rate, 0.0);
    }

    #[test]
    fn test_summarize_means_and_model_stats() {
        let results = vec![
            result(0, true, 80.0, &[("a", 100.0), ("b", 300.0)]),
            result(1, false, 0.0, &[]),
            result(2, true, 40.0, &[("a", 200.0)]),
            result(3, true, 60.0, &[("a", 300.0)]),
        ];
        let summary = summarize(&results);

        assert_eq!(summary.total_examples, 4);
        assert_eq!(summary.valid_json_count, 3);
        assert_eq!(summary.valid_json_rate, 75.0);
        assert_eq!(summary.mean_explanation_score, 45.0);
        assert_eq!(summary.mean_latency_ms, 100.0);
        assert_eq!(
            summary.per_model_stats["a"],
            ModelStats {
                used_count: 3,
                mean_latency_ms: 200.0
            }
        );
        assert_eq!(summary.per_model_stats["b"].used_count, 1);
        assert_eq!(summary.per_model_stats["b"].mean_latency_ms, 300.0);
    }

    #[test]
    fn test_load_dataset_fixture() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/eval_dataset.json");
        let dataset = load_dataset(&path).unwrap();
        assert!(dataset.len() >= 3);
        assert!(dataset.iter().all(|e| !e.gold_explanation.is_empty()));
    }

    #[test]
    fn test_load_dataset_errors() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_dataset(&dir.path().join("missing.json")).is_err());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{\"not\": \"an array\"}").unwrap();
        assert!(load_dataset(&bad).is_err());
    }

    #[tokio::test]
    async fn test_run_evaluation_scores_examples() {
        let reply = r#"{"explanation": "the variable x is not defined", "suggestion": "define x before use", "score": 90}"#;
        let analyzer = Analyzer::new(ScriptedCaller::new(&[("a", reply)]), "a", "");
        let dataset = vec![
            EvaluationExample {
                code: "print(x)".to_string(),
                error_message: "NameError".to_string(),
                gold_explanation: "x is not defined".to_string(),
                gold_suggestion: "define x".to_string(),
                language: Some("python".to_string()),
            },
            EvaluationExample {
                code: "print(y)".to_string(),
                error_message: "NameError".to_string(),
                gold_explanation: "nothing in common".to_string(),
                gold_suggestion: "zzz".to_string(),
                language: None,
            },
        ];
        let options = EvalOptions {
            concurrency: 1,
            show_progress: false,
            ..EvalOptions::default()
        };

        let results = run_evaluation(&analyzer, &dataset, &options).await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].example_id, 0);
        assert!(results[0].valid_json);
        assert_eq!(results[0].explanation_score, 100.0);
        assert_eq!(results[0].suggestion_score, 100.0);
        assert_eq!(results[1].overall_score, 0.0);
        assert_eq!(results[1].models_used, vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_models_are_invalid() {
        let analyzer = Analyzer::new(ScriptedCaller::new(&[]), "a", "b");
        let dataset = vec![EvaluationExample {
            code: "x".to_string(),
            error_message: "e".to_string(),
            gold_explanation: "g".to_string(),
            gold_suggestion: "s".to_string(),
            language: None,
        }];
        let options = EvalOptions {
            show_progress: false,
            ..EvalOptions::default()
        };

        let results = run_evaluation(&analyzer, &dataset, &options).await.unwrap();
        assert!(!results[0].valid_json);
        assert_eq!(results[0].models_used, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(results[0].per_model_latency_ms.len(), 2);
    }

    #[test]
    fn test_save_results() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.json");
        let results = vec![result(0, true, 50.0, &[("a", 10.0)])];

        save_results(&path, &summarize(&results), &results).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["summary"]["total_examples"], 1);
        assert_eq!(value["results"][0]["example_id"], 0);
        assert!(value["run_at"].is_string());
    }
}
