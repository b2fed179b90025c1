//! Markdown and JSON report generation.
//!
//! Renders a single analysis answer, or the summary of an evaluation run.

use crate::analysis::aggregator::is_fallback;
use crate::models::{AnalyzeResponse, CanonicalResponse, EvaluationSummary, ResponseMeta};
use anyhow::Result;

/// Generate a Markdown report for one analysis.
pub fn generate_markdown_report(response: &AnalyzeResponse) -> String {
    let mut output = String::new();

    output.push_str("# BugSage Analysis\n\n");
    output.push_str(&generate_answer_section(&response.answer));
    output.push_str(&generate_meta_section(&response.meta, is_fallback(&response.answer)));
    output.push_str(&generate_footer());

    output
}

/// Generate the explanation and suggestion.
fn generate_answer_section(answer: &CanonicalResponse) -> String {
    let mut section = String::new();

    let mut badges = Vec::new();
    if let Some(severity) = answer.severity {
        badges.push(format!("{} **{}**", severity.emoji(), severity.to_string().to_uppercase()));
    }
    if let Some(ref bug_type) = answer.bug_type {
        badges.push(format!("`{}`", bug_type));
    }
    badges.push(format!("Confidence: {}/100", answer.score));
    section.push_str(&badges.join(" | "));
    section.push_str("\n\n");

    section.push_str("## Explanation\n\n");
    section.push_str(&answer.explanation);
    section.push_str("\n\n");

    section.push_str("## Suggestion\n\n");
    section.push_str(&format!("> 💡 {}\n\n", answer.suggestion));

    section
}

/// Generate the provenance section.
fn generate_meta_section(meta: &ResponseMeta, fallback: bool) -> String {
    let mut section = String::new();

    section.push_str("## Details\n\n");
    let models: Vec<String> = meta.models_used.iter().map(|m| format!("`{}`", m)).collect();
    section.push_str(&format!("- **Models:** {}\n", models.join(", ")));
    if fallback {
        section.push_str("- **Usable Answers:** none, showing the fallback\n");
    }
    section.push_str(&format!("- **Quality Score:** {}/100\n", meta.quality_score));
    section.push_str(&format!("- **Total Latency:** {:.0}ms\n", meta.total_latency_ms));
    if meta.from_cache {
        section.push_str("- **Served From Cache:** yes\n");
    }
    if meta.had_repair {
        section.push_str("- **Output Repaired:** yes\n");
    }
    section.push('\n');

    if !meta.per_model_latency_ms.is_empty() {
        section.push_str("| Model | Latency |\n");
        section.push_str("|:---|---:|\n");

        let mut latencies: Vec<_> = meta.per_model_latency_ms.iter().collect();
        latencies.sort_by(|a, b| a.0.cmp(b.0));
        for (model, latency) in latencies {
            section.push_str(&format!("| `{}` | {:.0}ms |\n", model, latency));
        }
        section.push('\n');
    }

    section
}

/// Generate a Markdown summary of an evaluation run.
pub fn generate_evaluation_markdown(summary: &EvaluationSummary) -> String {
    let mut output = String::new();

    output.push_str("# BugSage Evaluation\n\n");
    output.push_str("| Metric | Value |\n");
    output.push_str("|:---|---:|\n");
    output.push_str(&format!("| Examples | {} |\n", summary.total_examples));
    output.push_str(&format!(
        "| Valid JSON | {} ({:.2}%) |\n",
        summary.valid_json_count, summary.valid_json_rate
    ));
    output.push_str(&format!(
        "| Mean Explanation Score | {:.2} |\n",
        summary.mean_explanation_score
    ));
    output.push_str(&format!(
        "| Mean Suggestion Score | {:.2} |\n",
        summary.mean_suggestion_score
    ));
    output.push_str(&format!("| Mean Overall Score | {:.2} |\n", summary.mean_overall_score));
    output.push_str(&format!("| Mean Latency | {:.0}ms |\n\n", summary.mean_latency_ms));

    if !summary.per_model_stats.is_empty() {
        output.push_str("## Models\n\n");
        output.push_str("| Model | Used | Mean Latency |\n");
        output.push_str("|:---|:---:|---:|\n");

        let mut models: Vec<_> = summary.per_model_stats.iter().collect();
        models.sort_by(|a, b| b.1.used_count.cmp(&a.1.used_count).then_with(|| a.0.cmp(b.0)));
        for (model, stats) in models {
            output.push_str(&format!(
                "| `{}` | {} | {:.0}ms |\n",
                model, stats.used_count, stats.mean_latency_ms
            ));
        }
        output.push('\n');
    }

    output
}

/// Generate the report footer.
fn generate_footer() -> String {
    format!("---\n\n*Generated by BugSage v{}*\n", env!("CARGO_PKG_VERSION"))
}

/// Generate a JSON report.
pub fn generate_json_report(response: &AnalyzeResponse) -> Result<String> {
    serde_json::to_string_pretty(response).map_err(Into::into)
}
