//! End-to-end analysis of one request.
//!
//! Resolves which models to ask, serves from the cache when possible,
//! otherwise fans the prompt out to every model concurrently and reconciles
//! whatever comes back.

use crate::analysis::{heuristic_score, process};
use crate::cache::{fingerprint, ResponseCache};
use crate::llm::{build_analysis_prompt, ModelCaller, PROMPT_VERSION};
use crate::models::{AnalysisMode, AnalyzeRequest, AnalyzeResponse, ResponseMeta};
use anyhow::{bail, Result};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Runs analysis requests against a set of models.
pub struct Analyzer<C> {
    caller: C,
    cache: Option<Arc<ResponseCache>>,
    primary_model: String,
    secondary_model: String,
    backend_version: Option<String>,
}

impl<C: ModelCaller> Analyzer<C> {
    pub fn new(
        caller: C,
        primary_model: impl Into<String>,
        secondary_model: impl Into<String>,
    ) -> Self {
        Self {
            caller,
            cache: None,
            primary_model: primary_model.into(),
            secondary_model: secondary_model.into(),
            backend_version: None,
        }
    }

    /// Share `cache` across requests.
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Version string reported in response metadata.
    pub fn with_backend_version(mut self, version: impl Into<String>) -> Self {
        self.backend_version = Some(version.into());
        self
    }

    pub fn cache(&self) -> Option<&ResponseCache> {
        self.cache.as_deref()
    }

    /// Models to query for `request`.
    ///
    /// An explicit list wins; otherwise quick mode uses the primary model and
    /// detailed mode adds the secondary one when it differs.
    pub fn resolve_models(&self, request: &AnalyzeRequest) -> Result<Vec<String>> {
        let models: Vec<String> = match &request.models {
            Some(explicit) => explicit
                .iter()
                .map(|m| m.trim())
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect(),
            None => {
                let mut models = Vec::new();
                if !self.primary_model.is_empty() {
                    models.push(self.primary_model.clone());
                }
                if request.mode == AnalysisMode::Detailed
                    && !self.secondary_model.is_empty()
                    && self.secondary_model != self.primary_model
                {
                    models.push(self.secondary_model.clone());
                }
                models
            }
        };

        if models.is_empty() {
            bail!("No models selected for analysis");
        }
        Ok(models)
    }

    /// Explain the bug described by `request`.
    pub async fn analyze(&self, request: &AnalyzeRequest) -> Result<AnalyzeResponse> {
        let start = Instant::now();
        let models = self.resolve_models(request)?;
        let language = request.language.as_deref();

        let key = fingerprint(
            &models,
            &request.code,
            &request.error_message,
            language,
            PROMPT_VERSION,
        );

        if let Some(cache) = &self.cache {
            if let Some(answer) = cache.get(&key) {
                debug!("Cache hit for {} model(s)", models.len());
                let quality_score = heuristic_score(&answer);
                return Ok(AnalyzeResponse {
                    answer,
                    meta: ResponseMeta {
                        models_used: models,
                        per_model_latency_ms: HashMap::new(),
                        total_latency_ms: start.elapsed().as_secs_f64() * 1000.0,
                        had_repair: false,
                        from_cache: true,
                        quality_score,
                        backend_version: self.backend_version.clone(),
                    },
                });
            }
            debug!("Cache miss");
        }

        let prompt = build_analysis_prompt(&request.code, &request.error_message, language);
        let raw_results = join_all(models.iter().map(|m| self.caller.call(m, &prompt))).await;

        let mut per_model_latency_ms = HashMap::new();
        for result in &raw_results {
            match &result.error {
                Some(error) => warn!(
                    "Model {} failed after {:.0}ms: {}",
                    result.model, result.latency_ms, error
                ),
                None => info!(
                    "Model {} answered in {:.0}ms ({} chars)",
                    result.model,
                    result.latency_ms,
                    result.text.as_deref().map_or(0, str::len)
                ),
            }
            per_model_latency_ms.insert(result.model.clone(), result.latency_ms);
        }

        let (_, aggregated) = process(&raw_results);

        if aggregated.contributors.is_empty() {
            warn!("No model produced a usable answer; returning fallback");
        } else if let Some(cache) = &self.cache {
            cache.set(key, aggregated.response.clone());
        }

        let quality_score = heuristic_score(&aggregated.response);

        Ok(AnalyzeResponse {
            answer: aggregated.response,
            meta: ResponseMeta {
                models_used: models,
                per_model_latency_ms,
                total_latency_ms: start.elapsed().as_secs_f64() * 1000.0,
                had_repair: aggregated.used_repair,
                from_cache: false,
                quality_score,
                backend_version: self.backend_version.clone(),
            },
        })
    }
}
