//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.bugsage.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".bugsage.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub models: ModelsConfig,

    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Offline evaluation settings.
    #[serde(default)]
    pub evaluation: EvaluationConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Number of evaluation examples processed concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// Model provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Model used in every mode.
    #[serde(default = "default_primary")]
    pub primary: String,

    /// Additional model used in detailed mode. Empty disables it.
    #[serde(default = "default_secondary")]
    pub secondary: String,

    /// Chat completions endpoint.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens in each response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            primary: default_primary(),
            secondary: default_secondary(),
            api_url: default_api_url(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_primary() -> String {
    "01-ai/Yi-Coder-1.5B-Chat".to_string()
}

fn default_secondary() -> String {
    "mistralai/Mistral-7B-Instruct-v0.2".to_string()
}

fn default_api_url() -> String {
    "https://router.huggingface.co/v1/chat/completions".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_max_tokens() -> u32 {
    512
}

fn default_timeout() -> u64 {
    30
}

/// Response cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum number of cached responses.
    #[serde(default = "default_cache_max_size")]
    pub max_size: usize,

    /// Lifetime of a cached response in seconds.
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_size: default_cache_max_size(),
            default_ttl_seconds: default_cache_ttl(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_cache_max_size() -> usize {
    512
}

fn default_cache_ttl() -> u64 {
    3600
}

/// Offline evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Dataset of examples with reference answers.
    #[serde(default = "default_dataset_path")]
    pub dataset_path: String,

    /// Where evaluation results are written.
    #[serde(default = "default_results_path")]
    pub output_path: String,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            output_path: default_results_path(),
        }
    }
}

fn default_dataset_path() -> String {
    "evaluation_dataset.json".to_string()
}

fn default_results_path() -> String {
    "evaluation_results.json".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.api_url {
            self.models.api_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.models.temperature = temperature;
        }
        if let Some(max_tokens) = args.max_tokens {
            self.models.max_tokens = max_tokens;
        }
        if let Some(timeout) = args.timeout {
            self.models.timeout_seconds = timeout;
        }

        if args.no_cache {
            self.cache.enabled = false;
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(ref results) = args.results {
            self.evaluation.output_path = results.display().to_string();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.models.primary, "01-ai/Yi-Coder-1.5B-Chat");
        assert_eq!(config.cache.max_size, 512);
        assert_eq!(config.cache.default_ttl_seconds, 3600);
        assert!(config.cache.enabled);
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
concurrency = 2

[models]
primary = "bigcode/starcoder2-15b"
secondary = ""
temperature = 0.1

[cache]
max_size = 16
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.concurrency, 2);
        assert_eq!(config.models.primary, "bigcode/starcoder2-15b");
        assert_eq!(config.models.temperature, 0.1);
        assert_eq!(config.models.max_tokens, 512);
        assert_eq!(config.cache.max_size, 16);
        assert_eq!(config.cache.default_ttl_seconds, 3600);
        assert!(config.models.secondary.is_empty());
    }

    #[test]
    fn test_merge_with_args() {
        use clap::Parser;

        let mut config = Config::default();
        let args = crate::cli::Args::try_parse_from([
            "bugsage",
            "--evaluate",
            "--results",
            "out.json",
            "--timeout",
            "5",
            "--no-cache",
            "--concurrency",
            "8",
        ])
        .unwrap();
        config.merge_with_args(&args);

        assert_eq!(config.models.timeout_seconds, 5);
        assert_eq!(config.models.temperature, 0.2);
        assert!(!config.cache.enabled);
        assert_eq!(config.general.concurrency, 8);
        assert_eq!(config.evaluation.output_path, "out.json");
    }

    #[test]
    fn test_logging_is_not_configured_by_file() {
        let content = "[general]\nverbose = true\nconcurrency = 3\n";
        let config: Config = toml::from_str(content).unwrap();
        assert_eq!(config.general.concurrency, 3);
        assert!(!Config::default_toml().contains("verbose"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[evaluation]\ndataset_path = \"data/eval.json\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.evaluation.dataset_path, "data/eval.json");
        assert_eq!(config.evaluation.output_path, "evaluation_results.json");
    }

    #[test]
    fn test_load_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache\nmax_size = ").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[models]"));
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[evaluation]"));
    }
}
