//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::AnalysisMode;
use clap::Parser;
use std::path::PathBuf;

/// BugSage - explain bugs with a panel of code models
///
/// Sends your code and error message to one or more hosted models,
/// repairs and reconciles their answers, and prints a single explanation
/// with a suggested fix.
///
/// Examples:
///   bugsage --code app.py --error "NameError: name 'x' is not defined"
///   bugsage --code Main.java --error-file build.log --language java --mode quick
///   bugsage --code app.js --error "TypeError" --models a/model,b/model --format json
///   bugsage --evaluate data/eval.json --results out.json
///   bugsage --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Source file containing the buggy code
    #[arg(
        long,
        value_name = "FILE",
        required_unless_present_any = ["init_config", "evaluate"]
    )]
    pub code: Option<PathBuf>,

    /// Error message produced by the code
    ///
    /// Use "N/A" when there is no error and you want a review instead.
    #[arg(short, long, value_name = "TEXT", conflicts_with = "error_file")]
    pub error: Option<String>,

    /// Read the error message from a file
    #[arg(long, value_name = "FILE")]
    pub error_file: Option<PathBuf>,

    /// Programming language of the code (e.g. python, java)
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<String>,

    /// Which configured models to ask
    #[arg(long, default_value = "detailed", value_name = "MODE")]
    pub mode: AnalysisMode,

    /// Explicit models to query (comma-separated); overrides --mode
    #[arg(long, value_name = "MODELS", value_delimiter = ',')]
    pub models: Option<Vec<String>>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Run the offline evaluation on a dataset
    ///
    /// Without a path, uses the dataset named in the config file.
    #[arg(long, value_name = "DATASET", num_args = 0..=1)]
    pub evaluate: Option<Option<PathBuf>>,

    /// Where to write evaluation results
    #[arg(long, value_name = "FILE", requires = "evaluate")]
    pub results: Option<PathBuf>,

    /// Number of evaluation examples run concurrently
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .bugsage.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Chat completions endpoint URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// API token for the model provider
    #[arg(long, env = "HF_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Temperature for model responses (0.0 - 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Maximum tokens per model response
    #[arg(long, value_name = "TOKENS")]
    pub max_tokens: Option<u32>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Disable the response cache
    #[arg(long)]
    pub no_cache: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .bugsage.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Whether this run is an evaluation rather than a single analysis.
    pub fn is_evaluation(&self) -> bool {
        self.evaluate.is_some()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if !self.is_evaluation() && self.error.is_none() && self.error_file.is_none() {
            return Err("One of --error or --error-file is required".to_string());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.max_tokens == Some(0) {
            return Err("Max tokens must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if let Some(ref models) = self.models {
            if models.iter().all(|m| m.trim().is_empty()) {
                return Err("--models must name at least one model".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref code) = self.code {
            if !code.is_file() {
                return Err(format!("Code file does not exist: {}", code.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
