//! BugSage - multi-model bug explanations
//!
//! A CLI tool that asks one or more hosted code models to explain a bug,
//! repairs and reconciles their JSON answers, and reports a single result.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (bad arguments, config, unreadable input, etc.)

mod analysis;
mod cache;
mod cli;
mod config;
mod eval;
mod llm;
mod models;
mod pipeline;
mod report;

use anyhow::{Context, Result};
use cache::ResponseCache;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE_NAME};
use llm::{ClientConfig, HuggingFaceClient};
use models::AnalyzeRequest;
use pipeline::Analyzer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("BugSage v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let outcome = if args.is_evaluation() {
        run_evaluate(args).await
    } else {
        run_analyze(args).await
    };

    if let Err(e) = outcome {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .bugsage.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize models, cache and evaluation paths.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
///
/// `RUST_LOG` takes precedence over `--verbose`/`--quiet`. Logs go to
/// stderr so reports printed on stdout stay clean.
fn init_logging(args: &Args) {
    let level = args.log_level();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    let mut config = if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        Config::load(config_path)?
    } else {
        match Config::load_default() {
            Ok(Some(config)) => {
                info!("Loaded default config from {}", CONFIG_FILE_NAME);
                config
            }
            Ok(None) => {
                debug!("No config file found, using defaults");
                Config::default()
            }
            Err(e) => {
                warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    };

    config.merge_with_args(args);
    Ok(config)
}

/// Build the analyzer shared by both run modes.
fn build_analyzer(args: &Args, config: &Config) -> Result<Analyzer<HuggingFaceClient>> {
    let client = HuggingFaceClient::new(ClientConfig {
        api_url: config.models.api_url.clone(),
        api_key: args.api_key.clone(),
        temperature: config.models.temperature,
        max_tokens: config.models.max_tokens,
        timeout_seconds: config.models.timeout_seconds,
    })?;

    if !client.has_api_key() {
        warn!("HF_API_KEY is not set; every model call will fail");
    }

    let mut analyzer = Analyzer::new(
        client,
        config.models.primary.clone(),
        config.models.secondary.clone(),
    )
    .with_backend_version(env!("CARGO_PKG_VERSION"));

    if config.cache.enabled {
        let cache = ResponseCache::new(config.cache.max_size, config.cache.default_ttl_seconds)?;
        analyzer = analyzer.with_cache(Arc::new(cache));
    } else {
        debug!("Response cache disabled");
    }

    Ok(analyzer)
}

/// Explain a single bug and print or save the report.
async fn run_analyze(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let analyzer = build_analyzer(&args, &config)?;

    let code_path = args.code.as_deref().context("--code is required")?;
    let code = std::fs::read_to_string(code_path)
        .with_context(|| format!("Failed to read code file: {}", code_path.display()))?;

    let error_message = match (&args.error, &args.error_file) {
        (Some(text), _) => text.clone(),
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read error file: {}", path.display()))?,
        (None, None) => anyhow::bail!("One of --error or --error-file is required"),
    };

    let request = AnalyzeRequest {
        code,
        error_message,
        language: args.language.clone(),
        mode: args.mode,
        models: args.models.clone(),
    };

    let models = analyzer.resolve_models(&request)?;
    if !args.quiet {
        eprintln!("🔬 Analyzing with {}...", models.join(", "));
    }

    let response = analyzer.analyze(&request).await?;

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&response)?,
        OutputFormat::Markdown => report::generate_markdown_report(&response),
    };

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &output)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !args.quiet {
                eprintln!("✅ Report saved to: {}", path.display());
            }
        }
        None => println!("{}", output),
    }

    Ok(())
}

/// Run the offline evaluation and save its results.
async fn run_evaluate(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let analyzer = build_analyzer(&args, &config)?;

    let dataset_path = match args.evaluate {
        Some(Some(ref path)) => path.clone(),
        _ => PathBuf::from(&config.evaluation.dataset_path),
    };
    let results_path = PathBuf::from(&config.evaluation.output_path);

    let dataset = eval::load_dataset(&dataset_path)?;
    info!(
        "Evaluating {} examples from {} ({} at a time)",
        dataset.len(),
        dataset_path.display(),
        config.general.concurrency
    );

    let options = eval::EvalOptions {
        concurrency: config.general.concurrency,
        mode: args.mode,
        models: args.models.clone(),
        show_progress: !args.quiet,
    };

    let results = eval::run_evaluation(&analyzer, &dataset, &options).await?;
    let summary = eval::summarize(&results);

    if let Some(cache) = analyzer.cache() {
        debug!("Cache holds {}/{} entries", cache.size(), cache.max_size());
    }
    eval::save_results(&results_path, &summary, &results)?;

    println!("{}", report::generate_evaluation_markdown(&summary));
    if !args.quiet {
        eprintln!("✅ Results saved to: {}", results_path.display());
    }

    Ok(())
}
