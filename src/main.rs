//! GrantCite - publication and citation metrics for grant recipients
//!
//! A CLI tool that resolves grant recipients on Semantic Scholar, counts
//! their publications and citations in the six years before each grant,
//! and fits grant amount against those counts.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (configuration, unreadable input, unwritable output)

mod analysis;
mod api;
mod cache;
mod cli;
mod config;
mod input;
mod models;
mod pipeline;
mod report;
mod sink;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{AnalyzeArgs, Args, CollectArgs, Command, OutputFormat};
use config::Config;
use models::{AnalysisReport, ReportMetadata};
use std::path::PathBuf;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle init-config early (no logging needed)
    if matches!(args.command, Command::InitConfig) {
        return handle_init_config();
    }

    init_logging(&args);

    info!("GrantCite v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    let result = match args.command {
        Command::Collect(ref collect) => run_collect(&args, collect).await,
        Command::Analyze(ref analyze) => run_analyze(&args, analyze),
        Command::InitConfig => Ok(()),
    };

    if let Err(e) = result {
        error!("Run failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle init-config: generate a default .grantcite.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(config::DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::DEFAULT_CONFIG_FILE))?;

    println!(
        "✅ Created {} with default settings.",
        config::DEFAULT_CONFIG_FILE
    );
    println!("   Edit it to customize columns, paging, retries, and file locations.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
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
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", config::DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}

/// Collect metrics for every researcher in the input table.
async fn run_collect(args: &Args, collect: &CollectArgs) -> Result<()> {
    let mut config = load_config(args)?;
    config.merge_collect_args(collect);

    println!("📥 Reading grant table: {}", collect.input.display());
    let records = input::RowSource::new(config.input.clone()).read_path(&collect.input)?;
    println!("   {} researchers", records.len());

    let cache = cache::AuthorCache::open(&config.output.cache)?;
    let sink = sink::ResultSink::open(&config.output.results)?;
    info!(
        "{} cached authors, {} researchers already in {}",
        cache.len(),
        sink.len(),
        sink.path().display()
    );

    let retry = api::RetryPolicy::from(&config.retry);
    let client = api::SemanticScholarClient::new(&config.api)?;

    println!("\n🔬 Querying Semantic Scholar...");
    println!("   API: {}", config.api.base_url);
    println!(
        "   Key: {}",
        if config.api.api_key.is_some() {
            "set"
        } else {
            "none (shared rate limit)"
        }
    );

    let mut pipeline = pipeline::Pipeline::new(
        client,
        pipeline::AuthorResolver::new(cache, config.api.search_limit, retry.clone()),
        pipeline::PublicationFetcher::new(
            config.effective_page_size(),
            config.api.page_delay(),
            retry,
        ),
        sink,
        pipeline::PipelineOptions {
            researcher_delay: config.api.researcher_delay(),
            show_progress: !args.quiet,
        },
    );

    let summary = pipeline.run(&records).await?;

    println!("\n📊 Collection Summary:");
    println!("   Researchers: {}", summary.total);
    println!(
        "   ✅ Written: {} | ⏭️  Skipped: {} | ❓ No match: {} | ⚠️  Failed: {}",
        summary.written, summary.skipped, summary.no_match, summary.failed
    );
    println!("   Duration: {:.1}s", summary.duration.as_secs_f64());
    println!("\n✅ Results saved to: {}", config.output.results);

    Ok(())
}

/// Fit grant amount against the collected metrics and write the report.
fn run_analyze(args: &Args, analyze: &AnalyzeArgs) -> Result<()> {
    let mut config = load_config(args)?;
    config.merge_analyze_args(analyze);

    let results_path = analyze
        .results
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.results));

    println!("📥 Loading results: {}", results_path.display());
    let rows = sink::read_rows(&results_path)?;
    if rows.is_empty() {
        warn!("{} has no rows", results_path.display());
    }

    let fits = analysis::analyze(&rows, &config.analysis);

    let report = AnalysisReport {
        metadata: ReportMetadata {
            results_path: results_path.display().to_string(),
            analysis_date: Utc::now(),
            researchers: rows.len(),
            outliers_filtered: config.analysis.filter_outliers,
            iqr_factor: config.analysis.iqr_factor,
        },
        fits,
    };

    let output = match analyze.format {
        OutputFormat::Json => report::generate_json_report(&report)?,
        OutputFormat::Markdown => report::generate_markdown_report(&report),
    };

    let report_path = match (&analyze.report, analyze.format) {
        (Some(path), _) => path.clone(),
        (None, OutputFormat::Json) => PathBuf::from(&config.analysis.report).with_extension("json"),
        (None, OutputFormat::Markdown) => PathBuf::from(&config.analysis.report),
    };

    std::fs::write(&report_path, &output)
        .with_context(|| format!("Failed to write report to {}", report_path.display()))?;

    println!("\n📊 Regression Summary:");
    for mf in &report.fits {
        match mf.fit {
            Some(fit) => println!(
                "   {}: {} (R² = {:.2}, n = {})",
                mf.metric,
                fit.equation(),
                fit.r_squared,
                fit.n
            ),
            None => println!("   {}: not enough data", mf.metric),
        }
    }
    println!("\n✅ Report saved to: {}", report_path.display());

    Ok(())
}
