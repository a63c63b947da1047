//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// GrantCite - publication and citation metrics for grant recipients
///
/// Reads a table of grant recipients, looks every researcher up on
/// Semantic Scholar, and records how much they published (and how often
/// they were cited) in the six years before their grant.
///
/// Examples:
///   grantcite collect --input NSERC_Results.csv
///   grantcite collect --input grants.txt --delimiter ';' --first-grant-only
///   grantcite analyze --results citation_pubs.csv --format json
///   grantcite init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to configuration file
    ///
    /// If not specified, looks for .grantcite.toml in the current directory
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Fetch publication metrics for every researcher in the input table
    Collect(CollectArgs),
    /// Fit grant amount against the collected metrics and write a report
    Analyze(AnalyzeArgs),
    /// Generate a default .grantcite.toml configuration file
    InitConfig,
}

#[derive(clap::Args, Debug, Clone)]
pub struct CollectArgs {
    /// Input table of grant recipients (CSV with headers)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Result table; rows are appended and existing names are skipped
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Author-ID cache file
    #[arg(long, value_name = "FILE")]
    pub cache: Option<PathBuf>,

    /// Semantic Scholar Graph API base URL
    #[arg(long, value_name = "URL")]
    pub api_url: Option<String>,

    /// Semantic Scholar API key
    #[arg(long, env = "SEMANTIC_SCHOLAR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Number of author candidates considered per search
    #[arg(long, value_name = "COUNT")]
    pub search_limit: Option<usize>,

    /// Publications requested per page (max 1000)
    #[arg(long, value_name = "COUNT")]
    pub page_size: Option<usize>,

    /// Pause between page requests, in milliseconds
    #[arg(long, value_name = "MS")]
    pub page_delay_ms: Option<u64>,

    /// Attempts per request when rate-limited
    #[arg(long, value_name = "NUM")]
    pub max_attempts: Option<u32>,

    /// Input field delimiter
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Keep only the earliest grant for each name
    #[arg(long)]
    pub first_grant_only: bool,
}

#[derive(clap::Args, Debug, Clone)]
pub struct AnalyzeArgs {
    /// Result table produced by `collect`
    #[arg(short, long, value_name = "FILE")]
    pub results: Option<PathBuf>,

    /// Report output path
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Keep IQR outliers in the fit
    #[arg(long)]
    pub no_outlier_filter: bool,

    /// IQR fence multiplier
    #[arg(long, value_name = "FACTOR")]
    pub iqr_factor: Option<f64>,
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

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        match &self.command {
            Command::Collect(collect) => collect.validate(),
            Command::Analyze(analyze) => analyze.validate(),
            Command::InitConfig => Ok(()),
        }
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

impl CollectArgs {
    fn validate(&self) -> Result<(), String> {
        if !self.input.is_file() {
            return Err(format!("Input file does not exist: {}", self.input.display()));
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.search_limit == Some(0) {
            return Err("Search limit must be at least 1".to_string());
        }

        if let Some(size) = self.page_size {
            if size == 0 || size > crate::config::MAX_PAGE_SIZE {
                return Err(format!(
                    "Page size must be between 1 and {}",
                    crate::config::MAX_PAGE_SIZE
                ));
            }
        }

        if self.max_attempts == Some(0) {
            return Err("Max attempts must be at least 1".to_string());
        }

        Ok(())
    }
}

impl AnalyzeArgs {
    fn validate(&self) -> Result<(), String> {
        if let Some(factor) = self.iqr_factor {
            if !factor.is_finite() || factor <= 0.0 {
                return Err("IQR factor must be a positive number".to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn make_collect(input: PathBuf) -> CollectArgs {
        CollectArgs {
            input,
            output: None,
            cache: None,
            api_url: None,
            api_key: None,
            search_limit: None,
            page_size: None,
            page_delay_ms: None,
            max_attempts: None,
            delimiter: None,
            first_grant_only: false,
        }
    }

    fn make_args(command: Command) -> Args {
        Args {
            command,
            config: None,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_parse_collect() {
        let args = Args::try_parse_from([
            "grantcite",
            "collect",
            "--input",
            "grants.csv",
            "--page-size",
            "500",
            "--first-grant-only",
            "-v",
        ])
        .unwrap();

        assert!(args.verbose);
        match args.command {
            Command::Collect(collect) => {
                assert_eq!(collect.input, PathBuf::from("grants.csv"));
                assert_eq!(collect.page_size, Some(500));
                assert!(collect.first_grant_only);
                assert!(collect.output.is_none());
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_validation_missing_input() {
        let args = make_args(Command::Collect(make_collect(PathBuf::from(
            "/definitely/not/here.csv",
        ))));
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_page_size_bounds() {
        let input = NamedTempFile::new().unwrap();
        let mut collect = make_collect(input.path().to_path_buf());
        collect.page_size = Some(1001);
        assert!(make_args(Command::Collect(collect.clone())).validate().is_err());

        collect.page_size = Some(1000);
        assert!(make_args(Command::Collect(collect)).validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let input = NamedTempFile::new().unwrap();
        let mut collect = make_collect(input.path().to_path_buf());
        collect.api_url = Some("ftp://example.org".to_string());
        assert!(make_args(Command::Collect(collect)).validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args(Command::InitConfig);
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args(Command::InitConfig);
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
