//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.grantcite.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".grantcite.toml";

/// Largest page the author-papers endpoint accepts.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Bibliographic API settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Rate-limit retry settings.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Input table settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Output and cache locations.
    #[serde(default)]
    pub output: OutputConfig,

    /// Regression analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Semantic Scholar API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the Graph API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Optional API key, sent as `x-api-key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Candidates considered per author search.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Publications requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Pause between successful page fetches, in milliseconds.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,

    /// Pause between researchers, in milliseconds.
    #[serde(default = "default_researcher_delay_ms")]
    pub researcher_delay_ms: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
            timeout_seconds: default_timeout(),
            search_limit: default_search_limit(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            researcher_delay_ms: default_researcher_delay_ms(),
        }
    }
}

impl ApiConfig {
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    pub fn researcher_delay(&self) -> Duration {
        Duration::from_millis(self.researcher_delay_ms)
    }
}

fn default_base_url() -> String {
    "https://api.semanticscholar.org/graph/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_search_limit() -> usize {
    5
}

fn default_page_size() -> usize {
    100
}

fn default_page_delay_ms() -> u64 {
    1000
}

fn default_researcher_delay_ms() -> u64 {
    1000
}

/// Retry settings applied to every API request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Factor applied to the delay after each retry.
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            multiplier: default_multiplier(),
        }
    }
}

fn default_max_attempts() -> u32 {
    5
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_multiplier() -> u32 {
    2
}

/// Input table layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Column holding the researcher name.
    #[serde(default = "default_name_column")]
    pub name_column: String,

    /// Column holding the fiscal-year range (e.g. "2020-2021").
    #[serde(default = "default_year_column")]
    pub year_column: String,

    /// Column holding the currency-formatted amount.
    #[serde(default = "default_amount_column")]
    pub amount_column: String,

    /// Field delimiter.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,

    /// Keep only the earliest grant for each name.
    #[serde(default)]
    pub first_grant_only: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            name_column: default_name_column(),
            year_column: default_year_column(),
            amount_column: default_amount_column(),
            delimiter: default_delimiter(),
            first_grant_only: false,
        }
    }
}

fn default_name_column() -> String {
    "Name".to_string()
}

fn default_year_column() -> String {
    "Fiscal Year".to_string()
}

fn default_amount_column() -> String {
    "Amount($)".to_string()
}

fn default_delimiter() -> char {
    ','
}

/// Output file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Result table, appended to across runs.
    #[serde(default = "default_results")]
    pub results: String,

    /// Author-ID cache file.
    #[serde(default = "default_cache")]
    pub cache: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            results: default_results(),
            cache: default_cache(),
        }
    }
}

fn default_results() -> String {
    "citation_pubs.csv".to_string()
}

fn default_cache() -> String {
    "author_cache.json".to_string()
}

/// Regression analysis settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Drop IQR outliers before fitting.
    #[serde(default = "default_true")]
    pub filter_outliers: bool,

    /// Fence multiplier for the IQR filter.
    #[serde(default = "default_iqr_factor")]
    pub iqr_factor: f64,

    /// Default report path.
    #[serde(default = "default_report")]
    pub report: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            filter_outliers: true,
            iqr_factor: default_iqr_factor(),
            report: default_report(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_iqr_factor() -> f64 {
    1.5
}

fn default_report() -> String {
    "grant_report.md".to_string()
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
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge the `collect` command's arguments into this configuration.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_collect_args(&mut self, args: &crate::cli::CollectArgs) {
        if let Some(ref url) = args.api_url {
            self.api.base_url = url.trim_end_matches('/').to_string();
        }
        if args.api_key.is_some() {
            self.api.api_key = args.api_key.clone();
        }
        if let Some(limit) = args.search_limit {
            self.api.search_limit = limit;
        }
        if let Some(size) = args.page_size {
            self.api.page_size = size;
        }
        if let Some(delay) = args.page_delay_ms {
            self.api.page_delay_ms = delay;
        }
        if let Some(attempts) = args.max_attempts {
            self.retry.max_attempts = attempts;
        }
        if let Some(delimiter) = args.delimiter {
            self.input.delimiter = delimiter;
        }
        if let Some(ref output) = args.output {
            self.output.results = output.display().to_string();
        }
        if let Some(ref cache) = args.cache {
            self.output.cache = cache.display().to_string();
        }

        // Flags always override
        if args.first_grant_only {
            self.input.first_grant_only = true;
        }
    }

    /// Merge the `analyze` command's arguments into this configuration.
    pub fn merge_analyze_args(&mut self, args: &crate::cli::AnalyzeArgs) {
        if let Some(factor) = args.iqr_factor {
            self.analysis.iqr_factor = factor;
        }
        if let Some(ref report) = args.report {
            self.analysis.report = report.display().to_string();
        }
        if args.no_outlier_filter {
            self.analysis.filter_outliers = false;
        }
    }

    /// Page size clamped to what the API accepts.
    pub fn effective_page_size(&self) -> usize {
        self.api.page_size.clamp(1, MAX_PAGE_SIZE)
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
    use crate::cli::CollectArgs;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.search_limit, 5);
        assert_eq!(config.api.page_size, 100);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.input.name_column, "Name");
        assert_eq!(config.output.results, "citation_pubs.csv");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[api]
page_size = 500
api_key = "secret"

[retry]
max_attempts = 3

[input]
delimiter = "\t"
first_grant_only = true
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.api.page_size, 500);
        assert_eq!(config.api.api_key.as_deref(), Some("secret"));
        assert_eq!(config.api.search_limit, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.multiplier, 2);
        assert_eq!(config.input.delimiter, '\t');
        assert!(config.input.first_grant_only);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[api]"));
        assert!(toml_str.contains("[retry]"));
        assert!(toml_str.contains("[input]"));
        assert!(!toml_str.contains("api_key"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.api.base_url, Config::default().api.base_url);
    }

    #[test]
    fn test_merge_only_overrides_given_values() {
        let mut config = Config::default();
        config.api.page_size = 250;

        let args = CollectArgs {
            input: PathBuf::from("grants.csv"),
            output: Some(PathBuf::from("out.csv")),
            cache: None,
            api_url: Some("http://localhost:8080/".to_string()),
            api_key: None,
            search_limit: None,
            page_size: None,
            page_delay_ms: Some(0),
            max_attempts: None,
            delimiter: None,
            first_grant_only: false,
        };
        config.merge_collect_args(&args);

        assert_eq!(config.api.page_size, 250);
        assert_eq!(config.api.page_delay_ms, 0);
        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.output.results, "out.csv");
        assert_eq!(config.output.cache, "author_cache.json");
    }

    #[test]
    fn test_effective_page_size_is_capped() {
        let mut config = Config::default();
        config.api.page_size = 5000;
        assert_eq!(config.effective_page_size(), MAX_PAGE_SIZE);
        config.api.page_size = 0;
        assert_eq!(config.effective_page_size(), 1);
    }
}
