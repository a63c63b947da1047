//! Data models for the grant metrics pipeline.
//!
//! This module contains the core data structures that flow between the
//! input reader, the API client, the aggregator, and the result sink.

use crate::analysis::MetricFit;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A grant recipient read from the input table.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearcherRecord {
    /// Name exactly as it appears in the input.
    pub name: String,
    /// First year of the grant's fiscal-year range.
    pub grant_year: i32,
    /// Grant amount in dollars.
    pub grant_amount: f64,
}

/// One author returned by an author search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorCandidate {
    pub author_id: String,
    pub name: String,
    /// Number of papers the API attributes to this author.
    pub paper_count: u64,
}

/// A single publication of a resolved author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Publication {
    pub title: Option<String>,
    /// Publication year, when known.
    pub year: Option<i32>,
    pub citation_count: u64,
}

impl Publication {
    /// Creates a publication without a title.
    #[cfg(test)]
    pub fn dated(year: Option<i32>, citation_count: u64) -> Self {
        Self {
            title: None,
            year,
            citation_count,
        }
    }
}

/// One line of the output table.
///
/// Field names are fixed by the output format and are relied on by the
/// analysis step when the table is read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "DG_Year")]
    pub grant_year: i32,
    #[serde(rename = "DG_Amount")]
    pub grant_amount: f64,
    #[serde(rename = "Publications_6Yrs")]
    pub publication_count_6yr: u64,
    #[serde(rename = "Citations_6Yrs")]
    pub citation_total_6yr: u64,
}

impl ResultRow {
    /// Column order of the output table.
    pub const HEADER: [&'static str; 5] = [
        "Name",
        "DG_Year",
        "DG_Amount",
        "Publications_6Yrs",
        "Citations_6Yrs",
    ];
}

/// Publication metrics that can be regressed against the grant amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Publications in the six years before the grant.
    Publications,
    /// Citations of those publications.
    Citations,
}

impl Metric {
    pub const ALL: [Metric; 2] = [Metric::Publications, Metric::Citations];

    /// Reads this metric from a result row.
    pub fn value(&self, row: &ResultRow) -> f64 {
        match self {
            Metric::Publications => row.publication_count_6yr as f64,
            Metric::Citations => row.citation_total_6yr as f64,
        }
    }

    /// Axis label used in reports.
    pub fn label(&self) -> &'static str {
        match self {
            Metric::Publications => "Publication Count (Last 6 Years)",
            Metric::Citations => "Citation Count (Last 6 Years)",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Publications => write!(f, "Publications"),
            Metric::Citations => write!(f, "Citations"),
        }
    }
}

/// Metadata about an analysis report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Result table the analysis was run on.
    pub results_path: String,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Rows in the result table.
    pub researchers: usize,
    /// Whether IQR outliers were dropped before fitting.
    pub outliers_filtered: bool,
    /// Fence multiplier used by the outlier filter.
    pub iqr_factor: f64,
}

/// Regression report over a result table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub metadata: ReportMetadata,
    /// One fit per metric.
    pub fits: Vec<MetricFit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> ResultRow {
        ResultRow {
            name: "Jane Doe".to_string(),
            grant_year: 2020,
            grant_amount: 45000.0,
            publication_count_6yr: 12,
            citation_total_6yr: 340,
        }
    }

    #[test]
    fn test_metric_value() {
        let row = row();
        assert_eq!(Metric::Publications.value(&row), 12.0);
        assert_eq!(Metric::Citations.value(&row), 340.0);
    }

    #[test]
    fn test_result_row_serializes_in_header_order() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(row()).unwrap();
        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let mut lines = out.lines();
        assert_eq!(lines.next(), Some(ResultRow::HEADER.join(",").as_str()));
        assert_eq!(lines.next(), Some("Jane Doe,2020,45000.0,12,340"));
    }
}
