//! Markdown and JSON report generation.
//!
//! This module renders the regression analysis of a result table.

use crate::analysis::MetricFit;
use crate::models::{AnalysisReport, ReportMetadata};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AnalysisReport) -> String {
    let mut output = String::new();

    output.push_str("# Grant Metrics Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_summary_section(&report.fits));

    for fit in &report.fits {
        output.push_str(&generate_fit_section(fit));
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Results:** `{}`\n", metadata.results_path));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Researchers:** {}\n", metadata.researchers));
    if metadata.outliers_filtered {
        section.push_str(&format!(
            "- **Outlier Filter:** IQR, k = {}\n",
            metadata.iqr_factor
        ));
    } else {
        section.push_str("- **Outlier Filter:** off\n");
    }
    section.push('\n');

    section
}

/// Generate the summary table across metrics.
fn generate_summary_section(fits: &[MetricFit]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| Metric | Points | Excluded | Slope | Intercept | R² |\n");
    section.push_str("|:---|:---:|:---:|---:|---:|:---:|\n");

    for mf in fits {
        match mf.fit {
            Some(fit) => section.push_str(&format!(
                "| {} | {} | {} | {:.2} | {:.2} | {:.2} |\n",
                mf.metric, fit.n, mf.excluded, fit.slope, fit.intercept, fit.r_squared
            )),
            None => section.push_str(&format!(
                "| {} | - | {} | - | - | - |\n",
                mf.metric, mf.excluded
            )),
        }
    }
    section.push('\n');

    section
}

/// Generate the section for one metric.
fn generate_fit_section(mf: &MetricFit) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {} Count vs DG Value\n\n", mf.metric));
    section.push_str(&format!("*x: {} | y: DG Value ($)*\n\n", mf.metric.label()));

    match mf.fit {
        Some(fit) => {
            section.push_str(&format!("- **Line of best fit:** `{}`\n", fit.equation()));
            section.push_str(&format!("- **R²:** {:.2}\n", fit.r_squared));
            section.push_str(&format!("- **Points:** {}\n", fit.n));
        }
        None => {
            section.push_str("Not enough distinct points to fit a line.\n");
        }
    }
    if mf.excluded > 0 {
        section.push_str(&format!("- **Outliers excluded:** {}\n", mf.excluded));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    "---\n\n*Report generated by grantcite*\n".to_string()
}

/// Generate a JSON report.
pub fn generate_json_report(report: &AnalysisReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}
