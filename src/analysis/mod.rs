//! Analysis modules.
//!
//! Window aggregation used while collecting, and the regression analysis
//! run over the collected results.

pub mod aggregator;
pub mod regression;

pub use aggregator::aggregate;
pub use regression::{filter_outliers, linear_fit, LinearFit};

use crate::config::AnalysisConfig;
use crate::models::{Metric, ResultRow};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Regression of grant amount against one metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricFit {
    pub metric: Metric,
    /// Rows removed by the outlier filter.
    pub excluded: usize,
    /// `None` when the remaining rows cannot support a fit.
    pub fit: Option<LinearFit>,
}

/// Fit `grant_amount ~ metric` for every metric.
pub fn analyze(rows: &[ResultRow], config: &AnalysisConfig) -> Vec<MetricFit> {
    Metric::ALL
        .iter()
        .map(|&metric| {
            let used: Vec<&ResultRow> = if config.filter_outliers {
                filter_outliers(rows, metric, config.iqr_factor)
            } else {
                rows.iter().collect()
            };

            let xs: Vec<f64> = used.iter().map(|r| metric.value(r)).collect();
            let ys: Vec<f64> = used.iter().map(|r| r.grant_amount).collect();
            let fit = linear_fit(&xs, &ys);

            debug!("{}: {} of {} rows used", metric, used.len(), rows.len());

            MetricFit {
                metric,
                excluded: rows.len() - used.len(),
                fit,
            }
        })
        .collect()
}
