//! Least-squares fits and outlier filtering over collected results.

use crate::models::{Metric, ResultRow};
use serde::{Deserialize, Serialize};

/// Ordinary least-squares fit of `y = slope * x + intercept`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// Points used in the fit.
    pub n: usize,
}

impl LinearFit {
    /// The fitted line as "y = 1.23x + 4.56".
    pub fn equation(&self) -> String {
        format!("y = {:.2}x + {:.2}", self.slope, self.intercept)
    }
}

/// Fit a line through paired samples.
///
/// Returns `None` with fewer than two points or when every `x` is equal.
/// When every `y` is equal the fit is exact and `r_squared` is 1.
pub fn linear_fit(xs: &[f64], ys: &[f64]) -> Option<LinearFit> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }

    let mean_x = xs[..n].iter().sum::<f64>() / n as f64;
    let mean_y = ys[..n].iter().sum::<f64>() / n as f64;

    let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
    for (x, y) in xs.iter().zip(ys).take(n) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxx += dx * dx;
        syy += dy * dy;
        sxy += dx * dy;
    }

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let r_squared = if syy == 0.0 {
        1.0
    } else {
        (sxy * sxy) / (sxx * syy)
    };

    Some(LinearFit {
        slope,
        intercept: mean_y - slope * mean_x,
        r_squared,
        n,
    })
}

/// Quantile with linear interpolation between closest ranks.
///
/// `sorted` must be ascending and non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Tukey fences `[Q1 - k*IQR, Q3 + k*IQR]` for a sample.
pub fn iqr_bounds(values: &[f64], k: f64) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q1 = quantile(&sorted, 0.25);
    let q3 = quantile(&sorted, 0.75);
    let iqr = q3 - q1;

    Some((q1 - k * iqr, q3 + k * iqr))
}

/// Drop rows whose metric or grant amount falls outside the IQR fences.
pub fn filter_outliers<'a>(rows: &'a [ResultRow], metric: Metric, k: f64) -> Vec<&'a ResultRow> {
    let xs: Vec<f64> = rows.iter().map(|r| metric.value(r)).collect();
    let ys: Vec<f64> = rows.iter().map(|r| r.grant_amount).collect();

    let (Some((x_lo, x_hi)), Some((y_lo, y_hi))) = (iqr_bounds(&xs, k), iqr_bounds(&ys, k)) else {
        return Vec::new();
    };

    rows.iter()
        .filter(|r| {
            let x = metric.value(r);
            (x_lo..=x_hi).contains(&x) && (y_lo..=y_hi).contains(&r.grant_amount)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn row(pubs: u64, cites: u64, amount: f64) -> ResultRow {
        ResultRow {
            name: format!("R{}", pubs),
            grant_year: 2020,
            grant_amount: amount,
            publication_count_6yr: pubs,
            citation_total_6yr: cites,
        }
    }

    #[test]
    fn test_exact_line() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [5.0, 7.0, 9.0, 11.0];
        let fit = linear_fit(&xs, &ys).unwrap();

        assert!(approx(fit.slope, 2.0));
        assert!(approx(fit.intercept, 3.0));
        assert!(approx(fit.r_squared, 1.0));
        assert_eq!(fit.n, 4);
        assert_eq!(fit.equation(), "y = 2.00x + 3.00");
    }

    #[test]
    fn test_noisy_fit() {
        let xs = [1.0, 2.0, 3.0];
        let ys = [1.0, 3.0, 2.0];
        let fit = linear_fit(&xs, &ys).unwrap();

        assert!(approx(fit.slope, 0.5));
        assert!(approx(fit.intercept, 1.0));
        assert!(approx(fit.r_squared, 0.25));
    }

    #[test]
    fn test_degenerate_inputs() {
        assert!(linear_fit(&[1.0], &[2.0]).is_none());
        assert!(linear_fit(&[3.0, 3.0, 3.0], &[1.0, 2.0, 3.0]).is_none());

        let flat = linear_fit(&[1.0, 2.0], &[4.0, 4.0]).unwrap();
        assert!(approx(flat.slope, 0.0));
        assert!(approx(flat.r_squared, 1.0));
    }

    #[test]
    fn test_iqr_bounds() {
        let (lo, hi) = iqr_bounds(&[1.0, 2.0, 3.0, 4.0, 5.0], 1.5).unwrap();
        // Q1 = 2, Q3 = 4
        assert!(approx(lo, -1.0));
        assert!(approx(hi, 7.0));
        assert!(iqr_bounds(&[], 1.5).is_none());
    }

    #[test]
    fn test_filter_outliers_drops_extremes() {
        let rows = vec![
            row(1, 10, 30000.0),
            row(2, 20, 32000.0),
            row(3, 30, 34000.0),
            row(4, 40, 36000.0),
            row(100, 50, 38000.0),
            row(5, 60, 900000.0),
        ];

        let kept = filter_outliers(&rows, Metric::Publications, 1.5);
        let pubs: Vec<u64> = kept.iter().map(|r| r.publication_count_6yr).collect();
        assert_eq!(pubs, vec![1, 2, 3, 4]);
    }
}
