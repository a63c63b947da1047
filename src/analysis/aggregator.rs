//! Publication window aggregation.

use crate::models::Publication;
use std::ops::RangeInclusive;

/// Number of years counted before the grant.
pub const WINDOW_YEARS: i32 = 6;

/// Count and citation total for one researcher's window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowMetrics {
    pub publications: u64,
    pub citations: u64,
}

/// The years counted for a grant awarded in `grant_year`.
pub fn window(grant_year: i32) -> RangeInclusive<i32> {
    (grant_year - WINDOW_YEARS)..=(grant_year - 1)
}

/// Sum publications and citations dated within [`window`].
///
/// Publications without a year are never counted.
pub fn aggregate(publications: &[Publication], grant_year: i32) -> WindowMetrics {
    let years = window(grant_year);

    publications
        .iter()
        .filter(|p| p.year.is_some_and(|y| years.contains(&y)))
        .fold(WindowMetrics::default(), |acc, p| WindowMetrics {
            publications: acc.publications + 1,
            citations: acc.citations + p.citation_count,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds() {
        let pubs = vec![
            Publication::dated(Some(2013), 1000), // Y-7
            Publication::dated(Some(2014), 1),    // Y-6
            Publication::dated(Some(2017), 10),
            Publication::dated(Some(2019), 100), // Y-1
            Publication::dated(Some(2020), 5000), // Y
        ];

        let metrics = aggregate(&pubs, 2020);
        assert_eq!(
            metrics,
            WindowMetrics {
                publications: 3,
                citations: 111,
            }
        );
    }

    #[test]
    fn test_missing_year_never_counted() {
        let pubs = vec![
            Publication::dated(None, 50),
            Publication::dated(Some(2018), 2),
        ];

        let metrics = aggregate(&pubs, 2020);
        assert_eq!(metrics.publications, 1);
        assert_eq!(metrics.citations, 2);
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(aggregate(&[], 2020), WindowMetrics::default());
    }

    #[test]
    fn test_window_range() {
        assert_eq!(window(2020), 2014..=2019);
    }
}
