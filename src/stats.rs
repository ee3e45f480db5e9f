//! Descriptive statistics over step duration samples.

use std::collections::BTreeMap;

use crate::{ProfilerError, ProfilerResult};

pub const DEFAULT_PERCENTILES: [u8; 4] = [50, 90, 95, 99];

#[derive(Debug, Clone, PartialEq)]
pub struct StepStatistics {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub percentiles: BTreeMap<u8, f64>,
}

impl StepStatistics {
    /// Computes statistics for `samples`, evaluating every percentile in
    /// `ladder` (each in `0..=100`).
    pub fn compute(samples: &[f64], ladder: &[u8]) -> ProfilerResult<Self> {
        if samples.is_empty() {
            return Err(ProfilerError::Compute(
                "cannot compute statistics of an empty sample set".to_string(),
            ));
        }
        if let Some(p) = ladder.iter().find(|p| **p > 100) {
            return Err(ProfilerError::Compute(format!(
                "percentile {p} is outside 0..=100"
            )));
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let min = sorted[0];
        let max = sorted[count - 1];
        let mean = sorted.iter().sum::<f64>() / count as f64;
        let median = percentile(&sorted, 50.0);
        let percentiles = ladder
            .iter()
            .map(|p| (*p, percentile(&sorted, f64::from(*p))))
            .collect();

        Ok(Self {
            count,
            min,
            max,
            mean,
            median,
            percentiles,
        })
    }
}

/// Linear interpolation between closest ranks: rank = p/100 * (n - 1).
/// `sorted` must be non-empty and ascending. At `p = 50` this is the median.
pub fn percentile(sorted: &[f64], p: f64) -> f64 {
    let last = sorted.len() - 1;
    let rank = (p / 100.0) * last as f64;
    let lower = rank.floor() as usize;
    let upper = (rank.ceil() as usize).min(last);
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}
