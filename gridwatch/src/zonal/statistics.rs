//! Summary statistics over extracted cell values.
//!
//! Analyses reduce an accumulated cell map to a single number: one of the
//! statistics below, computed over the per-cell accumulated sums. An empty
//! value set produces NaN for every statistic except the count; callers treat
//! NaN as "no data".

use super::{AccumulatedCell, CellKey};
use std::collections::HashMap;

/// The reduction an analysis applies to its extracted values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Statistic {
    Count,
    Sum,
    Mean,
    Min,
    Max,
    Median,
    Variance,
    StandardDeviation,
}

/// All statistics of one value set, computed in a single pass plus a sort
/// for the median.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticsSummary {
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub variance: f64,
    pub standard_deviation: f64,
}

impl StatisticsSummary {
    /// Computes the summary of a value set.
    ///
    /// Variance is population variance (divide by N).
    pub fn from_values(mut values: Vec<f64>) -> Self {
        let count = values.len();
        if count == 0 {
            return Self {
                count: 0,
                sum: f64::NAN,
                mean: f64::NAN,
                min: f64::NAN,
                max: f64::NAN,
                median: f64::NAN,
                variance: f64::NAN,
                standard_deviation: f64::NAN,
            };
        }

        let n = count as f64;
        let sum: f64 = values.iter().sum();
        let mean = sum / n;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sq_diff = 0.0;
        for &v in &values {
            min = min.min(v);
            max = max.max(v);
            sq_diff += (v - mean) * (v - mean);
        }
        let variance = sq_diff / n;

        values.sort_by(|a, b| a.total_cmp(b));
        let median = if count % 2 == 1 {
            values[count / 2]
        } else {
            (values[count / 2 - 1] + values[count / 2]) / 2.0
        };

        Self {
            count,
            sum,
            mean,
            min,
            max,
            median,
            variance,
            standard_deviation: variance.sqrt(),
        }
    }

    /// Summary over the per-cell accumulated sums of a cell map.
    pub fn from_cell_sums(cells: &HashMap<CellKey, AccumulatedCell>) -> Self {
        Self::from_values(cells.values().map(|c| c.sum).collect())
    }
}

impl Statistic {
    /// Picks this statistic out of a summary.
    pub fn evaluate(&self, summary: &StatisticsSummary) -> f64 {
        match self {
            Statistic::Count => summary.count as f64,
            Statistic::Sum => summary.sum,
            Statistic::Mean => summary.mean,
            Statistic::Min => summary.min,
            Statistic::Max => summary.max,
            Statistic::Median => summary.median,
            Statistic::Variance => summary.variance,
            Statistic::StandardDeviation => summary.standard_deviation,
        }
    }
}
