//! Grouped temporal moments
//!
//! Reduces a `(time, lat, lon)` series along time into per-cell count, mean,
//! median, variance, skewness and excess kurtosis for every calendar group.
//! Higher moments come from raw moments:
//!
//! ```text
//! var  = E[x²] - μ²
//! skew = (E[x³] - 3μ·var - μ³) / σ³
//! kurt = (E[x⁴] - 4μ·E[x³] + 6·E[x²]·μ² - 3μ⁴) / σ⁴ - 3
//! ```
//!
//! A cell with no valid sample in a group is missing for every statistic.
//! Skewness and kurtosis are also missing when the variance is zero.

use super::grouping::{group_indices, Grouping};
use super::parallel::{cells_to_grid, counts_to_grid, map_cells};
use crate::errors::{ClimaError, Result};
use crate::masked::{Masked2, Masked3};
use crate::series::TimeSeries3D;
use ndarray::{Array2, Array3, Axis};
use tracing::info;

/// Moments of one sample set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Moments {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Population variance
    pub variance: f64,
    pub skewness: Option<f64>,
    /// Excess kurtosis
    pub kurtosis: Option<f64>,
}

impl Moments {
    /// Moments of `samples`, `None` when there are none
    #[must_use]
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }
        let n = samples.len() as f64;
        let (s1, s2, s3, s4) = samples.iter().fold((0.0, 0.0, 0.0, 0.0), |acc, &x| {
            let x2 = x * x;
            (acc.0 + x, acc.1 + x2, acc.2 + x2 * x, acc.3 + x2 * x2)
        });
        let (mean, m2, m3, m4) = (s1 / n, s2 / n, s3 / n, s4 / n);

        let raw_var = m2 - mean * mean;
        // Below this bound the raw-moment difference is cancellation noise.
        let degenerate = raw_var <= (n + 4.0) * f64::EPSILON * m2.abs();
        let variance = if degenerate { 0.0 } else { raw_var };

        let (skewness, kurtosis) = if degenerate {
            (None, None)
        } else {
            let std = variance.sqrt();
            let mean2 = mean * mean;
            let skew = (m3 - 3.0 * mean * variance - mean2 * mean) / (std * std * std);
            let kurt = (m4 - 4.0 * mean * m3 + 6.0 * m2 * mean2 - 3.0 * mean2 * mean2)
                / (variance * variance)
                - 3.0;
            (Some(skew), Some(kurt))
        };

        Some(Self {
            count: samples.len(),
            mean,
            median: median(samples),
            variance,
            skewness,
            kurtosis,
        })
    }

    /// Population standard deviation
    #[must_use]
    pub fn std(&self) -> f64 {
        self.variance.sqrt()
    }
}

/// Median of a non-empty sample set; the mean of the two middle values for even counts
pub(crate) fn median(samples: &[f64]) -> f64 {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Per-cell statistics of one group
#[derive(Debug, Clone)]
pub struct GroupStatistics {
    /// Calendar month (1..=12), season index (0..=3) or 0 for the whole record
    pub key: usize,
    /// Number of time steps in the group
    pub steps: usize,
    pub count: Array2<usize>,
    pub mean: Masked2,
    pub median: Masked2,
    pub variance: Masked2,
    pub skewness: Masked2,
    pub kurtosis: Masked2,
}

impl GroupStatistics {
    /// Population standard deviation
    #[must_use]
    pub fn std(&self) -> Masked2 {
        self.variance.map_valid(f64::sqrt)
    }
}

/// Statistics for every group of a grouping, in key order
#[derive(Debug, Clone)]
pub struct MonthlyAggregate {
    pub grouping: Grouping,
    pub groups: Vec<GroupStatistics>,
}

impl MonthlyAggregate {
    /// Statistics of the group with the given key
    #[must_use]
    pub fn get(&self, key: usize) -> Option<&GroupStatistics> {
        self.groups.iter().find(|g| g.key == key)
    }

    /// Stack one statistic of every group into a `(group, lat, lon)` array.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the aggregate holds no groups.
    pub fn stack(&self, field: impl Fn(&GroupStatistics) -> &Masked2) -> Result<Masked3> {
        let slices: Vec<Masked2> = self.groups.iter().map(|g| field(g).clone()).collect();
        Masked3::stack(&slices)
    }

    /// Valid counts of every group as a `(group, lat, lon)` array
    ///
    /// # Errors
    ///
    /// Returns an array error if the aggregate holds no groups.
    pub fn count_stack(&self) -> Result<Array3<usize>> {
        let views: Vec<_> = self.groups.iter().map(|g| g.count.view()).collect();
        Ok(ndarray::stack(Axis(0), &views)?)
    }
}

/// Reduce `series` along time into per-group moments.
pub fn reduce(series: &TimeSeries3D, grouping: Grouping) -> MonthlyAggregate {
    let dim = series.grid_shape();
    let months = series.months();

    info!(
        grouping = grouping.as_str(),
        steps = series.ntime(),
        nlat = dim.0,
        nlon = dim.1,
        "computing temporal moments"
    );

    let groups = group_indices(&months, grouping)
        .into_iter()
        .map(|group| {
            let cells = map_cells(series.data(), &group.indices, Moments::from_samples);
            group_statistics(group.key, group.indices.len(), dim, &cells)
        })
        .collect();

    MonthlyAggregate { grouping, groups }
}

fn group_statistics(
    key: usize,
    steps: usize,
    dim: (usize, usize),
    cells: &[Option<Moments>],
) -> GroupStatistics {
    let field = |f: fn(&Moments) -> Option<f64>| -> Masked2 {
        let values: Vec<Option<f64>> = cells.iter().map(|c| c.as_ref().and_then(f)).collect();
        cells_to_grid(dim, &values)
    };
    let counts: Vec<usize> = cells.iter().map(|c| c.map_or(0, |m| m.count)).collect();

    GroupStatistics {
        key,
        steps,
        count: counts_to_grid(dim, &counts),
        mean: field(|m| Some(m.mean)),
        median: field(|m| Some(m.median)),
        variance: field(|m| Some(m.variance)),
        skewness: field(|m| m.skewness),
        kurtosis: field(|m| m.kurtosis),
    }
}

/// Check that a group has at least one valid sample somewhere on the grid.
///
/// # Errors
///
/// Returns `InsufficientObservations` naming the group otherwise.
pub fn require_observations(stats: &GroupStatistics) -> Result<()> {
    if stats.count.iter().any(|&c| c > 0) {
        Ok(())
    } else {
        Err(ClimaError::InsufficientObservations {
            context: format!("group {} has no valid samples", stats.key),
        })
    }
}
