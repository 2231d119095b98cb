//! Whole-record means, per-year monthly averages and monthly climatologies

use super::grouping::{year_month_groups, Grouping};
use super::moments::{median, reduce, MonthlyAggregate};
use super::parallel::{cells_to_grid, counts_to_grid, map_cells, mean_cells};
use crate::masked::{Masked2, Masked3};
use crate::series::TimeSeries3D;
use chrono::{Duration, NaiveDateTime};
use ndarray::Array2;
use tracing::{debug, info};

/// Count-weighted mean of every cell over the full record.
///
/// Cells never observed are missing.
pub fn time_mean(data: &Masked3) -> Masked2 {
    let times: Vec<usize> = (0..data.shape()[0]).collect();
    mean_cells(data, &times).0
}

/// Cells never observed over the full record (`true` = never observed).
pub fn never_observed(data: &Masked3) -> Array2<bool> {
    time_mean(data).mask()
}

/// Mean, median, spread and counts of one calendar month of one year
#[derive(Debug, Clone)]
pub struct MonthlyMean {
    pub year: i32,
    pub month: u32,
    /// First timestamp of the month shifted by the mean offset of its steps
    pub time: NaiveDateTime,
    pub mean: Masked2,
    pub median: Masked2,
    /// Population standard deviation
    pub std: Masked2,
    pub count: Array2<usize>,
}

/// Average the series within each (year, month) present on its time axis.
///
/// Year-months without time steps do not appear in the output.
pub fn monthly_average(series: &TimeSeries3D) -> Vec<MonthlyMean> {
    let dim = series.grid_shape();
    let groups = year_month_groups(series.time());
    info!(months = groups.len(), "computing monthly averages");

    groups
        .into_iter()
        .filter_map(|group| {
            let first = *group.indices.first()?;
            let time = representative_time(series.time(), &group.indices, first);
            debug!(year = group.year, month = group.month, steps = group.indices.len(), "averaging month");

            let cells = map_cells(series.data(), &group.indices, |samples| {
                let n = samples.len();
                if n == 0 {
                    return (None, None, None, 0);
                }
                let mean = samples.iter().sum::<f64>() / n as f64;
                let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n as f64;
                (Some(mean), Some(median(samples)), Some(var.sqrt()), n)
            });

            let means: Vec<_> = cells.iter().map(|c| c.0).collect();
            let medians: Vec<_> = cells.iter().map(|c| c.1).collect();
            let stds: Vec<_> = cells.iter().map(|c| c.2).collect();
            let counts: Vec<_> = cells.iter().map(|c| c.3).collect();

            Some(MonthlyMean {
                year: group.year,
                month: group.month,
                time,
                mean: cells_to_grid(dim, &means),
                median: cells_to_grid(dim, &medians),
                std: cells_to_grid(dim, &stds),
                count: counts_to_grid(dim, &counts),
            })
        })
        .collect()
}

fn representative_time(time: &[NaiveDateTime], indices: &[usize], first: usize) -> NaiveDateTime {
    let start = time[first];
    let offsets: Vec<i64> = indices
        .iter()
        .map(|&i| (time[i] - start).num_seconds())
        .collect();
    let mean_offset = offsets.iter().sum::<i64>() / offsets.len().max(1) as i64;
    start + Duration::seconds(mean_offset)
}

/// Multi-year monthly climatology: the moments of every calendar month.
pub fn climatology(series: &TimeSeries3D) -> MonthlyAggregate {
    reduce(series, Grouping::Monthly)
}
