//! Parallel per-cell reductions over the time axis
//!
//! Every `(lat, lon)` cell of a `(time, lat, lon)` array is reduced
//! independently, so cells are spread over the rayon pool with no locking.
//! Each worker writes only its own output element.

use crate::masked::{Masked2, Masked3};
use ndarray::Array2;
use rayon::prelude::*;
use tracing::debug;

/// Apply `reduce` to the valid samples of every cell at the given time indices.
///
/// The result is in row-major `(lat, lon)` order.
pub fn map_cells<T, F>(data: &Masked3, times: &[usize], reduce: F) -> Vec<T>
where
    T: Send,
    F: Fn(&[f64]) -> T + Sync,
{
    let shape = data.shape();
    let (nlat, nlon) = (shape[1], shape[2]);
    let output_size = nlat * nlon;

    debug!(
        cells = output_size,
        steps = times.len(),
        threads = rayon::current_num_threads(),
        "reducing cells"
    );

    (0..output_size)
        .into_par_iter()
        .map(|flat_idx| {
            let (lat, lon) = (flat_idx / nlon, flat_idx % nlon);
            let samples = data.cell_samples(lat, lon, times);
            reduce(&samples)
        })
        .collect()
}

/// Count-weighted mean of every cell over the given time indices
pub fn mean_cells(data: &Masked3, times: &[usize]) -> (Masked2, Array2<usize>) {
    let shape = data.shape();
    let dim = (shape[1], shape[2]);
    let cells = map_cells(data, times, |samples| {
        let n = samples.len();
        let mean = (n > 0).then(|| samples.iter().sum::<f64>() / n as f64);
        (mean, n)
    });
    let (means, counts): (Vec<Option<f64>>, Vec<usize>) = cells.into_iter().unzip();
    (cells_to_grid(dim, &means), counts_to_grid(dim, &counts))
}

pub(crate) fn cells_to_grid(dim: (usize, usize), cells: &[Option<f64>]) -> Masked2 {
    let ncols = dim.1;
    let values = Array2::from_shape_fn(dim, |(i, j)| cells[i * ncols + j].unwrap_or(f64::NAN));
    let valid = Array2::from_shape_fn(dim, |(i, j)| cells[i * ncols + j].is_some());
    Masked2::from_parts(values, valid)
}

pub(crate) fn counts_to_grid(dim: (usize, usize), counts: &[usize]) -> Array2<usize> {
    let ncols = dim.1;
    Array2::from_shape_fn(dim, |(i, j)| counts[i * ncols + j])
}
