//! Circular longitude shifts
//!
//! Rotates the last (longitude) axis of a grid and its coordinate vector in
//! lockstep, e.g. to move an Atlantic-centered grid to the Pacific convention.

use crate::errors::{ClimaError, Result};
use crate::masked::Masked;
use ndarray::{Axis, Dimension, RemoveAxis};

/// Number of columns a shift of `delta` degrees moves, in `0..nlon`.
fn shift_columns(lon: &[f64], delta: f64) -> Result<usize> {
    if lon.len() < 2 {
        return Err(ClimaError::shape(
            "lon_axis",
            "at least two longitudes",
            lon.len(),
        ));
    }
    let resolution = lon[1] - lon[0];
    if !resolution.is_finite() || resolution == 0.0 {
        return Err(ClimaError::invalid(
            "lon_axis",
            format!("longitude resolution must be finite and non-zero, got {resolution}"),
        ));
    }
    if !delta.is_finite() {
        return Err(ClimaError::invalid("delta_degrees", "shift must be finite"));
    }
    let nlon = lon.len() as i64;
    let steps = (delta / resolution).round() as i64;
    Ok(steps.rem_euclid(nlon) as usize)
}

/// Column order after rotating by `shift` positions: `shift..n` then `0..shift`
fn rotation_indices(nlon: usize, shift: usize) -> Vec<usize> {
    (shift..nlon).chain(0..shift).collect()
}

/// Rotate the longitude axis of `grid` by `delta` degrees.
///
/// Works for a single `(lat, lon)` grid as well as a `(time, lat, lon)` stack;
/// longitude is always the last axis. The returned axis is `lon + delta`,
/// evenly spaced at the original resolution.
///
/// # Errors
///
/// Returns `ShapeMismatch` if the axis length differs from the grid's last
/// dimension or has fewer than two points, and `InvalidConfiguration` for a
/// degenerate resolution or non-finite shift.
pub fn shift_longitude<D>(grid: &Masked<D>, lon: &[f64], delta: f64) -> Result<(Masked<D>, Vec<f64>)>
where
    D: Dimension + RemoveAxis,
{
    let last = grid.ndim().checked_sub(1).ok_or_else(|| {
        ClimaError::shape("grid", "at least one dimension", 0)
    })?;
    let nlon = grid.shape()[last];
    if lon.len() != nlon {
        return Err(ClimaError::shape("lon_axis", nlon, lon.len()));
    }
    let shift = shift_columns(lon, delta)?;
    let indices = rotation_indices(nlon, shift);

    let values = grid.values().select(Axis(last), &indices);
    let valid = grid.valid().select(Axis(last), &indices);
    let lon_shifted = lon.iter().map(|l| l + delta).collect();

    Ok((Masked::from_parts(values, valid), lon_shifted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_shift_wraps() {
        let lon: Vec<f64> = (0..4).map(f64::from).collect();
        assert_eq!(shift_columns(&lon, -1.0).unwrap(), 3);
        assert_eq!(shift_columns(&lon, 5.0).unwrap(), 1);
        assert_eq!(rotation_indices(4, 1), vec![1, 2, 3, 0]);
    }
}
