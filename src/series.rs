//! Gridded time series
//!
//! [`TimeSeries3D`] couples a `(time, lat, lon)` masked array with its time
//! axis. The axis must be strictly increasing and match the leading dimension.

use crate::errors::{ClimaError, Result};
use crate::masked::{Masked2, Masked3, MissingConvention};
use chrono::{Datelike, NaiveDateTime};
use ndarray::Array3;

/// A `(time, lat, lon)` masked array plus its timestamps
#[derive(Debug, Clone)]
pub struct TimeSeries3D {
    time: Vec<NaiveDateTime>,
    data: Masked3,
}

impl TimeSeries3D {
    /// Pair a time axis with data.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the axis length differs from the leading
    /// dimension, and `TimeAxis` if it is not strictly increasing.
    pub fn new(time: Vec<NaiveDateTime>, data: Masked3) -> Result<Self> {
        let ntime = data.shape()[0];
        if time.len() != ntime {
            return Err(ClimaError::shape("time", ntime, time.len()));
        }
        if let Some(i) = time.windows(2).position(|w| w[1] <= w[0]) {
            return Err(ClimaError::TimeAxis(format!(
                "time axis is not strictly increasing at index {} ({} then {})",
                i + 1,
                time[i],
                time[i + 1]
            )));
        }
        Ok(Self { time, data })
    }

    /// Build from raw values following a missing-value convention.
    ///
    /// # Errors
    ///
    /// Same as [`Masked3::from_convention`] and [`TimeSeries3D::new`].
    pub fn from_raw(
        time: Vec<NaiveDateTime>,
        values: Array3<f64>,
        mask: Option<&Array3<bool>>,
        convention: MissingConvention,
    ) -> Result<Self> {
        Self::new(time, Masked3::from_convention(values, mask, convention)?)
    }

    /// Stack daily grids, e.g. the output of per-file binning, into a series.
    ///
    /// # Errors
    ///
    /// Same as [`Masked3::stack`] and [`TimeSeries3D::new`].
    pub fn from_slices(time: Vec<NaiveDateTime>, slices: &[Masked2]) -> Result<Self> {
        Self::new(time, Masked3::stack(slices)?)
    }

    pub fn time(&self) -> &[NaiveDateTime] {
        &self.time
    }

    pub fn data(&self) -> &Masked3 {
        &self.data
    }

    pub fn ntime(&self) -> usize {
        self.time.len()
    }

    /// `(nlat, nlon)` of every time slice
    pub fn grid_shape(&self) -> (usize, usize) {
        let shape = self.data.shape();
        (shape[1], shape[2])
    }

    /// Calendar month (1..=12) of every time step
    pub fn months(&self) -> Vec<u32> {
        self.time.iter().map(Datelike::month).collect()
    }

    pub fn into_parts(self) -> (Vec<NaiveDateTime>, Masked3) {
        (self.time, self.data)
    }
}
