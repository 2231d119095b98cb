//! Along-track binning onto a regular longitude/latitude grid
//!
//! Scattered `(value, lon, lat)` samples are accumulated into per-cell sums and
//! counts in a single pass. A cell's value is `sum / count` when at least one
//! sample fell in it and is missing otherwise, never zero.
//!
//! Samples outside the configured domain are dropped silently: that is the
//! binning policy, not an error. The number of dropped samples is reported on
//! the result for bookkeeping.

use crate::errors::{ClimaError, Result};
use crate::masked::Masked2;
use ndarray::Array2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Longitude convention of a grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationKind {
    /// Centered on the prime meridian, longitudes roughly in [-180, 179]
    Atlantic,
    /// Centered on the date line, longitudes in [0, 359]
    Pacific,
}

impl std::str::FromStr for OrientationKind {
    type Err = ClimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "atlantic" => Ok(Self::Atlantic),
            "pacific" => Ok(Self::Pacific),
            other => Err(ClimaError::invalid(
                "orientation",
                format!("unknown orientation '{other}', expected 'atlantic' or 'pacific'"),
            )),
        }
    }
}

/// Longitude convention plus explicit domain bounds in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orientation {
    pub kind: OrientationKind,
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl Orientation {
    /// Atlantic-centered domain `lon ∈ [-180, 179]`, `lat ∈ [-lat_max, lat_max]`
    #[must_use]
    pub fn atlantic(lat_max: f64) -> Self {
        Self {
            kind: OrientationKind::Atlantic,
            lon_min: -180.0,
            lon_max: 179.0,
            lat_min: -lat_max,
            lat_max,
        }
    }

    /// Pacific-centered domain `lon ∈ [0, 359]`, `lat ∈ [-lat_max, lat_max]`
    #[must_use]
    pub fn pacific(lat_max: f64) -> Self {
        Self {
            kind: OrientationKind::Pacific,
            lon_min: 0.0,
            lon_max: 359.0,
            lat_min: -lat_max,
            lat_max,
        }
    }

    fn validate(&self) -> Result<()> {
        let finite = [self.lon_min, self.lon_max, self.lat_min, self.lat_max]
            .iter()
            .all(|b| b.is_finite());
        if !finite {
            return Err(ClimaError::invalid("orientation", "bounds must be finite"));
        }
        if self.lon_min >= self.lon_max {
            return Err(ClimaError::invalid(
                "lon_bounds",
                format!("lon_min {} must be below lon_max {}", self.lon_min, self.lon_max),
            ));
        }
        if self.lat_min >= self.lat_max {
            return Err(ClimaError::invalid(
                "lat_bounds",
                format!("lat_min {} must be below lat_max {}", self.lat_min, self.lat_max),
            ));
        }
        Ok(())
    }

    /// Integer degree for a longitude: floor inside the domain, toward zero at
    /// or beyond its edge so boundary samples cannot overflow the grid.
    fn lon_degree(&self, lon: f64) -> i64 {
        let inside = match self.kind {
            OrientationKind::Atlantic => lon.abs() < self.lon_max,
            OrientationKind::Pacific => lon > self.lon_min && lon < self.lon_max,
        };
        if inside {
            lon.floor() as i64
        } else {
            lon.trunc() as i64
        }
    }

    fn lat_degree(&self, lat: f64) -> i64 {
        if lat.abs() < self.lat_max {
            lat.floor() as i64
        } else {
            lat.trunc() as i64
        }
    }

    /// `(lat_index, lon_index)` of a sample, `None` when outside the domain
    fn cell_index(&self, lon: f64, lat: f64, nlat: usize, nlon: usize) -> Option<(usize, usize)> {
        if !lon.is_finite() || !lat.is_finite() {
            return None;
        }
        let lon_deg = self.lon_degree(lon);
        let lat_deg = self.lat_degree(lat);
        if lat_deg.abs() as f64 > self.lat_max || (lon_deg as f64) < self.lon_min {
            return None;
        }
        let lat_offset = self.lat_max as i64;
        let (lon_i, lat_i) = match self.kind {
            OrientationKind::Atlantic => (lon_deg + self.lon_max as i64, lat_deg + lat_offset),
            OrientationKind::Pacific => (lon_deg, lat_deg + lat_offset),
        };
        let lon_i = usize::try_from(lon_i).ok().filter(|&i| i < nlon)?;
        let lat_i = usize::try_from(lat_i).ok().filter(|&i| i < nlat)?;
        Some((lat_i, lon_i))
    }
}

/// Grid shape plus its longitude convention
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridSpec {
    pub nlon: usize,
    pub nlat: usize,
    pub orientation: Orientation,
}

impl GridSpec {
    /// Validate a grid of `(nlon, nlat)` cells.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for an empty shape or unordered bounds.
    pub fn new(shape: (usize, usize), orientation: Orientation) -> Result<Self> {
        let (nlon, nlat) = shape;
        if nlon == 0 || nlat == 0 {
            return Err(ClimaError::invalid(
                "grid_shape",
                format!("grid must have at least one cell, got (nlon={nlon}, nlat={nlat})"),
            ));
        }
        orientation.validate()?;
        Ok(Self {
            nlon,
            nlat,
            orientation,
        })
    }

    /// Longitude of every grid column (cell index offset back to degrees)
    #[must_use]
    pub fn lon_axis(&self) -> Vec<f64> {
        let start = match self.orientation.kind {
            OrientationKind::Atlantic => -self.orientation.lon_max,
            OrientationKind::Pacific => 0.0,
        };
        (0..self.nlon).map(|i| start + i as f64).collect()
    }

    /// Latitude of every grid row
    #[must_use]
    pub fn lat_axis(&self) -> Vec<f64> {
        let start = -self.orientation.lat_max.trunc();
        (0..self.nlat).map(|i| start + i as f64).collect()
    }
}

/// One along-track sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub value: f64,
    pub lon: f64,
    pub lat: f64,
}

impl Observation {
    #[must_use]
    pub const fn new(value: f64, lon: f64, lat: f64) -> Self {
        Self { value, lon, lat }
    }
}

/// Result of binning: averaged grid, per-cell counts and the dropped tally
#[derive(Debug, Clone)]
pub struct BinnedGrid {
    /// `(nlat, nlon)` cell means, missing where no sample landed
    pub mean: Masked2,
    /// `(nlat, nlon)` number of samples per cell
    pub counts: Array2<u32>,
    /// Samples outside the domain or with a non-finite value
    pub dropped: usize,
}

impl BinnedGrid {
    /// Total number of binned samples
    pub fn binned(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).sum()
    }
}

/// Bin observations onto the grid described by `spec`.
pub fn bin_observations(observations: &[Observation], spec: &GridSpec) -> BinnedGrid {
    let (nlat, nlon) = (spec.nlat, spec.nlon);
    let mut sums = Array2::<f64>::zeros((nlat, nlon));
    let mut counts = Array2::<u32>::zeros((nlat, nlon));
    let mut dropped = 0_usize;

    for obs in observations {
        if !obs.value.is_finite() {
            dropped += 1;
            continue;
        }
        match spec.orientation.cell_index(obs.lon, obs.lat, nlat, nlon) {
            Some((lat_i, lon_i)) => {
                sums[[lat_i, lon_i]] += obs.value;
                counts[[lat_i, lon_i]] += 1;
            }
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(
            dropped,
            total = observations.len(),
            "dropped samples outside the grid domain"
        );
    }

    let mut valid = Array2::from_elem((nlat, nlon), false);
    ndarray::Zip::from(&mut sums)
        .and(&counts)
        .and(&mut valid)
        .for_each(|s, &c, ok| {
            if c > 0 {
                *s /= f64::from(c);
                *ok = true;
            }
        });

    BinnedGrid {
        mean: Masked2::from_parts(sums, valid),
        counts,
        dropped,
    }
}

/// Bin parallel value/longitude/latitude arrays.
///
/// # Errors
///
/// Returns `ShapeMismatch` if the three arrays differ in length.
pub fn bin_arrays(values: &[f64], lon: &[f64], lat: &[f64], spec: &GridSpec) -> Result<BinnedGrid> {
    if lon.len() != values.len() {
        return Err(ClimaError::shape("lon", values.len(), lon.len()));
    }
    if lat.len() != values.len() {
        return Err(ClimaError::shape("lat", values.len(), lat.len()));
    }
    let observations: Vec<Observation> = values
        .iter()
        .zip(lon)
        .zip(lat)
        .map(|((&value, &lon), &lat)| Observation::new(value, lon, lat))
        .collect();
    Ok(bin_observations(&observations, spec))
}

/// Bin independent batches (e.g. one per daily file) in parallel.
///
/// Each batch owns its output grid, so the batches need no coordination.
pub fn bin_batches(batches: &[Vec<Observation>], spec: &GridSpec) -> Vec<BinnedGrid> {
    debug!(
        batches = batches.len(),
        threads = rayon::current_num_threads(),
        "binning batches"
    );
    batches
        .par_iter()
        .map(|batch| bin_observations(batch, spec))
        .collect()
}
