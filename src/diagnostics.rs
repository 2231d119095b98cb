//! Wave-climate diagnostics built on the gridded series
//!
//! - swell probability from wave age or from an expected-vs-observed wave height
//! - fraction of the ocean whose annual wind phase is anomalous
//! - imposing a land mask on every time slice

use crate::errors::{ClimaError, Result};
use crate::masked::{Masked2, Masked3};
use crate::series::TimeSeries3D;
use crate::statistics::grouping::{group_indices, Grouping};
use crate::statistics::parallel::{cells_to_grid, counts_to_grid};
use crate::statistics::temporal::never_observed;
use ndarray::{Array2, Axis, Zip};
use rayon::prelude::*;
use std::f64::consts::{FRAC_PI_2, PI};
use tracing::{debug, info};

/// Wave age above which a sea state counts as swell
pub const WAVE_AGE_THRESHOLD: f64 = 1.2;

/// What a sample is compared against to classify it as swell
#[derive(Debug, Clone, Copy)]
pub enum SwellReference<'a> {
    /// The sample is a wave age; swell when it exceeds the threshold
    WaveAge { threshold: f64 },
    /// The sample is an expected wave height; swell when it exceeds the
    /// observed wave height at the same time and cell
    ObservedHeight(&'a Masked3),
}

impl Default for SwellReference<'_> {
    fn default() -> Self {
        Self::WaveAge {
            threshold: WAVE_AGE_THRESHOLD,
        }
    }
}

/// Swell and wind-sea probabilities of one group
#[derive(Debug, Clone)]
pub struct SwellProbability {
    pub key: usize,
    /// `N_swell / (N_swell + N_wind)`
    pub p_swell: Masked2,
    pub p_wind: Masked2,
    pub n_swell: Array2<usize>,
    pub n_wind: Array2<usize>,
}

/// Per-cell probability of swell for every group of `grouping`.
///
/// Samples missing in the series, or in the observed height when that is the
/// reference, are not counted. Cells with no counted sample are missing.
///
/// # Errors
///
/// Returns `ShapeMismatch` if the observed height differs in shape from the
/// series and `InvalidConfiguration` for a non-finite wave-age threshold.
pub fn swell_probability(
    series: &TimeSeries3D,
    reference: SwellReference<'_>,
    grouping: Grouping,
) -> Result<Vec<SwellProbability>> {
    let data = series.data();
    match reference {
        SwellReference::ObservedHeight(observed) if observed.shape() != data.shape() => {
            return Err(ClimaError::shape(
                "observed",
                format!("{:?}", data.shape()),
                format!("{:?}", observed.shape()),
            ));
        }
        SwellReference::WaveAge { threshold } if !threshold.is_finite() => {
            return Err(ClimaError::invalid("threshold", format!("threshold must be finite, got {threshold}")));
        }
        _ => {}
    }

    let dim = series.grid_shape();
    let (nlat, nlon) = dim;
    info!(grouping = grouping.as_str(), "computing swell probability");

    let groups = group_indices(&series.months(), grouping)
        .into_iter()
        .map(|group| {
            let counts: Vec<(usize, usize)> = (0..nlat * nlon)
                .into_par_iter()
                .map(|flat_idx| {
                    let (lat, lon) = (flat_idx / nlon, flat_idx % nlon);
                    group.indices.iter().fold((0, 0), |(swell, wind), &t| {
                        let Some(value) = data.get([t, lat, lon]) else {
                            return (swell, wind);
                        };
                        let bound = match reference {
                            SwellReference::WaveAge { threshold } => Some(threshold),
                            SwellReference::ObservedHeight(observed) => observed.get([t, lat, lon]),
                        };
                        match bound {
                            Some(b) if value > b => (swell + 1, wind),
                            Some(_) => (swell, wind + 1),
                            None => (swell, wind),
                        }
                    })
                })
                .collect();

            let p_swell: Vec<Option<f64>> = counts
                .iter()
                .map(|&(s, w)| (s + w > 0).then(|| s as f64 / (s + w) as f64))
                .collect();
            let p_wind: Vec<Option<f64>> = p_swell.iter().map(|p| p.map(|p| 1.0 - p)).collect();
            let (n_swell, n_wind): (Vec<usize>, Vec<usize>) = counts.into_iter().unzip();

            debug!(key = group.key, steps = group.indices.len(), "swell group done");
            SwellProbability {
                key: group.key,
                p_swell: cells_to_grid(dim, &p_swell),
                p_wind: cells_to_grid(dim, &p_wind),
                n_swell: counts_to_grid(dim, &n_swell),
                n_wind: counts_to_grid(dim, &n_wind),
            }
        })
        .collect();

    Ok(groups)
}

/// Ocean basins used to partition the phase histograms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basin {
    NorthPacific,
    NorthAtlantic,
    IndianOcean,
    SouthPacific,
    SouthAtlantic,
}

impl Basin {
    #[must_use]
    pub const fn is_northern(self) -> bool {
        matches!(self, Self::NorthPacific | Self::NorthAtlantic)
    }

    /// Phase interval, in radians, that marks an anomalous annual cycle
    #[must_use]
    pub fn anomalous_window(self) -> (f64, f64) {
        if self.is_northern() {
            (-PI, -FRAC_PI_2)
        } else {
            (0.0, FRAC_PI_2)
        }
    }
}

impl std::str::FromStr for Basin {
    type Err = ClimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace(['-', ' '], "_").as_str() {
            "north_pacific" => Ok(Self::NorthPacific),
            "north_atlantic" => Ok(Self::NorthAtlantic),
            "indian_ocean" => Ok(Self::IndianOcean),
            "south_pacific" => Ok(Self::SouthPacific),
            "south_atlantic" => Ok(Self::SouthAtlantic),
            other => Err(ClimaError::invalid("basin", format!("unknown basin '{other}'"))),
        }
    }
}

/// Histogram counts with `counts.len() + 1` bin edges
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseHistogram {
    counts: Vec<f64>,
    edges: Vec<f64>,
}

impl PhaseHistogram {
    /// # Errors
    ///
    /// Returns `ShapeMismatch` unless there is exactly one more edge than count.
    pub fn new(counts: Vec<f64>, edges: Vec<f64>) -> Result<Self> {
        if edges.len() != counts.len() + 1 {
            return Err(ClimaError::shape("edges", counts.len() + 1, edges.len()));
        }
        Ok(Self { counts, edges })
    }

    /// Histogram the valid cells of a phase grid into `bins` equal bins over `[−π, π]`.
    ///
    /// Bins are half-open except the last, which includes `π`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for zero bins.
    pub fn from_phases(phases: &Masked2, bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(ClimaError::invalid("bins", "at least one bin is required"));
        }
        let width = 2.0 * PI / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| -PI + width * i as f64).collect();
        let mut counts = vec![0.0; bins];
        Zip::from(phases.values())
            .and(phases.valid())
            .for_each(|&phase, &ok| {
                if ok && (-PI..=PI).contains(&phase) {
                    let bin = (((phase + PI) / width) as usize).min(bins - 1);
                    counts[bin] += 1.0;
                }
            });
        Ok(Self { counts, edges })
    }

    pub fn counts(&self) -> &[f64] {
        &self.counts
    }

    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    pub fn total(&self) -> f64 {
        self.counts.iter().sum()
    }

    /// Counts of bins whose left edge lies in `[lo, hi]`
    fn counts_in(&self, (lo, hi): (f64, f64)) -> f64 {
        self.counts
            .iter()
            .zip(&self.edges)
            .filter(|&(_, &edge)| edge >= lo && edge <= hi)
            .map(|(c, _)| c)
            .sum()
    }
}

/// Phase histogram of one basin
#[derive(Debug, Clone)]
pub struct RegionHistogram {
    pub basin: Basin,
    pub histogram: PhaseHistogram,
}

/// Fraction of the global ocean whose annual phase is anomalous.
///
/// Each basin contributes the counts falling in its anomalous window; the sum
/// is divided by the total count of the `global` histogram.
///
/// # Errors
///
/// Returns `InsufficientObservations` when the global histogram is empty.
pub fn phase_fraction(regions: &[RegionHistogram], global: &PhaseHistogram) -> Result<f64> {
    let total = global.total();
    if total <= 0.0 {
        return Err(ClimaError::InsufficientObservations {
            context: "global phase histogram holds no counts".to_string(),
        });
    }
    let anomalous: f64 = regions
        .iter()
        .map(|r| {
            let count = r.histogram.counts_in(r.basin.anomalous_window());
            debug!(basin = ?r.basin, count, "anomalous phase count");
            count
        })
        .sum();
    Ok(anomalous / total)
}

/// Cells never observed over the record (`true` = never observed)
#[must_use]
pub fn reference_mask(series: &TimeSeries3D) -> Array2<bool> {
    never_observed(series.data())
}

/// Mark `land` cells (`true` = land) missing in every time slice.
///
/// Ocean cells keep their own validity.
///
/// # Errors
///
/// Returns `ShapeMismatch` if `land` differs from the grid shape.
pub fn apply_land_mask(data: &Masked3, land: &Array2<bool>) -> Result<Masked3> {
    let shape = data.shape();
    if land.dim() != (shape[1], shape[2]) {
        return Err(ClimaError::shape(
            "land",
            format!("({}, {})", shape[1], shape[2]),
            format!("{:?}", land.dim()),
        ));
    }
    let mut valid = data.valid().clone();
    for mut slice in valid.axis_iter_mut(Axis(0)) {
        Zip::from(&mut slice).and(land).for_each(|ok, &is_land| {
            if is_land {
                *ok = false;
            }
        });
    }
    Ok(Masked3::from_parts(data.values().clone(), valid))
}
