//! Regional climatology of a grid box
//!
//! Averages monthly (or seasonal) mean and variance fields over a square box of
//! cells, derives the standard error of the mean and fits a mean, annual and
//! semiannual harmonic model to the 12-month regional cycle.

use crate::errors::{ClimaError, Result};
use crate::harmonic::{fit, BasisSpec, HarmonicFit, MONTHLY_PERIOD};
use crate::masked::{Masked1, Masked3};
use crate::statistics::Season;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Months in a regional cycle
pub const MONTHS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Hemisphere {
    /// Northern
    Nh,
    /// Southern; output is reordered to start in July
    Sh,
}

/// Side of the prime meridian the box lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    East,
    West,
}

impl Side {
    /// Longitude subtracted from the axis when reporting box bounds
    #[must_use]
    pub const fn reference_longitude(self) -> f64 {
        match self {
            Self::East => 0.0,
            Self::West => 360.0,
        }
    }
}

impl std::str::FromStr for Hemisphere {
    type Err = ClimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nh" | "north" => Ok(Self::Nh),
            "sh" | "south" => Ok(Self::Sh),
            other => Err(ClimaError::invalid("hemisphere", format!("unknown hemisphere '{other}'"))),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = ClimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "east" => Ok(Self::East),
            "west" => Ok(Self::West),
            other => Err(ClimaError::invalid("side", format!("unknown side '{other}'"))),
        }
    }
}

/// Square box of `size × size` cells starting at `(lat_index, lon_index)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionBox {
    pub lat_index: usize,
    pub lon_index: usize,
    pub size: usize,
}

/// Coordinates of the first and last row and column of a box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoxBounds {
    pub lat_start: f64,
    pub lat_end: f64,
    pub lon_start: f64,
    pub lon_end: f64,
}

#[derive(Debug, Clone)]
pub struct RegionalSeries {
    pub mean: Masked1,
    /// Standard error of the mean, `sqrt(variance / dof)`
    pub stdm: Masked1,
    pub fitted: Vec<f64>,
    /// `fitted − mean`, missing where the mean is missing
    pub residual: Masked1,
    pub fit: HarmonicFit,
    pub bounds: BoxBounds,
}

/// Compute the regional climatology of `region`.
///
/// `mean` and `variance` are `(group, lat, lon)` fields with either 12 monthly
/// or 4 seasonal groups; seasonal groups are spread over their three months.
///
/// # Errors
///
/// Returns `ShapeMismatch` for mismatched fields or axes and for a box that
/// leaves the grid, `InvalidConfiguration` for a zero `dof`, and the fit errors
/// of [`fit`] when the regional cycle has no valid month.
#[allow(clippy::too_many_arguments)]
pub fn regional_climatology(
    mean: &Masked3,
    variance: &Masked3,
    lon: &[f64],
    lat: &[f64],
    region: RegionBox,
    dof: usize,
    hemisphere: Hemisphere,
    side: Side,
) -> Result<RegionalSeries> {
    validate(mean, variance, lon, lat, region)?;
    if dof == 0 {
        return Err(ClimaError::invalid("dof", "degrees of freedom must be positive"));
    }

    let bounds = BoxBounds {
        lat_start: lat[region.lat_index],
        lat_end: lat[region.lat_index + region.size - 1],
        lon_start: lon[region.lon_index] - side.reference_longitude(),
        lon_end: lon[region.lon_index + region.size - 1] - side.reference_longitude(),
    };
    info!(?region, ?hemisphere, ?side, "computing regional climatology");

    let mut reg_mean = to_months(&box_average(mean, region));
    let reg_var = to_months(&box_average(variance, region));
    let mut stdm: Vec<Option<f64>> = reg_var
        .iter()
        .map(|v| v.map(|v| (v / dof as f64).sqrt()))
        .collect();

    let harmonic = fit(&reg_mean, BasisSpec::MeanAnnualSemiannual, MONTHLY_PERIOD)?;
    let mut fitted = harmonic.fitted.clone();
    let mut residual: Vec<Option<f64>> = reg_mean
        .iter()
        .zip(&fitted)
        .map(|(m, f)| m.map(|m| f - m))
        .collect();

    if hemisphere == Hemisphere::Sh {
        debug!("reordering southern hemisphere cycle to start in July");
        reg_mean.rotate_left(MONTHS / 2);
        stdm.rotate_left(MONTHS / 2);
        fitted.rotate_left(MONTHS / 2);
        residual.rotate_left(MONTHS / 2);
    }

    Ok(RegionalSeries {
        mean: Masked1::from_options(&reg_mean),
        stdm: Masked1::from_options(&stdm),
        fitted,
        residual: Masked1::from_options(&residual),
        fit: harmonic,
        bounds,
    })
}

fn validate(mean: &Masked3, variance: &Masked3, lon: &[f64], lat: &[f64], region: RegionBox) -> Result<()> {
    let shape = mean.shape();
    if variance.shape() != shape {
        return Err(ClimaError::shape(
            "variance",
            format!("{shape:?}"),
            format!("{:?}", variance.shape()),
        ));
    }
    let (ngroups, nlat, nlon) = (shape[0], shape[1], shape[2]);
    if ngroups != MONTHS && ngroups != Season::ALL.len() {
        return Err(ClimaError::shape("mean", "12 monthly or 4 seasonal groups", ngroups));
    }
    if lat.len() != nlat {
        return Err(ClimaError::shape("lat", nlat, lat.len()));
    }
    if lon.len() != nlon {
        return Err(ClimaError::shape("lon", nlon, lon.len()));
    }
    if region.size == 0 {
        return Err(ClimaError::shape("box_size", "at least 1", 0));
    }
    let leaves = |start: usize, len: usize| start.checked_add(region.size).map_or(true, |end| end > len);
    if leaves(region.lat_index, nlat) || leaves(region.lon_index, nlon) {
        return Err(ClimaError::shape(
            "box_size",
            format!("a box inside ({nlat}, {nlon})"),
            format!(
                "{} cells from row {} and column {}",
                region.size, region.lat_index, region.lon_index
            ),
        ));
    }
    Ok(())
}

/// Mean over latitude, then over longitude, of every group inside the box
fn box_average(field: &Masked3, region: RegionBox) -> Vec<Option<f64>> {
    let lats = region.lat_index..region.lat_index + region.size;
    let lons = region.lon_index..region.lon_index + region.size;

    (0..field.shape()[0])
        .map(|g| {
            let columns: Vec<f64> = lons
                .clone()
                .filter_map(|j| {
                    let column: Vec<f64> = lats.clone().filter_map(|i| field.get([g, i, j])).collect();
                    mean_of(&column)
                })
                .collect();
            mean_of(&columns)
        })
        .collect()
}

fn mean_of(samples: &[f64]) -> Option<f64> {
    (!samples.is_empty()).then(|| samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Spread a 4-season cycle over its months; a 12-month cycle passes through
fn to_months(groups: &[Option<f64>]) -> Vec<Option<f64>> {
    if groups.len() == MONTHS {
        return groups.to_vec();
    }
    (1..=MONTHS as u32)
        .map(|month| groups[Season::of_month(month).index()])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seasons_spread_over_their_months() {
        let months = to_months(&[Some(0.0), Some(1.0), Some(2.0), Some(3.0)]);
        assert_eq!(months[0], Some(0.0));
        assert_eq!(months[11], Some(0.0));
        assert_eq!(months[4], Some(1.0));
        assert_eq!(months[7], Some(2.0));
        assert_eq!(months[9], Some(3.0));
    }
}
