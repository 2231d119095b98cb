//! Unweighted least squares solve
//!
//! Missing samples are replaced once by the mean of the valid samples, then the
//! normal equations `x = (AᵗA)⁻¹ Aᵗ b` are solved in a single pass. A normal
//! matrix that cannot be inverted is an error, never a silent `NaN` result.

use super::basis::BasisSpec;
use crate::errors::{ClimaError, Result};
use crate::masked::{Masked1, Masked2, Masked3, MissingConvention};
use crate::statistics::parallel::cells_to_grid;
use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use rayon::prelude::*;
use tracing::{debug, info};

/// Pre-factored solver for one basis, series length and period.
///
/// The projector `(AᵗA)⁻¹ Aᵗ` depends only on these three, so one solver can
/// fit any number of series of the same length.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    basis: BasisSpec,
    period: f64,
    design: DMatrix<f64>,
    projector: DMatrix<f64>,
}

impl LeastSquares {
    /// Build the design matrix and factor the normal equations.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a bad period, `ShapeMismatch` for an
    /// empty series and `DesignMatrixSingular` when `AᵗA` is not invertible,
    /// including whenever there are fewer samples than parameters.
    pub fn new(basis: BasisSpec, n: usize, period: f64) -> Result<Self> {
        basis.validate_period(period)?;
        if n == 0 {
            return Err(ClimaError::shape("series", "at least one sample", 0));
        }
        let p = basis.parameters();
        let singular = ClimaError::DesignMatrixSingular {
            parameters: p,
            observations: n,
        };
        if n < p {
            return Err(singular);
        }

        let design = basis.design_matrix(n, period);
        let normal = design.transpose() * &design;

        let sv = normal.clone().svd(false, false).singular_values;
        let largest = sv.iter().copied().fold(0.0_f64, f64::max);
        let smallest = sv.iter().copied().fold(f64::INFINITY, f64::min);
        if !(smallest > largest * p as f64 * f64::EPSILON) {
            debug!(largest, smallest, basis = basis.as_str(), "normal matrix is rank deficient");
            return Err(singular);
        }

        let inverse = normal.try_inverse().ok_or(singular)?;
        let projector = inverse * design.transpose();

        Ok(Self {
            basis,
            period,
            design,
            projector,
        })
    }

    pub fn basis(&self) -> BasisSpec {
        self.basis
    }

    pub fn period(&self) -> f64 {
        self.period
    }

    /// Number of samples the solver was built for
    pub fn len(&self) -> usize {
        self.design.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.design.nrows() == 0
    }

    /// Coefficients and fitted values for a gap-free series
    fn solve(&self, data: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let b = DVector::from_column_slice(data);
        let x = &self.projector * b;
        let fitted = &self.design * &x;
        (x.iter().copied().collect(), fitted.iter().copied().collect())
    }

    /// Fit one series with missing entries.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the series length differs from the solver's
    /// and `InsufficientObservations` if no sample is valid.
    pub fn fit(&self, series: &[Option<f64>]) -> Result<HarmonicFit> {
        if series.len() != self.len() {
            return Err(ClimaError::shape("series", self.len(), series.len()));
        }
        let (filled, fill_value) = gap_fill(series)?;
        let (coefficients, fitted) = self.solve(&filled);
        Ok(HarmonicFit {
            basis: self.basis,
            period: self.period,
            coefficients,
            fitted,
            fill_value,
        })
    }
}

/// Replace missing samples with the mean of the valid ones.
///
/// A non-finite sample counts as missing even when wrapped in `Some`.
fn gap_fill(series: &[Option<f64>]) -> Result<(Vec<f64>, f64)> {
    let (sum, n) = series
        .iter()
        .flatten()
        .filter(|v| v.is_finite())
        .fold((0.0, 0_usize), |(sum, n), &v| (sum + v, n + 1));
    if n == 0 {
        return Err(ClimaError::InsufficientObservations {
            context: format!("all {} samples of the series are missing", series.len()),
        });
    }
    let mean = sum / n as f64;
    let filled = series
        .iter()
        .map(|s| s.filter(|v| v.is_finite()).unwrap_or(mean))
        .collect();
    Ok((filled, mean))
}

/// Result of one least squares fit
#[derive(Debug, Clone, PartialEq)]
pub struct HarmonicFit {
    pub basis: BasisSpec,
    pub period: f64,
    /// One coefficient per design-matrix column, in column order
    pub coefficients: Vec<f64>,
    /// Model evaluated at `t = 1..=N`
    pub fitted: Vec<f64>,
    /// Value substituted for missing samples before the solve
    pub fill_value: f64,
}

/// Fit `series` with `basis`.
///
/// # Errors
///
/// See [`LeastSquares::new`] and [`LeastSquares::fit`].
pub fn fit(series: &[Option<f64>], basis: BasisSpec, period: f64) -> Result<HarmonicFit> {
    LeastSquares::new(basis, series.len(), period)?.fit(series)
}

/// Fit a masked series.
///
/// # Errors
///
/// See [`fit`].
pub fn fit_masked(series: &Masked1, basis: BasisSpec, period: f64) -> Result<HarmonicFit> {
    fit(&series.to_options(), basis, period)
}

/// Fit raw values whose missing entries follow `convention`.
///
/// # Errors
///
/// See [`Masked::from_convention`](crate::masked::Masked::from_convention) and [`fit`].
pub fn fit_raw(
    values: &[f64],
    mask: Option<&[bool]>,
    convention: MissingConvention,
    basis: BasisSpec,
    period: f64,
) -> Result<HarmonicFit> {
    let mask = mask.map(|m| Array1::from_vec(m.to_vec()));
    let series = Masked1::from_convention(Array1::from_vec(values.to_vec()), mask.as_ref(), convention)?;
    fit_masked(&series, basis, period)
}

/// Per-cell fit of a `(time, lat, lon)` series
#[derive(Debug, Clone)]
pub struct GridFit {
    pub basis: BasisSpec,
    pub period: f64,
    /// One `(lat, lon)` grid per coefficient; cells never observed are missing
    pub coefficients: Vec<Masked2>,
}

impl GridFit {
    /// Coefficient grid `index`
    #[must_use]
    pub fn coefficient(&self, index: usize) -> Option<&Masked2> {
        self.coefficients.get(index)
    }
}

/// Fit every cell's time series independently, in parallel.
///
/// All cells share the design matrix, so it is factored once up front.
///
/// # Errors
///
/// See [`LeastSquares::new`].
pub fn fit_grid(data: &Masked3, basis: BasisSpec, period: f64) -> Result<GridFit> {
    let shape = data.shape();
    let (ntime, nlat, nlon) = (shape[0], shape[1], shape[2]);
    let solver = LeastSquares::new(basis, ntime, period)?;

    info!(
        basis = basis.as_str(),
        cells = nlat * nlon,
        steps = ntime,
        "fitting harmonic model per cell"
    );

    let cells: Vec<Option<Vec<f64>>> = (0..nlat * nlon)
        .into_par_iter()
        .map(|flat_idx| {
            let series = data.cell_series(flat_idx / nlon, flat_idx % nlon).to_options();
            match solver.fit(&series) {
                Ok(f) => Ok(Some(f.coefficients)),
                Err(e) if e.is_missing_data() => Ok(None),
                Err(e) => Err(e),
            }
        })
        .collect::<Result<_>>()?;

    let coefficients = (0..basis.parameters())
        .map(|k| {
            let grid: Vec<Option<f64>> = cells
                .iter()
                .map(|c| c.as_ref().map(|coefs| coefs[k]))
                .collect();
            cells_to_grid((nlat, nlon), &grid)
        })
        .collect();

    Ok(GridFit {
        basis,
        period,
        coefficients,
    })
}
