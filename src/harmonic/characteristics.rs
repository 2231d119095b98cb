//! Quantities derived from a fit: harmonic amplitude and phase, residual,
//! root-mean-square error and coefficient of determination.

use super::basis::{BasisSpec, MONTHLY_PERIOD};
use super::fit::{fit_masked, HarmonicFit};
use crate::errors::{ClimaError, Result};
use crate::masked::Masked1;

/// Amplitude and phase of one sinusoidal term.
///
/// With sine coefficient `s` and cosine coefficient `c` the term equals
/// `amplitude·cos(ωt − phase)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicComponent {
    pub amplitude: f64,
    /// Radians in `(−π, π]`
    pub phase: f64,
}

impl HarmonicComponent {
    #[must_use]
    pub fn from_coefficients(sin_coef: f64, cos_coef: f64) -> Self {
        Self {
            amplitude: sin_coef.hypot(cos_coef),
            phase: sin_coef.atan2(cos_coef),
        }
    }
}

/// Annual and semiannual components of a coefficient vector, where present
#[must_use]
pub fn components(
    basis: BasisSpec,
    coefficients: &[f64],
) -> (Option<HarmonicComponent>, Option<HarmonicComponent>) {
    let pick = |index: Option<usize>| {
        let i = index?;
        Some(HarmonicComponent::from_coefficients(
            *coefficients.get(i)?,
            *coefficients.get(i + 1)?,
        ))
    };
    (pick(basis.annual_index()), pick(basis.semiannual_index()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct FitCharacteristics {
    /// `data − fitted`, missing where the data is missing
    pub residual: Vec<Option<f64>>,
    pub rms: f64,
    pub annual: Option<HarmonicComponent>,
    pub semiannual: Option<HarmonicComponent>,
    /// `1 − SS_res/SS_tot`; `None` for a constant series
    pub cod: Option<f64>,
}

/// Describe how well `fit` matches `data`, using the valid samples only.
///
/// Non-finite samples are treated as missing.
///
/// # Errors
///
/// Returns `ShapeMismatch` if `data` and the fit differ in length and
/// `InsufficientObservations` if no sample is valid.
pub fn characterize(data: &[Option<f64>], fit: &HarmonicFit) -> Result<FitCharacteristics> {
    if data.len() != fit.fitted.len() {
        return Err(ClimaError::shape("data", fit.fitted.len(), data.len()));
    }

    let data: Vec<Option<f64>> = data.iter().map(|d| d.filter(|v| v.is_finite())).collect();
    let residual: Vec<Option<f64>> = data
        .iter()
        .zip(&fit.fitted)
        .map(|(d, m)| d.map(|d| d - m))
        .collect();

    let observed: Vec<f64> = data.iter().flatten().copied().collect();
    if observed.is_empty() {
        return Err(ClimaError::InsufficientObservations {
            context: "no valid samples to characterize the fit".to_string(),
        });
    }
    let n = observed.len() as f64;
    let mean = observed.iter().sum::<f64>() / n;

    let ss_res: f64 = residual.iter().flatten().map(|r| r * r).sum();
    let ss_tot: f64 = observed.iter().map(|x| (x - mean).powi(2)).sum();

    let (annual, semiannual) = components(fit.basis, &fit.coefficients);

    Ok(FitCharacteristics {
        rms: (ss_res / n).sqrt(),
        cod: (ss_tot > 0.0).then(|| 1.0 - ss_res / ss_tot),
        residual,
        annual,
        semiannual,
    })
}

/// Remove the linear trend `slope·t` (`t = 1..N`) from a series.
///
/// The intercept is kept so the detrended series retains its level.
///
/// # Errors
///
/// See [`fit_masked`].
pub fn detrend(series: &Masked1) -> Result<Masked1> {
    let fit = fit_masked(series, BasisSpec::MeanLinear, MONTHLY_PERIOD)?;
    let slope = fit.coefficients[1];
    let detrended: Vec<Option<f64>> = series
        .to_options()
        .into_iter()
        .enumerate()
        .map(|(i, v)| v.map(|v| v - slope * (i + 1) as f64))
        .collect();
    Ok(Masked1::from_options(&detrended))
}
