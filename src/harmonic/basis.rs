//! Model bases for the least squares fit
//!
//! Design-matrix columns appear in a fixed order, taking only those the basis
//! needs: constant `1`, time index `t = 1..N`, annual `sin(2πt/P)`,
//! `cos(2πt/P)`, semiannual `sin(2πt/(P/2))`, `cos(2πt/(P/2))`.

use crate::errors::{ClimaError, Result};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Annual period of a monthly series
pub const MONTHLY_PERIOD: f64 = 12.0;
/// Annual period of a daily series
pub const DAILY_PERIOD: f64 = 365.25;

/// Family of the fitted function, as used by [`BasisSpec::from_trend`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Linear,
    Exponential,
    Sinusoidal,
}

impl std::str::FromStr for Trend {
    type Err = ClimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "linear" => Ok(Self::Linear),
            "exponential" => Ok(Self::Exponential),
            "sinusoidal" => Ok(Self::Sinusoidal),
            other => Err(ClimaError::invalid(
                "trend",
                format!("unknown trend '{other}', expected linear, exponential or sinusoidal"),
            )),
        }
    }
}

/// Which terms the model contains
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BasisSpec {
    /// `c`
    Mean,
    /// `c + b·t`
    MeanLinear,
    /// `ln y = c + b·t`; the caller takes logarithms before and exponentiates after
    Exponential,
    /// `c + annual`
    MeanAnnual,
    /// `c + b·t + annual`
    MeanLinearAnnual,
    /// `c + annual + semiannual`
    MeanAnnualSemiannual,
    /// `c + b·t + annual + semiannual`
    MeanLinearAnnualSemiannual,
}

impl BasisSpec {
    /// Resolve a trend family and parameter count.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for combinations that do not exist, such
    /// as a 3-parameter linear model.
    pub fn from_trend(trend: Trend, parameters: usize) -> Result<Self> {
        match (trend, parameters) {
            (Trend::Linear, 1) => Ok(Self::Mean),
            (Trend::Linear, 2) => Ok(Self::MeanLinear),
            (Trend::Exponential, 2) => Ok(Self::Exponential),
            (Trend::Sinusoidal, 3) => Ok(Self::MeanAnnual),
            (Trend::Sinusoidal, 4) => Ok(Self::MeanLinearAnnual),
            (Trend::Sinusoidal, 5) => Ok(Self::MeanAnnualSemiannual),
            (Trend::Sinusoidal, 6) => Ok(Self::MeanLinearAnnualSemiannual),
            (trend, parameters) => Err(ClimaError::invalid(
                "parameters",
                format!("{parameters} parameters are not supported for a {trend:?} model"),
            )),
        }
    }

    /// Number of coefficients
    #[must_use]
    pub const fn parameters(self) -> usize {
        match self {
            Self::Mean => 1,
            Self::MeanLinear | Self::Exponential => 2,
            Self::MeanAnnual => 3,
            Self::MeanLinearAnnual => 4,
            Self::MeanAnnualSemiannual => 5,
            Self::MeanLinearAnnualSemiannual => 6,
        }
    }

    /// Index of the time-index coefficient
    #[must_use]
    pub const fn linear_index(self) -> Option<usize> {
        match self {
            Self::MeanLinear
            | Self::Exponential
            | Self::MeanLinearAnnual
            | Self::MeanLinearAnnualSemiannual => Some(1),
            Self::Mean | Self::MeanAnnual | Self::MeanAnnualSemiannual => None,
        }
    }

    /// Index of the annual sine coefficient; the cosine follows it
    #[must_use]
    pub const fn annual_index(self) -> Option<usize> {
        match self {
            Self::MeanAnnual | Self::MeanAnnualSemiannual => Some(1),
            Self::MeanLinearAnnual | Self::MeanLinearAnnualSemiannual => Some(2),
            Self::Mean | Self::MeanLinear | Self::Exponential => None,
        }
    }

    /// Index of the semiannual sine coefficient; the cosine follows it
    #[must_use]
    pub const fn semiannual_index(self) -> Option<usize> {
        match self {
            Self::MeanAnnualSemiannual => Some(3),
            Self::MeanLinearAnnualSemiannual => Some(4),
            _ => None,
        }
    }

    /// True when the basis has periodic terms and so needs a period
    #[must_use]
    pub const fn is_periodic(self) -> bool {
        self.annual_index().is_some()
    }

    /// Check that `period` is usable with this basis.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a non-finite or non-positive period
    /// on a periodic basis.
    pub fn validate_period(self, period: f64) -> Result<()> {
        if self.is_periodic() && !(period.is_finite() && period > 0.0) {
            return Err(ClimaError::invalid(
                "period",
                format!("period must be finite and positive, got {period}"),
            ));
        }
        Ok(())
    }

    /// Design-matrix row for time index `t`
    #[must_use]
    pub fn row(self, t: f64, period: f64) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.parameters());
        row.push(1.0);
        if self.linear_index().is_some() {
            row.push(t);
        }
        if self.annual_index().is_some() {
            let w = 2.0 * PI * t / period;
            row.push(w.sin());
            row.push(w.cos());
        }
        if self.semiannual_index().is_some() {
            let w = 2.0 * PI * t / (period / 2.0);
            row.push(w.sin());
            row.push(w.cos());
        }
        row
    }

    /// `N × parameters` design matrix for `t = 1..=N`
    #[must_use]
    pub fn design_matrix(self, n: usize, period: f64) -> DMatrix<f64> {
        let p = self.parameters();
        let mut a = DMatrix::zeros(n, p);
        for i in 0..n {
            let row = self.row((i + 1) as f64, period);
            for (j, v) in row.into_iter().enumerate() {
                a[(i, j)] = v;
            }
        }
        a
    }

    /// Evaluate the model with `coefficients` at time index `t`
    #[must_use]
    pub fn evaluate(self, coefficients: &[f64], t: f64, period: f64) -> f64 {
        self.row(t, period)
            .iter()
            .zip(coefficients)
            .map(|(a, x)| a * x)
            .sum()
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::MeanLinear => "mean-linear",
            Self::Exponential => "exponential",
            Self::MeanAnnual => "mean-annual",
            Self::MeanLinearAnnual => "mean-linear-annual",
            Self::MeanAnnualSemiannual => "mean-annual-semiannual",
            Self::MeanLinearAnnualSemiannual => "mean-linear-annual-semiannual",
        }
    }
}

impl std::str::FromStr for BasisSpec {
    type Err = ClimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(Self::Mean),
            "mean-linear" | "linear" => Ok(Self::MeanLinear),
            "exponential" => Ok(Self::Exponential),
            "mean-annual" | "annual" => Ok(Self::MeanAnnual),
            "mean-linear-annual" => Ok(Self::MeanLinearAnnual),
            "mean-annual-semiannual" | "semiannual" => Ok(Self::MeanAnnualSemiannual),
            "mean-linear-annual-semiannual" | "full" => Ok(Self::MeanLinearAnnualSemiannual),
            other => Err(ClimaError::invalid(
                "basis",
                format!("unknown basis '{other}'"),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_follow_column_order() {
        let row = BasisSpec::MeanLinearAnnualSemiannual.row(3.0, 12.0);
        assert_eq!(row.len(), 6);
        assert_eq!(row[0], 1.0);
        assert_eq!(row[1], 3.0);
        assert!((row[2] - 1.0).abs() < 1e-12);
        assert!(row[3].abs() < 1e-12);
        assert!(row[4].abs() < 1e-12);
        assert!((row[5] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn parameter_counts_match_trend_table() {
        assert!(BasisSpec::from_trend(Trend::Linear, 3).is_err());
        assert!(BasisSpec::from_trend(Trend::Exponential, 1).is_err());
        for p in 3..=6 {
            let basis = BasisSpec::from_trend(Trend::Sinusoidal, p).unwrap();
            assert_eq!(basis.parameters(), p);
            assert_eq!(basis.row(1.0, 12.0).len(), p);
        }
    }
}
