//! Unweighted harmonic least squares
//!
//! - [`basis`]: model terms and the design matrix
//! - [`fit`]: the normal-equation solve, single series or per grid cell
//! - [`characteristics`]: amplitude, phase, rms and goodness of fit

pub mod basis;
pub mod characteristics;
pub mod fit;

pub use basis::{BasisSpec, Trend, DAILY_PERIOD, MONTHLY_PERIOD};
pub use characteristics::{characterize, components, detrend, FitCharacteristics, HarmonicComponent};
pub use fit::{fit, fit_grid, fit_masked, fit_raw, GridFit, HarmonicFit, LeastSquares};
