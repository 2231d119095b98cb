//! ocean_clima: gridding and climatology of ocean remote-sensing observations
//!
//! Turns along-track samples (significant wave height, wind speed, wave age)
//! into regular longitude/latitude grids and extracts climatological statistics
//! from the gridded series: grouped temporal moments, harmonic least squares
//! fits, regional monthly cycles and swell diagnostics.
//!
//! ## Key Features
//!
//! - **Explicit missing data**: every grid carries a validity array; empty cells
//!   propagate as missing through every statistic, never as zero
//! - **Parallel Processing**: per-cell reductions and fits run on Rayon
//! - **Loud numerical failures**: a singular least squares system is an error,
//!   distinct from "no data"
//!
//! ## Module Organization
//!
//! - [`masked`]: masked arrays and the `NaN`/mask missing-value conventions
//! - [`series`]: `(time, lat, lon)` series with a validated time axis
//! - [`binning`]: along-track samples to a regular grid
//! - [`shift`]: circular longitude shifts between grid conventions
//! - [`statistics`]: grouped temporal moments, monthly averages, climatologies
//! - [`harmonic`]: unweighted harmonic least squares and fit characteristics
//! - [`regional`]: regional monthly climatology of a grid box
//! - [`smoothing`]: box-car running mean and block downsampling
//! - [`diagnostics`]: swell probability, phase fraction, land masking
//! - [`config`]: named configuration records
//! - [`netcdf_io`]: reading series from and writing results to NetCDF
//! - [`parallel`]: thread-pool configuration
//! - [`errors`]: centralized error handling
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ocean_clima::prelude::*;
//!
//! let spec = GridSpec::new((360, 133), Orientation::atlantic(66.0)).unwrap();
//! let binned = bin_observations(&[Observation::new(1.5, -30.2, 10.7)], &spec);
//! assert_eq!(binned.binned(), 1);
//!
//! let fit = fit(&[Some(1.0), None, Some(1.0)], BasisSpec::Mean, MONTHLY_PERIOD).unwrap();
//! assert_eq!(fit.coefficients.len(), 1);
//! ```

pub mod binning;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod harmonic;
pub mod masked;
pub mod netcdf_io;
pub mod parallel;
pub mod regional;
pub mod series;
pub mod shift;
pub mod smoothing;
pub mod statistics;

pub use errors::{ClimaError, Result};

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::binning::{bin_arrays, bin_observations, BinnedGrid, GridSpec, Observation, Orientation, OrientationKind};
    pub use crate::config::ClimaConfig;
    pub use crate::errors::{ClimaError, Result};
    pub use crate::harmonic::{characterize, fit, fit_grid, BasisSpec, HarmonicFit, DAILY_PERIOD, MONTHLY_PERIOD};
    pub use crate::masked::{Masked1, Masked2, Masked3, MissingConvention};
    pub use crate::parallel::ParallelConfig;
    pub use crate::regional::{regional_climatology, Hemisphere, RegionBox, Side};
    pub use crate::series::TimeSeries3D;
    pub use crate::shift::shift_longitude;
    pub use crate::smoothing::{smooth, BoxKernel, SmoothMode};
    pub use crate::statistics::{reduce, Grouping, MonthlyAggregate};
}
