//! Temporal reductions of gridded series
//!
//! This module reduces `(time, lat, lon)` masked series along the time axis.
//!
//! # Organization
//!
//! - [`grouping`]: calendar month, season and year-month partitions of the time axis
//! - [`moments`]: grouped mean, median, variance, skewness and kurtosis
//! - [`temporal`]: whole-record means, per-year monthly averages, climatologies
//! - [`parallel`]: rayon driver shared by the per-cell reductions

pub mod grouping;
pub mod moments;
pub mod parallel;
pub mod temporal;

pub use grouping::{Grouping, Season};
pub use moments::{reduce, require_observations, GroupStatistics, Moments, MonthlyAggregate};
pub use temporal::{climatology, monthly_average, never_observed, time_mean, MonthlyMean};
