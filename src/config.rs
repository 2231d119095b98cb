//! Named configuration records
//!
//! Dataset location, grid definition and year range are read from a JSON file
//! instead of being hard-coded. Every field has a default matching the 1°
//! altimeter product, so a file only needs the fields it changes.

use crate::binning::{GridSpec, Orientation, OrientationKind};
use crate::errors::{ClimaError, Result};
use crate::masked::MissingConvention;
use crate::parallel::ParallelConfig;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClimaConfig {
    pub dataset_root: PathBuf,
    pub grid: GridConfig,
    pub years: YearRange,
    pub missing: MissingConvention,
    /// Worker threads; `None` uses one per core
    pub threads: Option<usize>,
}

impl Default for ClimaConfig {
    fn default() -> Self {
        Self {
            dataset_root: PathBuf::from("."),
            grid: GridConfig::default(),
            years: YearRange::default(),
            missing: MissingConvention::Nan,
            threads: None,
        }
    }
}

impl ClimaConfig {
    /// Load and validate a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns `Io` or `ConfigParse` if the file cannot be read, and
    /// `InvalidConfiguration` if a value is out of range.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading configuration");
        let config: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.validate()?;
        Ok(config)
    }

    /// # Errors
    ///
    /// Returns `InvalidConfiguration` naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        self.grid.grid_spec()?;
        self.years.validate()?;
        if self.threads == Some(0) {
            return Err(ClimaError::invalid("threads", "thread count must be positive"));
        }
        Ok(())
    }

    /// Path of a dataset file relative to the dataset root
    #[must_use]
    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.dataset_root.join(name)
    }

    #[must_use]
    pub fn parallel(&self) -> ParallelConfig {
        ParallelConfig::new(self.threads)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub orientation: OrientationKind,
    /// `[lon_min, lon_max]` in degrees
    pub lon_bounds: [f64; 2],
    /// `[lat_min, lat_max]` in degrees
    pub lat_bounds: [f64; 2],
    /// Cell size in degrees
    pub resolution: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            orientation: OrientationKind::Atlantic,
            lon_bounds: [-180.0, 179.0],
            lat_bounds: [-66.0, 66.0],
            resolution: 1.0,
        }
    }
}

impl GridConfig {
    /// Grid shape `(nlon, nlat)` covering both bounds inclusively
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a non-positive resolution.
    pub fn shape(&self) -> Result<(usize, usize)> {
        if !(self.resolution.is_finite() && self.resolution > 0.0) {
            return Err(ClimaError::invalid(
                "resolution",
                format!("resolution must be positive, got {}", self.resolution),
            ));
        }
        let cells = |[lo, hi]: [f64; 2]| ((hi - lo) / self.resolution).round() as usize + 1;
        Ok((cells(self.lon_bounds), cells(self.lat_bounds)))
    }

    /// Validated binning grid.
    ///
    /// Binning indexes whole degrees, so only a 1° resolution is accepted.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a resolution other than 1°, or for
    /// unordered or non-finite bounds.
    pub fn grid_spec(&self) -> Result<GridSpec> {
        let shape = self.shape()?;
        if self.resolution != 1.0 {
            return Err(ClimaError::invalid(
                "resolution",
                format!("binning requires a 1 degree grid, got {}", self.resolution),
            ));
        }
        let orientation = Orientation {
            kind: self.orientation,
            lon_min: self.lon_bounds[0],
            lon_max: self.lon_bounds[1],
            lat_min: self.lat_bounds[0],
            lat_max: self.lat_bounds[1],
        };
        GridSpec::new(shape, orientation)
    }
}

/// Inclusive range of years
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: 1993,
            end: 2016,
        }
    }
}

impl YearRange {
    fn validate(&self) -> Result<()> {
        if self.start > self.end {
            return Err(ClimaError::invalid(
                "years",
                format!("start year {} is after end year {}", self.start, self.end),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }

    /// Number of years in the range
    #[must_use]
    pub fn len(&self) -> usize {
        usize::try_from(self.end - self.start + 1).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
