//! Centralized error handling for ocean_clima
//!
//! Every fallible entry point returns [`Result`]. Configuration and shape
//! problems are reported before any computation starts; a singular normal
//! matrix is reported distinctly from "no data" so callers can tell a failed
//! fit from an empty cell.

use thiserror::Error;

/// Main error type for ocean_clima operations
#[derive(Error, Debug)]
pub enum ClimaError {
    /// Unsupported parameter value or combination
    #[error("Invalid configuration for '{parameter}': {message}")]
    InvalidConfiguration { parameter: String, message: String },

    /// Array dimensions do not agree with each other or with the requested window
    #[error("Shape mismatch for '{parameter}': expected {expected}, found {found}")]
    ShapeMismatch {
        parameter: String,
        expected: String,
        found: String,
    },

    /// The least-squares normal matrix AᵗA cannot be inverted
    #[error(
        "Design matrix is singular: {parameters} parameters cannot be resolved from {observations} observations"
    )]
    DesignMatrixSingular {
        parameters: usize,
        observations: usize,
    },

    /// A computation that needs at least one valid sample received none
    #[error("No valid observations: {context}")]
    InsufficientObservations { context: String },

    /// Malformed or unsupported time axis
    #[error("Time axis error: {0}")]
    TimeAxis(String),

    /// NetCDF file operation errors
    #[error("NetCDF error: {0}")]
    NetCDF(#[from] netcdf::Error),

    /// Variable not found in NetCDF file
    #[error("Variable '{var}' not found in file")]
    VariableNotFound { var: String },

    /// I/O operation errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Array shape or dimension error
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    /// Thread pool configuration error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),
}

impl ClimaError {
    pub(crate) fn invalid(parameter: &str, message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            parameter: parameter.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn shape(
        parameter: &str,
        expected: impl std::fmt::Display,
        found: impl std::fmt::Display,
    ) -> Self {
        Self::ShapeMismatch {
            parameter: parameter.to_string(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// True for errors that mean "no data" rather than a failed computation
    #[must_use]
    pub const fn is_missing_data(&self) -> bool {
        matches!(self, Self::InsufficientObservations { .. })
    }
}

/// Result type alias for ocean_clima operations
pub type Result<T> = std::result::Result<T, ClimaError>;
