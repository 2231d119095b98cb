//! Box-car running mean and block-mean downsampling
//!
//! A uniform kernel normalised to sum 1 slides over the data. Missing samples
//! contribute zero to a window; an output cell is missing only when every
//! sample under its window is missing.

use crate::errors::{ClimaError, Result};
use crate::masked::{Masked, Masked2};
use ndarray::{s, Array1, Array2, Dimension, Ix1, Ix2};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothMode {
    /// Mean of every fully contained window; edges shrink by `kernel − 1`
    RunningMean,
    /// Mean of non-overlapping blocks; a trailing partial block is dropped
    Deresolve,
}

impl std::str::FromStr for SmoothMode {
    type Err = ClimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "running_mean" | "running-mean" => Ok(Self::RunningMean),
            "deresolve" => Ok(Self::Deresolve),
            other => Err(ClimaError::invalid(
                "mode",
                format!("unknown smoothing mode '{other}', expected running_mean or deresolve"),
            )),
        }
    }
}

/// Uniform `rows × cols` kernel. 1-D data uses a `(len, 1)` kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxKernel {
    rows: usize,
    cols: usize,
}

impl BoxKernel {
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` for a zero-sized kernel.
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows == 0 || cols == 0 {
            return Err(ClimaError::invalid(
                "kernel",
                format!("kernel dimensions must be positive, got ({rows}, {cols})"),
            ));
        }
        Ok(Self { rows, cols })
    }

    /// Kernel for 1-D data
    ///
    /// # Errors
    ///
    /// See [`BoxKernel::new`].
    pub fn window(len: usize) -> Result<Self> {
        Self::new(len, 1)
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of kernel elements; each carries weight `1 / area`
    #[must_use]
    pub fn area(&self) -> usize {
        self.rows * self.cols
    }
}

/// Smooth or downsample a 1-D or 2-D masked array.
///
/// There is no missing-value option: validity comes from the [`Masked`] input,
/// and missing samples always add zero to the window sum over the full kernel area.
///
/// # Errors
///
/// Returns `ShapeMismatch` for data of any other rank, for a 1-D input with a
/// kernel wider than one column, and for a kernel larger than the data.
pub fn smooth<D: Dimension>(data: &Masked<D>, kernel: BoxKernel, mode: SmoothMode) -> Result<Masked<D>> {
    match data.ndim() {
        1 => {
            if kernel.cols != 1 {
                return Err(ClimaError::shape("kernel", "one column for 1-D data", kernel.cols));
            }
            let values = data.values().view().into_dimensionality::<Ix1>()?;
            let valid = data.valid().view().into_dimensionality::<Ix1>()?;
            let column = Masked2::from_parts(
                Array2::from_shape_fn((values.len(), 1), |(i, _)| values[i]),
                Array2::from_shape_fn((valid.len(), 1), |(i, _)| valid[i]),
            );
            let (out_values, out_valid) = convolve(&column, kernel, mode)?.into_parts();
            let out_values: Array1<f64> = out_values.column(0).to_owned();
            let out_valid: Array1<bool> = out_valid.column(0).to_owned();
            Ok(Masked::from_parts(
                out_values.into_dimensionality::<D>()?,
                out_valid.into_dimensionality::<D>()?,
            ))
        }
        2 => {
            let grid = Masked2::from_parts(
                data.values().view().into_dimensionality::<Ix2>()?.to_owned(),
                data.valid().view().into_dimensionality::<Ix2>()?.to_owned(),
            );
            let (out_values, out_valid) = convolve(&grid, kernel, mode)?.into_parts();
            Ok(Masked::from_parts(
                out_values.into_dimensionality::<D>()?,
                out_valid.into_dimensionality::<D>()?,
            ))
        }
        n => Err(ClimaError::shape("data", "a 1-D or 2-D array", format!("{n} dimensions"))),
    }
}

fn convolve(data: &Masked2, kernel: BoxKernel, mode: SmoothMode) -> Result<Masked2> {
    let (nrows, ncols) = data.values().dim();
    if kernel.rows > nrows || kernel.cols > ncols {
        return Err(ClimaError::shape(
            "kernel",
            format!("at most ({nrows}, {ncols})"),
            format!("({}, {})", kernel.rows, kernel.cols),
        ));
    }

    let (out_shape, stride) = match mode {
        SmoothMode::RunningMean => ((nrows - kernel.rows + 1, ncols - kernel.cols + 1), (1, 1)),
        SmoothMode::Deresolve => ((nrows / kernel.rows, ncols / kernel.cols), (kernel.rows, kernel.cols)),
    };
    debug!(?mode, input = ?(nrows, ncols), output = ?out_shape, "box-car convolution");

    let area = kernel.area() as f64;
    let mut valid = Array2::from_elem(out_shape, false);
    let values = Array2::from_shape_fn(out_shape, |(r, c)| {
        let (r0, c0) = (r * stride.0, c * stride.1);
        let window = s![r0..r0 + kernel.rows, c0..c0 + kernel.cols];
        let (sum, any) = data
            .values()
            .slice(window)
            .iter()
            .zip(data.valid().slice(window).iter())
            .filter(|&(_, &ok)| ok)
            .fold((0.0, false), |(sum, _), (&v, _)| (sum + v, true));
        valid[[r, c]] = any;
        sum / area
    });

    Ok(Masked2::from_parts(values, valid))
}
