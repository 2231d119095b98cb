//! Masked numeric arrays
//!
//! A [`Masked`] array pairs a plain `f64` array with a boolean validity array of
//! the same shape. Missing cells always hold `NaN` in the value array, but every
//! reduction in the crate checks the validity array explicitly instead of relying
//! on `NaN` arithmetic.

use crate::errors::{ClimaError, Result};
use ndarray::{Array, Array1, Array2, Array3, Axis, Dimension, Ix1, Ix2, Ix3, NdIndex, Zip};
use serde::{Deserialize, Serialize};

/// How missing samples are represented in raw input arrays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingConvention {
    /// `NaN` is the missing-value sentinel
    #[default]
    Nan,
    /// A separate boolean mask marks missing samples (`true` = missing)
    Mask,
}

impl std::str::FromStr for MissingConvention {
    type Err = ClimaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "nan" => Ok(Self::Nan),
            "mask" => Ok(Self::Mask),
            other => Err(ClimaError::invalid(
                "missing_convention",
                format!("unknown convention '{other}', expected 'nan' or 'mask'"),
            )),
        }
    }
}

/// Array of `f64` values with an explicit validity flag per element
#[derive(Debug, Clone)]
pub struct Masked<D: Dimension> {
    values: Array<f64, D>,
    valid: Array<bool, D>,
}

// Missing cells compare equal regardless of the NaN they hold.
impl<D: Dimension> PartialEq for Masked<D> {
    fn eq(&self, other: &Self) -> bool {
        self.valid == other.valid
            && Zip::from(&self.values)
                .and(&other.values)
                .and(&self.valid)
                .all(|&a, &b, &ok| !ok || a == b)
    }
}

pub type Masked1 = Masked<Ix1>;
pub type Masked2 = Masked<Ix2>;
pub type Masked3 = Masked<Ix3>;

impl<D: Dimension> Masked<D> {
    /// Build from values and a validity array (`true` = valid).
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the two arrays differ in shape.
    pub fn new(values: Array<f64, D>, valid: Array<bool, D>) -> Result<Self> {
        if values.shape() != valid.shape() {
            return Err(ClimaError::shape(
                "valid",
                format!("{:?}", values.shape()),
                format!("{:?}", valid.shape()),
            ));
        }
        Ok(Self::from_parts(values, valid))
    }

    /// Pair arrays that already share a shape
    pub(crate) fn from_parts(mut values: Array<f64, D>, valid: Array<bool, D>) -> Self {
        debug_assert_eq!(values.shape(), valid.shape());
        Zip::from(&mut values).and(&valid).for_each(|v, &ok| {
            if !ok {
                *v = f64::NAN;
            }
        });
        Self { values, valid }
    }

    /// Interpret `NaN` entries as missing.
    #[must_use]
    pub fn from_nan(values: Array<f64, D>) -> Self {
        let valid = values.mapv(|v| !v.is_nan());
        Self { values, valid }
    }

    /// Interpret `true` entries of `mask` as missing, whatever the value holds.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `mask` differs in shape from `values`.
    pub fn from_mask(values: Array<f64, D>, mask: &Array<bool, D>) -> Result<Self> {
        Self::new(values, mask.mapv(|m| !m))
    }

    /// Build from raw input following the selected missing-value convention.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` when the mask is absent under the mask
    /// convention or present under the `NaN` convention.
    pub fn from_convention(
        values: Array<f64, D>,
        mask: Option<&Array<bool, D>>,
        convention: MissingConvention,
    ) -> Result<Self> {
        match (convention, mask) {
            (MissingConvention::Nan, None) => Ok(Self::from_nan(values)),
            (MissingConvention::Mask, Some(mask)) => Self::from_mask(values, mask),
            (MissingConvention::Nan, Some(_)) => Err(ClimaError::invalid(
                "mask",
                "a mask was supplied but the missing convention is 'nan'",
            )),
            (MissingConvention::Mask, None) => Err(ClimaError::invalid(
                "mask",
                "the missing convention is 'mask' but no mask was supplied",
            )),
        }
    }

    /// Entirely missing array of the given shape
    #[must_use]
    pub fn missing(shape: D) -> Self {
        Self {
            values: Array::from_elem(shape.clone(), f64::NAN),
            valid: Array::from_elem(shape, false),
        }
    }

    pub fn values(&self) -> &Array<f64, D> {
        &self.values
    }

    pub fn valid(&self) -> &Array<bool, D> {
        &self.valid
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn raw_dim(&self) -> D {
        self.values.raw_dim()
    }

    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    /// Value at `index`, `None` when missing or out of bounds
    pub fn get<I: NdIndex<D> + Copy>(&self, index: I) -> Option<f64> {
        if *self.valid.get(index)? {
            self.values.get(index).copied()
        } else {
            None
        }
    }

    /// Number of valid elements
    pub fn count_valid(&self) -> usize {
        self.valid.iter().filter(|&&ok| ok).count()
    }

    /// Mean over all valid elements
    pub fn mean(&self) -> Option<f64> {
        let (sum, n) = Zip::from(&self.values)
            .and(&self.valid)
            .fold((0.0_f64, 0_usize), |(sum, n), &v, &ok| {
                if ok {
                    (sum + v, n + 1)
                } else {
                    (sum, n)
                }
            });
        (n > 0).then(|| sum / n as f64)
    }

    /// Copy of the values with missing cells replaced by `fill`
    #[must_use]
    pub fn filled(&self, fill: f64) -> Array<f64, D> {
        let mut out = self.values.clone();
        Zip::from(&mut out).and(&self.valid).for_each(|v, &ok| {
            if !ok {
                *v = fill;
            }
        });
        out
    }

    /// Copy of the values with missing cells as `NaN`
    #[must_use]
    pub fn to_nan_array(&self) -> Array<f64, D> {
        self.values.clone()
    }

    /// Boolean mask in the `true` = missing convention
    #[must_use]
    pub fn mask(&self) -> Array<bool, D> {
        self.valid.mapv(|ok| !ok)
    }

    /// Apply `f` to every valid element; missing elements stay missing
    #[must_use]
    pub fn map_valid<F: Fn(f64) -> f64>(&self, f: F) -> Self {
        let mut values = self.values.clone();
        Zip::from(&mut values).and(&self.valid).for_each(|v, &ok| {
            if ok {
                *v = f(*v);
            }
        });
        Self {
            values,
            valid: self.valid.clone(),
        }
    }

    pub fn into_parts(self) -> (Array<f64, D>, Array<bool, D>) {
        (self.values, self.valid)
    }
}

impl Masked1 {
    /// Build a 1-D array from optional samples
    #[must_use]
    pub fn from_options(samples: &[Option<f64>]) -> Self {
        let values = samples.iter().map(|s| s.unwrap_or(f64::NAN)).collect();
        let valid = samples.iter().map(Option::is_some).collect();
        Self {
            values: Array1::from_vec(values),
            valid: Array1::from_vec(valid),
        }
    }

    /// Samples as `Option`s, `None` for missing entries
    #[must_use]
    pub fn to_options(&self) -> Vec<Option<f64>> {
        self.values
            .iter()
            .zip(self.valid.iter())
            .map(|(&v, &ok)| ok.then_some(v))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Masked2 {
    /// Build a 2-D grid of shape `(nrows, ncols)` from row-major optional cells.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if `cells.len() != nrows * ncols`.
    pub fn from_cells(shape: (usize, usize), cells: Vec<Option<f64>>) -> Result<Self> {
        let (values, valid): (Vec<f64>, Vec<bool>) = cells
            .into_iter()
            .map(|c| (c.unwrap_or(f64::NAN), c.is_some()))
            .unzip();
        Ok(Self {
            values: Array2::from_shape_vec(shape, values)?,
            valid: Array2::from_shape_vec(shape, valid)?,
        })
    }
}

impl Masked3 {
    /// Stack equally shaped 2-D slices along a new leading axis.
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the slices disagree in shape or there are none.
    pub fn stack(slices: &[Masked2]) -> Result<Self> {
        let first = slices.first().ok_or_else(|| {
            ClimaError::shape("slices", "at least one slice", "an empty sequence")
        })?;
        let (nlat, nlon) = first.values.dim();
        let mut values = Array3::from_elem((slices.len(), nlat, nlon), f64::NAN);
        let mut valid = Array3::from_elem((slices.len(), nlat, nlon), false);
        for (t, slice) in slices.iter().enumerate() {
            if slice.values.dim() != (nlat, nlon) {
                return Err(ClimaError::shape(
                    "slices",
                    format!("({nlat}, {nlon})"),
                    format!("{:?} at index {t}", slice.values.dim()),
                ));
            }
            values.index_axis_mut(Axis(0), t).assign(&slice.values);
            valid.index_axis_mut(Axis(0), t).assign(&slice.valid);
        }
        Ok(Self { values, valid })
    }

    /// One `(lat, lon)` slice at time index `t`
    #[must_use]
    pub fn slice_time(&self, t: usize) -> Masked2 {
        Masked2 {
            values: self.values.index_axis(Axis(0), t).to_owned(),
            valid: self.valid.index_axis(Axis(0), t).to_owned(),
        }
    }

    /// The full time series of one grid cell
    #[must_use]
    pub fn cell_series(&self, lat: usize, lon: usize) -> Masked1 {
        Masked1 {
            values: self.values.slice(ndarray::s![.., lat, lon]).to_owned(),
            valid: self.valid.slice(ndarray::s![.., lat, lon]).to_owned(),
        }
    }

    /// Valid samples of cell `(lat, lon)` restricted to the given time indices
    pub fn cell_samples(&self, lat: usize, lon: usize, times: &[usize]) -> Vec<f64> {
        times
            .iter()
            .filter(|&&t| self.valid[[t, lat, lon]])
            .map(|&t| self.values[[t, lat, lon]])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn nan_and_mask_conventions_agree() {
        let nan = Masked::from_nan(array![1.0, f64::NAN, 3.0]);
        let mask = Masked::from_mask(array![1.0, -999.0, 3.0], &array![false, true, false]).unwrap();
        assert_eq!(nan, mask);
        assert_eq!(nan.count_valid(), 2);
        assert_eq!(nan.mean(), Some(2.0));
    }

    #[test]
    fn convention_requires_matching_mask() {
        let values = array![1.0, 2.0];
        assert!(Masked::from_convention(values.clone(), None, MissingConvention::Mask).is_err());
        let mask = array![false, false];
        assert!(Masked::from_convention(values, Some(&mask), MissingConvention::Nan).is_err());
    }
}
