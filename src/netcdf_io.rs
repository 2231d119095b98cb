//! NetCDF adapter
//!
//! Loads `(time, lat, lon)` variables into a [`TimeSeries3D`] and writes grids
//! and grouped statistics back out. The numerical modules never touch files;
//! this is the only place that does.

use crate::errors::{ClimaError, Result};
use crate::masked::{Masked, Masked2, Masked3};
use crate::series::TimeSeries3D;
use crate::statistics::MonthlyAggregate;
use chrono::{Duration, NaiveDate, NaiveDateTime, Utc};
use ndarray::{Array1, Array3, Dimension};
use netcdf::{create, AttributeValue, File, FileMut, Variable};
use std::{fs, path::Path};
use tracing::{debug, info};

/// Fill value written for missing cells
pub const FILL_VALUE: f64 = -9999.0;

/// A series read from file together with its coordinate axes
#[derive(Debug, Clone)]
pub struct GriddedDataset {
    pub series: TimeSeries3D,
    pub lon: Vec<f64>,
    pub lat: Vec<f64>,
}

/// Read a `(time, lat, lon)` variable and its coordinate variables.
///
/// Values equal to the variable's `_FillValue`, and `NaN`s, are missing. The
/// time coordinate is decoded from its CF `units` attribute.
///
/// # Errors
///
/// Returns `VariableNotFound` for a missing data or coordinate variable,
/// `ShapeMismatch` if the variable is not 3-D, `TimeAxis` for undecodable time
/// units and any NetCDF error raised while reading.
pub fn read_series(path: impl AsRef<Path>, var_name: &str) -> Result<GriddedDataset> {
    let path = path.as_ref();
    let file = netcdf::open(path)?;
    let var = find_variable(&file, var_name)?;

    let dims: Vec<(String, usize)> = var
        .dimensions()
        .iter()
        .map(|d| (d.name().to_string(), d.len()))
        .collect();
    if dims.len() != 3 {
        return Err(ClimaError::shape(
            var_name,
            "3 dimensions (time, lat, lon)",
            format!("{} dimensions", dims.len()),
        ));
    }
    info!(path = %path.display(), var = var_name, ?dims, "reading series");

    let values = var.get_values::<f64, _>(..)?;
    let values = Array3::from_shape_vec((dims[0].1, dims[1].1, dims[2].1), values)?;
    let data = match fill_value(&var) {
        Some(fill) => {
            let valid = values.mapv(|v| !v.is_nan() && v != fill);
            Masked3::new(values, valid)?
        }
        None => Masked3::from_nan(values),
    };
    debug!(valid = data.count_valid(), total = data.values().len(), "decoded missing values");

    let time_var = find_variable(&file, &dims[0].0)?;
    let units = string_attribute(&time_var, "units").ok_or_else(|| {
        ClimaError::TimeAxis(format!("time variable '{}' has no units attribute", dims[0].0))
    })?;
    let time = decode_time(&time_var.get_values::<f64, _>(..)?, &units)?;

    let lat = find_variable(&file, &dims[1].0)?.get_values::<f64, _>(..)?;
    let lon = find_variable(&file, &dims[2].0)?.get_values::<f64, _>(..)?;

    Ok(GriddedDataset {
        series: TimeSeries3D::new(time, data)?,
        lon,
        lat,
    })
}

fn find_variable<'f>(file: &'f File, name: &str) -> Result<Variable<'f>> {
    file.variable(name).ok_or_else(|| ClimaError::VariableNotFound {
        var: name.to_string(),
    })
}

fn fill_value(var: &Variable<'_>) -> Option<f64> {
    match var.attribute("_FillValue")?.value().ok()? {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(f64::from(v)),
        AttributeValue::Int(v) => Some(f64::from(v)),
        AttributeValue::Short(v) => Some(f64::from(v)),
        _ => None,
    }
}

fn string_attribute(var: &Variable<'_>, name: &str) -> Option<String> {
    match var.attribute(name)?.value().ok()? {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

/// Decode offsets in CF units such as `days since 1993-01-01 00:00:00`.
///
/// # Errors
///
/// Returns `TimeAxis` for an unknown unit or reference date, or an offset that
/// is non-finite or beyond the representable date range.
pub fn decode_time(offsets: &[f64], units: &str) -> Result<Vec<NaiveDateTime>> {
    let (unit, reference) = units
        .split_once(" since ")
        .ok_or_else(|| ClimaError::TimeAxis(format!("expected '<unit> since <date>', got '{units}'")))?;

    let seconds_per_unit = match unit.trim().to_ascii_lowercase().as_str() {
        "days" | "day" | "d" => 86_400.0,
        "hours" | "hour" | "h" => 3_600.0,
        "minutes" | "minute" | "min" => 60.0,
        "seconds" | "second" | "s" => 1.0,
        other => return Err(ClimaError::TimeAxis(format!("unsupported time unit '{other}'"))),
    };
    let base = parse_reference(reference.trim())?;

    offsets
        .iter()
        .map(|&offset| {
            if !offset.is_finite() {
                return Err(ClimaError::TimeAxis(format!("non-finite time offset {offset}")));
            }
            let millis = (offset * seconds_per_unit * 1000.0).round();
            let out_of_range = || ClimaError::TimeAxis(format!("time offset {offset} {} is out of range", unit.trim()));
            if millis.abs() >= i64::MAX as f64 {
                return Err(out_of_range());
            }
            Duration::try_milliseconds(millis as i64)
                .and_then(|d| base.checked_add_signed(d))
                .ok_or_else(out_of_range)
        })
        .collect()
}

fn parse_reference(reference: &str) -> Result<NaiveDateTime> {
    let reference = reference.trim_end_matches('Z').trim_end_matches(" UTC");
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(reference, format) {
            return Ok(t);
        }
    }
    NaiveDate::parse_from_str(reference, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| ClimaError::TimeAxis(format!("unrecognised reference date '{reference}'")))
}

/// Write a single `(lat, lon)` grid.
///
/// # Errors
///
/// Returns `ShapeMismatch` if the axes disagree with the grid, or any NetCDF
/// or I/O error.
pub fn write_grid(path: impl AsRef<Path>, name: &str, grid: &Masked2, lon: &[f64], lat: &[f64]) -> Result<()> {
    let (nlat, nlon) = grid.values().dim();
    check_axes(nlat, nlon, lon, lat)?;

    let mut file = create_output(path.as_ref())?;
    add_axes(&mut file, lon, lat)?;
    put_masked(&mut file, name, &["lat", "lon"], grid)?;
    add_history(&mut file)?;
    info!(path = %path.as_ref().display(), var = name, "wrote grid");
    Ok(())
}

/// Write every statistic of a grouped reduction as `(group, lat, lon)` variables.
///
/// # Errors
///
/// Returns `ShapeMismatch` if the axes disagree with the grids, or any NetCDF
/// or I/O error.
pub fn write_aggregate(
    path: impl AsRef<Path>,
    aggregate: &MonthlyAggregate,
    lon: &[f64],
    lat: &[f64],
) -> Result<()> {
    let mean = aggregate.stack(|g| &g.mean)?;
    let shape = mean.shape();
    check_axes(shape[1], shape[2], lon, lat)?;

    let mut file = create_output(path.as_ref())?;
    file.add_dimension("group", shape[0])?;
    add_axes(&mut file, lon, lat)?;

    let keys: Array1<i32> = aggregate
        .groups
        .iter()
        .map(|g| i32::try_from(g.key).unwrap_or(i32::MAX))
        .collect();
    let mut group_var = file.add_variable::<i32>("group", &["group"])?;
    group_var.put_attribute("grouping", aggregate.grouping.as_str())?;
    group_var.put(keys.view(), ..)?;

    let dims = ["group", "lat", "lon"];
    put_masked(&mut file, "mean", &dims, &mean)?;
    put_masked(&mut file, "median", &dims, &aggregate.stack(|g| &g.median)?)?;
    put_masked(&mut file, "variance", &dims, &aggregate.stack(|g| &g.variance)?)?;
    put_masked(&mut file, "skewness", &dims, &aggregate.stack(|g| &g.skewness)?)?;
    put_masked(&mut file, "kurtosis", &dims, &aggregate.stack(|g| &g.kurtosis)?)?;

    let counts = aggregate.count_stack()?.mapv(|c| i64::try_from(c).unwrap_or(i64::MAX));
    let mut count_var = file.add_variable::<i64>("count", &dims)?;
    count_var.put_attribute("long_name", "number of valid samples")?;
    count_var.put(counts.view(), ..)?;

    add_history(&mut file)?;
    info!(
        path = %path.as_ref().display(),
        groups = shape[0],
        grouping = aggregate.grouping.as_str(),
        "wrote aggregate"
    );
    Ok(())
}

fn check_axes(nlat: usize, nlon: usize, lon: &[f64], lat: &[f64]) -> Result<()> {
    if lon.len() != nlon {
        return Err(ClimaError::shape("lon", nlon, lon.len()));
    }
    if lat.len() != nlat {
        return Err(ClimaError::shape("lat", nlat, lat.len()));
    }
    Ok(())
}

fn create_output(path: &Path) -> Result<FileMut> {
    if path.exists() {
        fs::remove_file(path)?;
    }
    Ok(create(path)?)
}

fn add_axes(file: &mut FileMut, lon: &[f64], lat: &[f64]) -> Result<()> {
    file.add_dimension("lat", lat.len())?;
    file.add_dimension("lon", lon.len())?;

    let mut lat_var = file.add_variable::<f64>("lat", &["lat"])?;
    lat_var.put_attribute("units", "degrees_north")?;
    lat_var.put(Array1::from(lat.to_vec()).view(), ..)?;

    let mut lon_var = file.add_variable::<f64>("lon", &["lon"])?;
    lon_var.put_attribute("units", "degrees_east")?;
    lon_var.put(Array1::from(lon.to_vec()).view(), ..)?;
    Ok(())
}

fn put_masked<D: Dimension>(file: &mut FileMut, name: &str, dims: &[&str], data: &Masked<D>) -> Result<()> {
    let mut var = file.add_variable::<f64>(name, dims)?;
    var.put_attribute("_FillValue", FILL_VALUE)?;
    var.put(data.filled(FILL_VALUE).view(), ..)?;
    Ok(())
}

fn add_history(file: &mut FileMut) -> Result<()> {
    file.add_attribute(
        "history",
        format!("Created by ocean-clima on {}", Utc::now().to_rfc3339()),
    )?;
    Ok(())
}
