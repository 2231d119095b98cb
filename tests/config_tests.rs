//! Tests for configuration loading and thread-pool settings

use ocean_clima::binning::OrientationKind;
use ocean_clima::config::{ClimaConfig, GridConfig};
use ocean_clima::errors::ClimaError;
use ocean_clima::masked::MissingConvention;
use ocean_clima::parallel::{get_parallel_info, ParallelConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(json: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(json.as_bytes()).unwrap();
    file
}

#[test]
fn test_default_grid_matches_altimeter_product() {
    let config = ClimaConfig::default();
    assert_eq!(config.grid.shape().unwrap(), (360, 133));
    assert_eq!(config.years.len(), 24);
    assert!(config.years.contains(2016));
    assert!(!config.years.contains(2017));

    let spec = config.grid.grid_spec().unwrap();
    assert_eq!((spec.nlon, spec.nlat), (360, 133));
    assert_eq!(spec.orientation.kind, OrientationKind::Atlantic);
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let file = write_config(
        r#"{
            "dataset_root": "/data/altimetry",
            "grid": { "orientation": "pacific", "lon_bounds": [0.0, 359.0] },
            "missing": "mask",
            "threads": 2
        }"#,
    );
    let config = ClimaConfig::from_file(file.path()).unwrap();

    assert_eq!(config.grid.orientation, OrientationKind::Pacific);
    assert_eq!(config.grid.lat_bounds, [-66.0, 66.0]);
    assert_eq!(config.grid.shape().unwrap(), (360, 133));
    assert_eq!(config.missing, MissingConvention::Mask);
    assert_eq!(config.years.start, 1993);
    assert_eq!(config.parallel(), ParallelConfig::with_threads(2));
    assert_eq!(
        config.dataset_path("swh.nc"),
        std::path::PathBuf::from("/data/altimetry/swh.nc")
    );
}

#[test]
fn test_invalid_values_are_rejected() {
    let file = write_config(r#"{ "grid": { "resolution": 0.5 } }"#);
    let err = ClimaConfig::from_file(file.path()).unwrap_err();
    assert!(matches!(err, ClimaError::InvalidConfiguration { ref parameter, .. } if parameter == "resolution"));

    let file = write_config(r#"{ "years": { "start": 2010, "end": 2000 } }"#);
    assert!(matches!(
        ClimaConfig::from_file(file.path()),
        Err(ClimaError::InvalidConfiguration { .. })
    ));

    let file = write_config(r#"{ "threads": 0 }"#);
    assert!(ClimaConfig::from_file(file.path()).is_err());

    let file = write_config("{ not json");
    assert!(matches!(
        ClimaConfig::from_file(file.path()),
        Err(ClimaError::ConfigParse(_))
    ));

    assert!(matches!(
        ClimaConfig::from_file("/nonexistent/ocean_clima.json"),
        Err(ClimaError::Io(_))
    ));
}

#[test]
fn test_half_degree_shape_is_still_reported() {
    let grid = GridConfig {
        resolution: 0.5,
        ..GridConfig::default()
    };
    assert_eq!(grid.shape().unwrap(), (719, 265));
    assert!(grid.grid_spec().is_err());

    let grid = GridConfig {
        resolution: -1.0,
        ..GridConfig::default()
    };
    assert!(grid.shape().is_err());
}

#[test]
fn test_parallel_config() {
    assert_eq!(ParallelConfig::default().num_threads, None);
    assert_eq!(ParallelConfig::with_threads(4).num_threads, Some(4));
    assert_eq!(ParallelConfig::all_cores().num_threads, Some(num_cpus::get()));

    // A default pool needs no setup
    assert!(ParallelConfig::default().setup_global_pool().is_ok());
    assert!(matches!(
        ParallelConfig::with_threads(0).setup_global_pool(),
        Err(ClimaError::InvalidConfiguration { .. })
    ));

    let info = get_parallel_info();
    assert!(info.current_threads > 0);
    assert!(info.available_cores > 0);
}
