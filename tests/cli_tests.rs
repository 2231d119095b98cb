//! Tests for command-line parsing and error reporting

use clap::{CommandFactory, Parser};
use ocean_clima::cli::{Args, Command};
use ocean_clima::errors::ClimaError;
use ocean_clima::harmonic::BasisSpec;
use ocean_clima::regional::{Hemisphere, Side};
use ocean_clima::statistics::Grouping;

#[test]
fn test_command_definition_is_consistent() {
    Args::command().debug_assert();
}

#[test]
fn test_parse_moments() {
    let args = Args::try_parse_from([
        "ocean-clima", "-t", "4", "moments", "-f", "swh.nc", "--var", "swh", "-g", "seasonal", "-o", "out.nc",
    ])
    .unwrap();
    assert_eq!(args.threads, Some(4));
    match args.command {
        Command::Moments(cmd) => {
            assert_eq!(cmd.input.var, "swh");
            assert_eq!(cmd.grouping, Grouping::Seasonal);
            assert!(cmd.output.is_some());
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_parse_fit_and_regional_defaults() {
    let args = Args::try_parse_from([
        "ocean-clima", "fit", "-f", "ws.nc", "--var", "wind", "--lat-index", "3", "--lon-index", "7",
    ])
    .unwrap();
    match args.command {
        Command::Fit(cmd) => {
            assert_eq!(cmd.basis, BasisSpec::MeanAnnualSemiannual);
            assert_eq!(cmd.period, 12.0);
            assert_eq!((cmd.lat_index, cmd.lon_index), (3, 7));
        }
        other => panic!("unexpected command {other:?}"),
    }

    let args = Args::try_parse_from([
        "ocean-clima", "regional", "-f", "ws.nc", "--var", "wind", "--lat-index", "0", "--lon-index", "0",
        "--dof", "24", "--hemisphere", "sh", "--side", "west",
    ])
    .unwrap();
    match args.command {
        Command::Regional(cmd) => {
            assert_eq!(cmd.box_size, 1);
            assert_eq!(cmd.hemisphere, Hemisphere::Sh);
            assert_eq!(cmd.side, Side::West);
            assert_eq!(cmd.grouping, Grouping::Monthly);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_bad_values_are_rejected_by_the_parser() {
    assert!(Args::try_parse_from(["ocean-clima", "moments", "-f", "a.nc", "--var", "x", "-g", "weekly"]).is_err());
    assert!(Args::try_parse_from([
        "ocean-clima", "fit", "-f", "a.nc", "--var", "x", "--lat-index", "0", "--lon-index", "0", "-b", "cubic",
    ])
    .is_err());
}

#[test]
fn test_error_messages() {
    let err = ClimaError::DesignMatrixSingular {
        parameters: 6,
        observations: 1,
    };
    assert!(err.to_string().contains("6 parameters"));
    assert!(!err.is_missing_data());

    let err = ClimaError::VariableNotFound {
        var: "swh".to_string(),
    };
    assert!(err.to_string().contains("Variable 'swh' not found"));

    let err = ClimaError::InsufficientObservations {
        context: "empty group".to_string(),
    };
    assert!(err.is_missing_data());
    assert!(err.to_string().contains("empty group"));
}
