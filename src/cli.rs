//! Command-line interface for the `ocean-clima` binary, built on `clap`.

use crate::config::ClimaConfig;
use crate::errors::{ClimaError, Result};
use crate::harmonic::{characterize, fit, BasisSpec, MONTHLY_PERIOD};
use crate::netcdf_io::{read_series, write_aggregate, GriddedDataset};
use crate::regional::{regional_climatology, Hemisphere, RegionBox, Side};
use crate::statistics::{reduce, require_observations, Grouping};
use chrono::Datelike;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};

/// Climatologies, harmonic fits and regional cycles of gridded ocean data
#[derive(Parser, Debug)]
#[command(name = "ocean-clima", version, about)]
pub struct Args {
    /// JSON configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long, global = true)]
    pub threads: Option<usize>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Grouped temporal moments of every grid cell
    Moments(MomentsArgs),
    /// Harmonic least squares fit of one grid cell
    Fit(FitArgs),
    /// Regional climatology of a box of cells
    Regional(RegionalArgs),
}

/// Input variable shared by every subcommand
#[derive(ClapArgs, Debug)]
pub struct Input {
    /// NetCDF file, relative to the configured dataset root
    #[arg(short, long)]
    pub file: PathBuf,

    /// Name of the (time, lat, lon) variable
    #[arg(long)]
    pub var: String,
}

#[derive(ClapArgs, Debug)]
pub struct MomentsArgs {
    #[command(flatten)]
    pub input: Input,

    /// monthly, seasonal or all
    #[arg(short, long, default_value = "monthly", value_parser = parse_grouping)]
    pub grouping: Grouping,

    /// Path to save the statistics as NetCDF. If not set, prints a summary.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(ClapArgs, Debug)]
pub struct FitArgs {
    #[command(flatten)]
    pub input: Input,

    #[arg(long)]
    pub lat_index: usize,

    #[arg(long)]
    pub lon_index: usize,

    /// Model basis, e.g. mean-annual or mean-linear-annual-semiannual
    #[arg(short, long, default_value = "mean-annual-semiannual", value_parser = parse_basis)]
    pub basis: BasisSpec,

    /// Annual period in time steps
    #[arg(short, long, default_value_t = MONTHLY_PERIOD)]
    pub period: f64,
}

#[derive(ClapArgs, Debug)]
pub struct RegionalArgs {
    #[command(flatten)]
    pub input: Input,

    #[arg(long)]
    pub lat_index: usize,

    #[arg(long)]
    pub lon_index: usize,

    /// Edge length of the box in cells
    #[arg(long, default_value_t = 1)]
    pub box_size: usize,

    /// Degrees of freedom for the standard error of the mean
    #[arg(long)]
    pub dof: usize,

    /// nh or sh
    #[arg(long, default_value = "nh", value_parser = parse_hemisphere)]
    pub hemisphere: Hemisphere,

    /// east or west of the prime meridian
    #[arg(long, default_value = "east", value_parser = parse_side)]
    pub side: Side,

    /// Reduce to monthly or seasonal groups before averaging the box
    #[arg(short, long, default_value = "monthly", value_parser = parse_grouping)]
    pub grouping: Grouping,
}

fn parse_grouping(s: &str) -> std::result::Result<Grouping, String> {
    s.parse().map_err(|e: ClimaError| e.to_string())
}

fn parse_basis(s: &str) -> std::result::Result<BasisSpec, String> {
    s.parse().map_err(|e: ClimaError| e.to_string())
}

fn parse_hemisphere(s: &str) -> std::result::Result<Hemisphere, String> {
    s.parse().map_err(|e: ClimaError| e.to_string())
}

fn parse_side(s: &str) -> std::result::Result<Side, String> {
    s.parse().map_err(|e: ClimaError| e.to_string())
}

/// Execute the parsed command line.
///
/// # Errors
///
/// Propagates configuration, I/O and computation errors.
pub fn run(args: Args) -> Result<()> {
    let config = match &args.config {
        Some(path) => ClimaConfig::from_file(path)?,
        None => ClimaConfig::default(),
    };
    let mut parallel = config.parallel();
    if args.threads.is_some() {
        parallel.num_threads = args.threads;
    }
    parallel.setup_global_pool()?;

    match args.command {
        Command::Moments(cmd) => run_moments(&config, cmd),
        Command::Fit(cmd) => run_fit(&config, cmd),
        Command::Regional(cmd) => run_regional(&config, cmd),
    }
}

fn load(config: &ClimaConfig, input: &Input) -> Result<GriddedDataset> {
    let path = config.dataset_root.join(&input.file);
    let dataset = read_series(&path, &input.var)?;
    let skipped = dataset
        .series
        .time()
        .iter()
        .filter(|t| !config.years.contains(t.year()))
        .count();
    if skipped > 0 {
        warn!(skipped, years = ?config.years, "time steps fall outside the configured years");
    }
    Ok(dataset)
}

fn run_moments(config: &ClimaConfig, cmd: MomentsArgs) -> Result<()> {
    let dataset = load(config, &cmd.input)?;
    let aggregate = reduce(&dataset.series, cmd.grouping);

    for group in &aggregate.groups {
        if let Err(e) = require_observations(group) {
            warn!(key = group.key, "{e}");
        }
    }

    match cmd.output {
        Some(output) => {
            write_aggregate(&output, &aggregate, &dataset.lon, &dataset.lat)?;
            info!(path = %output.display(), "saved statistics");
        }
        None => {
            println!("{:>6} {:>8} {:>12} {:>12}", "group", "cells", "mean", "std");
            for group in &aggregate.groups {
                let mean = group.mean.mean().unwrap_or(f64::NAN);
                let std = group.std().mean().unwrap_or(f64::NAN);
                println!(
                    "{:>6} {:>8} {:>12.4} {:>12.4}",
                    group.key,
                    group.mean.count_valid(),
                    mean,
                    std
                );
            }
        }
    }
    Ok(())
}

fn run_fit(config: &ClimaConfig, cmd: FitArgs) -> Result<()> {
    let dataset = load(config, &cmd.input)?;
    let (nlat, nlon) = dataset.series.grid_shape();
    if cmd.lat_index >= nlat || cmd.lon_index >= nlon {
        return Err(ClimaError::shape(
            "cell",
            format!("an index inside ({nlat}, {nlon})"),
            format!("({}, {})", cmd.lat_index, cmd.lon_index),
        ));
    }

    let series = dataset
        .series
        .data()
        .cell_series(cmd.lat_index, cmd.lon_index)
        .to_options();
    let model = fit(&series, cmd.basis, cmd.period)?;
    let stats = characterize(&series, &model)?;

    println!("basis: {}", cmd.basis.as_str());
    println!("coefficients: {:?}", model.coefficients);
    println!("rms: {:.6}", stats.rms);
    if let Some(cod) = stats.cod {
        println!("cod: {cod:.6}");
    }
    if let Some(annual) = stats.annual {
        println!("annual amplitude: {:.6} phase: {:.6}", annual.amplitude, annual.phase);
    }
    if let Some(semiannual) = stats.semiannual {
        println!(
            "semiannual amplitude: {:.6} phase: {:.6}",
            semiannual.amplitude, semiannual.phase
        );
    }
    Ok(())
}

fn run_regional(config: &ClimaConfig, cmd: RegionalArgs) -> Result<()> {
    if cmd.grouping == Grouping::All {
        return Err(ClimaError::invalid("grouping", "regional climatology needs monthly or seasonal groups"));
    }
    let dataset = load(config, &cmd.input)?;
    let aggregate = reduce(&dataset.series, cmd.grouping);
    let mean = aggregate.stack(|g| &g.mean)?;
    let variance = aggregate.stack(|g| &g.variance)?;

    let region = RegionBox {
        lat_index: cmd.lat_index,
        lon_index: cmd.lon_index,
        size: cmd.box_size,
    };
    let result = regional_climatology(
        &mean,
        &variance,
        &dataset.lon,
        &dataset.lat,
        region,
        cmd.dof,
        cmd.hemisphere,
        cmd.side,
    )?;

    let b = result.bounds;
    println!(
        "box: lat {:.2}..{:.2} lon {:.2}..{:.2}",
        b.lat_start, b.lat_end, b.lon_start, b.lon_end
    );
    println!("{:>5} {:>12} {:>12} {:>12} {:>12}", "step", "mean", "stdm", "fit", "residual");
    for i in 0..result.fitted.len() {
        println!(
            "{:>5} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
            i,
            result.mean.get(i).unwrap_or(f64::NAN),
            result.stdm.get(i).unwrap_or(f64::NAN),
            result.fitted[i],
            result.residual.get(i).unwrap_or(f64::NAN)
        );
    }
    Ok(())
}
