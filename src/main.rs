//! Entry point for the `ocean-clima` binary.
//! Sets up logging, parses the command line and dispatches the subcommand.

use clap::Parser;
use ocean_clima::cli::{run, Args};
use std::process;
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

fn init_logging(verbose: bool) {
    let default = if verbose { "ocean_clima=debug" } else { "ocean_clima=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt().with_env_filter(filter).with_target(false).init();
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        error!("{e}");
        process::exit(1);
    }
}
