// SPDX-License-Identifier: MIT

//! Types and methods related to parsing the command line.

use std::path::PathBuf;

use clap::Parser;

/// Command line arguments passed to cmplot.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[must_use]
pub struct Cli {
    /// Path to the plot-definitions file
    pub definitions: PathBuf,

    /// Path to the metrics database; defaults to $COMPILATION_METRICS_DB
    #[arg(long)]
    pub database: Option<PathBuf>,
}

/// Parse the command line.
///
/// # Returns
/// - a `Cli` struct containing the command line arguments.
pub fn parse() -> Cli {
    Cli::parse()
}
