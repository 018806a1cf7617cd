use std::{num::NonZeroUsize, path::PathBuf};

use anyhow::{Result, bail};
use clap::Parser;
use env_logger::Env;
use log::info;
use qoi_convert::convert::{Options, convert_dir};

/// Converts every `.qoi` image in a directory to PNG.
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory to read `.qoi` files from.
    input_dir: PathBuf,

    /// Directory to write PNG files to [default: INPUT_DIR/converted].
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of files converted at once [default: number of CPUs].
    #[arg(short, long)]
    jobs: Option<NonZeroUsize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let Args {
        input_dir,
        output_dir,
        jobs,
    } = Args::parse();

    let report = convert_dir(&Options {
        input_dir,
        output_dir,
        jobs,
    })?;
    info!(
        "{} converted, {} failed",
        report.converted.len(),
        report.failed.len()
    );

    if !report.is_success() {
        bail!(
            "{} of {} files could not be converted",
            report.failed.len(),
            report.failed.len() + report.converted.len()
        );
    }
    Ok(())
}
