//! Produce the simulation volume for a target redshift.
//!
//! Picks the snapshot matching the target exactly, clamps to the nearest end
//! of the series, or blends the two bracketing snapshots linearly in z.
//!
//! Usage:
//! ```
//! cargo run --release --bin interpcube -- 7.1 --listing cubes.csv
//! cargo run --release --bin interpcube -- 7.1 \
//!     --redshifts 7.0 7.5 --cubes z7.0.bin z7.5.bin
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use skyproj::io::{read_series_listing, series_from_lists};
use skyproj::pipeline::{default_interpolation_output, run_interpolation};
use skyproj::shared_args::VolumeArgs;
use std::path::PathBuf;

/// Command line arguments for redshift interpolation
#[derive(Parser, Debug)]
#[command(
    name = "interpcube",
    about = "Interpolate periodic simulation volumes to a target redshift",
    long_about = None
)]
struct Args {
    /// Target redshift
    #[arg(allow_negative_numbers = true)]
    z: f64,

    /// CSV listing of "redshift,path" rows
    #[arg(long, conflicts_with_all = ["redshifts", "cubes"])]
    listing: Option<PathBuf>,

    /// Snapshot redshifts, ascending
    #[arg(long, num_args = 1.., requires = "cubes")]
    redshifts: Vec<f64>,

    /// Snapshot files, one per redshift
    #[arg(long, num_args = 1.., requires = "redshifts")]
    cubes: Vec<PathBuf>,

    #[command(flatten)]
    volume: VolumeArgs,

    /// Output file (default: interp_cube_z<z>.bin)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let series = match &args.listing {
        Some(listing) => read_series_listing(listing)
            .with_context(|| format!("reading listing {}", listing.display()))?,
        None if !args.redshifts.is_empty() => series_from_lists(&args.redshifts, &args.cubes)?,
        None => bail!("give either --listing or --redshifts with --cubes"),
    };
    let geometry = args.volume.geometry()?;
    let output = args
        .output
        .unwrap_or_else(|| default_interpolation_output(args.z));

    run_interpolation(args.z, &series, &geometry, &output)
        .with_context(|| format!("interpolating to z={}", args.z))?;
    println!("{}", output.display());
    Ok(())
}
