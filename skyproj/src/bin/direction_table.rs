//! Precompute and cache the unit direction of every HEALPix pixel.
//!
//! Building the table is the slowest part of a cold `cube2hpx` run at high
//! NSIDE; running this once up front lets a batch share the cache file.

use anyhow::{Context, Result};
use clap::Parser;
use skyproj::healpix::PixelDirectionTable;
use skyproj::io::save_direction_table;
use skyproj::io::table::default_cache_path;
use skyproj::sampler::DEFAULT_NSIDE;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser, Debug)]
#[command(name = "direction_table", about = "Write a HEALPix pixel direction cache")]
struct Args {
    /// HEALPix NSIDE
    #[arg(long, default_value_t = DEFAULT_NSIDE)]
    nside: usize,

    /// Output file (default: healpix_coord_N<nside>.bin)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let output = args.output.unwrap_or_else(|| default_cache_path(args.nside));

    let started = Instant::now();
    let table = PixelDirectionTable::new(args.nside)?;
    save_direction_table(&table, &output)
        .with_context(|| format!("writing {}", output.display()))?;
    println!(
        "Wrote {} directions for NSIDE {} to {} in {:.2?}",
        table.len(),
        args.nside,
        output.display(),
        started.elapsed()
    );
    Ok(())
}
