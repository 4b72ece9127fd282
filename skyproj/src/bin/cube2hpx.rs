//! Sample a simulation volume on the comoving shell seen at one frequency
//! and write the result as a HEALPix map.
//!
//! Usage:
//! ```
//! cargo run --release --bin cube2hpx -- cube.bin map.fits 150.0
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use cosmology::FlatLambdaCdm;
use log::info;
use skyproj::healpix::PixelDirectionTable;
use skyproj::io::load_or_build;
use skyproj::io::table::default_cache_path;
use skyproj::pipeline::run_projection;
use skyproj::sampler::{frequency_to_redshift, SamplingGeometry, VolumeSampler, DEFAULT_NSIDE};
use skyproj::shared_args::VolumeArgs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Command line arguments for cube-to-HEALPix projection
#[derive(Parser, Debug)]
#[command(
    name = "cube2hpx",
    about = "Project a periodic volume onto a HEALPix shell",
    long_about = None
)]
struct Args {
    /// Input volume (raw native-endian float64, row-major)
    input: PathBuf,

    /// Output HEALPix FITS file
    output: PathBuf,

    /// Observing frequency in MHz
    freq: f64,

    /// Output HEALPix NSIDE
    #[arg(long, default_value_t = DEFAULT_NSIDE)]
    nside: usize,

    #[command(flatten)]
    volume: VolumeArgs,

    /// Pixel direction cache (default: healpix_coord_N<nside>.bin)
    #[arg(long)]
    direction_cache: Option<PathBuf>,

    /// Do not read or write a pixel direction cache
    #[arg(long, conflicts_with = "direction_cache")]
    no_cache: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let geometry = SamplingGeometry {
        volume: args.volume.geometry()?,
        nside: args.nside,
    };
    let sampler = VolumeSampler::new(FlatLambdaCdm::wmap9());
    info!(
        "{} MHz is z={:.4}, shell radius {:.2}",
        args.freq,
        frequency_to_redshift(args.freq)?,
        sampler.shell_radius(args.freq)?
    );

    let started = Instant::now();
    let table = if args.no_cache {
        Arc::new(PixelDirectionTable::new(args.nside)?)
    } else {
        let cache = args
            .direction_cache
            .clone()
            .unwrap_or_else(|| default_cache_path(args.nside));
        load_or_build(Some(&cache), args.nside)
            .with_context(|| format!("preparing direction table {}", cache.display()))?
    };
    info!("Direction table ready in {:.2?}", started.elapsed());

    run_projection(
        &args.input,
        &args.output,
        args.freq,
        &geometry,
        &sampler,
        &table,
    )
    .with_context(|| format!("projecting {}", args.input.display()))?;
    println!("{}", args.output.display());
    Ok(())
}
