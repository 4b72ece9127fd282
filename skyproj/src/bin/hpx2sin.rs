//! Reproject a HEALPix map onto an orthographic (SIN) image.
//!
//! Usage:
//! ```
//! cargo run --release --bin hpx2sin -- map.fits image.fits 0 -27
//! cargo run --release --bin hpx2sin -- map.fits image.fits --field EoR1_zenith --k-to-jy 150
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use skyproj::bands::field_by_name;
use skyproj::pipeline::run_reprojection;
use skyproj::reproject::Pointing;
use skyproj::shared_args::ImageArgs;
use skyproj::units::BrightnessConversion;
use std::path::PathBuf;

/// Command line arguments for HEALPix-to-SIN reprojection
#[derive(Parser, Debug)]
#[command(
    name = "hpx2sin",
    about = "Reproject a HEALPix map onto an orthographic image",
    long_about = None
)]
struct Args {
    /// Input HEALPix FITS file
    hpxfile: PathBuf,

    /// Output image FITS file
    fitsfile: PathBuf,

    /// Image centre right ascension in degrees
    #[arg(allow_negative_numbers = true, requires = "dec")]
    ra: Option<f64>,

    /// Image centre declination in degrees
    #[arg(allow_negative_numbers = true, requires = "ra")]
    dec: Option<f64>,

    /// Named field instead of RA/Dec (EoR0, EoR1, EoR2, or with a _zenith suffix)
    #[arg(long, conflicts_with_all = ["ra", "dec"])]
    field: Option<String>,

    #[command(flatten)]
    image: ImageArgs,

    /// Convert kelvin to Jy/sr at this frequency in MHz
    #[arg(long, value_name = "FREQ_MHZ")]
    k_to_jy: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let pointing = match (&args.field, args.ra, args.dec) {
        (Some(name), _, _) => field_by_name(name)?.pointing(),
        (None, Some(ra), Some(dec)) => Pointing::new(ra, dec),
        _ => bail!("give either RA and Dec or --field"),
    };

    let mut params = args.image.params();
    if let Some(freq_mhz) = args.k_to_jy {
        let conversion = BrightnessConversion::KToJyPerSr { freq_mhz };
        params.multiplier *= conversion.factor();
        info!("Scaling map by {:.6e} for K -> Jy/sr", conversion.factor());
    }

    run_reprojection(&args.hpxfile, &args.fitsfile, pointing, &params)
        .with_context(|| format!("reprojecting {}", args.hpxfile.display()))?;
    println!("{}", args.fitsfile.display());
    Ok(())
}
