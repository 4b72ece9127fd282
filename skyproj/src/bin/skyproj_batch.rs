//! Run a batch of pipeline jobs on a worker pool.
//!
//! The batch is a JSON [`BatchConfig`]: explicit jobs plus band sweeps.
//! Every job runs independently; the process exits non-zero if any failed.
//!
//! Usage:
//! ```
//! cargo run --release --bin skyproj_batch -- batch.json --workers 16
//! cargo run --release --bin skyproj_batch -- --write-template batch.json
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use skyproj::tasks::{run_batch, BatchConfig, Sweep, SweepStage};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(
    name = "skyproj_batch",
    about = "Run interpolation, projection and reprojection jobs in parallel",
    long_about = None
)]
struct Args {
    /// Batch configuration file
    config: PathBuf,

    /// Override the configured number of workers
    #[arg(short, long)]
    workers: Option<usize>,

    /// List the jobs without running them
    #[arg(long)]
    dry_run: bool,

    /// Write an example configuration to CONFIG and exit
    #[arg(long)]
    write_template: bool,
}

fn template() -> BatchConfig {
    BatchConfig {
        sweeps: vec![
            Sweep {
                stage: SweepStage::Project,
                band: "EoR_low_80kHz".to_string(),
                input: Some("cubes/interp_cube_z{z}.bin".to_string()),
                output: "maps/hpx_{mhz}MHz.fits".to_string(),
                field: None,
            },
            Sweep {
                stage: SweepStage::Reproject,
                band: "EoR_low_80kHz".to_string(),
                input: Some("maps/hpx_{mhz}MHz.fits".to_string()),
                output: "images/sin_{mhz}MHz.fits".to_string(),
                field: Some("EoR0_zenith".to_string()),
            },
        ],
        ..BatchConfig::default()
    }
}

fn main() -> Result<ExitCode> {
    env_logger::init();
    let args = Args::parse();

    if args.write_template {
        template().save_to_file(&args.config)?;
        println!("Wrote template to {}", args.config.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = BatchConfig::load_from_file(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(workers) = args.workers {
        config.workers = workers;
    }

    if args.dry_run {
        for (i, job) in config.all_jobs()?.iter().enumerate() {
            println!("[{i}] {}", job.label());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let report = run_batch(&config)?;
    println!(
        "{} of {} jobs succeeded",
        report.succeeded(),
        report.outcomes.len()
    );
    for failure in report.failures() {
        if let Err(e) = &failure.result {
            println!("  FAILED [{}] {}: {e}", failure.index, failure.label);
        }
    }

    Ok(if report.all_succeeded() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
