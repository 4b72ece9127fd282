//! Batch jobs and the worker pool that runs them.
//!
//! A batch is a list of independent [`Job`]s, each an `(input, output,
//! parameters)` triple for one pipeline stage. Jobs are either listed
//! explicitly or generated by a [`Sweep`] over a named frequency band. The
//! [`WorkerPool`] runs them on a fixed number of threads; a failed job is
//! reported and never retried, and does not stop the others.

use crate::bands::{band_by_name, field_by_name};
use crate::error::{Result, SkyProjError};
use crate::healpix::PixelDirectionTable;
use crate::io::{load_or_build, read_series_listing, series_from_lists};
use crate::pipeline::{run_interpolation, run_projection, run_reprojection};
use crate::redshift::RedshiftSeries;
use crate::reproject::{ImageParams, Pointing};
use crate::sampler::{frequency_to_redshift, SamplingGeometry, VolumeSampler};
use crate::units::BrightnessConversion;
use cosmology::FlatLambdaCdm;
use log::{error, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Default number of worker threads
pub const DEFAULT_WORKERS: usize = 8;

/// One unit of work for a single pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Job {
    Interpolate {
        target_z: f64,
        output: PathBuf,
    },
    Project {
        input: PathBuf,
        output: PathBuf,
        freq_mhz: f64,
    },
    Reproject {
        input: PathBuf,
        output: PathBuf,
        pointing: Pointing,
    },
}

impl Job {
    /// Short description used in logs and the outcome summary
    pub fn label(&self) -> String {
        match self {
            Job::Interpolate { target_z, output } => {
                format!("interpolate z={target_z:.4} -> {}", output.display())
            }
            Job::Project {
                input,
                output,
                freq_mhz,
            } => format!(
                "project {} @ {freq_mhz:.3} MHz -> {}",
                input.display(),
                output.display()
            ),
            Job::Reproject {
                input,
                output,
                pointing,
            } => format!(
                "reproject {} @ ({:.3}, {:.3}) -> {}",
                input.display(),
                pointing.ra_deg,
                pointing.dec_deg,
                output.display()
            ),
        }
    }
}

/// Where the redshift series for interpolation jobs comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SeriesSource {
    /// CSV listing of `redshift,path` rows
    Listing { listing: PathBuf },
    /// Paired lists
    Pairs {
        redshifts: Vec<f64>,
        volumes: Vec<PathBuf>,
    },
}

impl SeriesSource {
    pub fn load(&self) -> Result<RedshiftSeries<PathBuf>> {
        match self {
            SeriesSource::Listing { listing } => read_series_listing(listing),
            SeriesSource::Pairs { redshifts, volumes } => series_from_lists(redshifts, volumes),
        }
    }
}

/// Stage a sweep generates jobs for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepStage {
    Interpolate,
    Project,
    Reproject,
}

/// One job per channel of a named band.
///
/// `input` and `output` are path templates; `{mhz}` is replaced by the
/// channel frequency and `{z}` by its 21 cm redshift, both to 3 decimals.
/// Reprojection sweeps also need a named `field` (e.g. `EoR0` or
/// `EoR0_zenith`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sweep {
    pub stage: SweepStage,
    pub band: String,
    #[serde(default)]
    pub input: Option<String>,
    pub output: String,
    #[serde(default)]
    pub field: Option<String>,
}

fn fill_template(template: &str, freq_mhz: f64, z: f64) -> PathBuf {
    PathBuf::from(
        template
            .replace("{mhz}", &format!("{freq_mhz:.3}"))
            .replace("{z}", &format!("{z:.3}")),
    )
}

impl Sweep {
    /// Expand into one job per channel
    pub fn expand(&self) -> Result<Vec<Job>> {
        let band = band_by_name(&self.band)?;
        let input = || {
            self.input.as_deref().ok_or_else(|| {
                SkyProjError::InvalidInput(format!(
                    "{:?} sweep over {} needs an input template",
                    self.stage, self.band
                ))
            })
        };
        let pointing = match (self.stage, &self.field) {
            (SweepStage::Reproject, Some(field)) => field_by_name(field)?.pointing(),
            (SweepStage::Reproject, None) => {
                return Err(SkyProjError::InvalidInput(format!(
                    "reproject sweep over {} needs a field",
                    self.band
                )))
            }
            _ => Pointing::default(),
        };

        band.frequencies()
            .into_iter()
            .map(|freq_mhz| {
                let z = frequency_to_redshift(freq_mhz)?;
                let output = fill_template(&self.output, freq_mhz, z);
                Ok(match self.stage {
                    SweepStage::Interpolate => Job::Interpolate {
                        target_z: z,
                        output,
                    },
                    SweepStage::Project => Job::Project {
                        input: fill_template(input()?, freq_mhz, z),
                        output,
                        freq_mhz,
                    },
                    SweepStage::Reproject => Job::Reproject {
                        input: fill_template(input()?, freq_mhz, z),
                        output,
                        pointing,
                    },
                })
            })
            .collect()
    }
}

/// A batch description, usually read from a JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    pub workers: usize,
    pub geometry: SamplingGeometry,
    /// Direction-table cache file for projection jobs
    pub direction_cache: Option<PathBuf>,
    pub cosmology: FlatLambdaCdm,
    pub image: ImageParams,
    /// Unit change folded into the image multiplier
    pub conversion: BrightnessConversion,
    pub series: Option<SeriesSource>,
    pub jobs: Vec<Job>,
    pub sweeps: Vec<Sweep>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            geometry: SamplingGeometry::default(),
            direction_cache: None,
            cosmology: FlatLambdaCdm::wmap9(),
            image: ImageParams::default(),
            conversion: BrightnessConversion::default(),
            series: None,
            jobs: Vec::new(),
            sweeps: Vec::new(),
        }
    }
}

impl BatchConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Explicit jobs followed by every sweep's jobs
    pub fn all_jobs(&self) -> Result<Vec<Job>> {
        let mut jobs = self.jobs.clone();
        for sweep in &self.sweeps {
            jobs.extend(sweep.expand()?);
        }
        Ok(jobs)
    }
}

/// Outcome of one job
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub index: usize,
    pub label: String,
    pub result: std::result::Result<(), String>,
}

impl TaskOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Per-job outcomes of a batch, in submission order
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_ok()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(TaskOutcome::is_ok)
    }
}

/// Fixed-size pool running independent tasks.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    pub fn new(workers: usize) -> Result<Self> {
        let workers = workers.max(1);
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("skyproj-worker-{i}"))
            .build()?;
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` on every item and collect outcomes in input order
    pub fn run<T, L, F>(&self, items: &[T], label: L, task: F) -> BatchReport
    where
        T: Sync,
        L: Fn(&T) -> String + Sync,
        F: Fn(&T) -> Result<()> + Sync,
    {
        let outcomes = self.pool.install(|| {
            items
                .par_iter()
                .enumerate()
                .map(|(index, item)| {
                    let label = label(item);
                    let started = Instant::now();
                    let result = task(item).map_err(|e| e.to_string());
                    match &result {
                        Ok(()) => info!("[{index}] {label} done in {:.2?}", started.elapsed()),
                        Err(e) => error!("[{index}] {label} failed: {e}"),
                    }
                    TaskOutcome {
                        index,
                        label,
                        result,
                    }
                })
                .collect()
        });
        BatchReport { outcomes }
    }
}

/// Shared read-only state every job of a batch may need
struct BatchContext {
    geometry: SamplingGeometry,
    sampler: VolumeSampler<FlatLambdaCdm>,
    image: ImageParams,
    series: Option<RedshiftSeries<PathBuf>>,
    table: Option<Arc<PixelDirectionTable>>,
}

impl BatchContext {
    fn prepare(config: &BatchConfig, jobs: &[Job]) -> Result<Self> {
        let needs_series = jobs.iter().any(|j| matches!(j, Job::Interpolate { .. }));
        let needs_table = jobs.iter().any(|j| matches!(j, Job::Project { .. }));

        let series = match (&config.series, needs_series) {
            (Some(source), true) => Some(source.load()?),
            (None, true) => {
                return Err(SkyProjError::InvalidInput(
                    "interpolation jobs need a redshift series".to_string(),
                ))
            }
            (_, false) => None,
        };
        let table = if needs_table {
            Some(load_or_build(
                config.direction_cache.as_deref(),
                config.geometry.nside,
            )?)
        } else {
            None
        };

        let mut image = config.image.clone();
        image.multiplier *= config.conversion.factor();

        Ok(Self {
            geometry: config.geometry,
            sampler: VolumeSampler::new(config.cosmology),
            image,
            series,
            table,
        })
    }

    fn run(&self, job: &Job) -> Result<()> {
        match job {
            Job::Interpolate { target_z, output } => {
                let series = self.series.as_ref().ok_or_else(|| {
                    SkyProjError::InvalidInput("no redshift series loaded".to_string())
                })?;
                run_interpolation(*target_z, series, &self.geometry.volume, output)
            }
            Job::Project {
                input,
                output,
                freq_mhz,
            } => {
                let table = self.table.as_ref().ok_or_else(|| {
                    SkyProjError::InvalidGeometry("no direction table loaded".to_string())
                })?;
                run_projection(input, output, *freq_mhz, &self.geometry, &self.sampler, table)
            }
            Job::Reproject {
                input,
                output,
                pointing,
            } => run_reprojection(input, output, *pointing, &self.image),
        }
    }
}

/// Run every job of a batch on a worker pool.
///
/// Setup problems (unreadable series, bad sweep) fail the whole batch before
/// any job starts; per-job failures are collected in the report.
pub fn run_batch(config: &BatchConfig) -> Result<BatchReport> {
    let jobs = config.all_jobs()?;
    let context = BatchContext::prepare(config, &jobs)?;
    let pool = WorkerPool::new(config.workers)?;
    info!("Running {} jobs on {} workers", jobs.len(), pool.workers());

    let report = pool.run(&jobs, Job::label, |job| context.run(job));
    info!(
        "Batch finished: {} of {} jobs succeeded",
        report.succeeded(),
        report.outcomes.len()
    );
    Ok(report)
}
