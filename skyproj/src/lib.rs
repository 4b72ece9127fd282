//! 21 cm light-cone sky projection
//!
//! This crate turns periodic simulation volumes into sky maps in three
//! stages: redshift interpolation between volume snapshots, sampling a
//! volume on a comoving shell into a HEALPix map, and reprojecting that map
//! onto an orthographic (SIN) image. The binaries in `src/bin` wrap each
//! stage, and [`tasks`] runs many of them on a worker pool.

pub mod bands;
pub mod error;
pub mod frames;
pub mod healpix;
pub mod io;
pub mod pipeline;
pub mod redshift;
pub mod reproject;
pub mod sampler;
pub mod shared_args;
pub mod sphere_map;
pub mod tasks;
pub mod units;
pub mod volume;
pub mod wcs;

// Re-exports for easier access
pub use error::{Result, SkyProjError};
pub use frames::CoordFrame;
pub use healpix::PixelDirectionTable;
pub use redshift::{interpolate, select_or_interpolate, RedshiftSeries, Selection};
pub use reproject::{reproject, FlatImage, ImageParams, Pointing};
pub use sampler::{frequency_to_redshift, SamplingGeometry, VolumeSampler, F21_MHZ};
pub use sphere_map::SphericalPixelMap;
pub use tasks::{run_batch, BatchConfig, Job, WorkerPool};
pub use volume::{Volume, VolumeGeometry};
pub use wcs::OrthographicProjection;
