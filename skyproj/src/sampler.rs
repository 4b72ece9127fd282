//! Cube-to-sphere projection.
//!
//! Each observing frequency picks out one comoving shell around the observer.
//! The shell is laid through the periodic simulation box (tiling it as often
//! as needed) and every HEALPix pixel takes the value of the cell its
//! direction lands in at that radius.

use crate::error::{Result, SkyProjError};
use crate::frames::CoordFrame;
use crate::healpix::PixelDirectionTable;
use crate::sphere_map::SphericalPixelMap;
use crate::volume::{Volume, VolumeGeometry};
use cosmology::DistanceModel;
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Rest frequency of the hydrogen 21 cm line, MHz
pub const F21_MHZ: f64 = 1420.405_751_77;

/// Default output NSIDE
pub const DEFAULT_NSIDE: usize = 4096;

/// Redshift at which 21 cm emission is observed at `freq_mhz`.
///
/// # Errors
/// `InvalidInput` unless the frequency is positive and finite.
pub fn frequency_to_redshift(freq_mhz: f64) -> Result<f64> {
    if !(freq_mhz.is_finite() && freq_mhz > 0.0) {
        return Err(SkyProjError::InvalidInput(format!(
            "observing frequency must be positive, got {freq_mhz} MHz"
        )));
    }
    Ok(F21_MHZ / freq_mhz - 1.0)
}

/// Observed 21 cm frequency in MHz for emission at redshift `z`
pub fn redshift_to_frequency(z: f64) -> f64 {
    F21_MHZ / (1.0 + z)
}

/// Declared geometry of a projection: the simulation box and the output
/// pixelization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingGeometry {
    pub volume: VolumeGeometry,
    pub nside: usize,
}

impl Default for SamplingGeometry {
    fn default() -> Self {
        Self {
            volume: VolumeGeometry::default(),
            nside: DEFAULT_NSIDE,
        }
    }
}

/// Projects volumes onto HEALPix shells using a distance model for the shell
/// radius.
#[derive(Debug, Clone)]
pub struct VolumeSampler<M> {
    distance: M,
}

impl<M: DistanceModel> VolumeSampler<M> {
    pub fn new(distance: M) -> Self {
        Self { distance }
    }

    pub fn distance_model(&self) -> &M {
        &self.distance
    }

    /// Comoving radius of the shell observed at `freq_mhz`
    pub fn shell_radius(&self, freq_mhz: f64) -> Result<f64> {
        let z = frequency_to_redshift(freq_mhz)?;
        Ok(self.distance.comoving_distance(z)?)
    }

    /// Sample `volume` on the shell observed at `freq_mhz`.
    ///
    /// Preconditions are checked before any sampling, in order: the table
    /// NSIDE must match the declared NSIDE (`InvalidGeometry`), the volume
    /// must match the declared box (`Shape`), and the frequency must be
    /// positive (`InvalidInput`). The returned map is in the celestial frame.
    pub fn project(
        &self,
        volume: &Volume,
        geometry: &SamplingGeometry,
        freq_mhz: f64,
        table: &PixelDirectionTable,
    ) -> Result<SphericalPixelMap> {
        check_geometry(volume, geometry, table)?;
        let z = frequency_to_redshift(freq_mhz)?;
        let dc = self.distance.comoving_distance(z)?;
        debug!("Shell at {freq_mhz} MHz: z={z:.6}, comoving distance {dc:.4}");
        project_at_distance(volume, geometry, dc, table)
    }
}

fn check_geometry(
    volume: &Volume,
    geometry: &SamplingGeometry,
    table: &PixelDirectionTable,
) -> Result<()> {
    if table.nside() != geometry.nside {
        return Err(SkyProjError::InvalidGeometry(format!(
            "direction table has NSIDE={} but output NSIDE={} was requested",
            table.nside(),
            geometry.nside
        )));
    }
    geometry.volume.check_volume(volume)
}

/// Sample `volume` on a shell of comoving radius `dc`.
///
/// Pixel `p` takes the value of the cell nearest `dc · direction[p]`, wrapped
/// periodically into the box.
pub fn project_at_distance(
    volume: &Volume,
    geometry: &SamplingGeometry,
    dc: f64,
    table: &PixelDirectionTable,
) -> Result<SphericalPixelMap> {
    check_geometry(volume, geometry, table)?;
    if !(dc.is_finite() && dc >= 0.0) {
        return Err(SkyProjError::InvalidInput(format!(
            "shell radius must be non-negative, got {dc}"
        )));
    }

    let box_geometry = &geometry.volume;
    let values: Vec<f64> = table
        .directions()
        .iter()
        .map(|v| volume.at(box_geometry.wrap_offset([dc * v[0], dc * v[1], dc * v[2]])))
        .collect();

    info!(
        "Projected {:?} volume onto NSIDE={} shell at radius {dc:.4}",
        box_geometry.shape, geometry.nside
    );
    SphericalPixelMap::with_nside(geometry.nside, values, CoordFrame::Celestial)
}
