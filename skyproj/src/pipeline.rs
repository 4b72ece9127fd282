//! File-to-file stage runners.
//!
//! Each runner reads its inputs, runs one pipeline stage and writes the
//! result last, so a failed run never leaves a partial output behind. The
//! CLIs and the batch driver are thin wrappers around these.

use crate::error::Result;
use crate::healpix::{ang2pix_ring, PixelDirectionTable};
use crate::io::{read_healpix_map, read_volume, write_healpix_map, write_sin_image, write_volume};
use crate::redshift::{interpolate, RedshiftSeries, Selection};
use crate::reproject::{reproject, ImageParams, Pointing, Provenance};
use crate::sampler::{SamplingGeometry, VolumeSampler};
use crate::volume::VolumeGeometry;
use cosmology::DistanceModel;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Default output name for an interpolated volume
pub fn default_interpolation_output(target_z: f64) -> PathBuf {
    PathBuf::from(format!("interp_cube_z{target_z:.3}.bin"))
}

/// Produce the volume for `target_z` from a series of volume files.
///
/// Only the one or two files the target actually needs are read.
pub fn run_interpolation(
    target_z: f64,
    series: &RedshiftSeries<PathBuf>,
    geometry: &VolumeGeometry,
    output: &Path,
) -> Result<()> {
    let volume = match series.select(target_z)? {
        Selection::Exact { item, .. } => {
            info!("z={target_z} matches {} exactly", item.display());
            read_volume(item, geometry)?
        }
        Selection::ClampLow { item } | Selection::ClampHigh { item } => {
            warn!(
                "z={target_z} is outside the series range [{}, {}]; using {}",
                series.redshifts()[0],
                series.redshifts()[series.len() - 1],
                item.display()
            );
            read_volume(item, geometry)?
        }
        Selection::Bracket {
            lo, hi, z_lo, z_hi, ..
        } => {
            info!(
                "Interpolating z={target_z} from {} (z={z_lo}) and {} (z={z_hi})",
                lo.display(),
                hi.display()
            );
            let lo = read_volume(lo, geometry)?;
            let hi = read_volume(hi, geometry)?;
            interpolate(&lo, &hi, z_lo, z_hi, target_z)?
        }
    };
    write_volume(&volume, output)?;
    info!("Wrote z={target_z} volume to {}", output.display());
    Ok(())
}

/// Project one volume file onto the HEALPix shell at `freq_mhz`.
pub fn run_projection<M: DistanceModel>(
    input: &Path,
    output: &Path,
    freq_mhz: f64,
    geometry: &SamplingGeometry,
    sampler: &VolumeSampler<M>,
    table: &PixelDirectionTable,
) -> Result<()> {
    let volume = read_volume(input, &geometry.volume)?;
    let map = sampler.project(&volume, geometry, freq_mhz, table)?;
    write_healpix_map(&map, output)?;
    info!(
        "Projected {} at {freq_mhz} MHz to {}",
        input.display(),
        output.display()
    );
    Ok(())
}

/// Reproject one HEALPix map file onto a SIN image.
///
/// When `params` carries no provenance, the input and output paths are
/// recorded instead.
pub fn run_reprojection(
    input: &Path,
    output: &Path,
    pointing: Pointing,
    params: &ImageParams,
) -> Result<()> {
    let map = read_healpix_map(input)?;

    let mut params = params.clone();
    if params.provenance == Provenance::default() {
        params.provenance = Provenance {
            input: input.display().to_string(),
            output: output.display().to_string(),
        };
    }

    let image = reproject(&map, pointing, &params)?;
    // Pointing is validated by now
    let theta = (90.0 - pointing.dec_deg).to_radians();
    let phi = pointing.ra_deg.to_radians();
    info!(
        "Pointing ({:.3}, {:.3}) falls in map pixel {} (value {:.6e})",
        pointing.ra_deg,
        pointing.dec_deg,
        ang2pix_ring(map.nside(), theta, phi),
        map.nearest(theta, phi)
    );
    write_sin_image(&image, output)?;
    info!("Wrote SIN image {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::CoordFrame;
    use crate::io::{read_sin_image, write_healpix_map};
    use crate::sphere_map::SphericalPixelMap;
    use crate::volume::Volume;
    use approx::assert_relative_eq;
    use cosmology::FixedDistance;
    use tempfile::tempdir;
    use test_helpers::constant_sky;

    #[test]
    fn test_default_output_name() {
        assert_eq!(
            default_interpolation_output(6.5),
            PathBuf::from("interp_cube_z6.500.bin")
        );
    }

    #[test]
    fn test_interpolation_reads_only_needed_files() {
        let dir = tempdir().unwrap();
        let geometry = VolumeGeometry::new([2, 2, 2], 1.0).unwrap();
        let lo = dir.path().join("lo.bin");
        let hi = dir.path().join("hi.bin");
        write_volume(&Volume::from_elem([2, 2, 2], 1.0).unwrap(), &lo).unwrap();
        write_volume(&Volume::from_elem([2, 2, 2], 3.0).unwrap(), &hi).unwrap();
        // The third member never exists on disk; selecting around it must not touch it
        let missing = dir.path().join("missing.bin");
        let series =
            RedshiftSeries::new(vec![(6.0, lo), (7.0, hi), (8.0, missing)]).unwrap();

        let out = dir.path().join("out.bin");
        run_interpolation(6.5, &series, &geometry, &out).unwrap();
        let volume = read_volume(&out, &geometry).unwrap();
        assert!(volume.data().iter().all(|&v| (v - 2.0).abs() < 1e-12));

        run_interpolation(5.0, &series, &geometry, &out).unwrap();
        assert_eq!(read_volume(&out, &geometry).unwrap().at([0, 0, 0]), 1.0);

        assert!(run_interpolation(7.5, &series, &geometry, &out).is_err());
    }

    #[test]
    fn test_projection_then_reprojection() {
        let dir = tempdir().unwrap();
        let cube = dir.path().join("cube.bin");
        let map_path = dir.path().join("map.fits");
        let image_path = dir.path().join("image.fits");

        let geometry = SamplingGeometry {
            volume: VolumeGeometry::new([4, 4, 4], 1.0).unwrap(),
            nside: 4,
        };
        write_volume(&Volume::from_elem([4, 4, 4], 5.0).unwrap(), &cube).unwrap();
        let table = PixelDirectionTable::new(4).unwrap();
        let sampler = VolumeSampler::new(FixedDistance(3.0));
        run_projection(&cube, &map_path, 150.0, &geometry, &sampler, &table).unwrap();

        let params = ImageParams {
            size: 24,
            res_deg: 5.0,
            ..ImageParams::default()
        };
        run_reprojection(&map_path, &image_path, Pointing::new(0.0, -30.0), &params).unwrap();
        let image = read_sin_image(&image_path).unwrap();
        assert_relative_eq!(image.data[[12, 12]], 5.0, epsilon = 1e-12);
        assert_eq!(image.data[[0, 0]], 0.0);
    }

    #[test]
    fn test_invalid_image_writes_nothing() {
        let dir = tempdir().unwrap();
        let map_path = dir.path().join("map.fits");
        let image_path = dir.path().join("image.fits");
        let map = SphericalPixelMap::new(constant_sky(2, 1.0), CoordFrame::Celestial).unwrap();
        write_healpix_map(&map, &map_path).unwrap();

        let params = ImageParams {
            size: 0,
            ..ImageParams::default()
        };
        assert!(run_reprojection(&map_path, &image_path, Pointing::new(0.0, 0.0), &params).is_err());
        assert!(!image_path.exists());
    }
}
