//! Full-sky HEALPix maps in RING ordering.

use crate::error::{Result, SkyProjError};
use crate::frames::CoordFrame;
use crate::healpix::{ang2pix_ring, get_interpol_ring, npix2nside};

/// One value per HEALPix RING pixel, tagged with the frame the pixel
/// directions are expressed in.
#[derive(Debug, Clone, PartialEq)]
pub struct SphericalPixelMap {
    nside: usize,
    frame: CoordFrame,
    values: Vec<f64>,
}

impl SphericalPixelMap {
    /// Wrap per-pixel values.
    ///
    /// # Errors
    /// `InvalidPixelization` if `values.len()` is not `12·N²`.
    pub fn new(values: Vec<f64>, frame: CoordFrame) -> Result<Self> {
        let nside = npix2nside(values.len())?;
        Ok(Self {
            nside,
            frame,
            values,
        })
    }

    /// Wrap values whose NSIDE is already known, checking that it matches
    pub fn with_nside(nside: usize, values: Vec<f64>, frame: CoordFrame) -> Result<Self> {
        let map = Self::new(values, frame)?;
        if map.nside != nside {
            return Err(SkyProjError::InvalidGeometry(format!(
                "map has NSIDE={} but NSIDE={nside} was declared",
                map.nside
            )));
        }
        Ok(map)
    }

    pub fn nside(&self) -> usize {
        self.nside
    }

    pub fn npix(&self) -> usize {
        self.values.len()
    }

    pub fn frame(&self) -> CoordFrame {
        self.frame
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn into_values(self) -> Vec<f64> {
        self.values
    }

    /// Bilinear interpolation over the four neighbouring pixels of
    /// `(theta, phi)`, both in radians in this map's frame
    pub fn interpolate(&self, theta: f64, phi: f64) -> f64 {
        self.interpolate_scaled(theta, phi, 1.0)
    }

    /// As [`Self::interpolate`], with every neighbour value scaled by
    /// `multiplier` before weighting
    pub fn interpolate_scaled(&self, theta: f64, phi: f64, multiplier: f64) -> f64 {
        let (pix, wgt) = get_interpol_ring(self.nside, theta, phi);
        pix.iter()
            .zip(wgt.iter())
            .map(|(&p, &w)| w * (multiplier * self.values[p]))
            .sum()
    }

    /// Value of the pixel containing `(theta, phi)`
    pub fn nearest(&self, theta: f64, phi: f64) -> f64 {
        self.values[ang2pix_ring(self.nside, theta, phi)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::healpix::pix2ang_ring;
    use approx::assert_relative_eq;
    use test_helpers::constant_sky;

    #[test]
    fn test_rejects_bad_length() {
        assert!(matches!(
            SphericalPixelMap::new(vec![0.0; 100], CoordFrame::Celestial),
            Err(SkyProjError::InvalidPixelization { npix: 100 })
        ));
        assert!(matches!(
            SphericalPixelMap::new(vec![], CoordFrame::Celestial),
            Err(SkyProjError::InvalidPixelization { npix: 0 })
        ));
    }

    #[test]
    fn test_declared_nside_must_match() {
        assert!(SphericalPixelMap::with_nside(2, constant_sky(2, 1.0), CoordFrame::Galactic).is_ok());
        assert!(matches!(
            SphericalPixelMap::with_nside(4, constant_sky(2, 1.0), CoordFrame::Galactic),
            Err(SkyProjError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_constant_map_interpolates_to_constant() {
        let map = SphericalPixelMap::new(constant_sky(8, 5.0), CoordFrame::Celestial).unwrap();
        assert_eq!(map.nside(), 8);
        assert_eq!(map.npix(), 768);
        for i in 0..30 {
            let theta = 0.1 * i as f64;
            let phi = 0.37 * i as f64;
            assert_relative_eq!(map.interpolate(theta, phi), 5.0, epsilon = 1e-12);
            assert_relative_eq!(map.interpolate_scaled(theta, phi, 2.0), 10.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_nearest_returns_pixel_value() {
        let nside = 4;
        let values: Vec<f64> = (0..192).map(|p| p as f64 * 0.5).collect();
        let map = SphericalPixelMap::new(values, CoordFrame::Celestial).unwrap();
        for pix in [0, 5, 77, 191] {
            let (theta, phi) = pix2ang_ring(nside, pix);
            assert_eq!(map.nearest(theta, phi), pix as f64 * 0.5);
        }
    }
}
