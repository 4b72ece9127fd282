//! Orthographic (SIN) projection between square image pixels and sky
//! coordinates.
//!
//! Pixel coordinates are 0-based. FITS `CRPIX = size/2` on both axes, so the
//! pointing sits at 0-based pixel `size/2 - 1` for even sizes. RA increases
//! to the left, so `CDELT1 = -res`. Directions on the far hemisphere, or pixels whose
//! native radius exceeds 1, have no counterpart and map to `None`.

use crate::error::{Result, SkyProjError};
use serde::{Deserialize, Serialize};

/// Default image side in pixels
pub const DEFAULT_IMAGE_SIZE: usize = 7480;

/// Default pixel scale in degrees. At the default size the projected
/// hemisphere (radius 1 rad) just fits inside the image.
pub const DEFAULT_PIXEL_SCALE_DEG: f64 = 0.015_322_941_176_470_588;

/// SIN projection centred on a pointing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrthographicProjection {
    /// Pointing RA in degrees
    pub crval_ra: f64,
    /// Pointing Dec in degrees
    pub crval_dec: f64,
    /// Square image side in pixels
    pub size: usize,
    /// Pixel scale in degrees per pixel
    pub res: f64,
}

impl OrthographicProjection {
    /// # Errors
    /// `InvalidGeometry` for a zero size, a non-positive scale, or a
    /// declination outside `[-90, 90]`.
    pub fn new(ra_deg: f64, dec_deg: f64, size: usize, res_deg: f64) -> Result<Self> {
        if size == 0 {
            return Err(SkyProjError::InvalidGeometry(
                "image size must be positive".to_string(),
            ));
        }
        if !(res_deg.is_finite() && res_deg > 0.0) {
            return Err(SkyProjError::InvalidGeometry(format!(
                "pixel scale must be positive, got {res_deg}"
            )));
        }
        if !ra_deg.is_finite() || !(-90.0..=90.0).contains(&dec_deg) {
            return Err(SkyProjError::InvalidGeometry(format!(
                "pointing ({ra_deg}, {dec_deg}) is not a valid RA/Dec"
            )));
        }
        Ok(Self {
            crval_ra: ra_deg.rem_euclid(360.0),
            crval_dec: dec_deg,
            size,
            res: res_deg,
        })
    }

    /// 1-based FITS `CRPIX`, identical on both axes
    pub fn fits_reference_pixel(&self) -> f64 {
        self.size as f64 / 2.0
    }

    /// 0-based reference pixel
    pub fn reference_pixel(&self) -> f64 {
        self.fits_reference_pixel() - 1.0
    }

    /// `(CDELT1, CDELT2)` in degrees
    pub fn cdelt(&self) -> (f64, f64) {
        (-self.res, self.res)
    }

    /// Sky coordinates `(ra, dec)` in degrees of pixel `(x, y)`, with RA in
    /// `[0, 360)`. `None` outside the projected disk.
    pub fn pixel_to_world(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let c = self.reference_pixel();
        let l = (-self.res * (x - c)).to_radians();
        let m = (self.res * (y - c)).to_radians();
        let r2 = l * l + m * m;
        if r2 > 1.0 {
            return None;
        }
        let n = (1.0 - r2).sqrt();

        let (sin_d0, cos_d0) = self.crval_dec.to_radians().sin_cos();
        let dec = (m * cos_d0 + n * sin_d0).clamp(-1.0, 1.0).asin();
        let dra = l.atan2(n * cos_d0 - m * sin_d0);
        let ra = (self.crval_ra + dra.to_degrees()).rem_euclid(360.0);
        Some((ra, dec.to_degrees()))
    }

    /// Pixel `(x, y)` of sky coordinates in degrees. `None` for directions
    /// on the far hemisphere.
    pub fn world_to_pixel(&self, ra_deg: f64, dec_deg: f64) -> Option<(f64, f64)> {
        let (sin_d, cos_d) = dec_deg.to_radians().sin_cos();
        let (sin_d0, cos_d0) = self.crval_dec.to_radians().sin_cos();
        let (sin_da, cos_da) = (ra_deg - self.crval_ra).to_radians().sin_cos();

        let n = sin_d * sin_d0 + cos_d * cos_d0 * cos_da;
        if n < 0.0 {
            return None;
        }
        let l = cos_d * sin_da;
        let m = sin_d * cos_d0 - cos_d * sin_d0 * cos_da;

        let c = self.reference_pixel();
        Some((c - l.to_degrees() / self.res, c + m.to_degrees() / self.res))
    }
}
