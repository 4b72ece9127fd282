//! HEALPix RING-scheme pixel geometry.
//!
//! Pixel centres and pixel lookup come from [`cdshealpix::ring`]; this module
//! adds NSIDE validation and the four-pixel bilinear weights used for map
//! interpolation. Angles follow the HEALPix convention: `theta` is colatitude
//! in `[0, π]`, `phi` is longitude in radians.
//!
//! # Example
//!
//! ```
//! use skyproj::healpix::{ang2pix_ring, nside2npix, pix2ang_ring};
//!
//! let nside = 8;
//! assert_eq!(nside2npix(nside).unwrap(), 768);
//! let (theta, phi) = pix2ang_ring(nside, 100);
//! assert_eq!(ang2pix_ring(nside, theta, phi), 100);
//! ```

use crate::error::{Result, SkyProjError};
use cdshealpix::ring;
use log::debug;
use rayon::prelude::*;
use std::f64::consts::{FRAC_PI_2, PI, TAU};

/// Largest NSIDE the RING routines accept
pub const NSIDE_MAX: usize = 1 << 29;

fn checked_nside(nside: usize) -> Result<u32> {
    if nside == 0 || nside > NSIDE_MAX {
        return Err(SkyProjError::InvalidGeometry(format!(
            "NSIDE={nside} is outside [1, {NSIDE_MAX}]"
        )));
    }
    Ok(nside as u32)
}

/// Number of pixels in a full-sky map of the given NSIDE.
///
/// # Errors
/// `InvalidGeometry` if `nside` is zero or above [`NSIDE_MAX`].
pub fn nside2npix(nside: usize) -> Result<usize> {
    let npix = ring::n_hash(checked_nside(nside)?);
    usize::try_from(npix).map_err(|_| {
        SkyProjError::InvalidGeometry(format!("NSIDE={nside} does not fit in memory"))
    })
}

/// Recover NSIDE from a pixel count.
///
/// # Errors
/// `InvalidPixelization` unless `npix == 12·N²` for some integer `N ≥ 1`.
pub fn npix2nside(npix: usize) -> Result<usize> {
    let invalid = || SkyProjError::InvalidPixelization { npix };
    if npix == 0 || npix % 12 != 0 {
        return Err(invalid());
    }
    let nside = ((npix / 12) as f64).sqrt().round() as usize;
    match nside2npix(nside) {
        Ok(n) if n == npix => Ok(nside),
        _ => Err(invalid()),
    }
}

/// True if `npix` is a valid full-sky pixel count
pub fn is_npix_ok(npix: usize) -> bool {
    npix2nside(npix).is_ok()
}

/// Colatitude and longitude (radians) of a pixel centre.
///
/// `nside` must already be valid (see [`nside2npix`]).
pub fn pix2ang_ring(nside: usize, pix: usize) -> (f64, f64) {
    let (lon, lat) = ring::center(nside as u32, pix as u64);
    (FRAC_PI_2 - lat, lon)
}

/// Unit vector pointing at a pixel centre
pub fn pix2vec_ring(nside: usize, pix: usize) -> [f64; 3] {
    let (lon, lat) = ring::center(nside as u32, pix as u64);
    let (sin_lat, cos_lat) = lat.sin_cos();
    [cos_lat * lon.cos(), cos_lat * lon.sin(), sin_lat]
}

/// Pixel containing the direction `(theta, phi)`; both must be finite
pub fn ang2pix_ring(nside: usize, theta: f64, phi: f64) -> usize {
    let lat = (FRAC_PI_2 - theta).clamp(-FRAC_PI_2, FRAC_PI_2);
    ring::hash(nside as u32, phi, lat) as usize
}

/// Index of the ring north of colatitude `theta` (0 above the first ring)
pub fn ring_above(nside: usize, theta: f64) -> i64 {
    let nside = nside as i64;
    let z = theta.cos();
    let az = z.abs();
    if az <= 2.0 / 3.0 {
        return (nside as f64 * (2.0 - 1.5 * z)) as i64;
    }
    let iring = (nside as f64 * (3.0 * (1.0 - az)).sqrt()) as i64;
    if z > 0.0 {
        iring
    } else {
        4 * nside - iring - 1
    }
}

/// Placement of one iso-latitude ring, rings numbered from 1 at the north pole
#[derive(Debug, Clone, Copy)]
struct RingInfo {
    startpix: i64,
    ringpix: i64,
    theta: f64,
    shifted: bool,
}

impl RingInfo {
    fn new(nside: usize, ring: i64) -> Self {
        let n = nside as i64;
        let npix = 12 * n * n;
        let northring = if ring > 2 * n { 4 * n - ring } else { ring };
        let (ringpix, shifted, mut startpix) = if northring < n {
            (4 * northring, true, 2 * northring * (northring - 1))
        } else {
            let ncap = 2 * n * (n - 1);
            (4 * n, (northring - n) & 1 == 0, ncap + (northring - n) * 4 * n)
        };
        if northring != ring {
            startpix = npix - startpix - ringpix;
        }
        let (_, lat) = ring::center(nside as u32, startpix as u64);
        Self {
            startpix,
            ringpix,
            theta: FRAC_PI_2 - lat,
            shifted,
        }
    }

    /// The two pixels of this ring that straddle `phi`, with linear weights
    fn neighbours(&self, phi: f64) -> ([i64; 2], [f64; 2]) {
        let shift = if self.shifted { 0.5 } else { 0.0 };
        let dphi = TAU / self.ringpix as f64;
        let i = (phi / dphi - shift).floor() as i64;
        let w1 = (phi - (i as f64 + shift) * dphi) / dphi;
        let i1 = i.rem_euclid(self.ringpix);
        let i2 = (i + 1).rem_euclid(self.ringpix);
        (
            [self.startpix + i1, self.startpix + i2],
            [1.0 - w1, w1],
        )
    }
}

/// Four neighbouring pixels of `(theta, phi)` and their bilinear weights.
///
/// Two pixels come from the ring above and two from the ring below; at the
/// poles, where only one ring exists on that side, the missing pair is taken
/// from the pixels across the pole. Weights are non-negative and sum to 1.
pub fn get_interpol_ring(nside: usize, theta: f64, phi: f64) -> ([usize; 4], [f64; 4]) {
    let nl4 = 4 * nside as i64;
    let npix = nl4 * 3 * nside as i64;
    // rem_euclid rounds tiny negative longitudes up to exactly 2π
    let phi = match phi.rem_euclid(TAU) {
        p if p >= TAU => 0.0,
        p => p,
    };

    let ir1 = ring_above(nside, theta);
    let ir2 = ir1 + 1;

    let mut pix = [0i64; 4];
    let mut wgt = [0.0f64; 4];
    let mut theta1 = 0.0;
    let mut theta2 = 0.0;

    if ir1 > 0 {
        let info = RingInfo::new(nside, ir1);
        let (p, w) = info.neighbours(phi);
        pix[..2].copy_from_slice(&p);
        wgt[..2].copy_from_slice(&w);
        theta1 = info.theta;
    }
    if ir2 < nl4 {
        let info = RingInfo::new(nside, ir2);
        let (p, w) = info.neighbours(phi);
        pix[2..].copy_from_slice(&p);
        wgt[2..].copy_from_slice(&w);
        theta2 = info.theta;
    }

    if ir1 == 0 {
        // North pole: borrow the opposite pixels of the first ring
        let wtheta = theta / theta2;
        wgt[2] *= wtheta;
        wgt[3] *= wtheta;
        let fac = (1.0 - wtheta) * 0.25;
        wgt = [fac, fac, wgt[2] + fac, wgt[3] + fac];
        pix[0] = (pix[2] + 2) & 3;
        pix[1] = (pix[3] + 2) & 3;
    } else if ir2 == nl4 {
        // South pole: same trick with the last ring
        let wtheta = (theta - theta1) / (PI - theta1);
        wgt[0] *= 1.0 - wtheta;
        wgt[1] *= 1.0 - wtheta;
        let fac = wtheta * 0.25;
        wgt = [wgt[0] + fac, wgt[1] + fac, fac, fac];
        pix[2] = ((pix[0] + 2) & 3) + npix - 4;
        pix[3] = ((pix[1] + 2) & 3) + npix - 4;
    } else {
        let wtheta = (theta - theta1) / (theta2 - theta1);
        wgt[0] *= 1.0 - wtheta;
        wgt[1] *= 1.0 - wtheta;
        wgt[2] *= wtheta;
        wgt[3] *= wtheta;
    }

    (pix.map(|p| p as usize), wgt)
}

/// Unit vector of every pixel centre for one NSIDE, in RING order.
///
/// Building the table for a large NSIDE is the most expensive setup step of
/// a projection run, so it is computed once (in parallel), shared between
/// tasks behind an `Arc`, and can be cached on disk with
/// [`crate::io::table`].
#[derive(Debug, Clone, PartialEq)]
pub struct PixelDirectionTable {
    nside: usize,
    directions: Vec<[f64; 3]>,
}

impl PixelDirectionTable {
    /// Compute the table for `nside`.
    ///
    /// # Errors
    /// `InvalidGeometry` if `nside` is zero or above [`NSIDE_MAX`].
    pub fn new(nside: usize) -> Result<Self> {
        let npix = nside2npix(nside)?;
        debug!("Computing {npix} pixel directions for NSIDE={nside}");
        let directions = (0..npix)
            .into_par_iter()
            .map(|pix| pix2vec_ring(nside, pix))
            .collect();
        Ok(Self { nside, directions })
    }

    /// Wrap precomputed directions (e.g. read from a cache file).
    ///
    /// # Errors
    /// `InvalidGeometry` if the direction count is not `12·nside²`.
    pub fn from_directions(nside: usize, directions: Vec<[f64; 3]>) -> Result<Self> {
        let npix = nside2npix(nside)?;
        if directions.len() != npix {
            return Err(SkyProjError::InvalidGeometry(format!(
                "{} directions do not match NSIDE={nside} ({npix} pixels)",
                directions.len()
            )));
        }
        Ok(Self { nside, directions })
    }

    pub fn nside(&self) -> usize {
        self.nside
    }

    pub fn len(&self) -> usize {
        self.directions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions.is_empty()
    }

    pub fn directions(&self) -> &[[f64; 3]] {
        &self.directions
    }

    /// Direction of one pixel
    pub fn direction(&self, pix: usize) -> Option<[f64; 3]> {
        self.directions.get(pix).copied()
    }
}
