//! Celestial, ecliptic and galactic sky frames.
//!
//! Every transform here is a stateless rotation about the origin. The matrices
//! are IAU J2000 values; `rotation_matrix(from, to)` composes them through the
//! celestial (equatorial) frame.

use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Obliquity of the ecliptic at J2000, degrees
pub const OBLIQUITY_J2000_DEG: f64 = 23.439_291_1;

/// Coordinate frame a spherical map is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoordFrame {
    /// Equatorial RA/Dec (FITS `COORDSYS = C`)
    #[default]
    #[serde(rename = "C")]
    Celestial,
    #[serde(rename = "E")]
    Ecliptic,
    #[serde(rename = "G")]
    Galactic,
}

impl CoordFrame {
    /// Single-letter HEALPix `COORDSYS` code
    pub fn code(self) -> char {
        match self {
            CoordFrame::Celestial => 'C',
            CoordFrame::Ecliptic => 'E',
            CoordFrame::Galactic => 'G',
        }
    }

    /// Rotation taking celestial unit vectors into this frame
    fn rotation_from_celestial(self) -> Matrix3<f64> {
        match self {
            CoordFrame::Celestial => Matrix3::identity(),
            CoordFrame::Ecliptic => celestial_to_ecliptic(),
            CoordFrame::Galactic => celestial_to_galactic(),
        }
    }
}

impl fmt::Display for CoordFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl FromStr for CoordFrame {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "C" | "Q" | "EQ" | "CELESTIAL" | "EQUATORIAL" => Ok(CoordFrame::Celestial),
            "E" | "ECLIPTIC" => Ok(CoordFrame::Ecliptic),
            "G" | "GALACTIC" => Ok(CoordFrame::Galactic),
            other => Err(format!(
                "unknown coordinate frame '{other}', expected one of C, E, G"
            )),
        }
    }
}

#[rustfmt::skip]
fn celestial_to_galactic() -> Matrix3<f64> {
    Matrix3::new(
        -0.054_875_560_4, -0.873_437_090_2, -0.483_835_015_5,
        0.494_109_427_9, -0.444_829_630_0, 0.746_982_244_5,
        -0.867_666_149_0, -0.198_076_373_4, 0.455_983_776_2,
    )
}

#[rustfmt::skip]
fn celestial_to_ecliptic() -> Matrix3<f64> {
    let (sin_e, cos_e) = OBLIQUITY_J2000_DEG.to_radians().sin_cos();
    Matrix3::new(
        1.0, 0.0, 0.0,
        0.0, cos_e, sin_e,
        0.0, -sin_e, cos_e,
    )
}

/// Matrix rotating unit vectors expressed in `from` into `to`
pub fn rotation_matrix(from: CoordFrame, to: CoordFrame) -> Matrix3<f64> {
    to.rotation_from_celestial() * from.rotation_from_celestial().transpose()
}

/// Rotate a direction vector between frames
pub fn rotate_vector(from: CoordFrame, to: CoordFrame, v: [f64; 3]) -> [f64; 3] {
    if from == to {
        return v;
    }
    let r = rotation_matrix(from, to) * Vector3::new(v[0], v[1], v[2]);
    [r.x, r.y, r.z]
}

/// Unit vector for colatitude `theta` and longitude `phi` (radians)
pub fn ang2vec(theta: f64, phi: f64) -> [f64; 3] {
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();
    [sin_t * cos_p, sin_t * sin_p, cos_t]
}

/// Colatitude in `[0, π]` and longitude in `[0, 2π)` of a vector
pub fn vec2ang(v: [f64; 3]) -> (f64, f64) {
    let norm = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    let theta = (v[2] / norm).clamp(-1.0, 1.0).acos();
    let phi = v[1].atan2(v[0]).rem_euclid(TAU);
    (theta, phi)
}

/// Rotate HEALPix angles `(theta, phi)` from one frame to another
pub fn rotate_angles(from: CoordFrame, to: CoordFrame, theta: f64, phi: f64) -> (f64, f64) {
    if from == to {
        return (theta, phi);
    }
    vec2ang(rotate_vector(from, to, ang2vec(theta, phi)))
}
