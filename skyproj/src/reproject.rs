//! HEALPix-to-SIN reprojection ("hpx2sin").
//!
//! Every pixel of a square orthographic image is inverse-projected to RA/Dec,
//! rotated into the sphere map's frame when needed, and sampled from the map
//! by bilinear interpolation. Pixels beyond the projected disk are set to 0
//! and flagged invalid.

use crate::error::Result;
use crate::frames::{rotate_angles, CoordFrame};
use crate::sphere_map::SphericalPixelMap;
use crate::wcs::{OrthographicProjection, DEFAULT_IMAGE_SIZE, DEFAULT_PIXEL_SCALE_DEG};
use chrono::{DateTime, Utc};
use log::{debug, info};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Image centre on the sky, degrees
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pointing {
    pub ra_deg: f64,
    pub dec_deg: f64,
}

impl Pointing {
    pub fn new(ra_deg: f64, dec_deg: f64) -> Self {
        Self { ra_deg, dec_deg }
    }
}

/// Value of a free-form FITS header card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HeaderValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Int(v) => write!(f, "{v}"),
            HeaderValue::Float(v) => write!(f, "{v}"),
            HeaderValue::Str(v) => write!(f, "{v}"),
        }
    }
}

/// Extra key/value/comment card copied into the image header
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderCard {
    pub key: String,
    pub value: HeaderValue,
    #[serde(default)]
    pub comment: Option<String>,
}

impl HeaderCard {
    pub fn new(key: impl Into<String>, value: HeaderValue) -> Self {
        Self {
            key: key.into(),
            value,
            comment: None,
        }
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Input and output names recorded in the provenance history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub input: String,
    pub output: String,
}

/// Output image geometry and sampling options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageParams {
    /// Square image side in pixels
    pub size: usize,
    /// Degrees per pixel at the reference pixel
    pub res_deg: f64,
    /// Uniform factor applied to the map before sampling
    pub multiplier: f64,
    pub provenance: Provenance,
    pub extra_cards: Vec<HeaderCard>,
    /// Treat the map as being in this frame instead of the one it carries
    pub map_frame: Option<CoordFrame>,
}

impl Default for ImageParams {
    fn default() -> Self {
        Self {
            size: DEFAULT_IMAGE_SIZE,
            res_deg: DEFAULT_PIXEL_SCALE_DEG,
            multiplier: 1.0,
            provenance: Provenance::default(),
            extra_cards: Vec::new(),
            map_frame: None,
        }
    }
}

/// A reprojected image with its projection, header cards and history.
///
/// `data` and `valid` are indexed `[[y, x]]`: rows follow the DEC axis and
/// columns the RA axis, which is the row-major layout FITS expects.
#[derive(Debug, Clone)]
pub struct FlatImage {
    pub data: Array2<f64>,
    pub valid: Array2<bool>,
    pub projection: OrthographicProjection,
    pub cards: Vec<HeaderCard>,
    pub history: Vec<String>,
    pub created: DateTime<Utc>,
}

impl FlatImage {
    /// Number of pixels inside the projected disk
    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|&&v| v).count()
    }

    /// `DATE` card value, millisecond precision
    pub fn date_string(&self) -> String {
        self.created.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()
    }
}

/// Provenance lines: a legend followed by the actual values
pub fn history_lines(provenance: &Provenance, projection: &OrthographicProjection) -> Vec<String> {
    vec![
        "hpx2sin hpxfile fitsfile ra dec size res".to_string(),
        format!(
            "hpx2sin {} {} {:.3} {:.3} {} {:.6}",
            provenance.input,
            provenance.output,
            projection.crval_ra,
            projection.crval_dec,
            projection.size,
            projection.res
        ),
    ]
}

/// Reproject `map` onto a SIN image centred on `pointing`.
///
/// The map's pixel count is validated when the map is constructed, so a
/// `SphericalPixelMap` here always holds `12·N²` values.
///
/// # Errors
/// `InvalidGeometry` if the image parameters or pointing are invalid.
pub fn reproject(
    map: &SphericalPixelMap,
    pointing: Pointing,
    params: &ImageParams,
) -> Result<FlatImage> {
    let projection = OrthographicProjection::new(
        pointing.ra_deg,
        pointing.dec_deg,
        params.size,
        params.res_deg,
    )?;
    let size = params.size;
    let frame = params.map_frame.unwrap_or(map.frame());
    debug!(
        "Reprojecting NSIDE={} {} map to {size}x{size} SIN image at ({:.3}, {:.3}), {} deg/px",
        map.nside(),
        frame,
        projection.crval_ra,
        projection.crval_dec,
        projection.res
    );

    let mut data = Array2::<f64>::zeros((size, size));
    let mut valid = Array2::from_elem((size, size), false);

    for ((y, x), value) in data.indexed_iter_mut() {
        let Some((ra, dec)) = projection.pixel_to_world(x as f64, y as f64) else {
            continue;
        };
        let theta = (90.0 - dec).to_radians();
        let phi = ra.to_radians();
        let (theta, phi) = rotate_angles(CoordFrame::Celestial, frame, theta, phi);
        *value = map.interpolate_scaled(theta, phi, params.multiplier);
        valid[[y, x]] = true;
    }

    let image = FlatImage {
        data,
        valid,
        projection,
        cards: params.extra_cards.clone(),
        history: history_lines(&params.provenance, &projection),
        created: Utc::now(),
    };
    info!(
        "Reprojected {} of {} pixels inside the projected disk",
        image.valid_count(),
        size * size
    );
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{ang2vec, rotate_vector, vec2ang};
    use crate::healpix::{nside2npix, pix2ang_ring};
    use approx::assert_relative_eq;
    use test_helpers::constant_sky;

    fn small_params(size: usize, res_deg: f64) -> ImageParams {
        ImageParams {
            size,
            res_deg,
            ..ImageParams::default()
        }
    }

    #[test]
    fn test_constant_map_reprojects_to_constant() {
        let map = SphericalPixelMap::new(constant_sky(8, 5.0), CoordFrame::Celestial).unwrap();
        let image = reproject(&map, Pointing::new(0.0, -30.0), &small_params(64, 4.0)).unwrap();

        assert_eq!(image.data.dim(), (64, 64));
        for ((y, x), &v) in image.data.indexed_iter() {
            if image.valid[[y, x]] {
                assert_relative_eq!(v, 5.0, epsilon = 1e-12);
            } else {
                assert_eq!(v, 0.0);
            }
        }
    }

    #[test]
    fn test_disk_mask() {
        let map = SphericalPixelMap::new(constant_sky(4, 1.0), CoordFrame::Celestial).unwrap();
        // 2 deg/px over 80 px spans 160 deg, wider than the 114.6 deg disk
        let image = reproject(&map, Pointing::new(30.0, 10.0), &small_params(80, 2.0)).unwrap();

        assert!(!image.valid[[0, 0]]);
        assert!(!image.valid[[79, 79]]);
        assert!(image.valid[[40, 40]]);
        for ((y, x), &ok) in image.valid.indexed_iter() {
            let inside = image.projection.pixel_to_world(x as f64, y as f64).is_some();
            assert_eq!(ok, inside);
            assert!(image.data[[y, x]].is_finite());
        }
        assert!(image.valid_count() > 0 && image.valid_count() < 80 * 80);
    }

    #[test]
    fn test_multiplier_scales_output() {
        let map = SphericalPixelMap::new(constant_sky(4, 2.0), CoordFrame::Galactic).unwrap();
        let params = ImageParams {
            multiplier: 691.0,
            ..small_params(16, 5.0)
        };
        let image = reproject(&map, Pointing::new(0.0, 0.0), &params).unwrap();
        assert_relative_eq!(image.data[[8, 8]], 1382.0, epsilon = 1e-9);
    }

    #[test]
    fn test_centre_pixel_samples_pointing() {
        let nside = 16;
        let values: Vec<f64> = (0..nside2npix(nside).unwrap()).map(|p| p as f64).collect();
        let map = SphericalPixelMap::new(values, CoordFrame::Celestial).unwrap();
        let pointing = Pointing::new(45.0, 20.0);
        let image = reproject(&map, pointing, &small_params(32, 1.0)).unwrap();
        assert_eq!(image.projection.fits_reference_pixel(), 16.0);

        let theta = (90.0f64 - 20.0).to_radians();
        let phi = 45.0f64.to_radians();
        assert_relative_eq!(image.data[[15, 15]], map.interpolate(theta, phi), epsilon = 1e-9);
        assert!(image.valid[[15, 15]]);
    }

    #[test]
    fn test_galactic_map_is_rotated() {
        // Map is 1 in the northern galactic hemisphere and 0 in the south
        let nside = 16;
        let values: Vec<f64> = (0..nside2npix(nside).unwrap())
            .map(|p| {
                let (theta, _) = pix2ang_ring(nside, p);
                if theta < std::f64::consts::FRAC_PI_2 { 1.0 } else { 0.0 }
            })
            .collect();
        let map = SphericalPixelMap::new(values, CoordFrame::Galactic).unwrap();

        // Pointing at the north galactic pole, given in celestial coordinates
        let (theta_c, phi_c) = vec2ang(rotate_vector(
            CoordFrame::Galactic,
            CoordFrame::Celestial,
            ang2vec(0.0, 0.0),
        ));
        let pointing = Pointing::new(phi_c.to_degrees(), 90.0 - theta_c.to_degrees());
        let image = reproject(&map, pointing, &small_params(20, 1.0)).unwrap();
        assert_relative_eq!(image.data[[9, 9]], 1.0, epsilon = 1e-12);

        // The antipodal pointing sees the southern galactic hemisphere
        let south = reproject(
            &map,
            Pointing::new(pointing.ra_deg + 180.0, -pointing.dec_deg),
            &small_params(20, 1.0),
        )
        .unwrap();
        assert_relative_eq!(south.data[[9, 9]], 0.0, epsilon = 1e-12);

        // (60, +10) is north of the celestial equator but at b = -31
        let relabeled =
            SphericalPixelMap::new(map.values().to_vec(), CoordFrame::Celestial).unwrap();
        let taurus = Pointing::new(60.0, 10.0);
        let as_celestial = reproject(&relabeled, taurus, &small_params(20, 1.0)).unwrap();
        assert_relative_eq!(as_celestial.data[[9, 9]], 1.0, epsilon = 1e-12);
        let params = ImageParams {
            map_frame: Some(CoordFrame::Galactic),
            ..small_params(20, 1.0)
        };
        let overridden = reproject(&relabeled, taurus, &params).unwrap();
        assert_relative_eq!(overridden.data[[9, 9]], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_history_and_cards() {
        let map = SphericalPixelMap::new(constant_sky(1, 0.0), CoordFrame::Celestial).unwrap();
        let params = ImageParams {
            provenance: Provenance {
                input: "map.fits".to_string(),
                output: "img.fits".to_string(),
            },
            extra_cards: vec![HeaderCard::new("FREQ", HeaderValue::Float(150.0)).with_comment("MHz")],
            ..small_params(4, 1.0)
        };
        let image = reproject(&map, Pointing::new(0.0, -30.0), &params).unwrap();
        assert_eq!(image.history[0], "hpx2sin hpxfile fitsfile ra dec size res");
        assert_eq!(image.history[1], "hpx2sin map.fits img.fits 0.000 -30.000 4 1.000000");
        assert_eq!(image.cards.len(), 1);
        assert_eq!(image.date_string().len(), 23);
    }

    #[test]
    fn test_invalid_image_geometry() {
        let map = SphericalPixelMap::new(constant_sky(1, 0.0), CoordFrame::Celestial).unwrap();
        assert!(reproject(&map, Pointing::new(0.0, 0.0), &small_params(0, 1.0)).is_err());
        assert!(reproject(&map, Pointing::new(0.0, 120.0), &small_params(8, 1.0)).is_err());
    }
}
