//! Brightness-temperature and flux-density conversion factors.
//!
//! Radio maps come either as Rayleigh-Jeans brightness temperature (K) or as
//! surface brightness (Jy/sr, Jy/beam). The factors here are only ever used
//! to build the uniform multiplier handed to the reprojection step.

use serde::{Deserialize, Serialize};
use uom::si::angle::{degree, radian};
use uom::si::f64::{Angle, Frequency};
use uom::si::frequency::{hertz, megahertz};

/// Boltzmann constant, J/K
pub const BOLTZMANN: f64 = 1.380_649e-23;

/// Speed of light, m/s
pub const SPEED_OF_LIGHT: f64 = 299_792_458.0;

/// One jansky in W m⁻² Hz⁻¹
pub const JANSKY: f64 = 1e-26;

/// Extension trait for radio observing frequencies
pub trait FrequencyExt {
    /// Create frequency from megahertz
    fn from_megahertz(mhz: f64) -> Self;

    /// Get frequency in megahertz
    fn as_megahertz(&self) -> f64;

    /// Get frequency in hertz
    fn as_hertz(&self) -> f64;
}

impl FrequencyExt for Frequency {
    fn from_megahertz(mhz: f64) -> Self {
        Frequency::new::<megahertz>(mhz)
    }

    fn as_megahertz(&self) -> f64 {
        self.get::<megahertz>()
    }

    fn as_hertz(&self) -> f64 {
        self.get::<hertz>()
    }
}

/// Extension trait for beam widths
pub trait AngleExt {
    fn from_degrees(deg: f64) -> Self;
    fn as_radians(&self) -> f64;
}

impl AngleExt for Angle {
    fn from_degrees(deg: f64) -> Self {
        Angle::new::<degree>(deg)
    }

    fn as_radians(&self) -> f64 {
        self.get::<radian>()
    }
}

/// Solid angle in steradians of a Gaussian beam with the given FWHM widths
pub fn gaussian_beam_area(bmaj: Angle, bmin: Angle) -> f64 {
    std::f64::consts::PI * bmaj.as_radians() * bmin.as_radians() / (4.0 * std::f64::consts::LN_2)
}

/// Multiply kelvin by this to get Jy/sr (Rayleigh-Jeans limit)
pub fn k_to_jy_per_sr(freq: Frequency) -> f64 {
    let nu = freq.as_hertz();
    2.0 * BOLTZMANN * nu * nu / (SPEED_OF_LIGHT * SPEED_OF_LIGHT) / JANSKY
}

/// Multiply Jy/sr by this to get kelvin
pub fn jy_per_sr_to_k(freq: Frequency) -> f64 {
    1.0 / k_to_jy_per_sr(freq)
}

/// Multiply kelvin by this to get Jy per circular Gaussian beam
pub fn k_to_jy_per_beam(freq: Frequency, beam_width: Angle) -> f64 {
    k_to_jy_per_sr(freq) * gaussian_beam_area(beam_width, beam_width)
}

/// Multiply Jy/beam by this to get kelvin
pub fn jy_per_beam_to_k(freq: Frequency, beam_width: Angle) -> f64 {
    1.0 / k_to_jy_per_beam(freq, beam_width)
}

/// Unit change applied to a map before reprojection.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BrightnessConversion {
    /// Leave values as they are
    #[default]
    Unchanged,
    KToJyPerSr { freq_mhz: f64 },
    JyPerSrToK { freq_mhz: f64 },
    KToJyPerBeam { freq_mhz: f64, beam_deg: f64 },
    JyPerBeamToK { freq_mhz: f64, beam_deg: f64 },
}

impl BrightnessConversion {
    /// Multiplicative factor for this conversion
    pub fn factor(&self) -> f64 {
        let freq = |mhz: f64| Frequency::from_megahertz(mhz);
        match *self {
            BrightnessConversion::Unchanged => 1.0,
            BrightnessConversion::KToJyPerSr { freq_mhz } => k_to_jy_per_sr(freq(freq_mhz)),
            BrightnessConversion::JyPerSrToK { freq_mhz } => jy_per_sr_to_k(freq(freq_mhz)),
            BrightnessConversion::KToJyPerBeam { freq_mhz, beam_deg } => {
                k_to_jy_per_beam(freq(freq_mhz), Angle::from_degrees(beam_deg))
            }
            BrightnessConversion::JyPerBeamToK { freq_mhz, beam_deg } => {
                jy_per_beam_to_k(freq(freq_mhz), Angle::from_degrees(beam_deg))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_frequency_ext() {
        let f = Frequency::from_megahertz(150.0);
        assert_relative_eq!(f.as_hertz(), 150e6);
        assert_relative_eq!(f.as_megahertz(), 150.0);
    }

    #[test]
    fn test_rayleigh_jeans_factor() {
        let f = Frequency::from_megahertz(150.0);
        assert_relative_eq!(k_to_jy_per_sr(f), 691.28, max_relative = 1e-4);
        assert_relative_eq!(k_to_jy_per_sr(f) * jy_per_sr_to_k(f), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_factor_scales_with_frequency_squared() {
        let low = k_to_jy_per_sr(Frequency::from_megahertz(100.0));
        let high = k_to_jy_per_sr(Frequency::from_megahertz(200.0));
        assert_relative_eq!(high / low, 4.0, epsilon = 1e-12);
    }

    #[test]
    fn test_gaussian_beam_area() {
        let w = Angle::from_degrees(1.0);
        let expected = std::f64::consts::PI * (1.0f64.to_radians()).powi(2) / (4.0 * 2f64.ln());
        assert_relative_eq!(gaussian_beam_area(w, w), expected, epsilon = 1e-15);

        let f = Frequency::from_megahertz(150.0);
        assert_relative_eq!(
            k_to_jy_per_beam(f, w),
            k_to_jy_per_sr(f) * expected,
            epsilon = 1e-12
        );
        assert_relative_eq!(k_to_jy_per_beam(f, w) * jy_per_beam_to_k(f, w), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_conversion_record() {
        assert_eq!(BrightnessConversion::default().factor(), 1.0);
        let conv: BrightnessConversion =
            serde_json::from_str(r#"{"kind": "k_to_jy_per_sr", "freq_mhz": 150.0}"#).unwrap();
        assert_relative_eq!(conv.factor(), 691.28, max_relative = 1e-4);
    }
}
