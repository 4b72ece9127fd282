//! Flat ΛCDM background cosmology.
//!
//! Computes line-of-sight comoving distance by integrating the inverse
//! dimensionless Hubble parameter with Simpson's rule. Radiation (photons
//! plus massless neutrinos) is included so distances at reionization-era
//! redshifts agree with standard cosmology packages to well below a cell.

use crate::{check_redshift, CosmologyError, DistanceModel, Result};
use serde::{Deserialize, Serialize};

/// Speed of light in km/s
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

/// Photon density parameter times h² per K⁴ of CMB temperature
const OMEGA_GAMMA_H2_PER_K4: f64 = 4.481_62e-7;

/// Massless neutrino energy density per effective species relative to photons,
/// 7/8 · (4/11)^(4/3)
const NEUTRINO_PHOTON_RATIO: f64 = 0.227_107_317_66;

/// Simpson intervals per unit redshift (always rounded up to an even count)
const INTERVALS_PER_UNIT_Z: f64 = 512.0;

/// Flat ΛCDM cosmology with radiation.
///
/// The dark energy density is fixed by flatness:
/// Ω_Λ = 1 − Ω_m − Ω_r.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlatLambdaCdm {
    /// Hubble constant in km/s/Mpc
    pub h0: f64,
    /// Matter density parameter today
    pub omega_m0: f64,
    /// Radiation (photons + massless neutrinos) density parameter today
    pub omega_r0: f64,
    /// Cosmological constant density parameter today
    pub omega_lambda0: f64,
}

impl FlatLambdaCdm {
    /// Build a flat cosmology from H0, Ω_m, CMB temperature and N_eff.
    ///
    /// # Arguments
    /// * `h0` - Hubble constant in km/s/Mpc
    /// * `omega_m0` - Matter density parameter today
    /// * `t_cmb0` - CMB temperature today in Kelvin (0 disables radiation)
    /// * `n_eff` - Effective number of massless neutrino species
    ///
    /// # Errors
    /// Returns `InvalidParameter` for non-positive H0, matter density outside
    /// [0, 1], negative temperature or neutrino count, or a budget that
    /// leaves a negative dark energy density.
    pub fn new(h0: f64, omega_m0: f64, t_cmb0: f64, n_eff: f64) -> Result<Self> {
        if !(h0.is_finite() && h0 > 0.0) {
            return Err(CosmologyError::InvalidParameter(format!(
                "H0 must be positive, got {h0}"
            )));
        }
        if !(0.0..=1.0).contains(&omega_m0) {
            return Err(CosmologyError::InvalidParameter(format!(
                "Omega_m0 must lie in [0, 1], got {omega_m0}"
            )));
        }
        if !(t_cmb0 >= 0.0 && n_eff >= 0.0) {
            return Err(CosmologyError::InvalidParameter(format!(
                "Tcmb0 and Neff must be non-negative, got {t_cmb0} and {n_eff}"
            )));
        }

        let cosmology = Self::from_parts(h0, omega_m0, t_cmb0, n_eff);
        if cosmology.omega_lambda0 < 0.0 {
            return Err(CosmologyError::InvalidParameter(format!(
                "Omega_m0 + Omega_r0 exceeds unity ({})",
                omega_m0 + cosmology.omega_r0
            )));
        }
        Ok(cosmology)
    }

    fn from_parts(h0: f64, omega_m0: f64, t_cmb0: f64, n_eff: f64) -> Self {
        let h = h0 / 100.0;
        let omega_gamma0 = OMEGA_GAMMA_H2_PER_K4 * t_cmb0.powi(4) / (h * h);
        let omega_r0 = omega_gamma0 * (1.0 + NEUTRINO_PHOTON_RATIO * n_eff);
        Self {
            h0,
            omega_m0,
            omega_r0,
            omega_lambda0: 1.0 - omega_m0 - omega_r0,
        }
    }

    /// WMAP 9-year parameters (Hinshaw et al. 2013, combined WMAP+eCMB+BAO+H0)
    pub fn wmap9() -> Self {
        Self::from_parts(69.32, 0.2865, 2.725, 3.04)
    }

    /// Hubble distance c/H0 in Mpc
    pub fn hubble_distance(&self) -> f64 {
        SPEED_OF_LIGHT_KM_S / self.h0
    }

    /// Dimensionless Hubble parameter E(z) = H(z)/H0
    pub fn efunc(&self, z: f64) -> f64 {
        let a_inv = 1.0 + z;
        let a_inv2 = a_inv * a_inv;
        (self.omega_m0 * a_inv2 * a_inv + self.omega_r0 * a_inv2 * a_inv2 + self.omega_lambda0)
            .sqrt()
    }

    /// Inverse of [`efunc`](Self::efunc), the integrand of the distance integral
    pub fn inv_efunc(&self, z: f64) -> f64 {
        1.0 / self.efunc(z)
    }

    /// Comoving distance in Mpc to redshift `z`.
    ///
    /// Negative redshifts (blueshifts down to z > -1) integrate backwards and
    /// return a negative distance.
    pub fn comoving_distance_mpc(&self, z: f64) -> Result<f64> {
        check_redshift(z)?;
        if z == 0.0 {
            return Ok(0.0);
        }
        Ok(self.hubble_distance() * simpson(|zz| self.inv_efunc(zz), 0.0, z))
    }
}

impl Default for FlatLambdaCdm {
    fn default() -> Self {
        Self::wmap9()
    }
}

impl DistanceModel for FlatLambdaCdm {
    fn comoving_distance(&self, z: f64) -> Result<f64> {
        self.comoving_distance_mpc(z)
    }
}

/// Composite Simpson integration of `f` over [a, b]
fn simpson<F: Fn(f64) -> f64>(f: F, a: f64, b: f64) -> f64 {
    let span = b - a;
    let mut n = (span.abs() * INTERVALS_PER_UNIT_Z).ceil() as usize;
    n = n.max(2);
    if n % 2 == 1 {
        n += 1;
    }
    let h = span / n as f64;

    let mut sum = f(a) + f(b);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(a + i as f64 * h);
    }
    sum * h / 3.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wmap9_is_flat() {
        let c = FlatLambdaCdm::wmap9();
        assert_relative_eq!(
            c.omega_m0 + c.omega_r0 + c.omega_lambda0,
            1.0,
            epsilon = 1e-12
        );
        assert!(c.omega_r0 > 5e-5 && c.omega_r0 < 1e-4);
    }

    #[test]
    fn test_efunc_today_is_one() {
        let c = FlatLambdaCdm::wmap9();
        assert_relative_eq!(c.efunc(0.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_distance_zero_at_origin() {
        let c = FlatLambdaCdm::wmap9();
        assert_eq!(c.comoving_distance_mpc(0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_low_redshift_hubble_law() {
        let c = FlatLambdaCdm::wmap9();
        let z = 1e-3;
        let d = c.comoving_distance_mpc(z).unwrap();
        assert_relative_eq!(d, c.hubble_distance() * z, max_relative = 1e-3);
    }

    #[test]
    fn test_distance_monotonic() {
        let c = FlatLambdaCdm::wmap9();
        let mut last = 0.0;
        for i in 1..40 {
            let d = c.comoving_distance_mpc(i as f64 * 0.25).unwrap();
            assert!(d > last, "distance must increase with redshift");
            last = d;
        }
    }

    #[test]
    fn test_wmap9_distance_magnitudes() {
        let c = FlatLambdaCdm::wmap9();
        let d1 = c.comoving_distance_mpc(1.0).unwrap();
        assert!(d1 > 3300.0 && d1 < 3450.0, "D_C(z=1) = {d1}");

        // Reionization-era shells sit between 8 and 10 Gpc
        let d7 = c.comoving_distance_mpc(7.0).unwrap();
        assert!(d7 > 8000.0 && d7 < 10000.0, "D_C(z=7) = {d7}");
    }

    #[test]
    fn test_matter_only_analytic() {
        // Einstein-de Sitter: D_C = 2 c/H0 (1 - 1/sqrt(1+z))
        let c = FlatLambdaCdm::new(70.0, 1.0, 0.0, 0.0).unwrap();
        let z = 3.0;
        let expected = 2.0 * c.hubble_distance() * (1.0 - 1.0 / (1.0_f64 + z).sqrt());
        assert_relative_eq!(
            c.comoving_distance_mpc(z).unwrap(),
            expected,
            max_relative = 1e-9
        );
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(FlatLambdaCdm::new(0.0, 0.3, 2.725, 3.04).is_err());
        assert!(FlatLambdaCdm::new(70.0, 1.5, 2.725, 3.04).is_err());
        assert!(FlatLambdaCdm::new(70.0, 1.0, 2.725, 3.04).is_err());
        assert!(FlatLambdaCdm::new(70.0, 0.3, -1.0, 3.04).is_err());
    }

    #[test]
    fn test_invalid_redshift() {
        let c = FlatLambdaCdm::wmap9();
        assert!(matches!(
            c.comoving_distance(-2.0),
            Err(CosmologyError::InvalidRedshift(_))
        ));
        assert!(c.comoving_distance(f64::INFINITY).is_err());
    }
}
