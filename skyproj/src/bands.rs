//! Named observing bands and field pointings.
//!
//! These are configuration records for the batch layer; the projection
//! stages themselves only ever see a single frequency or pointing.

use crate::error::{Result, SkyProjError};
use crate::reproject::Pointing;
use crate::sampler::frequency_to_redshift;
use serde::{Deserialize, Serialize};

/// Latitude of the MWA site, degrees. Zenith pointings use it as declination.
pub const MWA_LATITUDE_DEG: f64 = -26.7033;

/// Evenly spaced frequency channels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBand {
    pub name: String,
    /// Centre of the first channel, MHz
    pub start_mhz: f64,
    /// Channel spacing, MHz
    pub step_mhz: f64,
    pub channels: usize,
}

impl FrequencyBand {
    pub fn new(name: impl Into<String>, start_mhz: f64, step_mhz: f64, channels: usize) -> Self {
        Self {
            name: name.into(),
            start_mhz,
            step_mhz,
            channels,
        }
    }

    /// Centre frequency of every channel, MHz
    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.channels)
            .map(|i| self.start_mhz + self.step_mhz * i as f64)
            .collect()
    }

    /// 21 cm redshift of every channel
    pub fn redshifts(&self) -> Result<Vec<f64>> {
        self.frequencies()
            .into_iter()
            .map(frequency_to_redshift)
            .collect()
    }

    /// Redshift range `(lowest, highest)` spanned by the band
    pub fn redshift_range(&self) -> Result<(f64, f64)> {
        let last = self.channels.checked_sub(1).ok_or_else(|| {
            SkyProjError::InvalidInput(format!("band '{}' has no channels", self.name))
        })?;
        let z_a = frequency_to_redshift(self.start_mhz)?;
        let z_b = frequency_to_redshift(self.start_mhz + self.step_mhz * last as f64)?;
        Ok((z_a.min(z_b), z_a.max(z_b)))
    }
}

/// The MWA Epoch of Reionization bands at 40 kHz and 80 kHz spacing.
pub fn eor_bands() -> Vec<FrequencyBand> {
    vec![
        FrequencyBand::new("EoR_low_40kHz", 138.895, 0.04, 704),
        FrequencyBand::new("EoR_hi_40kHz", 167.055, 0.04, 705),
        FrequencyBand::new("EoR_all_40kHz", 138.895, 0.04, 1409),
        FrequencyBand::new("EoR_low_80kHz", 138.915, 0.08, 352),
        FrequencyBand::new("EoR_hi_80kHz", 167.075, 0.08, 353),
        FrequencyBand::new("EoR_all_80kHz", 138.915, 0.08, 705),
    ]
}

/// Look up one of [`eor_bands`] by name.
///
/// # Errors
/// `InvalidInput` for an unknown name.
pub fn band_by_name(name: &str) -> Result<FrequencyBand> {
    eor_bands()
        .into_iter()
        .find(|band| band.name.eq_ignore_ascii_case(name))
        .ok_or_else(|| SkyProjError::InvalidInput(format!("unknown frequency band '{name}'")))
}

/// A named sky position given as RA in hours and Dec in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPointing {
    pub name: String,
    pub ra_hours: f64,
    pub dec_deg: f64,
}

impl FieldPointing {
    pub fn new(name: impl Into<String>, ra_hours: f64, dec_deg: f64) -> Self {
        Self {
            name: name.into(),
            ra_hours,
            dec_deg,
        }
    }

    pub fn ra_degrees(&self) -> f64 {
        15.0 * self.ra_hours
    }

    pub fn pointing(&self) -> Pointing {
        Pointing::new(self.ra_degrees(), self.dec_deg)
    }
}

/// Centres of the EoR0, EoR1 and EoR2 fields
pub fn eor_fields() -> Vec<FieldPointing> {
    vec![
        FieldPointing::new("EoR0", 0.0, -30.0),
        FieldPointing::new("EoR1", 4.0, -30.0),
        FieldPointing::new("EoR2", 10.33, -10.0),
    ]
}

/// Zenith pointings at the RA of each EoR field
pub fn eor_zenith_pointings() -> Vec<FieldPointing> {
    eor_fields()
        .into_iter()
        .map(|field| FieldPointing::new(field.name, field.ra_hours, MWA_LATITUDE_DEG))
        .collect()
}

/// Look up a field centre (`EoR1`) or zenith pointing (`EoR1_zenith`) by name.
pub fn field_by_name(name: &str) -> Result<FieldPointing> {
    let (base, zenith) = match name.strip_suffix("_zenith") {
        Some(base) => (base, true),
        None => (name, false),
    };
    let fields = if zenith {
        eor_zenith_pointings()
    } else {
        eor_fields()
    };
    fields
        .into_iter()
        .find(|field| field.name.eq_ignore_ascii_case(base))
        .ok_or_else(|| SkyProjError::InvalidInput(format!("unknown field '{name}'")))
}
