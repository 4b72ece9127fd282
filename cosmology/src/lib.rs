//! Cosmological distance models
//!
//! This crate maps redshift to comoving distance. The sky projection code only
//! ever talks to a [`DistanceModel`], so any background cosmology (analytic,
//! tabulated, or a fixed radius for tests) can be plugged in.

use thiserror::Error;

pub mod lambda_cdm;
pub mod table;

pub use lambda_cdm::{FlatLambdaCdm, SPEED_OF_LIGHT_KM_S};
pub use table::TabulatedDistance;

/// Error types for distance calculations
#[derive(Debug, Error)]
pub enum CosmologyError {
    #[error("Invalid redshift: {0} (must be finite and > -1)")]
    InvalidRedshift(f64),

    #[error("Invalid cosmological parameter: {0}")]
    InvalidParameter(String),

    #[error("Redshift {z} is outside tabulated range [{min}, {max}]")]
    OutOfTable { z: f64, min: f64, max: f64 },
}

pub type Result<T> = std::result::Result<T, CosmologyError>;

/// Anything that can turn a redshift into a comoving distance.
///
/// Distances are returned in the length unit the caller's simulation volume
/// uses (Mpc for the models in this crate). Implementations must be pure:
/// the same redshift always yields the same distance.
pub trait DistanceModel: Send + Sync {
    /// Line-of-sight comoving distance to redshift `z`
    fn comoving_distance(&self, z: f64) -> Result<f64>;
}

impl<T: DistanceModel + ?Sized> DistanceModel for &T {
    fn comoving_distance(&self, z: f64) -> Result<f64> {
        (**self).comoving_distance(z)
    }
}

impl<T: DistanceModel + ?Sized> DistanceModel for std::sync::Arc<T> {
    fn comoving_distance(&self, z: f64) -> Result<f64> {
        (**self).comoving_distance(z)
    }
}

/// Distance model that returns the same radius for every redshift.
///
/// Handy for placing a shell at a known radius inside a test volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedDistance(pub f64);

impl DistanceModel for FixedDistance {
    fn comoving_distance(&self, z: f64) -> Result<f64> {
        check_redshift(z)?;
        Ok(self.0)
    }
}

/// Reject redshifts that have no physical comoving distance
pub(crate) fn check_redshift(z: f64) -> Result<()> {
    if !z.is_finite() || z <= -1.0 {
        return Err(CosmologyError::InvalidRedshift(z));
    }
    Ok(())
}
