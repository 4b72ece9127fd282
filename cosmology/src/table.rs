//! Tabulated distance model.
//!
//! Evaluating a ΛCDM distance integral for every frequency channel of a
//! survey repeats the same work many times. [`TabulatedDistance`] samples any
//! [`DistanceModel`] once on a regular redshift grid and answers later
//! queries by linear interpolation between grid points. The table is
//! immutable after construction, so one instance can be shared across all
//! worker threads.

use crate::{check_redshift, CosmologyError, DistanceModel, Result};

/// Comoving distance sampled on a regular redshift grid.
#[derive(Debug, Clone)]
pub struct TabulatedDistance {
    /// Redshift domain (min, max)
    domain: (f64, f64),
    /// Redshift step between grid points
    dz: f64,
    /// Distances at each grid point
    values: Vec<f64>,
}

impl TabulatedDistance {
    /// Sample `model` at `n_points` evenly spaced redshifts in [z_min, z_max].
    ///
    /// # Errors
    /// * `InvalidParameter` if `z_min >= z_max` or fewer than two points
    /// * Any error the underlying model raises while sampling
    pub fn new<M: DistanceModel + ?Sized>(
        model: &M,
        z_min: f64,
        z_max: f64,
        n_points: usize,
    ) -> Result<Self> {
        if !(z_min < z_max) {
            return Err(CosmologyError::InvalidParameter(format!(
                "table range must be increasing, got [{z_min}, {z_max}]"
            )));
        }
        if n_points < 2 {
            return Err(CosmologyError::InvalidParameter(
                "table needs at least 2 points".to_string(),
            ));
        }
        check_redshift(z_min)?;

        let dz = (z_max - z_min) / (n_points - 1) as f64;
        let values = (0..n_points)
            .map(|i| model.comoving_distance(z_min + i as f64 * dz))
            .collect::<Result<Vec<f64>>>()?;

        log::debug!(
            "Tabulated comoving distance on z in [{z_min}, {z_max}] with {n_points} points"
        );

        Ok(Self {
            domain: (z_min, z_max),
            dz,
            values,
        })
    }

    /// Redshift domain covered by the table
    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    /// Number of grid points
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the table has no samples (never true for a constructed table)
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Interpolated distance at `z`
    pub fn eval(&self, z: f64) -> Result<f64> {
        let (min, max) = self.domain;
        if !(z >= min && z <= max) {
            return Err(CosmologyError::OutOfTable { z, min, max });
        }

        let pos = (z - min) / self.dz;
        let last = self.values.len() - 1;
        let i = (pos.floor() as usize).min(last - 1);
        let t = pos - i as f64;
        Ok(self.values[i] + t * (self.values[i + 1] - self.values[i]))
    }
}

impl DistanceModel for TabulatedDistance {
    fn comoving_distance(&self, z: f64) -> Result<f64> {
        self.eval(z)
    }
}
