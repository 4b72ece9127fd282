//! Redshift-wise interpolation between simulation volumes.
//!
//! Simulations are saved at a handful of redshifts; a light-cone needs a
//! volume at every observed frequency. [`RedshiftSeries::select`] decides
//! which stored volumes a target redshift needs (exact match, clamp at either
//! end, or a bracketing pair with weights) without touching any volume data,
//! so callers holding file paths instead of loaded volumes can load only
//! what is required. [`select_or_interpolate`] runs the whole policy on
//! in-memory volumes.

use crate::error::{Result, SkyProjError};
use crate::volume::Volume;
use log::{debug, warn};
use ndarray::Zip;
use std::borrow::Cow;
use std::cmp::Ordering;

/// An ordered sequence of (redshift, item) pairs.
///
/// `T` is usually a [`Volume`] or a path to one. Redshifts are finite and
/// strictly ascending; the constructor rejects anything else.
#[derive(Debug, Clone)]
pub struct RedshiftSeries<T> {
    redshifts: Vec<f64>,
    items: Vec<T>,
}

/// Which series members a target redshift resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Selection<'a, T> {
    /// Target equals a member redshift
    Exact { index: usize, item: &'a T },
    /// Target lies below every member; the lowest-redshift member is used
    ClampLow { item: &'a T },
    /// Target lies above every member; the highest-redshift member is used
    ClampHigh { item: &'a T },
    /// Target lies strictly between two adjacent members
    Bracket {
        lo: &'a T,
        hi: &'a T,
        z_lo: f64,
        z_hi: f64,
        weights: InterpolationWeights,
    },
}

/// Linear weights for the two ends of a bracketing pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolationWeights {
    pub lo: f64,
    pub hi: f64,
}

impl InterpolationWeights {
    /// Weights for `z` inside `[z_lo, z_hi]`:
    /// `lo = (z_hi - z)/(z_hi - z_lo)`, `hi = (z - z_lo)/(z_hi - z_lo)`.
    pub fn new(z_lo: f64, z_hi: f64, z: f64) -> Self {
        let span = z_hi - z_lo;
        Self {
            lo: (z_hi - z) / span,
            hi: (z - z_lo) / span,
        }
    }
}

impl<T> RedshiftSeries<T> {
    /// Build a series from (redshift, item) pairs.
    ///
    /// # Errors
    /// `InvalidInput` if the series is empty, any redshift is not finite, or
    /// redshifts are not strictly ascending.
    pub fn new(entries: Vec<(f64, T)>) -> Result<Self> {
        if entries.is_empty() {
            return Err(SkyProjError::InvalidInput(
                "redshift series must contain at least one volume".to_string(),
            ));
        }
        let (redshifts, items): (Vec<f64>, Vec<T>) = entries.into_iter().unzip();

        if let Some(bad) = redshifts.iter().find(|z| !z.is_finite()) {
            return Err(SkyProjError::InvalidInput(format!(
                "series redshift {bad} is not finite"
            )));
        }
        if let Some(pair) = redshifts.windows(2).find(|w| w[1] <= w[0]) {
            return Err(SkyProjError::InvalidInput(format!(
                "series redshifts must be strictly ascending, found {} followed by {}",
                pair[0], pair[1]
            )));
        }

        Ok(Self { redshifts, items })
    }

    /// Build a series from parallel redshift and item lists
    pub fn from_parts(redshifts: Vec<f64>, items: Vec<T>) -> Result<Self> {
        if redshifts.len() != items.len() {
            return Err(SkyProjError::InvalidInput(format!(
                "{} redshifts but {} volumes; lists must have the same length",
                redshifts.len(),
                items.len()
            )));
        }
        Self::new(redshifts.into_iter().zip(items).collect())
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a constructed series
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Member redshifts in ascending order
    pub fn redshifts(&self) -> &[f64] {
        &self.redshifts
    }

    /// Member items in redshift order
    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Map every item, keeping the redshifts
    pub fn try_map<U, F>(self, f: F) -> Result<RedshiftSeries<U>>
    where
        F: FnMut(T) -> Result<U>,
    {
        let items = self.items.into_iter().map(f).collect::<Result<Vec<U>>>()?;
        Ok(RedshiftSeries {
            redshifts: self.redshifts,
            items,
        })
    }

    /// Resolve `target_z` to the members it needs.
    ///
    /// Policy, checked in order: exact match, below range (clamp to the
    /// lowest member), above range (clamp to the highest member), otherwise
    /// the bracketing pair.
    ///
    /// # Errors
    /// `InvalidInput` if `target_z` is not finite, or if the series has a
    /// single member and `target_z` does not match it.
    pub fn select(&self, target_z: f64) -> Result<Selection<'_, T>> {
        if !target_z.is_finite() {
            return Err(SkyProjError::InvalidInput(format!(
                "target redshift {target_z} is not finite"
            )));
        }

        if let Some(index) = self.redshifts.iter().position(|&z| z == target_z) {
            return Ok(Selection::Exact {
                index,
                item: &self.items[index],
            });
        }

        if self.items.len() < 2 {
            return Err(SkyProjError::InvalidInput(format!(
                "cannot interpolate to z={target_z} from a single volume at z={}",
                self.redshifts[0]
            )));
        }

        let last = self.redshifts.len() - 1;
        if target_z < self.redshifts[0] {
            return Ok(Selection::ClampLow {
                item: &self.items[0],
            });
        }
        if target_z > self.redshifts[last] {
            return Ok(Selection::ClampHigh {
                item: &self.items[last],
            });
        }

        // First member above the target; exact matches were handled above.
        let hi = self.redshifts.partition_point(|&z| z < target_z);
        let lo = hi - 1;
        let (z_lo, z_hi) = (self.redshifts[lo], self.redshifts[hi]);
        Ok(Selection::Bracket {
            lo: &self.items[lo],
            hi: &self.items[hi],
            z_lo,
            z_hi,
            weights: InterpolationWeights::new(z_lo, z_hi, target_z),
        })
    }
}

/// Per-cell linear interpolation between two volumes along redshift.
///
/// `out[cell] = w_lo·lo[cell] + w_hi·hi[cell]` with weights from
/// [`InterpolationWeights::new`].
///
/// # Errors
/// `ShapeMismatch` if the volumes differ in shape, `InvalidInput` if
/// `z_lo >= z_hi`.
pub fn interpolate(lo: &Volume, hi: &Volume, z_lo: f64, z_hi: f64, z: f64) -> Result<Volume> {
    if lo.shape() != hi.shape() {
        return Err(SkyProjError::ShapeMismatch {
            lo: lo.shape(),
            hi: hi.shape(),
            z_lo,
            z_hi,
        });
    }
    if z_lo.partial_cmp(&z_hi) != Some(Ordering::Less) {
        return Err(SkyProjError::InvalidInput(format!(
            "bracketing redshifts must satisfy z_lo < z_hi, got {z_lo} and {z_hi}"
        )));
    }

    let w = InterpolationWeights::new(z_lo, z_hi, z);
    debug!(
        "Interpolating z={z} between z={z_lo} (w={:.6}) and z={z_hi} (w={:.6})",
        w.lo, w.hi
    );
    let data = Zip::from(lo.data())
        .and(hi.data())
        .map_collect(|&a, &b| w.lo * a + w.hi * b);
    Volume::new(data)
}

/// Select or interpolate the volume for `target_z` from an in-memory series.
///
/// Exact matches and clamped targets borrow the stored volume unchanged;
/// only a bracketed target allocates a new volume.
pub fn select_or_interpolate(target_z: f64, series: &RedshiftSeries<Volume>) -> Result<Cow<'_, Volume>> {
    match series.select(target_z)? {
        Selection::Exact { item, .. } => Ok(Cow::Borrowed(item)),
        Selection::ClampLow { item } => {
            warn!(
                "z={target_z} is below the series range; using the volume at z={}",
                series.redshifts()[0]
            );
            Ok(Cow::Borrowed(item))
        }
        Selection::ClampHigh { item } => {
            warn!(
                "z={target_z} is above the series range; using the volume at z={}",
                series.redshifts()[series.len() - 1]
            );
            Ok(Cow::Borrowed(item))
        }
        Selection::Bracket {
            lo, hi, z_lo, z_hi, ..
        } => Ok(Cow::Owned(interpolate(lo, hi, z_lo, z_hi, target_z)?)),
    }
}
