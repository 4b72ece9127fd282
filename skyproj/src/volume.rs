//! Periodic simulation volumes.
//!
//! A simulation box is a 3-torus: stepping off one face re-enters through the
//! opposite face. [`VolumeGeometry`] carries the cell counts and physical cell
//! size and owns the rounding/wrapping policy that turns a physical offset
//! into a cell index. [`Volume`] is the scalar field itself.

use crate::error::{Result, SkyProjError};
use ndarray::Array3;
use serde::{Deserialize, Serialize};

/// Default cells per side of the simulation cube
pub const DEFAULT_SIDE: usize = 128;

/// Default cell size in Mpc/h
pub const DEFAULT_CELL_SIZE: f64 = 7.8125;

/// Cell counts and physical resolution of a periodic volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeGeometry {
    /// Number of cells along (x, y, z)
    pub shape: [usize; 3],
    /// Physical length of one cell, in the distance model's length unit
    pub cell_size: f64,
}

impl VolumeGeometry {
    /// Create a geometry, rejecting empty axes and non-positive cell sizes.
    ///
    /// # Errors
    /// * `Shape` if any axis has zero cells
    /// * `InvalidGeometry` if `cell_size` is not a positive finite number
    pub fn new(shape: [usize; 3], cell_size: f64) -> Result<Self> {
        check_shape(shape)?;
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(SkyProjError::InvalidGeometry(format!(
                "cell size must be positive, got {cell_size}"
            )));
        }
        Ok(Self { shape, cell_size })
    }

    /// Build a geometry from a runtime list of extents (e.g. CLI input)
    pub fn from_extents(extents: &[usize], cell_size: f64) -> Result<Self> {
        let shape: [usize; 3] = extents.try_into().map_err(|_| {
            SkyProjError::Shape(format!(
                "volume shape must have 3 extents, got {}",
                extents.len()
            ))
        })?;
        Self::new(shape, cell_size)
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Physical box length along each axis
    pub fn box_size(&self) -> [f64; 3] {
        self.shape.map(|n| n as f64 * self.cell_size)
    }

    /// Map a physical offset from the origin to the nearest cell, wrapped
    /// periodically. Each returned index lies in `[0, shape[axis])`.
    #[inline]
    pub fn wrap_offset(&self, offset: [f64; 3]) -> [usize; 3] {
        [
            wrap_index(offset[0], self.cell_size, self.shape[0]),
            wrap_index(offset[1], self.cell_size, self.shape[1]),
            wrap_index(offset[2], self.cell_size, self.shape[2]),
        ]
    }

    /// Confirm that `volume` was sampled on this geometry
    pub fn check_volume(&self, volume: &Volume) -> Result<()> {
        if volume.shape() != self.shape {
            return Err(SkyProjError::Shape(format!(
                "volume has shape {:?} but geometry declares {:?}",
                volume.shape(),
                self.shape
            )));
        }
        Ok(())
    }
}

impl Default for VolumeGeometry {
    fn default() -> Self {
        Self {
            shape: [DEFAULT_SIDE; 3],
            cell_size: DEFAULT_CELL_SIZE,
        }
    }
}

/// Nearest cell index along one axis for a physical coordinate, wrapped
/// into `[0, side)`.
///
/// Rounding is half-to-even so a coordinate exactly between two cells always
/// resolves the same way numerical array libraries do.
#[inline]
pub fn wrap_index(coordinate: f64, cell_size: f64, side: usize) -> usize {
    let cell = (coordinate / cell_size).round_ties_even() as i64;
    cell.rem_euclid(side as i64) as usize
}

fn check_shape(shape: [usize; 3]) -> Result<()> {
    if shape.contains(&0) {
        return Err(SkyProjError::Shape(format!(
            "volume extents must be positive, got {shape:?}"
        )));
    }
    Ok(())
}

/// A scalar field sampled on a periodic 3D grid.
///
/// Values are indexed `[x, y, z]` with `z` varying fastest, matching a
/// row-major flat array on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Array3<f64>,
}

impl Volume {
    /// Wrap an array as a volume.
    ///
    /// # Errors
    /// Returns `Shape` if any axis is empty.
    pub fn new(data: Array3<f64>) -> Result<Self> {
        let (nx, ny, nz) = data.dim();
        check_shape([nx, ny, nz])?;
        Ok(Self { data })
    }

    /// Volume of the given shape with every cell set to `value`
    pub fn from_elem(shape: [usize; 3], value: f64) -> Result<Self> {
        check_shape(shape)?;
        Ok(Self {
            data: Array3::from_elem((shape[0], shape[1], shape[2]), value),
        })
    }

    /// Build a volume from a row-major flat vector
    pub fn from_shape_vec(shape: [usize; 3], values: Vec<f64>) -> Result<Self> {
        check_shape(shape)?;
        let expected: usize = shape.iter().product();
        let found = values.len();
        let data = Array3::from_shape_vec((shape[0], shape[1], shape[2]), values).map_err(|_| {
            SkyProjError::Shape(format!(
                "{found} values cannot fill a {shape:?} volume ({expected} cells)"
            ))
        })?;
        Ok(Self { data })
    }

    /// Cells along (x, y, z)
    pub fn shape(&self) -> [usize; 3] {
        let (nx, ny, nz) = self.data.dim();
        [nx, ny, nz]
    }

    /// Borrow the underlying array
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// Consume the volume, returning its array
    pub fn into_data(self) -> Array3<f64> {
        self.data
    }

    /// Value at an in-range cell index
    #[inline]
    pub fn at(&self, index: [usize; 3]) -> f64 {
        self.data[index]
    }

    /// Value at any integer index, wrapping each axis periodically
    pub fn get_periodic(&self, index: [i64; 3]) -> f64 {
        let shape = self.shape();
        self.data[[
            index[0].rem_euclid(shape[0] as i64) as usize,
            index[1].rem_euclid(shape[1] as i64) as usize,
            index[2].rem_euclid(shape[2] as i64) as usize,
        ]]
    }

    /// Values as a row-major flat vector
    pub fn to_flat_vec(&self) -> Vec<f64> {
        self.data.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_helpers::index_cube;

    #[test]
    fn test_wrap_index_in_range() {
        for side in [1usize, 3, 8, 128] {
            for step in -1000..1000 {
                let coord = step as f64 * 0.37;
                let idx = wrap_index(coord, 1.0, side);
                assert!(idx < side, "index {idx} out of [0, {side})");
            }
        }
    }

    #[test]
    fn test_wrap_index_negative_and_overflow() {
        assert_eq!(wrap_index(-1.0, 1.0, 8), 7);
        assert_eq!(wrap_index(8.0, 1.0, 8), 0);
        assert_eq!(wrap_index(17.2, 1.0, 8), 1);
        assert_eq!(wrap_index(-16.0, 2.0, 8), 0);
    }

    #[test]
    fn test_wrap_index_rounds_half_to_even() {
        assert_eq!(wrap_index(0.5, 1.0, 8), 0);
        assert_eq!(wrap_index(1.5, 1.0, 8), 2);
        assert_eq!(wrap_index(2.5, 1.0, 8), 2);
        assert_eq!(wrap_index(-0.5, 1.0, 8), 0);
        assert_eq!(wrap_index(-1.5, 1.0, 8), 6);
    }

    #[test]
    fn test_geometry_wrap_offset() {
        let geometry = VolumeGeometry::new([4, 5, 6], 2.0).unwrap();
        assert_eq!(geometry.wrap_offset([0.0, 0.0, 0.0]), [0, 0, 0]);
        assert_eq!(geometry.wrap_offset([-2.0, 10.0, 13.0]), [3, 0, 0]);
        assert_eq!(geometry.box_size(), [8.0, 10.0, 12.0]);
        assert_eq!(geometry.cell_count(), 120);
    }

    #[test]
    fn test_geometry_validation() {
        assert!(matches!(
            VolumeGeometry::new([4, 0, 4], 1.0),
            Err(SkyProjError::Shape(_))
        ));
        assert!(matches!(
            VolumeGeometry::new([4, 4, 4], 0.0),
            Err(SkyProjError::InvalidGeometry(_))
        ));
        assert!(matches!(
            VolumeGeometry::from_extents(&[4, 4], 1.0),
            Err(SkyProjError::Shape(_))
        ));
        assert!(VolumeGeometry::from_extents(&[4, 4, 4], 1.0).is_ok());
    }

    #[test]
    fn test_default_geometry() {
        let geometry = VolumeGeometry::default();
        assert_eq!(geometry.shape, [128, 128, 128]);
        assert_eq!(geometry.cell_size, 7.8125);
    }

    #[test]
    fn test_periodic_lookup_is_deterministic() {
        let volume = Volume::new(index_cube([3, 4, 5])).unwrap();
        let a = volume.get_periodic([-1, 9, 5]);
        let b = volume.get_periodic([-1, 9, 5]);
        assert_eq!(a, b);
        assert_eq!(a, volume.at([2, 1, 0]));
    }

    #[test]
    fn test_from_shape_vec_mismatch() {
        assert!(matches!(
            Volume::from_shape_vec([2, 2, 2], vec![0.0; 7]),
            Err(SkyProjError::Shape(_))
        ));
        let volume = Volume::from_shape_vec([1, 2, 3], (0..6).map(f64::from).collect()).unwrap();
        assert_eq!(volume.at([0, 1, 2]), 5.0);
        assert_eq!(volume.to_flat_vec().len(), 6);
    }

    #[test]
    fn test_check_volume_shape() {
        let geometry = VolumeGeometry::new([2, 2, 2], 1.0).unwrap();
        let volume = Volume::from_elem([2, 2, 3], 1.0).unwrap();
        assert!(matches!(
            geometry.check_volume(&volume),
            Err(SkyProjError::Shape(_))
        ));
    }
}
