//! Raw volume files: a flat, native-endian `f64` array in row-major order.
//! The shape is not stored and must be supplied by the caller.

use crate::error::{Result, SkyProjError};
use crate::volume::{Volume, VolumeGeometry};
use log::debug;
use std::fs;
use std::path::Path;

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Read a volume of the given geometry.
///
/// # Errors
/// `Shape` if the file size does not match the declared cell count, or any
/// I/O error from reading the file.
pub fn read_volume<P: AsRef<Path>>(path: P, geometry: &VolumeGeometry) -> Result<Volume> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    let expected = geometry.cell_count() * F64_BYTES;
    if bytes.len() != expected {
        return Err(SkyProjError::Shape(format!(
            "{} holds {} bytes but a {:?} volume needs {expected}",
            path.display(),
            bytes.len(),
            geometry.shape
        )));
    }
    // The byte buffer carries no alignment guarantee, so copy rather than cast
    let values: Vec<f64> = bytemuck::pod_collect_to_vec(&bytes);
    debug!("Read {:?} volume from {}", geometry.shape, path.display());
    Volume::from_shape_vec(geometry.shape, values)
}

/// Write a volume as raw `f64`, replacing any existing file.
pub fn write_volume<P: AsRef<Path>>(volume: &Volume, path: P) -> Result<()> {
    let path = path.as_ref();
    let values = volume.to_flat_vec();
    fs::write(path, bytemuck::cast_slice::<f64, u8>(&values))?;
    debug!("Wrote {:?} volume to {}", volume.shape(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;
    use test_helpers::index_cube;

    #[test]
    fn test_volume_file_preserves_cell_order() {
        let file = NamedTempFile::new().unwrap();
        let volume = Volume::new(index_cube([3, 4, 5])).unwrap();
        write_volume(&volume, file.path()).unwrap();

        assert_eq!(fs::metadata(file.path()).unwrap().len(), 60 * 8);
        let geometry = VolumeGeometry::new([3, 4, 5], 1.0).unwrap();
        let read = read_volume(file.path(), &geometry).unwrap();
        assert_eq!(read, volume);
        assert_eq!(read.at([2, 3, 4]), 59.0);
    }

    #[test]
    fn test_volume_file_is_native_endian() {
        let file = NamedTempFile::new().unwrap();
        let volume = Volume::new(index_cube([1, 1, 3])).unwrap();
        write_volume(&volume, file.path()).unwrap();

        let expected: Vec<u8> = [0.0f64, 1.0, 2.0]
            .iter()
            .flat_map(|v| v.to_ne_bytes())
            .collect();
        assert_eq!(fs::read(file.path()).unwrap(), expected);
    }

    #[test]
    fn test_size_mismatch_is_shape_error() {
        let file = NamedTempFile::new().unwrap();
        write_volume(&Volume::from_elem([2, 2, 2], 1.0).unwrap(), file.path()).unwrap();
        let geometry = VolumeGeometry::new([2, 2, 3], 1.0).unwrap();
        assert!(matches!(
            read_volume(file.path(), &geometry),
            Err(SkyProjError::Shape(_))
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let geometry = VolumeGeometry::default();
        assert!(matches!(
            read_volume("/nonexistent/cube.bin", &geometry),
            Err(SkyProjError::Io(_))
        ));
    }
}
