//! On-disk cache for pixel direction tables.
//!
//! Layout: NSIDE as a native-endian `u64`, then one `[f64; 3]` unit vector per
//! pixel in RING order.

use crate::error::{Result, SkyProjError};
use crate::healpix::{nside2npix, PixelDirectionTable};
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HEADER_BYTES: usize = std::mem::size_of::<u64>();
const DIRECTION_BYTES: usize = std::mem::size_of::<[f64; 3]>();

/// Conventional cache file name for an NSIDE
pub fn default_cache_path(nside: usize) -> PathBuf {
    PathBuf::from(format!("healpix_coord_N{nside}.bin"))
}

pub fn save_direction_table<P: AsRef<Path>>(table: &PixelDirectionTable, path: P) -> Result<()> {
    let header = (table.nside() as u64).to_ne_bytes();
    let body: &[u8] = bytemuck::cast_slice(table.directions());
    let mut bytes = Vec::with_capacity(HEADER_BYTES + body.len());
    bytes.extend_from_slice(&header);
    bytes.extend_from_slice(body);
    fs::write(path, bytes)?;
    Ok(())
}

/// Load a cached table.
///
/// # Errors
/// `InvalidGeometry` if the header NSIDE is out of range, or the file is
/// truncated, or its pixel count does not match that NSIDE.
pub fn load_direction_table<P: AsRef<Path>>(path: P) -> Result<PixelDirectionTable> {
    let path = path.as_ref();
    let bytes = fs::read(path)?;
    if bytes.len() < HEADER_BYTES {
        return Err(SkyProjError::InvalidGeometry(format!(
            "{} is too short to be a direction table",
            path.display()
        )));
    }
    let (header, body) = bytes.split_at(HEADER_BYTES);
    let mut nside_bytes = [0u8; HEADER_BYTES];
    nside_bytes.copy_from_slice(header);
    let nside = usize::try_from(u64::from_ne_bytes(nside_bytes)).unwrap_or(usize::MAX);
    let expected = nside2npix(nside)?.checked_mul(DIRECTION_BYTES);

    if expected != Some(body.len()) {
        return Err(SkyProjError::InvalidGeometry(format!(
            "{} declares NSIDE={nside} but holds {} bytes of directions",
            path.display(),
            body.len()
        )));
    }
    let directions: Vec<[f64; 3]> = bytemuck::pod_collect_to_vec(body);
    PixelDirectionTable::from_directions(nside, directions)
}

/// Reuse the cache at `path` when it matches `nside`, otherwise compute the
/// table and, if a path was given, write it there for next time.
pub fn load_or_build(path: Option<&Path>, nside: usize) -> Result<Arc<PixelDirectionTable>> {
    if let Some(path) = path.filter(|p| p.is_file()) {
        match load_direction_table(path) {
            Ok(table) if table.nside() == nside => {
                info!("Loaded NSIDE={nside} direction table from {}", path.display());
                return Ok(Arc::new(table));
            }
            Ok(table) => warn!(
                "Ignoring direction cache {}: NSIDE={} but {nside} requested",
                path.display(),
                table.nside()
            ),
            Err(e) => warn!("Ignoring unreadable direction cache {}: {e}", path.display()),
        }
    }

    let table = PixelDirectionTable::new(nside)?;
    if let Some(path) = path {
        save_direction_table(&table, path)?;
        info!("Cached NSIDE={nside} direction table at {}", path.display());
    }
    Ok(Arc::new(table))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_cache_file_reproduces_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dirs.bin");
        let table = PixelDirectionTable::new(4).unwrap();
        save_direction_table(&table, &path).unwrap();

        let loaded = load_direction_table(&path).unwrap();
        assert_eq!(loaded, table);
        assert_eq!(fs::metadata(&path).unwrap().len(), (8 + 192 * 24) as u64);
    }

    #[test]
    fn test_truncated_cache_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dirs.bin");
        let table = PixelDirectionTable::new(2).unwrap();
        save_direction_table(&table, &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() - 8]).unwrap();

        assert!(matches!(
            load_direction_table(&path),
            Err(SkyProjError::InvalidGeometry(_))
        ));
    }

    #[test]
    fn test_garbage_header_rebuilds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dirs.bin");
        fs::write(&path, [0xFFu8; 8]).unwrap();
        assert!(matches!(
            load_direction_table(&path),
            Err(SkyProjError::InvalidGeometry(_))
        ));

        // Largest accepted NSIDE whose byte size still overflows
        let mut bytes = (crate::healpix::NSIDE_MAX as u64).to_ne_bytes().to_vec();
        bytes.extend_from_slice(&[0u8; 24]);
        fs::write(&path, bytes).unwrap();
        assert!(matches!(
            load_direction_table(&path),
            Err(SkyProjError::InvalidGeometry(_))
        ));

        let table = load_or_build(Some(&path), 2).unwrap();
        assert_eq!(table.nside(), 2);
        assert_eq!(load_direction_table(&path).unwrap().nside(), 2);
    }

    #[test]
    fn test_load_or_build_writes_then_reuses() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dirs.bin");

        let built = load_or_build(Some(&path), 2).unwrap();
        assert!(path.is_file());
        let reused = load_or_build(Some(&path), 2).unwrap();
        assert_eq!(built, reused);

        // A cache for another NSIDE is replaced rather than used
        let rebuilt = load_or_build(Some(&path), 4).unwrap();
        assert_eq!(rebuilt.nside(), 4);
        assert_eq!(load_direction_table(&path).unwrap().nside(), 4);

        assert_eq!(load_or_build(None, 1).unwrap().len(), 12);
    }

    #[test]
    fn test_default_cache_path() {
        assert_eq!(default_cache_path(4096), PathBuf::from("healpix_coord_N4096.bin"));
    }
}
