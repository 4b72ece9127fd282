//! Redshift series listings.
//!
//! A listing is a headerless CSV file of `redshift,path` rows, one per
//! simulation volume, in ascending redshift. Lines starting with `#` are
//! ignored. Relative paths are resolved against the listing's directory.

use crate::error::{Result, SkyProjError};
use crate::redshift::RedshiftSeries;
use std::path::{Path, PathBuf};

/// Read a listing into a series of volume paths
pub fn read_series_listing<P: AsRef<Path>>(path: P) -> Result<RedshiftSeries<PathBuf>> {
    let path = path.as_ref();
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut entries = Vec::new();
    for record in reader.deserialize::<(f64, PathBuf)>() {
        let (z, volume) = record?;
        entries.push((z, base.join(volume)));
    }
    if entries.is_empty() {
        return Err(SkyProjError::InvalidInput(format!(
            "{} lists no volumes",
            path.display()
        )));
    }
    RedshiftSeries::new(entries)
}

/// Build a series from paired redshift and path lists (e.g. `--zi` and
/// `--cube` on the command line).
pub fn series_from_lists(redshifts: &[f64], volumes: &[PathBuf]) -> Result<RedshiftSeries<PathBuf>> {
    RedshiftSeries::from_parts(redshifts.to_vec(), volumes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_listing_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let listing = dir.path().join("series.csv");
        fs::write(
            &listing,
            "# z, cube\n6.26864407, cube_a.bin\n6.58384245,cube_b.bin\n7.51166288 , /abs/cube_c.bin\n",
        )
        .unwrap();

        let series = read_series_listing(&listing).unwrap();
        assert_eq!(series.redshifts(), &[6.26864407, 6.58384245, 7.51166288]);
        assert_eq!(series.items()[0], dir.path().join("cube_a.bin"));
        assert_eq!(series.items()[2], PathBuf::from("/abs/cube_c.bin"));
    }

    #[test]
    fn test_unsorted_listing_rejected() {
        let dir = tempdir().unwrap();
        let listing = dir.path().join("series.csv");
        fs::write(&listing, "7.0,b.bin\n6.0,a.bin\n").unwrap();
        assert!(matches!(
            read_series_listing(&listing),
            Err(SkyProjError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_malformed_listing() {
        let dir = tempdir().unwrap();
        let listing = dir.path().join("series.csv");
        fs::write(&listing, "six,a.bin\n").unwrap();
        assert!(matches!(read_series_listing(&listing), Err(SkyProjError::Csv(_))));

        fs::write(&listing, "# nothing here\n").unwrap();
        assert!(matches!(
            read_series_listing(&listing),
            Err(SkyProjError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_series_from_lists() {
        let paths = vec![PathBuf::from("a.bin"), PathBuf::from("b.bin")];
        assert!(series_from_lists(&[6.0, 7.0], &paths).is_ok());
        assert!(matches!(
            series_from_lists(&[6.0], &paths),
            Err(SkyProjError::InvalidInput(_))
        ));
    }
}
