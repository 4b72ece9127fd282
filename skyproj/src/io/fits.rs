//! FITS I/O for HEALPix maps and SIN images
//!
//! HEALPix maps are stored the way healpy writes them: an empty primary HDU
//! followed by a binary table with one `f64` column and the `PIXTYPE`,
//! `ORDERING`, `NSIDE` and `COORDSYS` cards. SIN images are a single primary
//! image carrying the WCS cards, creation date and provenance history.

use crate::error::{Result, SkyProjError};
use crate::frames::CoordFrame;
use crate::reproject::{FlatImage, HeaderCard, HeaderValue};
use crate::sphere_map::SphericalPixelMap;
use crate::wcs::OrthographicProjection;
use fitsio::hdu::FitsHdu;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::tables::{ColumnDataType, ColumnDescription};
use fitsio::FitsFile;
use log::debug;
use ndarray::Array2;
use std::path::Path;
use thiserror::Error;

/// Column name used for map values
pub const HEALPIX_COLUMN: &str = "TEMPERATURE";

/// Errors that can occur during FITS file operations
#[derive(Error, Debug)]
pub enum FitsError {
    #[error("FITS I/O error: {0}")]
    FitsIo(#[from] fitsio::errors::Error),
    #[error("HDU not found: {0}")]
    HduNotFound(String),
    #[error("Invalid data type in HDU: {0}")]
    InvalidDataType(String),
    #[error("Unsupported header value: {0}")]
    Header(String),
}

/// Write a sphere map as a HEALPix binary table, replacing any existing file.
pub fn write_healpix_map<P: AsRef<Path>>(map: &SphericalPixelMap, path: P) -> Result<()> {
    write_healpix_table(map, path.as_ref())?;
    debug!(
        "Wrote NSIDE={} HEALPix map to {}",
        map.nside(),
        path.as_ref().display()
    );
    Ok(())
}

fn write_healpix_table(map: &SphericalPixelMap, path: &Path) -> std::result::Result<(), FitsError> {
    let mut fptr = FitsFile::create(path).overwrite().open()?;

    let column = ColumnDescription::new(HEALPIX_COLUMN)
        .with_type(ColumnDataType::Double)
        .create()?;
    let hdu = fptr.create_table("xtension".to_string(), &[column])?;

    let npix = map.npix() as i64;
    hdu.write_key(&mut fptr, "PIXTYPE", ("HEALPIX", "HEALPIX pixelisation"))?;
    hdu.write_key(&mut fptr, "ORDERING", ("RING", "Pixel ordering scheme"))?;
    hdu.write_key(&mut fptr, "COORDSYS", (map.frame().to_string(), "Coordinate system"))?;
    hdu.write_key(&mut fptr, "NSIDE", (map.nside() as i64, "Resolution parameter"))?;
    hdu.write_key(&mut fptr, "FIRSTPIX", (0i64, "First pixel # (0 based)"))?;
    hdu.write_key(&mut fptr, "LASTPIX", (npix - 1, "Last pixel # (0 based)"))?;
    hdu.write_key(&mut fptr, "INDXSCHM", ("IMPLICIT", "Indexing: IMPLICIT or EXPLICIT"))?;
    hdu.write_key(&mut fptr, "OBJECT", ("FULLSKY", "Sky coverage"))?;
    hdu.write_col(&mut fptr, HEALPIX_COLUMN, map.values())?;
    Ok(())
}

/// Read a HEALPix binary table written by [`write_healpix_map`] or healpy.
///
/// # Errors
/// * `InvalidInput` for NESTED ordering
/// * `InvalidPixelization` if the column length is not `12·N²`
/// * `InvalidGeometry` if the `NSIDE` card disagrees with the column length
pub fn read_healpix_map<P: AsRef<Path>>(path: P) -> Result<SphericalPixelMap> {
    let table = read_healpix_table(path.as_ref())?;

    if !table.ordering.trim().eq_ignore_ascii_case("RING") {
        return Err(SkyProjError::InvalidInput(format!(
            "{} uses {} ordering; only RING maps are supported",
            path.as_ref().display(),
            table.ordering
        )));
    }
    let frame = match table.coordsys {
        Some(code) => code.parse::<CoordFrame>().map_err(SkyProjError::InvalidInput)?,
        None => CoordFrame::Celestial,
    };
    match table.nside {
        Some(nside) => SphericalPixelMap::with_nside(nside, table.values, frame),
        None => SphericalPixelMap::new(table.values, frame),
    }
}

struct HealpixTable {
    values: Vec<f64>,
    ordering: String,
    coordsys: Option<String>,
    nside: Option<usize>,
}

fn read_healpix_table(path: &Path) -> std::result::Result<HealpixTable, FitsError> {
    let mut fptr = FitsFile::open(path)?;
    let hdu = fptr
        .hdu(1)
        .map_err(|_| FitsError::HduNotFound(format!("no map table in {}", path.display())))?;

    let column = hdu
        .read_key::<String>(&mut fptr, "TTYPE1")
        .unwrap_or_else(|_| HEALPIX_COLUMN.to_string());
    let values = hdu.read_col::<f64>(&mut fptr, column.trim())?;
    let ordering = hdu
        .read_key::<String>(&mut fptr, "ORDERING")
        .unwrap_or_else(|_| "RING".to_string());
    let coordsys = hdu.read_key::<String>(&mut fptr, "COORDSYS").ok();
    let nside = hdu
        .read_key::<i64>(&mut fptr, "NSIDE")
        .ok()
        .map(|n| n as usize);

    Ok(HealpixTable {
        values,
        ordering,
        coordsys,
        nside,
    })
}

/// Write a reprojected image with its WCS, header cards and history.
pub fn write_sin_image<P: AsRef<Path>>(image: &FlatImage, path: P) -> Result<()> {
    write_sin_primary(image, path.as_ref())?;
    debug!(
        "Wrote {}x{} SIN image to {}",
        image.projection.size,
        image.projection.size,
        path.as_ref().display()
    );
    Ok(())
}

fn write_sin_primary(image: &FlatImage, path: &Path) -> std::result::Result<(), FitsError> {
    let proj = &image.projection;
    let (ny, nx) = image.data.dim();
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[ny, nx],
    };
    let mut fptr = FitsFile::create(path)
        .with_custom_primary(&description)
        .overwrite()
        .open()?;
    let hdu = fptr.primary_hdu()?;

    let (cdelt1, cdelt2) = proj.cdelt();
    let crpix = proj.fits_reference_pixel();
    hdu.write_key(&mut fptr, "CTYPE1", "RA---SIN")?;
    hdu.write_key(&mut fptr, "CTYPE2", "DEC--SIN")?;
    hdu.write_key(&mut fptr, "CRPIX1", crpix)?;
    hdu.write_key(&mut fptr, "CRPIX2", crpix)?;
    hdu.write_key(&mut fptr, "CDELT1", cdelt1)?;
    hdu.write_key(&mut fptr, "CDELT2", cdelt2)?;
    hdu.write_key(&mut fptr, "CRVAL1", proj.crval_ra)?;
    hdu.write_key(&mut fptr, "CRVAL2", proj.crval_dec)?;
    hdu.write_key(&mut fptr, "CUNIT1", "deg")?;
    hdu.write_key(&mut fptr, "CUNIT2", "deg")?;
    hdu.write_key(&mut fptr, "EQUINOX", 2000.0f64)?;
    hdu.write_key(&mut fptr, "DATE", (image.date_string(), "Date of file creation"))?;

    for card in &image.cards {
        write_card(&hdu, &mut fptr, card)?;
    }
    for line in &image.history {
        hdu.write_key(&mut fptr, "HISTORY", line.as_str())?;
    }

    let flat: Vec<f64> = image.data.iter().copied().collect();
    hdu.write_image(&mut fptr, &flat)?;
    Ok(())
}

fn write_card(
    hdu: &FitsHdu,
    fptr: &mut FitsFile,
    card: &HeaderCard,
) -> std::result::Result<(), FitsError> {
    let key = card.key.trim().to_ascii_uppercase();
    if key.is_empty() || key.len() > 8 {
        return Err(FitsError::Header(format!(
            "keyword '{}' must be 1 to 8 characters",
            card.key
        )));
    }
    let comment = card.comment.as_deref().unwrap_or("");
    match &card.value {
        HeaderValue::Int(v) => hdu.write_key(fptr, &key, (*v, comment))?,
        HeaderValue::Float(v) => hdu.write_key(fptr, &key, (*v, comment))?,
        HeaderValue::Str(v) => hdu.write_key(fptr, &key, (v.as_str(), comment))?,
    }
    Ok(())
}

/// Pixel data and projection read back from a SIN image
#[derive(Debug, Clone)]
pub struct SinImage {
    pub data: Array2<f64>,
    pub projection: OrthographicProjection,
}

/// Read a square SIN image written by [`write_sin_image`].
pub fn read_sin_image<P: AsRef<Path>>(path: P) -> Result<SinImage> {
    let (data, crval, cdelt2) = read_sin_primary(path.as_ref())?;
    let (ny, nx) = data.dim();
    if ny != nx {
        return Err(SkyProjError::InvalidGeometry(format!(
            "SIN image must be square, found {nx}x{ny}"
        )));
    }
    let projection = OrthographicProjection::new(crval.0, crval.1, nx, cdelt2)?;
    Ok(SinImage { data, projection })
}

type SinPrimary = (Array2<f64>, (f64, f64), f64);

fn read_sin_primary(path: &Path) -> std::result::Result<SinPrimary, FitsError> {
    let mut fptr = FitsFile::open(path)?;
    let hdu = fptr.primary_hdu()?;

    let naxis1 = hdu.read_key::<i64>(&mut fptr, "NAXIS1")? as usize;
    let naxis2 = hdu.read_key::<i64>(&mut fptr, "NAXIS2")? as usize;
    let crval1 = hdu.read_key::<f64>(&mut fptr, "CRVAL1")?;
    let crval2 = hdu.read_key::<f64>(&mut fptr, "CRVAL2")?;
    let cdelt2 = hdu.read_key::<f64>(&mut fptr, "CDELT2")?;

    let flat = hdu.read_image::<Vec<f64>>(&mut fptr)?;
    let data = Array2::from_shape_vec((naxis2, naxis1), flat).map_err(|_| {
        FitsError::InvalidDataType(format!(
            "cannot reshape image data to {naxis1}x{naxis2} in {}",
            path.display()
        ))
    })?;
    Ok((data, (crval1, crval2), cdelt2))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reproject::{reproject, ImageParams, Pointing};
    use approx::assert_relative_eq;
    use tempfile::tempdir;
    use test_helpers::constant_sky;

    #[test]
    fn test_fits_error_display() {
        let error = FitsError::HduNotFound("TEST".to_string());
        assert!(error.to_string().contains("HDU not found: TEST"));

        let error = FitsError::InvalidDataType("bad data".to_string());
        assert!(error
            .to_string()
            .contains("Invalid data type in HDU: bad data"));
    }

    #[test]
    fn test_healpix_map_file_keeps_values_and_frame() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("map.fits");
        let values: Vec<f64> = (0..48).map(|p| p as f64 * 0.25 - 3.0).collect();
        let map = SphericalPixelMap::new(values, CoordFrame::Galactic).unwrap();

        write_healpix_map(&map, &path).unwrap();
        let read = read_healpix_map(&path).unwrap();
        assert_eq!(read, map);
        assert_eq!(read.nside(), 2);
        assert_eq!(read.frame(), CoordFrame::Galactic);
    }

    #[test]
    fn test_sin_image_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("image.fits");
        let map = SphericalPixelMap::new(constant_sky(4, 5.0), CoordFrame::Celestial).unwrap();
        let params = ImageParams {
            size: 32,
            res_deg: 3.0,
            extra_cards: vec![
                HeaderCard::new("FREQ", HeaderValue::Float(150.0)).with_comment("MHz"),
                HeaderCard::new("BUNIT", HeaderValue::Str("K".to_string())),
            ],
            ..ImageParams::default()
        };
        let image = reproject(&map, Pointing::new(60.0, -30.0), &params).unwrap();

        write_sin_image(&image, &path).unwrap();
        let read = read_sin_image(&path).unwrap();
        assert_eq!(read.data.dim(), (32, 32));
        assert_eq!(read.projection.size, 32);
        assert_relative_eq!(read.projection.crval_ra, 60.0);
        assert_relative_eq!(read.projection.crval_dec, -30.0);
        assert_relative_eq!(read.projection.res, 3.0);
        assert_eq!(read.data, image.data);
    }

    #[test]
    fn test_bad_header_keyword_rejected() {
        let dir = tempdir().unwrap();
        let map = SphericalPixelMap::new(constant_sky(1, 1.0), CoordFrame::Celestial).unwrap();
        let params = ImageParams {
            size: 4,
            res_deg: 1.0,
            extra_cards: vec![HeaderCard::new("WAYTOOLONGKEY", HeaderValue::Int(1))],
            ..ImageParams::default()
        };
        let image = reproject(&map, Pointing::new(0.0, 0.0), &params).unwrap();
        assert!(write_sin_image(&image, dir.path().join("bad.fits")).is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(read_healpix_map("/nonexistent/map.fits").is_err());
    }
}
