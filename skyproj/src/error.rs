//! Error type shared by every stage of the projection pipeline

use thiserror::Error;

/// Errors raised by the projection pipeline.
///
/// Every stage checks its preconditions before doing any array work, so an
/// error always means no output artifact was produced.
#[derive(Error, Debug)]
pub enum SkyProjError {
    /// Malformed or insufficient redshift series, bad frequency, bad task
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Two volumes that must be combined cell by cell have different shapes
    #[error("Volume shape mismatch: {lo:?} at z={z_lo} vs {hi:?} at z={z_hi}")]
    ShapeMismatch {
        lo: [usize; 3],
        hi: [usize; 3],
        z_lo: f64,
        z_hi: f64,
    },

    /// Volume extents are not three positive integers or disagree with the geometry
    #[error("Invalid volume shape: {0}")]
    Shape(String),

    /// Pixelization, direction table or image geometry is inconsistent
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Sphere map length is not 12·N² for an integer N
    #[error("Invalid pixelization: {npix} pixels is not 12 * nside^2 for an integer nside")]
    InvalidPixelization { npix: usize },

    #[error("Distance model error: {0}")]
    Cosmology(#[from] cosmology::CosmologyError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FITS error: {0}")]
    Fits(#[from] crate::io::fits::FitsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, SkyProjError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = SkyProjError::InvalidPixelization { npix: 13 };
        assert!(error.to_string().contains("13 pixels"));

        let error = SkyProjError::ShapeMismatch {
            lo: [4, 4, 4],
            hi: [4, 4, 8],
            z_lo: 6.0,
            z_hi: 7.0,
        };
        let msg = error.to_string();
        assert!(msg.contains("[4, 4, 4]"));
        assert!(msg.contains("z=7"));
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing cube");
        let err: SkyProjError = io.into();
        assert!(matches!(err, SkyProjError::Io(_)));
        assert!(err.to_string().contains("missing cube"));
    }
}
