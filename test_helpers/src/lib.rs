//! Test helpers for skyproj
//!
//! Small synthetic simulation volumes and sky maps. Fixtures are plain
//! `ndarray` / `Vec` values so they can be used from unit tests inside any
//! workspace crate.

use ndarray::Array3;

/// Cube of `side`³ cells all holding `value`
pub fn constant_cube(side: usize, value: f64) -> Array3<f64> {
    Array3::from_elem((side, side, side), value)
}

/// Zero cube with a single non-zero cell at `index`.
///
/// Panics if `index` lies outside the cube.
pub fn single_cell_cube(side: usize, index: [usize; 3], value: f64) -> Array3<f64> {
    let mut cube = Array3::zeros((side, side, side));
    cube[index] = value;
    cube
}

/// Cube whose value encodes its own flat row-major index.
///
/// Every cell is distinct, so a lookup result identifies exactly which cell
/// was read.
pub fn index_cube(shape: [usize; 3]) -> Array3<f64> {
    Array3::from_shape_fn((shape[0], shape[1], shape[2]), |(i, j, k)| {
        ((i * shape[1] + j) * shape[2] + k) as f64
    })
}

/// HEALPix-sized vector (12·nside²) holding `value` everywhere
pub fn constant_sky(nside: usize, value: f64) -> Vec<f64> {
    vec![value; 12 * nside * nside]
}
