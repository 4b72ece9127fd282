//! File formats for every artifact the pipeline reads or writes.

pub mod fits;
pub mod series;
pub mod table;
pub mod volume;

pub use fits::{read_healpix_map, read_sin_image, write_healpix_map, write_sin_image, FitsError};
pub use series::{read_series_listing, series_from_lists};
pub use table::{load_direction_table, load_or_build, save_direction_table};
pub use volume::{read_volume, write_volume};
