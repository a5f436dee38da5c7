//! I/O for elevation surfaces and point layers

mod points;
mod native;

pub use points::{
    read_points, read_points_from_str, write_points, write_points_to_string, WriteOptions,
};
pub use native::{
    read_geotiff, read_geotiff_from_buffer, write_geotiff, write_geotiff_to_buffer,
};
