//! # terrashape core
//!
//! Core types, traits and I/O for terrain shape analysis.
//!
//! This crate provides:
//! - `Raster`: georeferenced elevation grid with a side-channel no-data value
//! - `GeoTransform`: affine transformation for georeferencing
//! - `CRS`: coordinate reference systems and pure-Rust projections
//! - `PointCollection` / `PointStore`: point layers with a declared schema
//! - I/O for GeoTIFF surfaces and GeoJSON point layers

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;
pub mod vector;

pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{GeoTransform, Raster};
pub use vector::{AttributeValue, FeatureId, PointCollection, PointFeature, PointStore};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::{CoordinateTransform, CRS};
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Raster};
    pub use crate::vector::{FeatureId, PointCollection, PointStore};
    pub use crate::Algorithm;
}

/// Core trait for algorithms.
///
/// Algorithms transform input data according to parameters.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
