//! Error types for terrashape

use thiserror::Error;

/// Main error type for terrashape operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Coordinate ({x}, {y}) lies outside the surface")]
    SampleOutOfBounds { x: f64, y: f64 },

    #[error("Surface has no data at ({x}, {y})")]
    NoDataValue { x: f64, y: f64 },

    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),

    #[error("Coordinate ({x}, {y}) cannot be projected: {reason}")]
    Projection { x: f64, y: f64, reason: String },

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Precondition violated: {name} = {value} ({reason})")]
    PreconditionViolation {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Field '{field}' is not part of the {collection} schema")]
    SchemaViolation { field: String, collection: String },

    #[error("No feature with id {0}")]
    UnknownFeature(String),

    #[error("Duplicate feature id {0}")]
    DuplicateFeature(String),

    #[error("Invalid point data: {0}")]
    Format(String),

    #[error("Output already exists: {0} (overwrite disabled)")]
    OutputExists(String),

    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Format(e.to_string())
    }
}

impl From<geojson::Error> for Error {
    fn from(e: geojson::Error) -> Self {
        Error::Format(e.to_string())
    }
}

/// Result type alias for terrashape operations
pub type Result<T> = std::result::Result<T, Error>;
