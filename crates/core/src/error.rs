//! Error types for vegscan

use std::time::Duration;
use thiserror::Error;

/// Main error type for vegscan raster operations
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

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("Raster grids are not aligned: band '{band}' has a different geotransform")]
    TransformMismatch { band: String },

    #[error("Band '{0}' not found")]
    MissingBand(String),

    #[error("Duplicate band name '{0}'")]
    DuplicateBand(String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Insufficient data: {available} usable values, {required} required ({context})")]
    InsufficientData {
        available: usize,
        required: usize,
        context: &'static str,
    },

    #[error("Cluster model has not been trained")]
    ModelNotTrained,

    #[error("Cluster model is already trained; fit is one-shot")]
    ModelAlreadyTrained,

    #[error("Pixel budget exceeded: raster has {pixels} pixels, budget is {budget}")]
    BudgetExceeded { pixels: u64, budget: u64 },

    #[error("{operation} timed out after {timeout:?}")]
    IoTimeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("Export to {destination} failed: {reason}")]
    Export { destination: String, reason: String },

    #[error("TIFF error: {0}")]
    Tiff(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for vegscan operations
pub type Result<T> = std::result::Result<T, Error>;
