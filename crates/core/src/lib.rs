//! # vegscan Core
//!
//! Core types and I/O for the vegscan vegetation-mapping pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type with no-data handling
//! - `BandStack` / `BandSeries`: named multi-band rasters and dated scene series
//! - `GeoTransform` and `BBox`: georeferencing and geographic extents
//! - `CRS`: Coordinate Reference System handling
//! - GeoTIFF I/O, including timeout-guarded atomic export

pub mod crs;
pub mod error;
pub mod io;
pub mod raster;

pub use chrono::NaiveDate;
pub use crs::CRS;
pub use error::{Error, Result};
pub use raster::{
    BBox, Band, BandSeries, BandStack, GeoTransform, Raster, RasterElement, RasterStatistics, Scene,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::crs::CRS;
    pub use crate::error::{Error, Result};
    pub use crate::raster::{
        BBox, BandSeries, BandStack, GeoTransform, Raster, RasterElement, Scene,
    };
}
