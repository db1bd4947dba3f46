//! Raster data structures and operations

mod band;
mod bbox;
mod element;
mod geotransform;
mod grid;

pub use band::{Band, BandSeries, BandStack, Scene};
pub use bbox::BBox;
pub use element::RasterElement;
pub use geotransform::GeoTransform;
pub use grid::{Raster, RasterStatistics, METRES_PER_DEGREE};
