//! Statistics over classified and index rasters
//!
//! - **area**: ground area per class id, with a pixel budget
//! - **histogram**: equal-width value histogram

mod area;
mod histogram;

pub use area::{area_by_class, AreaParams, AreaReport, ClassArea, PixelArea};
pub use histogram::{histogram, Histogram};
