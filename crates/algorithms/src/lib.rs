//! # vegscan Algorithms
//!
//! The per-pixel stages of the vegscan pipeline.
//!
//! ## Available Algorithm Categories
//!
//! - **imagery**: median compositing, normalized-difference indices
//! - **classification**: seeded pixel sampling, 1-D k-means
//! - **statistics**: area per class, value histograms
//!
//! Row-parallel stages use rayon when the `parallel` feature is on (the
//! default) and fall back to plain iterators otherwise.

pub mod classification;
pub mod imagery;
mod maybe_rayon;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::classification::{
        sample_pixels, ClusterModel, KMeans, KMeansParams, Region, SampleParams, SamplePoint,
    };
    pub use crate::imagery::{band_index, median_composite, normalized_difference, SpectralIndex};
    pub use crate::statistics::{
        area_by_class, histogram, AreaParams, AreaReport, Histogram, PixelArea,
    };
    pub use vegscan_core::prelude::*;
}
