//! Unsupervised classification of index rasters
//!
//! - **Sampling**: seeded random draw of valid pixels for training
//! - **K-means**: 1-D clustering with a one-shot fit and raster-wide assignment

mod kmeans;
mod sampling;

pub use kmeans::{ClusterModel, KMeans, KMeansParams, NODATA_LABEL};
pub use sampling::{sample_pixels, Region, SampleParams, SamplePoint};
