//! Imagery analysis algorithms
//!
//! - Median compositing of a dated scene series
//! - Normalized difference: generic two-band index and named presets

mod composite;
mod indices;

pub use composite::{median, median_composite, median_of};
pub use indices::{band_index, normalized_difference, SpectralIndex};
