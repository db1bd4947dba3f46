//! # vegscan Store
//!
//! Where the pipeline's imagery comes from.
//!
//! A [`TileStore`] answers a [`TileQuery`] (bbox, inclusive date range,
//! cloud threshold, bands) with a date-ordered [`BandSeries`] on one grid
//! covering the query box, or [`StoreError::NoImagery`] when nothing matches.
//!
//! - [`DirectoryStore`]: a `catalog.json` plus one GeoTIFF per band
//! - [`MemoryStore`]: scenes held in memory
//! - [`fetch_with_timeout`]: any store behind a caller-supplied deadline

pub mod directory;
pub mod error;
pub mod memory;
pub mod models;
pub mod query;
mod store;

pub use directory::{DirectoryStore, CATALOG_FILE};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use models::{SceneAsset, SceneCatalog, SceneItem, SceneProperties};
pub use query::{DateRange, TileQuery};
pub use store::{fetch_with_timeout, TileStore};

pub use vegscan_core::BandSeries;
