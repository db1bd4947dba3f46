//! # vegscan Pipeline
//!
//! Runs the full vegetation-mapping chain against a tile store: fetch,
//! median composite, normalized-difference index, seeded sampling, k-means
//! fit and assignment, area per class and an optional GeoTIFF export.
//!
//! ```no_run
//! use std::sync::Arc;
//! use vegscan_pipeline::{Pipeline, PipelineConfig};
//! use vegscan_store::DirectoryStore;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::from_file("vegscan.json")?;
//! let store = Arc::new(DirectoryStore::open("data/")?);
//! let output = Pipeline::new(config)?.run(store)?;
//! println!("{}", output.report);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod pipeline;
pub mod synthetic;

pub use config::{ExportConfig, PipelineConfig, SampleConfig};
pub use error::{PipelineError, Result, Stage};
pub use pipeline::{Pipeline, PipelineOutput, CLASS_BAND};
