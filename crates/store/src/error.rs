//! Error types for tile stores.

use thiserror::Error;
use vegscan_core::BBox;

/// Errors produced while fetching scenes from a tile store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no imagery matches bbox {bbox:?} between {start} and {end} under {cloud_threshold}% cloud")]
    NoImagery {
        bbox: BBox,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
        cloud_threshold: f64,
    },

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("scene {scene} has no asset for band {band}")]
    MissingAsset { scene: String, band: String },

    #[error("catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("core error: {0}")]
    Core(#[from] vegscan_core::Error),
}

impl StoreError {
    /// Whether this error is a fetch deadline expiring.
    pub fn is_timeout(&self) -> bool {
        matches!(self, StoreError::Core(vegscan_core::Error::IoTimeout { .. }))
    }
}

/// Result alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
