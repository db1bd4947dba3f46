//! Run configuration.
//!
//! A [`PipelineConfig`] is plain serde data, loadable from JSON. Every field
//! has a default, so a config file only needs the values it changes:
//!
//! ```json
//! {
//!   "aoi": { "min_x": 75.7, "min_y": 30.2, "max_x": 76.5, "max_y": 31.0 },
//!   "start_date": "2023-10-01",
//!   "end_date": "2023-11-30",
//!   "clusters": 4,
//!   "export": { "path": "classified.tif" }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vegscan_algorithms::classification::{KMeansParams, Region, SampleParams};
use vegscan_algorithms::imagery::SpectralIndex;
use vegscan_algorithms::statistics::{AreaParams, PixelArea};
use vegscan_core::BBox;
use vegscan_store::{DateRange, TileQuery};

use crate::error::{PipelineError, Result};

/// Pixel sampling for model training
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SampleConfig {
    /// Pixels drawn for training (default: 5000)
    pub num_pixels: usize,
    /// Sampling resolution in metres (default: 10)
    pub scale: Option<f64>,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            num_pixels: 5000,
            scale: Some(10.0),
        }
    }
}

/// Where and how to write the classified raster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// Destination GeoTIFF
    pub path: PathBuf,
    /// Also write the index as a second band (default: true)
    #[serde(default = "default_true")]
    pub include_index: bool,
    /// Deadline for the write, in seconds
    #[serde(default)]
    pub timeout_secs: Option<f64>,
}

fn default_true() -> bool {
    true
}

/// Configuration of one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Area of interest, in the imagery's CRS
    pub aoi: BBox,
    /// First acquisition date (inclusive)
    pub start_date: NaiveDate,
    /// Last acquisition date (inclusive)
    pub end_date: NaiveDate,
    /// Scenes need strictly less cloud cover than this percentage (default: 10)
    pub cloud_threshold: f64,
    /// Normalized-difference index to classify (default: NDVI)
    pub index: SpectralIndex,
    pub sample: SampleConfig,
    /// Number of clusters (default: 4)
    pub clusters: usize,
    /// K-means iteration cap (default: 100)
    pub max_iterations: usize,
    /// Seed for sampling and clustering; `None` draws one per run
    pub seed: Option<u64>,
    /// Largest label raster the area report accepts (default: 1e9)
    pub max_pixels: u64,
    /// Override the pixel area derived from the imagery, in square metres
    pub pixel_area_m2: Option<f64>,
    /// Bins of the index histogram over [-1, 1] (default: 50)
    pub histogram_bins: usize,
    /// Deadline for fetching imagery, in seconds
    pub fetch_timeout_secs: Option<f64>,
    pub export: Option<ExportConfig>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            aoi: BBox::new(75.7, 30.2, 76.5, 31.0),
            start_date: NaiveDate::from_ymd_opt(2023, 10, 1).unwrap_or(NaiveDate::MIN),
            end_date: NaiveDate::from_ymd_opt(2023, 11, 30).unwrap_or(NaiveDate::MIN),
            cloud_threshold: 10.0,
            index: SpectralIndex::Ndvi,
            sample: SampleConfig::default(),
            clusters: 4,
            max_iterations: 100,
            seed: Some(42),
            max_pixels: 1_000_000_000,
            pixel_area_m2: None,
            histogram_bins: 50,
            fetch_timeout_secs: Some(60.0),
            export: None,
        }
    }
}

impl PipelineConfig {
    /// Load and validate a JSON config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(PipelineError::Config(msg));

        if !self.aoi.is_valid() {
            return fail(format!("aoi {:?} is empty or inverted", self.aoi));
        }
        if self.start_date > self.end_date {
            return fail(format!(
                "start_date {} is after end_date {}",
                self.start_date, self.end_date
            ));
        }
        if !(0.0..=100.0).contains(&self.cloud_threshold) {
            return fail(format!(
                "cloud_threshold {} is not a percentage",
                self.cloud_threshold
            ));
        }
        if self.sample.num_pixels == 0 {
            return fail("sample.num_pixels must be at least 1".into());
        }
        if let Some(scale) = self.sample.scale {
            if !(scale.is_finite() && scale > 0.0) {
                return fail(format!("sample.scale {scale} must be positive"));
            }
        }
        if self.clusters == 0 {
            return fail("clusters must be at least 1".into());
        }
        if self.max_iterations == 0 {
            return fail("max_iterations must be at least 1".into());
        }
        if self.histogram_bins == 0 {
            return fail("histogram_bins must be at least 1".into());
        }
        if let Some(area) = self.pixel_area_m2 {
            if !(area.is_finite() && area > 0.0) {
                return fail(format!("pixel_area_m2 {area} must be positive"));
            }
        }
        for (name, secs) in [
            ("fetch_timeout_secs", self.fetch_timeout_secs),
            (
                "export.timeout_secs",
                self.export.as_ref().and_then(|e| e.timeout_secs),
            ),
        ] {
            if let Some(secs) = secs {
                if !(secs.is_finite() && secs > 0.0) {
                    return fail(format!("{name} {secs} must be positive"));
                }
            }
        }
        Ok(())
    }

    /// Tile store query for this run's AOI, dates, cloud threshold and the
    /// bands the index needs.
    pub fn query(&self) -> Result<TileQuery> {
        let dates = DateRange::new(self.start_date, self.end_date)?;
        let (a, b) = self.index.bands();
        Ok(TileQuery::new(self.aoi, dates)
            .cloud_threshold(self.cloud_threshold)
            .bands(&[a, b]))
    }

    pub fn sample_params(&self) -> SampleParams {
        SampleParams {
            num_pixels: self.sample.num_pixels,
            region: Region::Full,
            scale: self.sample.scale,
            seed: self.seed,
        }
    }

    pub fn kmeans_params(&self) -> KMeansParams {
        KMeansParams {
            k: self.clusters,
            max_iterations: self.max_iterations,
            seed: self.seed,
        }
    }

    pub fn area_params(&self) -> AreaParams {
        AreaParams {
            pixel_area: self.pixel_area_m2.map(PixelArea::Constant),
            max_pixels: self.max_pixels,
        }
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs_f64)
    }
}

impl ExportConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_follow_the_reference_run() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.clusters, 4);
        assert_eq!(config.sample.num_pixels, 5000);
        assert_eq!(config.sample.scale, Some(10.0));
        assert_eq!(config.max_pixels, 1_000_000_000);

        let query = config.query().unwrap();
        assert_eq!(query.bands, vec!["B8", "B4"]);
        assert_eq!(query.cloud_threshold, 10.0);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(
            r#"{
                "start_date": "2024-03-01",
                "end_date": "2024-03-31",
                "index": "ndwi",
                "sample": { "num_pixels": 200 },
                "export": { "path": "out/classes.tif" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.index, SpectralIndex::Ndwi);
        assert_eq!(config.sample.num_pixels, 200);
        assert_eq!(config.sample.scale, Some(10.0));
        assert_eq!(config.clusters, 4);
        let export = config.export.unwrap();
        assert!(export.include_index);
        assert_eq!(export.timeout(), None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let bad = [
            r#"{ "clusters": 0 }"#,
            r#"{ "start_date": "2024-02-01", "end_date": "2024-01-01" }"#,
            r#"{ "cloud_threshold": 150 }"#,
            r#"{ "sample": { "scale": -10 } }"#,
            r#"{ "fetch_timeout_secs": 0 }"#,
        ];
        for text in bad {
            assert!(
                matches!(PipelineConfig::from_json(text), Err(PipelineError::Config(_))),
                "accepted {text}"
            );
        }
        assert!(matches!(
            PipelineConfig::from_json(r#"{ "clusterz": 3 }"#),
            Err(PipelineError::ConfigJson(_))
        ));
    }

    #[test]
    fn missing_file_is_config_io() {
        assert!(matches!(
            PipelineConfig::from_file("/nonexistent/vegscan.json"),
            Err(PipelineError::ConfigIo { .. })
        ));
    }
}
