//! One run of the vegetation-mapping pipeline.
//!
//! ```text
//! fetch -> composite -> index -> sample -> fit -> assign -> aggregate
//!                                                       \-> export
//! ```
//!
//! Stages pass owned values forward; nothing is shared between runs. The
//! first failing stage ends the run.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, info_span};
use vegscan_algorithms::classification::{sample_pixels, ClusterModel, KMeans};
use vegscan_algorithms::imagery::median_composite;
use vegscan_algorithms::statistics::{area_by_class, histogram, AreaReport, Histogram};
use vegscan_core::io::{export_geotiff, ExportOptions, ExportReceipt};
use vegscan_core::raster::{BandStack, Raster, RasterStatistics};
use vegscan_store::{fetch_with_timeout, TileStore};

use crate::config::{ExportConfig, PipelineConfig};
use crate::error::{AtStage, Result, Stage};

/// Name of the label band in exported files
pub const CLASS_BAND: &str = "class";

/// Everything a run produced
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Number of scenes that went into the composite
    pub scenes: usize,
    pub composite: BandStack,
    pub index: Raster<f64>,
    pub index_stats: RasterStatistics,
    /// Index distribution over [-1, 1]
    pub histogram: Histogram,
    /// Pixels used to train the model
    pub samples: usize,
    pub model: ClusterModel,
    pub labels: Raster<i32>,
    pub report: AreaReport,
    pub export: Option<ExportReceipt>,
    pub elapsed: Duration,
}

/// A validated configuration, ready to run against any tile store.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every stage in order against `store`.
    pub fn run(&self, store: Arc<dyn TileStore>) -> Result<PipelineOutput> {
        let config = &self.config;
        let started = Instant::now();
        let span = info_span!("pipeline", index = %config.index, k = config.clusters);
        let _guard = span.enter();

        let query = config.query()?;
        info!(
            aoi = ?query.bbox,
            start = %query.dates.start,
            end = %query.dates.end,
            cloud_threshold = query.cloud_threshold,
            "fetching imagery"
        );
        let series = fetch_with_timeout(store, &query, config.fetch_timeout())?;
        let scenes = series.len();

        let composite = median_composite(&series).at(Stage::Composite)?;
        drop(series);
        debug!(bands = composite.len(), "composite ready");

        let index = config.index.compute(&composite).at(Stage::Index)?;
        let index_stats = index.statistics();
        info!(
            index = %config.index,
            valid = index_stats.valid_count,
            nodata = index_stats.nodata_count,
            min = ?index_stats.min,
            max = ?index_stats.max,
            mean = ?index_stats.mean,
            "index computed"
        );
        let histogram =
            histogram(&index, config.histogram_bins, Some((-1.0, 1.0))).at(Stage::Index)?;

        let samples = sample_pixels(&index, &config.sample_params()).at(Stage::Sample)?;
        let values: Vec<f64> = samples.iter().map(|p| p.value).collect();
        info!(samples = values.len(), "training sample drawn");

        let mut kmeans = KMeans::new(config.kmeans_params()).at(Stage::Fit)?;
        let model = kmeans.fit(&values).at(Stage::Fit)?.clone();

        let labels = kmeans.assign(&index).at(Stage::Assign)?;

        let report = area_by_class(&labels, &config.area_params()).at(Stage::Aggregate)?;
        for (class, area) in report.classes() {
            info!(
                class,
                centroid = model.centroids().get(*class as usize).copied(),
                pixels = area.pixels,
                hectares = area.hectares(),
                "class area"
            );
        }

        let export = match &config.export {
            Some(export) => Some(self.export(export, &labels, &index).at(Stage::Export)?),
            None => None,
        };

        let elapsed = started.elapsed();
        info!(?elapsed, "pipeline finished");

        Ok(PipelineOutput {
            scenes,
            composite,
            index,
            index_stats,
            histogram,
            samples: values.len(),
            model,
            labels,
            report,
            export,
            elapsed,
        })
    }

    fn export(
        &self,
        export: &ExportConfig,
        labels: &Raster<i32>,
        index: &Raster<f64>,
    ) -> vegscan_core::Result<ExportReceipt> {
        let mut stack = BandStack::new();
        stack.push(CLASS_BAND, labels.to_f64())?;
        if export.include_index {
            stack.push(self.config.index.name(), index.clone())?;
        }
        let options = ExportOptions {
            timeout: export.timeout(),
            region: Some(self.config.aoi),
        };
        export_geotiff(&stack, &export.path, &options)
    }
}
