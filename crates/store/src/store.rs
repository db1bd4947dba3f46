//! The tile store contract and a deadline-guarded fetch.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};
use vegscan_core::io::with_timeout;
use vegscan_core::raster::{BandSeries, BandStack, Scene};

use crate::error::{Result, StoreError};
use crate::query::TileQuery;

/// Source of cloud-filtered scenes.
///
/// `fetch` returns every matching scene, restricted to the requested bands
/// and placed on one grid covering the query box, in date order. Zero matches is
/// [`StoreError::NoImagery`], never an empty series.
pub trait TileStore: Send + Sync {
    fn fetch(&self, query: &TileQuery) -> Result<BandSeries>;
}

/// Run `store.fetch` on a worker thread, giving up after `timeout`.
///
/// Expiry surfaces as [`vegscan_core::Error::IoTimeout`] inside
/// [`StoreError::Core`]. The fetch is not retried.
pub fn fetch_with_timeout(
    store: Arc<dyn TileStore>,
    query: &TileQuery,
    timeout: Option<Duration>,
) -> Result<BandSeries> {
    let query = query.clone();
    with_timeout("tile fetch", timeout, move |_| store.fetch(&query))
}

/// Keep the requested bands of `scene` (in query order). `Ok(None)` when
/// no pixel centre of the scene falls inside the query box.
pub(crate) fn select_bands(scene: &Scene, query: &TileQuery) -> Result<Option<Scene>> {
    let mut bands = BandStack::new();
    for name in &query.bands {
        let raster = scene.bands.band(name).map_err(|_| StoreError::MissingAsset {
            scene: scene.id.clone(),
            band: name.clone(),
        })?;
        bands.push(name.as_str(), raster.clone())?;
    }

    let (rows, cols) = bands.shape();
    let Some(transform) = bands.transform() else {
        return Ok(None);
    };
    if query.bbox.pixel_window(transform, rows, cols).is_none() {
        debug!(scene = %scene.id, "scene does not cover the query box");
        return Ok(None);
    }

    Ok(Some(Scene {
        id: scene.id.clone(),
        date: scene.date,
        bands,
    }))
}

/// Place the matched scenes on one grid covering the query box and turn
/// them into a series, or report that nothing matched.
///
/// The grid follows the lattice of the earliest scene. Scenes that only
/// partly cover the box (adjacent tiles) are NaN outside their footprint,
/// which the compositor skips.
pub(crate) fn into_series(mut scenes: Vec<Scene>, query: &TileQuery) -> Result<BandSeries> {
    scenes.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
    let Some(reference) = scenes.first().and_then(|s| s.bands.transform().copied()) else {
        return Err(query.no_imagery());
    };
    let Some((transform, rows, cols)) = query.bbox.grid_on(&reference) else {
        return Err(query.no_imagery());
    };

    let scenes = scenes
        .into_iter()
        .map(|scene| Scene {
            bands: scene.bands.regrid(&transform, rows, cols),
            ..scene
        })
        .collect();
    let series = BandSeries::new(scenes)?;
    info!(
        scenes = series.len(),
        rows = series.shape().0,
        cols = series.shape().1,
        "fetched scenes"
    );
    Ok(series)
}
