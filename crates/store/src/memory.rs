//! In-memory tile store.

use std::sync::RwLock;

use vegscan_core::raster::{BandSeries, Scene};

use crate::error::Result;
use crate::query::TileQuery;
use crate::store::{into_series, select_bands, TileStore};

/// A scene held in memory with its cloud cover.
#[derive(Debug, Clone)]
struct StoredScene {
    scene: Scene,
    cloud_cover: Option<f64>,
}

/// Tile store over scenes held in memory. Applies the same filtering as
/// [`crate::DirectoryStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    scenes: RwLock<Vec<StoredScene>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scene with its cloud cover percentage.
    pub fn insert(&self, scene: Scene, cloud_cover: Option<f64>) {
        self.scenes
            .write()
            .unwrap_or_else(|p| p.into_inner())
            .push(StoredScene { scene, cloud_cover });
    }

    pub fn with_scene(self, scene: Scene, cloud_cover: Option<f64>) -> Self {
        self.insert(scene, cloud_cover);
        self
    }

    pub fn len(&self) -> usize {
        self.scenes.read().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TileStore for MemoryStore {
    fn fetch(&self, query: &TileQuery) -> Result<BandSeries> {
        query.validate()?;
        let stored = self.scenes.read().unwrap_or_else(|p| p.into_inner());

        let mut matched = Vec::new();
        for entry in stored.iter() {
            if !query.accepts(entry.scene.date, entry.cloud_cover) {
                continue;
            }
            if let Some(scene) = select_bands(&entry.scene, query)? {
                matched.push(scene);
            }
        }
        into_series(matched, query)
    }
}
