//! Directory-backed tile store.
//!
//! Layout:
//!
//! ```text
//! <root>/catalog.json          SceneCatalog
//! <root>/<scene id>/<band>.tif single-band GeoTIFF per asset
//! ```

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::{debug, warn};
use vegscan_core::io::{read_geotiff, write_geotiff};
use vegscan_core::raster::{BandSeries, BandStack, Scene};

use crate::error::{Result, StoreError};
use crate::models::{SceneAsset, SceneCatalog, SceneItem, SceneProperties};
use crate::query::TileQuery;
use crate::store::{into_series, select_bands, TileStore};

/// File name of the catalog inside a store directory.
pub const CATALOG_FILE: &str = "catalog.json";

/// Tile store reading a [`SceneCatalog`] and its GeoTIFF assets from disk.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
    catalog: SceneCatalog,
}

impl DirectoryStore {
    /// Open an existing store directory.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let path = root.join(CATALOG_FILE);
        let file = File::open(&path).map_err(|e| {
            StoreError::Catalog(format!("cannot open {}: {}", path.display(), e))
        })?;
        let catalog: SceneCatalog = serde_json::from_reader(BufReader::new(file))?;
        debug!(root = %root.display(), items = catalog.len(), "opened scene catalog");
        Ok(Self { root, catalog })
    }

    /// Start an empty store in `root`, creating the directory if needed.
    pub fn create(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(vegscan_core::Error::from)?;
        let store = Self {
            root,
            catalog: SceneCatalog::default(),
        };
        store.write_catalog()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn catalog(&self) -> &SceneCatalog {
        &self.catalog
    }

    /// Write every band of `scene` as a GeoTIFF and record it in the catalog.
    pub fn add_scene(&mut self, scene: &Scene, cloud_cover: Option<f64>) -> Result<()> {
        let dir = self.root.join(&scene.id);
        std::fs::create_dir_all(&dir).map_err(vegscan_core::Error::from)?;

        let mut assets = HashMap::new();
        for band in scene.bands.bands() {
            let href = format!("{}/{}.tif", scene.id, band.name);
            write_geotiff(&band.raster, self.root.join(&href))?;
            assets.insert(band.name.clone(), SceneAsset { href, title: None });
        }

        let extent = scene
            .bands
            .bands()
            .first()
            .map(|b| b.raster.bbox())
            .map(|b| vec![b.min_x, b.min_y, b.max_x, b.max_y]);

        self.catalog.features.push(SceneItem {
            id: scene.id.clone(),
            bbox: extent,
            properties: SceneProperties {
                datetime: Some(format!("{}T00:00:00Z", scene.date)),
                eo_cloud_cover: cloud_cover,
                ..Default::default()
            },
            assets,
        });
        self.write_catalog()
    }

    /// Replace `catalog.json` atomically: the catalog is written and flushed to
    /// a temp file in the store root, then renamed over the old one.
    fn write_catalog(&self) -> Result<()> {
        let path = self.root.join(CATALOG_FILE);
        let mut tmp = NamedTempFile::new_in(&self.root).map_err(vegscan_core::Error::from)?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer_pretty(&mut writer, &self.catalog)?;
            writer.flush().map_err(vegscan_core::Error::from)?;
        }
        tmp.persist(&path).map_err(|e| {
            StoreError::Catalog(format!("cannot write {}: {}", path.display(), e.error))
        })?;
        Ok(())
    }

    fn resolve(&self, href: &str) -> PathBuf {
        let path = Path::new(href);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        }
    }

    fn load_scene(&self, item: &SceneItem, query: &TileQuery) -> Result<Scene> {
        let date = item.date().ok_or_else(|| {
            StoreError::Catalog(format!("scene {} has no usable datetime", item.id))
        })?;

        let mut bands = BandStack::new();
        for name in &query.bands {
            let asset = item.asset(name).ok_or_else(|| StoreError::MissingAsset {
                scene: item.id.clone(),
                band: name.clone(),
            })?;
            let raster = read_geotiff::<f64, _>(self.resolve(&asset.href))?;
            bands.push(name.as_str(), raster)?;
        }

        Ok(Scene {
            id: item.id.clone(),
            date,
            bands,
        })
    }
}

impl TileStore for DirectoryStore {
    fn fetch(&self, query: &TileQuery) -> Result<BandSeries> {
        query.validate()?;

        let mut matched = Vec::new();
        for item in &self.catalog.features {
            let Some(date) = item.date() else {
                warn!(scene = %item.id, "skipping scene without a usable datetime");
                continue;
            };
            if !query.accepts(date, item.cloud_cover()) {
                continue;
            }
            if let Some(extent) = item.extent() {
                if !extent.intersects(&query.bbox) {
                    continue;
                }
            }

            let scene = self.load_scene(item, query)?;
            if let Some(scene) = select_bands(&scene, query)? {
                matched.push(scene);
            }
        }
        into_series(matched, query)
    }
}
