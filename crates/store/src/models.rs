//! Scene catalog data types.
//!
//! Serde models for a local `catalog.json`, shaped like a STAC Item
//! Collection: each feature carries an id, an acquisition datetime, a
//! bbox, the `eo:cloud_cover` percentage and one GeoTIFF asset per band.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vegscan_core::BBox;

/// A collection of scene items (GeoJSON FeatureCollection).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SceneCatalog {
    #[serde(rename = "type", default = "feature_collection")]
    pub type_: String,

    pub features: Vec<SceneItem>,
}

fn feature_collection() -> String {
    "FeatureCollection".into()
}

impl SceneCatalog {
    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

/// A single scene (GeoJSON Feature).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneItem {
    /// Unique scene identifier.
    pub id: String,

    /// Bounding box `[west, south, east, north]` in the imagery's CRS.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<Vec<f64>>,

    pub properties: SceneProperties,

    /// Assets keyed by band name (e.g. `"B4"`).
    pub assets: HashMap<String, SceneAsset>,
}

impl SceneItem {
    /// Get an asset by band name.
    pub fn asset(&self, band: &str) -> Option<&SceneAsset> {
        self.assets.get(band)
    }

    /// Acquisition date, taken from the leading `YYYY-MM-DD` of the
    /// datetime property.
    pub fn date(&self) -> Option<NaiveDate> {
        let datetime = self.properties.datetime.as_deref()?;
        NaiveDate::parse_from_str(datetime.get(..10)?, "%Y-%m-%d").ok()
    }

    pub fn cloud_cover(&self) -> Option<f64> {
        self.properties.eo_cloud_cover
    }

    /// The item's bbox, if present and well formed.
    pub fn extent(&self) -> Option<BBox> {
        match self.bbox.as_deref()? {
            [w, s, e, n] => Some(BBox::new(*w, *s, *e, *n)),
            _ => None,
        }
    }
}

/// Scene properties.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SceneProperties {
    /// ISO 8601 datetime.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,

    /// Cloud cover percentage (EO extension).
    #[serde(rename = "eo:cloud_cover", skip_serializing_if = "Option::is_none")]
    pub eo_cloud_cover: Option<f64>,

    /// Platform name (e.g., "sentinel-2a").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,

    /// All other properties we don't model explicitly.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A single band file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SceneAsset {
    /// Path to the GeoTIFF, relative to the catalog's directory unless absolute.
    pub href: String,

    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {
      "id": "S2A_MSIL2A_20231015T103021_T32TNS",
      "bbox": [500000.0, 4990000.0, 510000.0, 5000000.0],
      "properties": {
        "datetime": "2023-10-15T10:30:21Z",
        "eo:cloud_cover": 4.7,
        "platform": "sentinel-2a",
        "proj:epsg": 32632
      },
      "assets": {
        "B4": { "href": "S2A_20231015/B04.tif", "title": "Band 4 - Red" },
        "B8": { "href": "S2A_20231015/B08.tif" }
      }
    }
  ]
}"#;

    #[test]
    fn parse_catalog() {
        let catalog: SceneCatalog = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(catalog.len(), 1);

        let item = &catalog.features[0];
        assert_eq!(item.date(), NaiveDate::from_ymd_opt(2023, 10, 15));
        assert_eq!(item.cloud_cover(), Some(4.7));
        assert_eq!(
            item.extent(),
            Some(BBox::new(500000.0, 4990000.0, 510000.0, 5000000.0))
        );
        assert_eq!(item.asset("B8").unwrap().href, "S2A_20231015/B08.tif");
        assert!(item.asset("B11").is_none());
        assert_eq!(item.properties.extra["proj:epsg"], 32632);
    }

    #[test]
    fn malformed_fields_are_none() {
        let item = SceneItem {
            id: "x".into(),
            bbox: Some(vec![0.0, 1.0]),
            properties: SceneProperties {
                datetime: Some("15/10/2023".into()),
                ..Default::default()
            },
            assets: HashMap::new(),
        };
        assert_eq!(item.date(), None);
        assert_eq!(item.extent(), None);
    }

    #[test]
    fn roundtrip_keeps_cloud_cover_key() {
        let catalog: SceneCatalog = serde_json::from_str(FIXTURE).unwrap();
        let json = serde_json::to_string(&catalog).unwrap();
        assert!(json.contains("\"eo:cloud_cover\":4.7"));
    }
}
