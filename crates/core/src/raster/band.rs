//! Named multi-band rasters and dated scene series
//!
//! A [`BandStack`] is one multi-band image: every band shares the same grid.
//! A [`BandSeries`] is a time-ordered list of such images over one extent,
//! which is what the compositor reduces.

use chrono::NaiveDate;

use crate::error::{Error, Result};
use crate::raster::{BBox, GeoTransform, Raster};

/// One named band of a [`BandStack`].
#[derive(Debug, Clone)]
pub struct Band {
    pub name: String,
    pub raster: Raster<f64>,
}

/// Ordered set of named bands sharing width, height and geotransform.
#[derive(Debug, Clone, Default)]
pub struct BandStack {
    bands: Vec<Band>,
}

impl BandStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stack from `(name, raster)` pairs, validating the grid invariant.
    pub fn from_bands<I, S>(bands: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Raster<f64>)>,
        S: Into<String>,
    {
        let mut stack = Self::new();
        for (name, raster) in bands {
            stack.push(name, raster)?;
        }
        Ok(stack)
    }

    /// Append a band. Fails if the name is taken or the grid differs.
    pub fn push(&mut self, name: impl Into<String>, raster: Raster<f64>) -> Result<()> {
        let name = name.into();
        if self.bands.iter().any(|b| b.name == name) {
            return Err(Error::DuplicateBand(name));
        }
        if let Some(first) = self.bands.first() {
            let (er, ec) = first.raster.shape();
            let (ar, ac) = raster.shape();
            if (er, ec) != (ar, ac) {
                return Err(Error::SizeMismatch { er, ec, ar, ac });
            }
            if !first.raster.transform().same_grid(raster.transform()) {
                return Err(Error::TransformMismatch { band: name });
            }
        }
        self.bands.push(Band { name, raster });
        Ok(())
    }

    /// Look up a band by name
    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands
            .iter()
            .find(|b| b.name == name)
            .map(|b| &b.raster)
            .ok_or_else(|| Error::MissingBand(name.to_string()))
    }

    pub fn names(&self) -> Vec<&str> {
        self.bands.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    pub fn into_bands(self) -> Vec<Band> {
        self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Grid shape (rows, cols); `(0, 0)` for an empty stack
    pub fn shape(&self) -> (usize, usize) {
        self.bands.first().map_or((0, 0), |b| b.raster.shape())
    }

    /// Shared geotransform, if the stack has any band
    pub fn transform(&self) -> Option<&GeoTransform> {
        self.bands.first().map(|b| b.raster.transform())
    }

    /// Crop every band to `bbox`
    pub fn crop(&self, bbox: &BBox) -> Result<Self> {
        let bands = self
            .bands
            .iter()
            .map(|b| Ok(Band { name: b.name.clone(), raster: b.raster.crop(bbox)? }))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { bands })
    }

    /// Sample every band onto the given grid, NaN where a band has no coverage.
    pub fn regrid(&self, transform: &GeoTransform, rows: usize, cols: usize) -> Self {
        let bands = self
            .bands
            .iter()
            .map(|b| Band {
                name: b.name.clone(),
                raster: b.raster.regrid(transform, rows, cols, f64::NAN),
            })
            .collect();
        Self { bands }
    }
}

/// A single acquisition: an identifier, a date and its bands.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub date: NaiveDate,
    pub bands: BandStack,
}

/// Time-ordered scenes over one grid, all carrying the same band names.
#[derive(Debug, Clone, Default)]
pub struct BandSeries {
    scenes: Vec<Scene>,
}

impl BandSeries {
    /// Build a series, sorting scenes by date and checking they are aligned.
    pub fn new(mut scenes: Vec<Scene>) -> Result<Self> {
        scenes.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        if let Some(first) = scenes.first() {
            let names = first.bands.names();
            let (er, ec) = first.bands.shape();
            let transform = first.bands.transform().copied();

            for scene in &scenes[1..] {
                let (ar, ac) = scene.bands.shape();
                if (er, ec) != (ar, ac) {
                    return Err(Error::SizeMismatch { er, ec, ar, ac });
                }
                if let (Some(a), Some(b)) = (transform.as_ref(), scene.bands.transform()) {
                    if !a.same_grid(b) {
                        return Err(Error::TransformMismatch { band: scene.id.clone() });
                    }
                }
                for name in &names {
                    scene.bands.band(name)?;
                }
            }
        }

        Ok(Self { scenes })
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    /// Band names of the series (taken from the first scene)
    pub fn band_names(&self) -> Vec<&str> {
        self.scenes.first().map_or_else(Vec::new, |s| s.bands.names())
    }

    pub fn shape(&self) -> (usize, usize) {
        self.scenes.first().map_or((0, 0), |s| s.bands.shape())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(3, 3, value);
        r.set_transform(GeoTransform::new(0.0, 30.0, 10.0, -10.0));
        r
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 10, d).unwrap()
    }

    #[test]
    fn stack_rejects_misaligned_bands() {
        let mut stack = BandStack::new();
        stack.push("B4", grid(0.1)).unwrap();

        assert!(matches!(stack.push("B4", grid(0.2)), Err(Error::DuplicateBand(_))));
        assert!(matches!(
            stack.push("B8", Raster::filled(2, 3, 0.3)),
            Err(Error::SizeMismatch { .. })
        ));

        let mut shifted = grid(0.3);
        shifted.set_transform(GeoTransform::new(5.0, 30.0, 10.0, -10.0));
        assert!(matches!(stack.push("B8", shifted), Err(Error::TransformMismatch { .. })));

        stack.push("B8", grid(0.4)).unwrap();
        assert_eq!(stack.names(), vec!["B4", "B8"]);
        assert!(matches!(stack.band("B2"), Err(Error::MissingBand(_))));
    }

    #[test]
    fn series_sorted_by_date() {
        let scene = |id: &str, d| Scene {
            id: id.into(),
            date: date(d),
            bands: BandStack::from_bands([("B4", grid(0.1))]).unwrap(),
        };
        let series = BandSeries::new(vec![scene("late", 20), scene("early", 2)]).unwrap();
        assert_eq!(series.scenes()[0].id, "early");
        assert_eq!(series.band_names(), vec!["B4"]);
        assert_eq!(series.shape(), (3, 3));
    }

    #[test]
    fn series_requires_matching_bands() {
        let a = Scene {
            id: "a".into(),
            date: date(1),
            bands: BandStack::from_bands([("B4", grid(0.1)), ("B8", grid(0.5))]).unwrap(),
        };
        let b = Scene {
            id: "b".into(),
            date: date(2),
            bands: BandStack::from_bands([("B4", grid(0.1))]).unwrap(),
        };
        assert!(matches!(BandSeries::new(vec![a, b]), Err(Error::MissingBand(_))));
    }
}
