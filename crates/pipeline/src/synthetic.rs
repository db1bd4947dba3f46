//! Synthetic Sentinel-2-like scenes for demos and tests.
//!
//! Each scene is a soil background with a circular vegetation field in the
//! middle: the field reflects strongly in NIR (B8) and absorbs red (B4).
//! Values are digital numbers in the ranges of a Level-2A product.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use vegscan_core::raster::{BandStack, Scene};
use vegscan_core::{BBox, GeoTransform, NaiveDate, Raster, Result, CRS};

/// Shape and content of generated scenes
#[derive(Debug, Clone)]
pub struct SyntheticParams {
    pub rows: usize,
    pub cols: usize,
    pub transform: GeoTransform,
    pub crs: Option<CRS>,
    /// Radius of the vegetation disc, in pixels
    pub disc_radius: f64,
    /// Share of pixels lost to cloud (no-data in every band), in [0, 1]
    pub cloud_fraction: f64,
}

impl Default for SyntheticParams {
    /// 500 x 500 pixels of about 10 m (0.0001 degrees) at 75E 31N.
    fn default() -> Self {
        Self {
            rows: 500,
            cols: 500,
            transform: GeoTransform::new(75.0, 31.0, 0.0001, -0.0001),
            crs: Some(CRS::wgs84()),
            disc_radius: 100.0,
            cloud_fraction: 0.0,
        }
    }
}

impl SyntheticParams {
    /// Extent covered by generated scenes
    pub fn bbox(&self) -> BBox {
        BBox::from_bounds(self.transform.bounds(self.cols, self.rows))
    }

    /// Whether (row, col) lies inside the vegetation disc
    pub fn in_disc(&self, row: usize, col: usize) -> bool {
        let cy = self.rows as f64 / 2.0;
        let cx = self.cols as f64 / 2.0;
        let dy = row as f64 - cy;
        let dx = col as f64 - cx;
        dx * dx + dy * dy < self.disc_radius * self.disc_radius
    }
}

/// Generate one scene with bands `B4` (red) and `B8` (NIR).
pub fn vegetation_scene(
    id: &str,
    date: NaiveDate,
    params: &SyntheticParams,
    seed: u64,
) -> Result<Scene> {
    let mut rng = StdRng::seed_from_u64(seed);
    let n = params.rows * params.cols;
    let mut red = Vec::with_capacity(n);
    let mut nir = Vec::with_capacity(n);

    for row in 0..params.rows {
        for col in 0..params.cols {
            if params.cloud_fraction > 0.0 && rng.gen_bool(params.cloud_fraction.min(1.0)) {
                red.push(f64::NAN);
                nir.push(f64::NAN);
            } else if params.in_disc(row, col) {
                red.push(rng.gen_range(200.0..600.0));
                nir.push(rng.gen_range(2000.0..4000.0));
            } else {
                red.push(rng.gen_range(500.0..1500.0));
                nir.push(rng.gen_range(600.0..1600.0));
            }
        }
    }

    let band = |values: Vec<f64>| -> Result<Raster<f64>> {
        let mut r = Raster::from_vec(values, params.rows, params.cols)?;
        r.set_transform(params.transform);
        r.set_crs(params.crs.clone());
        r.set_nodata(Some(f64::NAN));
        Ok(r)
    };

    Ok(Scene {
        id: id.to_string(),
        date,
        bands: BandStack::from_bands([("B4", band(red)?), ("B8", band(nir)?)])?,
    })
}
