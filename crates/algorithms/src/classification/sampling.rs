//! Random pixel sampling for model fitting
//!
//! Draws a bounded, uniform, without-replacement subset of the valid pixels
//! of an index raster. All draws come from one seeded generator, so a fixed
//! seed reproduces the same sample over the same input.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};
use vegscan_core::raster::{BBox, Raster};
use vegscan_core::{Error, Result};

/// Where candidate pixels may be drawn from
#[derive(Debug, Clone, Default)]
pub enum Region {
    /// Every cell of the raster
    #[default]
    Full,
    /// Cells whose centre lies inside the box (same CRS as the raster)
    Bounds(BBox),
    /// Cells where the mask is non-zero; must match the raster's shape
    Mask(Raster<u8>),
}

/// Parameters for pixel sampling
#[derive(Debug, Clone)]
pub struct SampleParams {
    /// Maximum number of pixels to draw (default: 5000)
    pub num_pixels: usize,
    /// Candidate region (default: full extent)
    pub region: Region,
    /// Sampling resolution in metres. When coarser than the ground cell
    /// size, only cells on a regular stride grid are candidates.
    pub scale: Option<f64>,
    /// Generator seed. `None` draws a fresh one and logs it.
    pub seed: Option<u64>,
}

impl Default for SampleParams {
    fn default() -> Self {
        Self {
            num_pixels: 5000,
            region: Region::Full,
            scale: None,
            seed: None,
        }
    }
}

/// One sampled pixel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub row: usize,
    pub col: usize,
    pub value: f64,
}

/// Draw up to `params.num_pixels` valid pixels from `index`.
///
/// Each pixel is selected at most once. When the region holds fewer valid
/// pixels than requested, all of them are returned, so a region without
/// valid pixels yields an empty sample. Points come back in row-major order.
///
/// # Errors
/// `InvalidParameter` for a zero sample size or a non-positive scale;
/// `SizeMismatch` for a mask of the wrong shape.
pub fn sample_pixels(index: &Raster<f64>, params: &SampleParams) -> Result<Vec<SamplePoint>> {
    if params.num_pixels == 0 {
        return Err(Error::InvalidParameter {
            name: "num_pixels",
            value: "0".into(),
            reason: "at least one pixel must be requested".into(),
        });
    }
    if let Region::Mask(mask) = &params.region {
        if mask.shape() != index.shape() {
            return Err(Error::SizeMismatch {
                er: index.rows(),
                ec: index.cols(),
                ar: mask.rows(),
                ac: mask.cols(),
            });
        }
    }

    let stride = stride_for(index, params.scale)?;
    let candidates = candidates(index, &params.region, stride);
    if candidates.is_empty() {
        warn!("no valid pixel inside the sampling region");
        return Ok(candidates);
    }

    let seed = params.seed.unwrap_or_else(rand::random);
    if params.seed.is_none() {
        info!(seed, "sampling with a generated seed");
    }

    let points = if candidates.len() <= params.num_pixels {
        candidates
    } else {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut picked = rand::seq::index::sample(&mut rng, candidates.len(), params.num_pixels)
            .into_vec();
        picked.sort_unstable();
        picked.into_iter().map(|i| candidates[i]).collect()
    };

    debug!(
        sampled = points.len(),
        requested = params.num_pixels,
        stride,
        "sampled pixels"
    );
    Ok(points)
}

fn stride_for(index: &Raster<f64>, scale: Option<f64>) -> Result<usize> {
    let Some(scale) = scale else {
        return Ok(1);
    };
    if !scale.is_finite() || scale <= 0.0 {
        return Err(Error::InvalidParameter {
            name: "scale",
            value: scale.to_string(),
            reason: "must be a positive distance".into(),
        });
    }
    let (cell, _) = index.ground_cell_size();
    if cell <= 0.0 || !cell.is_finite() {
        return Ok(1);
    }
    Ok(((scale / cell).round() as usize).max(1))
}

/// Valid cells inside the region on the stride grid, row-major.
fn candidates(index: &Raster<f64>, region: &Region, stride: usize) -> Vec<SamplePoint> {
    let data = index.data();
    let mut out = Vec::new();
    for row in (0..index.rows()).step_by(stride) {
        for col in (0..index.cols()).step_by(stride) {
            let value = data[(row, col)];
            if index.is_nodata(value) || !in_region(index, region, row, col) {
                continue;
            }
            out.push(SamplePoint { row, col, value });
        }
    }
    out
}

fn in_region(index: &Raster<f64>, region: &Region, row: usize, col: usize) -> bool {
    match region {
        Region::Full => true,
        Region::Bounds(bbox) => {
            let (x, y) = index.pixel_to_geo(col, row);
            bbox.contains(x, y)
        }
        Region::Mask(mask) => mask.data()[(row, col)] != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vegscan_core::GeoTransform;

    fn index_raster(rows: usize, cols: usize) -> Raster<f64> {
        let values = (0..rows * cols).map(|i| i as f64 / 100.0).collect();
        let mut r = Raster::from_vec(values, rows, cols).unwrap();
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 10.0, 10.0, -10.0));
        r.set_nodata(Some(f64::NAN));
        r
    }

    fn params(num_pixels: usize, seed: u64) -> SampleParams {
        SampleParams {
            num_pixels,
            seed: Some(seed),
            ..Default::default()
        }
    }

    #[test]
    fn fewer_valid_than_requested_returns_all() {
        let mut r = index_raster(3, 3);
        r.set(0, 0, f64::NAN).unwrap();
        r.set(2, 1, f64::NAN).unwrap();

        let points = sample_pixels(&r, &params(100, 7)).unwrap();
        assert_eq!(points.len(), 7);
        assert!(points.iter().all(|p| !p.value.is_nan()));
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let r = index_raster(20, 20);
        let a = sample_pixels(&r, &params(25, 42)).unwrap();
        let b = sample_pixels(&r, &params(25, 42)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 25);
    }

    #[test]
    fn no_pixel_is_drawn_twice() {
        let r = index_raster(10, 10);
        let points = sample_pixels(&r, &params(60, 3)).unwrap();
        let mut cells: Vec<_> = points.iter().map(|p| (p.row, p.col)).collect();
        cells.dedup();
        assert_eq!(cells.len(), 60);
        // row-major order
        assert!(cells.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn bounds_region_limits_candidates() {
        let r = index_raster(10, 10);
        // Upper-left 3x3 block: x in [0, 30), y in [70, 100)
        let p = SampleParams {
            num_pixels: 100,
            region: Region::Bounds(BBox::new(0.0, 70.0, 30.0, 100.0)),
            seed: Some(1),
            ..Default::default()
        };
        let points = sample_pixels(&r, &p).unwrap();
        assert_eq!(points.len(), 9);
        assert!(points.iter().all(|pt| pt.row < 3 && pt.col < 3));
    }

    #[test]
    fn mask_region_and_shape_check() {
        let r = index_raster(2, 2);
        let mask = Raster::from_vec(vec![1u8, 0, 0, 1], 2, 2).unwrap();
        let p = SampleParams {
            num_pixels: 10,
            region: Region::Mask(mask),
            seed: Some(1),
            ..Default::default()
        };
        let points = sample_pixels(&r, &p).unwrap();
        assert_eq!(
            points.iter().map(|p| (p.row, p.col)).collect::<Vec<_>>(),
            vec![(0, 0), (1, 1)]
        );

        let bad = SampleParams {
            region: Region::Mask(Raster::filled(3, 3, 1u8)),
            ..p
        };
        assert!(matches!(
            sample_pixels(&r, &bad),
            Err(Error::SizeMismatch { .. })
        ));
    }

    #[test]
    fn coarse_scale_uses_stride_grid() {
        let r = index_raster(10, 10);
        let p = SampleParams {
            num_pixels: 1000,
            scale: Some(20.0),
            seed: Some(1),
            ..Default::default()
        };
        let points = sample_pixels(&r, &p).unwrap();
        assert_eq!(points.len(), 25);
        assert!(points.iter().all(|pt| pt.row % 2 == 0 && pt.col % 2 == 0));
    }

    #[test]
    fn all_nodata_yields_empty_sample() {
        let r = Raster::filled(2, 2, f64::NAN);
        assert_eq!(sample_pixels(&r, &params(10, 1)).unwrap(), vec![]);
    }
}
