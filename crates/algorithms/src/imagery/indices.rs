//! Normalized-difference spectral indices
//!
//! Every index here is a ratio of the form `(A - B) / (A + B)` between two
//! named bands of a [`BandStack`]. The result is a single-band index raster
//! in [-1, 1] with NaN as no-data.

use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use vegscan_core::raster::{BandStack, Raster};
use vegscan_core::{Error, Result};

/// Normalized-difference presets with Sentinel-2 band names
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpectralIndex {
    /// Normalized Difference Vegetation Index, (B8 - B4) / (B8 + B4)
    #[default]
    Ndvi,
    /// Normalized Difference Water Index (McFeeters), (B3 - B8) / (B3 + B8)
    Ndwi,
    /// Modified NDWI (Xu), (B3 - B11) / (B3 + B11)
    Mndwi,
    /// Normalized Burn Ratio, (B8 - B12) / (B8 + B12)
    Nbr,
}

impl SpectralIndex {
    /// Band names `(A, B)` entering `(A - B) / (A + B)`.
    pub fn bands(self) -> (&'static str, &'static str) {
        match self {
            SpectralIndex::Ndvi => ("B8", "B4"),
            SpectralIndex::Ndwi => ("B3", "B8"),
            SpectralIndex::Mndwi => ("B3", "B11"),
            SpectralIndex::Nbr => ("B8", "B12"),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SpectralIndex::Ndvi => "NDVI",
            SpectralIndex::Ndwi => "NDWI",
            SpectralIndex::Mndwi => "MNDWI",
            SpectralIndex::Nbr => "NBR",
        }
    }

    /// Compute this index from a multi-band image.
    pub fn compute(self, stack: &BandStack) -> Result<Raster<f64>> {
        let (a, b) = self.bands();
        band_index(stack, a, b)
    }
}

impl std::fmt::Display for SpectralIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Generic normalized difference
// ---------------------------------------------------------------------------

/// Normalized difference of two bands looked up by name in `stack`.
pub fn band_index(stack: &BandStack, band_a: &str, band_b: &str) -> Result<Raster<f64>> {
    let a = stack.band(band_a)?;
    let b = stack.band(band_b)?;
    normalized_difference(a, b)
}

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Pixels where either band is no-data, or where the two bands sum to zero,
/// are NaN. Results are clipped to [-1, 1], which only matters for negative
/// reflectances.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let a_data = band_a.data();
    let b_data = band_b.data();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let a = a_data[(row, col)];
                let b = b_data[(row, col)];

                if band_a.is_nodata(a) || band_b.is_nodata(b) {
                    continue;
                }

                let sum = a + b;
                if sum.abs() < 1e-10 {
                    continue;
                }

                *out = ((a - b) / sum).clamp(-1.0, 1.0);
            }
            row_data
        })
        .collect();

    band_a.derive(data, Some(f64::NAN))
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}
