//! Area per class
//!
//! Sums ground area over a label raster, one entry per class id. No-data
//! pixels are excluded from every sum.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::maybe_rayon::*;
use vegscan_core::raster::{Raster, RasterElement};
use vegscan_core::{Error, Result};

/// Ground area of one pixel
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PixelArea {
    /// Fixed area in square metres (equal-area grids)
    Constant(f64),
}

impl PixelArea {
    /// Pixel area derived from a raster's resolution and projection.
    ///
    /// Geographic grids are converted at 111 km per degree on both axes;
    /// see [`Raster::ground_cell_size`].
    pub fn from_raster<T: RasterElement>(raster: &Raster<T>) -> Self {
        let (w, h) = raster.ground_cell_size();
        PixelArea::Constant(w * h)
    }

    pub fn square_metres(&self) -> f64 {
        match self {
            PixelArea::Constant(a) => *a,
        }
    }
}

/// Parameters for area aggregation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AreaParams {
    /// Area of one pixel; `None` derives it from the label raster
    pub pixel_area: Option<PixelArea>,
    /// Largest raster (rows x cols) accepted (default: 1e9)
    pub max_pixels: u64,
}

impl Default for AreaParams {
    fn default() -> Self {
        Self {
            pixel_area: None,
            max_pixels: 1_000_000_000,
        }
    }
}

/// Pixel count and area of one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassArea {
    pub pixels: u64,
    pub area_m2: f64,
}

impl ClassArea {
    pub fn hectares(&self) -> f64 {
        self.area_m2 / 10_000.0
    }

    pub fn square_km(&self) -> f64 {
        self.area_m2 / 1_000_000.0
    }
}

/// Summed area per class id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AreaReport {
    pixel_area_m2: f64,
    classes: BTreeMap<i32, ClassArea>,
}

impl AreaReport {
    pub fn classes(&self) -> &BTreeMap<i32, ClassArea> {
        &self.classes
    }

    pub fn get(&self, class: i32) -> Option<&ClassArea> {
        self.classes.get(&class)
    }

    pub fn pixel_area_m2(&self) -> f64 {
        self.pixel_area_m2
    }

    pub fn total_pixels(&self) -> u64 {
        self.classes.values().map(|c| c.pixels).sum()
    }

    pub fn total_area_m2(&self) -> f64 {
        self.classes.values().map(|c| c.area_m2).sum()
    }

    /// Share of the total valid area held by `class`, in [0, 1].
    pub fn fraction(&self, class: i32) -> f64 {
        let total = self.total_pixels();
        match self.get(class) {
            Some(c) if total > 0 => c.pixels as f64 / total as f64,
            _ => 0.0,
        }
    }
}

impl fmt::Display for AreaReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (class, area) in &self.classes {
            writeln!(
                f,
                "class {class}: {:.4} km2 ({:.2} ha, {} px)",
                area.square_km(),
                area.hectares(),
                area.pixels
            )?;
        }
        write!(f, "total: {:.4} km2", self.total_area_m2() / 1_000_000.0)
    }
}

/// Sum pixel area per label.
///
/// # Errors
/// `BudgetExceeded` when the raster holds more than `max_pixels` cells;
/// nothing is truncated. `InvalidParameter` for a negative or non-finite
/// pixel area.
pub fn area_by_class(labels: &Raster<i32>, params: &AreaParams) -> Result<AreaReport> {
    let (rows, cols) = labels.shape();
    let pixels = (rows as u64) * (cols as u64);
    if pixels > params.max_pixels {
        return Err(Error::BudgetExceeded {
            pixels,
            budget: params.max_pixels,
        });
    }

    let pixel_area = params
        .pixel_area
        .unwrap_or_else(|| PixelArea::from_raster(labels))
        .square_metres();
    if !pixel_area.is_finite() || pixel_area < 0.0 {
        return Err(Error::InvalidParameter {
            name: "pixel_area",
            value: pixel_area.to_string(),
            reason: "must be a finite, non-negative area".into(),
        });
    }

    let data = labels.data();
    let partials: Vec<BTreeMap<i32, u64>> = crate::maybe_rayon::blocks(rows, ROW_BLOCK)
        .into_par_iter()
        .map(|(start, end)| {
            let mut counts = BTreeMap::new();
            for row in start..end {
                for col in 0..cols {
                    let label = data[(row, col)];
                    if !labels.is_nodata(label) {
                        *counts.entry(label).or_insert(0u64) += 1;
                    }
                }
            }
            counts
        })
        .collect();

    let mut counts: BTreeMap<i32, u64> = BTreeMap::new();
    for part in partials {
        for (label, n) in part {
            *counts.entry(label).or_insert(0) += n;
        }
    }

    let classes = counts
        .into_iter()
        .map(|(label, n)| {
            (
                label,
                ClassArea {
                    pixels: n,
                    area_m2: n as f64 * pixel_area,
                },
            )
        })
        .collect::<BTreeMap<_, _>>();

    debug!(classes = classes.len(), pixel_area, "aggregated class areas");
    Ok(AreaReport {
        pixel_area_m2: pixel_area,
        classes,
    })
}
