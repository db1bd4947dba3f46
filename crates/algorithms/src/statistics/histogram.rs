//! Value histogram of a raster
//!
//! Equal-width bins over valid cells. Used to log and report the spread of
//! an index raster before it is clustered.

use serde::{Deserialize, Serialize};
use vegscan_core::raster::{Raster, RasterElement};
use vegscan_core::{Error, Result};

/// Equal-width histogram over `[min, max]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub min: f64,
    pub max: f64,
    pub counts: Vec<u64>,
    /// Valid values falling outside `[min, max]`
    pub outside: u64,
}

impl Histogram {
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.counts.len() as f64
    }

    /// `[lower, upper)` edges of bin `i` (the last bin is closed).
    pub fn bin_edges(&self, i: usize) -> (f64, f64) {
        let w = self.bin_width();
        (self.min + i as f64 * w, self.min + (i + 1) as f64 * w)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }
}

/// Histogram of the valid cells of `raster`.
///
/// `range` defaults to the raster's own min/max. A constant raster gets a
/// single-valued range and every value lands in the first bin.
pub fn histogram<T: RasterElement>(
    raster: &Raster<T>,
    bins: usize,
    range: Option<(f64, f64)>,
) -> Result<Histogram> {
    if bins == 0 {
        return Err(Error::InvalidParameter {
            name: "bins",
            value: "0".into(),
            reason: "at least one bin is required".into(),
        });
    }

    let (min, max) = match range {
        Some((lo, hi)) if lo.is_finite() && hi.is_finite() && lo <= hi => (lo, hi),
        Some((lo, hi)) => {
            return Err(Error::InvalidParameter {
                name: "range",
                value: format!("({lo}, {hi})"),
                reason: "bounds must be finite and ordered".into(),
            })
        }
        None => {
            let stats = raster.statistics();
            match (stats.min, stats.max) {
                (Some(lo), Some(hi)) => (lo, hi),
                _ => {
                    return Err(Error::InsufficientData {
                        available: 0,
                        required: 1,
                        context: "histogram of a raster with no valid cells",
                    })
                }
            }
        }
    };

    let mut counts = vec![0u64; bins];
    let mut outside = 0;
    let width = (max - min) / bins as f64;

    for v in raster
        .data()
        .iter()
        .filter(|&&v| !raster.is_nodata(v))
        .filter_map(|&v| v.to_f64())
    {
        if v < min || v > max {
            outside += 1;
            continue;
        }
        let bin = if width > 0.0 {
            (((v - min) / width) as usize).min(bins - 1)
        } else {
            0
        };
        counts[bin] += 1;
    }

    Ok(Histogram {
        min,
        max,
        counts,
        outside,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_valid_values_per_bin() {
        let r = Raster::from_vec(vec![-1.0, -0.5, 0.0, 0.49, 0.5, 1.0, f64::NAN, 2.0], 2, 4).unwrap();
        let h = histogram(&r, 4, Some((-1.0, 1.0))).unwrap();

        assert_eq!(h.counts, vec![1, 1, 2, 2]);
        assert_eq!(h.outside, 1);
        assert_eq!(h.total(), 6);
        assert_eq!(h.bin_edges(1), (-0.5, 0.0));
    }

    #[test]
    fn default_range_and_constant_raster() {
        let r = Raster::filled(3, 3, 0.4);
        let h = histogram(&r, 5, None).unwrap();
        assert_eq!(h.counts[0], 9);
        assert_eq!(h.outside, 0);
    }

    #[test]
    fn empty_raster_or_bad_bins() {
        let r = Raster::filled(2, 2, f64::NAN);
        assert!(histogram(&r, 4, None).is_err());
        assert!(histogram(&Raster::filled(1, 1, 1.0), 0, None).is_err());
    }
}
