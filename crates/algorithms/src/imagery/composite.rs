//! Per-pixel median compositing of a scene series
//!
//! Reduces a time series of aligned scenes to one representative image.
//! Cloudy or missing observations arrive as no-data and are simply left out
//! of each pixel's median.

use crate::maybe_rayon::*;
use tracing::debug;
use vegscan_core::raster::{BandSeries, BandStack, Raster};
use vegscan_core::{Error, Result};

/// Median composite of every band in `series`.
///
/// For each band and pixel, the valid observations across all scenes are
/// collected and their median is taken (mean of the two middle values for
/// an even count). A pixel with no valid observation is NaN in the output.
/// The result does not depend on scene order.
pub fn median_composite(series: &BandSeries) -> Result<BandStack> {
    if series.is_empty() {
        return Err(Error::InsufficientData {
            available: 0,
            required: 1,
            context: "median composite needs at least one scene",
        });
    }

    let mut composite = BandStack::new();
    for name in series.band_names() {
        let layers = series
            .scenes()
            .iter()
            .map(|scene| scene.bands.band(name))
            .collect::<Result<Vec<_>>>()?;
        let band = median_of(&layers)?;
        debug!(band = name, valid = band.valid_count(), "composited band");
        composite.push(name, band)?;
    }
    Ok(composite)
}

/// Median of aligned single-band rasters, pixel by pixel.
pub fn median_of(layers: &[&Raster<f64>]) -> Result<Raster<f64>> {
    let first = layers.first().ok_or(Error::InsufficientData {
        available: 0,
        required: 1,
        context: "median needs at least one layer",
    })?;
    let (rows, cols) = first.shape();
    for layer in &layers[1..] {
        let (ar, ac) = layer.shape();
        if (ar, ac) != (rows, cols) {
            return Err(Error::SizeMismatch { er: rows, ec: cols, ar, ac });
        }
    }

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut stack = Vec::with_capacity(layers.len());
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                stack.clear();
                stack.extend(
                    layers
                        .iter()
                        .map(|layer| (layer, layer.data()[(row, col)]))
                        .filter(|(layer, v)| !layer.is_nodata(*v))
                        .map(|(_, v)| v),
                );
                if let Some(m) = median(&mut stack) {
                    *out = m;
                }
            }
            row_data
        })
        .collect();

    first.derive(data, Some(f64::NAN))
}

/// Median of a set of values, reordering them in place.
///
/// `None` for an empty set: a missing observation is never reported as zero.
pub fn median(values: &mut [f64]) -> Option<f64> {
    let n = values.len();
    if n == 0 {
        return None;
    }
    values.sort_unstable_by(f64::total_cmp);
    if n % 2 == 1 {
        Some(values[n / 2])
    } else {
        Some((values[n / 2 - 1] + values[n / 2]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vegscan_core::raster::{GeoTransform, Scene};
    use vegscan_core::NaiveDate;

    fn layer(values: Vec<f64>) -> Raster<f64> {
        let mut r = Raster::from_vec(values, 1, 3).unwrap();
        r.set_transform(GeoTransform::new(0.0, 10.0, 10.0, -10.0));
        r.set_nodata(Some(-9999.0));
        r
    }

    fn scene(id: &str, day: u32, red: Vec<f64>) -> Scene {
        Scene {
            id: id.into(),
            date: NaiveDate::from_ymd_opt(2023, 10, day).unwrap(),
            bands: BandStack::from_bands([("B4", layer(red))]).unwrap(),
        }
    }

    #[test]
    fn median_handles_odd_even_and_empty() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut Vec::<f64>::new()), None);
    }

    #[test]
    fn all_nodata_pixel_stays_nodata() {
        let series = BandSeries::new(vec![
            scene("a", 1, vec![0.1, -9999.0, 0.3]),
            scene("b", 2, vec![0.3, f64::NAN, 0.5]),
        ])
        .unwrap();

        let out = median_composite(&series).unwrap();
        let b4 = out.band("B4").unwrap();
        assert!((b4.get(0, 0).unwrap() - 0.2).abs() < 1e-12);
        assert!(b4.get(0, 1).unwrap().is_nan());
        assert!((b4.get(0, 2).unwrap() - 0.4).abs() < 1e-12);
    }

    #[test]
    fn single_valid_value_passes_through() {
        let series = BandSeries::new(vec![
            scene("a", 1, vec![-9999.0, 0.7, -9999.0]),
            scene("b", 2, vec![-9999.0, -9999.0, 0.25]),
            scene("c", 3, vec![0.6, -9999.0, -9999.0]),
        ])
        .unwrap();

        let b4 = median_composite(&series).unwrap().band("B4").unwrap().clone();
        assert_eq!(b4.get(0, 0).unwrap(), 0.6);
        assert_eq!(b4.get(0, 1).unwrap(), 0.7);
        assert_eq!(b4.get(0, 2).unwrap(), 0.25);
    }

    #[test]
    fn order_of_layers_does_not_matter() {
        let a = layer(vec![0.9, 0.1, 0.5]);
        let b = layer(vec![0.2, 0.4, -9999.0]);
        let c = layer(vec![0.3, 0.8, 0.6]);

        let abc = median_of(&[&a, &b, &c]).unwrap();
        let cab = median_of(&[&c, &a, &b]).unwrap();
        assert_eq!(abc.data(), cab.data());
        assert_eq!(abc.get(0, 0).unwrap(), 0.3);
        assert!((abc.get(0, 2).unwrap() - 0.55).abs() < 1e-12);
    }

    #[test]
    fn empty_series_is_insufficient() {
        let series = BandSeries::new(vec![]).unwrap();
        assert!(matches!(
            median_composite(&series),
            Err(Error::InsufficientData { .. })
        ));
    }
}
