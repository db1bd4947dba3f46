//! Main Raster type

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{BBox, GeoTransform, RasterElement};
use ndarray::{s, Array2, ArrayView2, ArrayViewMut2};

/// Ground length of one degree used for geographic grids (111 km).
pub const METRES_PER_DEGREE: f64 = 111_000.0;

/// A georeferenced 2D raster grid.
///
/// `Raster<T>` stores values of type `T` in a row-major grid together with
/// the transform, CRS and no-data marker that every derived raster inherits.
///
/// # Example
///
/// ```
/// use vegscan_core::Raster;
///
/// let mut raster: Raster<f64> = Raster::new(4, 4);
/// raster.set(1, 2, 0.42).unwrap();
/// assert_eq!(raster.get(1, 2).unwrap(), 0.42);
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    data: Array2<T>,
    transform: GeoTransform,
    crs: Option<CRS>,
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self::from_array(Array2::zeros((rows, cols)))
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self::from_array(Array2::from_elem((rows, cols), value))
    }

    /// Create a raster from row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Other(e.to_string()))?;
        Ok(Self::from_array(array))
    }

    /// Create a raster from nested rows; all rows must have equal length.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows.len(),
            });
        }
        let data: Vec<T> = rows.iter().flatten().copied().collect();
        Self::from_vec(data, rows.len(), cols)
    }

    /// Create a raster from an ndarray
    pub fn from_array(data: Array2<T>) -> Self {
        Self {
            data,
            transform: GeoTransform::default(),
            crs: None,
            nodata: None,
        }
    }

    /// Create a raster of another cell type sharing this raster's georeferencing.
    ///
    /// The data is taken as-is and must match this raster's shape.
    pub fn derive<U: RasterElement>(&self, data: Vec<U>, nodata: Option<U>) -> Result<Raster<U>> {
        let (rows, cols) = self.shape();
        let mut out = Raster::from_vec(data, rows, cols)?;
        out.transform = self.transform;
        out.crs = self.crs.clone();
        out.nodata = nodata;
        Ok(out)
    }

    /// Widen to `f64`, keeping the no-data marker value as-is.
    pub fn to_f64(&self) -> Raster<f64> {
        Raster {
            data: self.data.mapv(|v| v.to_f64().unwrap_or(f64::NAN)),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata.and_then(RasterElement::to_f64),
        }
    }

    /// Create a raster with the same dimensions and metadata, filled with a value
    pub fn like(&self, fill_value: T) -> Self {
        Self {
            data: Array2::from_elem(self.data.dim(), fill_value),
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    // Dimensions

    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        let (rows, cols) = self.shape();
        match self.data.get_mut((row, col)) {
            Some(cell) => {
                *cell = value;
                Ok(())
            }
            None => Err(Error::IndexOutOfBounds { row, col, rows, cols }),
        }
    }

    pub fn view(&self) -> ArrayView2<'_, T> {
        self.data.view()
    }

    pub fn view_mut(&mut self) -> ArrayViewMut2<'_, T> {
        self.data.view_mut()
    }

    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    pub fn into_array(self) -> Array2<T> {
        self.data
    }

    /// Copy of the `rows x cols` window starting at `(row0, col0)`,
    /// georeferenced to the window's own origin.
    pub fn window(&self, row0: usize, col0: usize, rows: usize, cols: usize) -> Result<Self> {
        let (src_rows, src_cols) = self.shape();
        if row0 + rows > src_rows || col0 + cols > src_cols {
            return Err(Error::IndexOutOfBounds {
                row: row0 + rows,
                col: col0 + cols,
                rows: src_rows,
                cols: src_cols,
            });
        }

        let data = self
            .data
            .slice(s![row0..row0 + rows, col0..col0 + cols])
            .to_owned();

        Ok(Self {
            data,
            transform: self.transform.shifted(row0, col0),
            crs: self.crs.clone(),
            nodata: self.nodata,
        })
    }

    /// Crop to the cells whose centres fall inside `bbox`.
    pub fn crop(&self, bbox: &BBox) -> Result<Self> {
        let (rows, cols) = self.shape();
        let (row0, col0, h, w) = bbox
            .pixel_window(&self.transform, rows, cols)
            .ok_or_else(|| Error::InvalidParameter {
                name: "bbox",
                value: format!("{:?}", bbox),
                reason: "does not cover any cell of the raster".into(),
            })?;
        self.window(row0, col0, h, w)
    }

    /// Sample this raster onto another grid by nearest cell: each target
    /// cell takes the value of the source cell under its centre, or `fill`
    /// where the source has no coverage. Keeps the CRS and no-data marker.
    pub fn regrid(&self, transform: &GeoTransform, rows: usize, cols: usize, fill: T) -> Self {
        let (src_rows, src_cols) = self.shape();
        let data = Array2::from_shape_fn((rows, cols), |(row, col)| {
            let (x, y) = transform.pixel_to_geo(col, row);
            let (c, r) = self.transform.geo_to_pixel(x, y);
            let (c, r) = (c.floor(), r.floor());
            if c >= 0.0 && r >= 0.0 && (c as usize) < src_cols && (r as usize) < src_rows {
                self.data[(r as usize, c as usize)]
            } else {
                fill
            }
        });

        Self {
            data,
            transform: *transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }

    // Metadata

    pub fn transform(&self) -> &GeoTransform {
        &self.transform
    }

    pub fn set_transform(&mut self, transform: GeoTransform) {
        self.transform = transform;
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn set_crs(&mut self, crs: Option<CRS>) {
        self.crs = crs;
    }

    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell size (assumes square cells)
    pub fn cell_size(&self) -> f64 {
        self.transform.cell_size()
    }

    /// Whether cell sizes are in degrees: the CRS says so, or there is no
    /// CRS and the cells are smaller than 0.1 units.
    pub fn is_geographic(&self) -> bool {
        match &self.crs {
            Some(crs) => crs.is_geographic(),
            None => self.transform.pixel_width.abs() < 0.1,
        }
    }

    /// Cell width and height on the ground in metres, converting degrees at
    /// [`METRES_PER_DEGREE`] for geographic grids.
    pub fn ground_cell_size(&self) -> (f64, f64) {
        let (w, h) = (
            self.transform.pixel_width.abs(),
            self.transform.pixel_height.abs(),
        );
        if self.is_geographic() {
            (w * METRES_PER_DEGREE, h * METRES_PER_DEGREE)
        } else {
            (w, h)
        }
    }

    /// Geographic extent of the whole grid
    pub fn bbox(&self) -> BBox {
        BBox::from_bounds(self.transform.bounds(self.cols(), self.rows()))
    }

    /// Geographic coordinates of the centre of cell (row, col)
    pub fn pixel_to_geo(&self, col: usize, row: usize) -> (f64, f64) {
        self.transform.pixel_to_geo(col, row)
    }

    // Value checks

    /// Check if a value is no-data under this raster's marker
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Number of cells holding a valid (non no-data) value
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }

    /// Basic statistics over valid cells
    pub fn statistics(&self) -> RasterStatistics {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut count = 0usize;

        for v in self
            .data
            .iter()
            .filter(|&&v| !self.is_nodata(v))
            .filter_map(|&v| v.to_f64())
        {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            count += 1;
        }

        RasterStatistics {
            min: (count > 0).then_some(min),
            max: (count > 0).then_some(max),
            mean: (count > 0).then(|| sum / count as f64),
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone, PartialEq)]
pub struct RasterStatistics {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f64> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f32> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.get(10, 0).is_err());
        assert!(raster.set(0, 10, 1.0).is_err());
    }

    #[test]
    fn test_from_rows_rejects_ragged() {
        assert!(Raster::<f64>::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_err());
        let r = Raster::<f64>::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(r.get(1, 0).unwrap(), 3.0);
    }

    #[test]
    fn test_statistics_skip_nodata() {
        let mut raster = Raster::from_vec(vec![1.0, f64::NAN, -9999.0, 3.0], 2, 2).unwrap();
        raster.set_nodata(Some(-9999.0));

        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(3.0));
        assert_eq!(stats.mean, Some(2.0));
        assert_eq!(stats.valid_count, 2);
        assert_eq!(stats.nodata_count, 2);
        assert_eq!(raster.valid_count(), 2);
    }

    #[test]
    fn test_window_and_crop() {
        let mut raster = Raster::from_vec((0..100).map(|v| v as f64).collect(), 10, 10).unwrap();
        raster.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));

        let win = raster.window(2, 3, 2, 2).unwrap();
        assert_eq!(win.shape(), (2, 2));
        assert_eq!(win.get(0, 0).unwrap(), 23.0);
        assert_eq!(win.transform().origin_x, 3.0);
        assert_eq!(win.transform().origin_y, 8.0);

        let cropped = raster.crop(&BBox::new(3.0, 6.0, 5.0, 8.0)).unwrap();
        assert_eq!(cropped.shape(), (2, 2));
        assert_eq!(cropped.get(0, 0).unwrap(), 23.0);

        assert!(raster.window(9, 9, 2, 2).is_err());
        assert!(raster.crop(&BBox::new(50.0, 50.0, 60.0, 60.0)).is_err());
    }

    #[test]
    fn test_regrid_fills_uncovered_cells() {
        let mut raster = Raster::from_vec(vec![1.0, 2.0, 3.0, 4.0], 2, 2).unwrap();
        raster.set_transform(GeoTransform::new(10.0, 20.0, 10.0, -10.0));

        // One column west of the source, one column past its east edge
        let target = GeoTransform::new(0.0, 20.0, 10.0, -10.0);
        let out = raster.regrid(&target, 2, 4, f64::NAN);
        assert_eq!(out.transform(), &target);
        assert!(out.get(0, 0).unwrap().is_nan());
        assert_eq!(out.get(0, 1).unwrap(), 1.0);
        assert_eq!(out.get(1, 2).unwrap(), 4.0);
        assert!(out.get(1, 3).unwrap().is_nan());
        assert_eq!(out.valid_count(), 4);
    }

    #[test]
    fn test_ground_cell_size() {
        let mut raster: Raster<f64> = Raster::new(2, 2);
        raster.set_transform(GeoTransform::new(75.0, 31.0, 0.0001, -0.0001));
        assert!(raster.is_geographic());
        let (w, h) = raster.ground_cell_size();
        assert!((w - 11.1).abs() < 1e-9 && (h - 11.1).abs() < 1e-9);

        raster.set_transform(GeoTransform::new(500000.0, 4000000.0, 10.0, -10.0));
        assert!(!raster.is_geographic());
        raster.set_crs(Some(CRS::wgs84()));
        assert!(raster.is_geographic());
    }

    #[test]
    fn test_derive_keeps_georeferencing() {
        let mut raster: Raster<f64> = Raster::new(2, 2);
        raster.set_transform(GeoTransform::new(10.0, 20.0, 10.0, -10.0));
        raster.set_crs(Some(CRS::utm(43, true)));

        let labels = raster.derive::<i32>(vec![0, 1, -1, 2], Some(-1)).unwrap();
        assert_eq!(labels.transform(), raster.transform());
        assert_eq!(labels.crs(), raster.crs());
        assert!(labels.is_nodata(-1));
        assert!(raster.derive::<i32>(vec![0, 1], None).is_err());
    }
}
