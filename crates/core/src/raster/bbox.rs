//! Geographic bounding boxes and their mapping onto raster grids

use serde::{Deserialize, Serialize};

use crate::raster::GeoTransform;

/// A geographic bounding box `[min_x, min_y, max_x, max_y]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    /// Build from the `(min_x, min_y, max_x, max_y)` tuple returned by
    /// [`GeoTransform::bounds`].
    pub fn from_bounds(bounds: (f64, f64, f64, f64)) -> Self {
        Self::new(bounds.0, bounds.1, bounds.2, bounds.3)
    }

    /// Whether min < max on both axes.
    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
            && self.min_x < self.max_x
            && self.min_y < self.max_y
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Check if two bboxes intersect.
    pub fn intersects(&self, other: &BBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Whether the point lies inside (min edges inclusive, max edges exclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x < self.max_x && y >= self.min_y && y < self.max_y
    }

    /// Overlapping area of two boxes, if any.
    pub fn intersection(&self, other: &BBox) -> Option<BBox> {
        if !self.intersects(other) {
            return None;
        }
        Some(BBox::new(
            self.min_x.max(other.min_x),
            self.min_y.max(other.min_y),
            self.max_x.min(other.max_x),
            self.max_y.min(other.max_y),
        ))
    }

    /// Pixel window `(row0, col0, rows, cols)` of the cells whose centres
    /// fall inside this box, for a grid of `rows x cols` cells.
    ///
    /// Returns `None` when no cell centre is covered.
    pub fn pixel_window(
        &self,
        transform: &GeoTransform,
        rows: usize,
        cols: usize,
    ) -> Option<(usize, usize, usize, usize)> {
        let mut row0 = usize::MAX;
        let mut row1 = 0usize;
        let mut col0 = usize::MAX;
        let mut col1 = 0usize;

        for row in 0..rows {
            let (_, y) = transform.pixel_to_geo(0, row);
            if y < self.min_y || y >= self.max_y {
                continue;
            }
            row0 = row0.min(row);
            row1 = row1.max(row + 1);
        }
        for col in 0..cols {
            let (x, _) = transform.pixel_to_geo(col, 0);
            if x < self.min_x || x >= self.max_x {
                continue;
            }
            col0 = col0.min(col);
            col1 = col1.max(col + 1);
        }

        if row0 == usize::MAX || col0 == usize::MAX {
            return None;
        }
        Some((row0, col0, row1 - row0, col1 - col0))
    }

    /// Grid on the lattice of `reference` made of the cells whose centres
    /// fall inside this box, whether or not `reference` itself covers them.
    /// Returns the grid's transform and `(rows, cols)`.
    ///
    /// Assumes a north-up lattice. `None` when no cell centre is covered.
    pub fn grid_on(&self, reference: &GeoTransform) -> Option<(GeoTransform, usize, usize)> {
        let (c0, r0) = reference.geo_to_pixel(self.min_x, self.max_y);
        let (c1, r1) = reference.geo_to_pixel(self.max_x, self.min_y);
        if !(c0.is_finite() && r0.is_finite() && c1.is_finite() && r1.is_finite()) {
            return None;
        }

        // centre x = c + 0.5 in [c0, c1); centre y in [min_y, max_y) means
        // c + 0.5 in (r0, r1] on the row axis
        let col_start = (c0 - 0.5).ceil() as i64;
        let col_end = (c1 - 0.5).ceil() as i64;
        let row_start = (r0 - 0.5).floor() as i64 + 1;
        let row_end = (r1 - 0.5).floor() as i64 + 1;
        if col_end <= col_start || row_end <= row_start {
            return None;
        }

        Some((
            reference.offset(row_start, col_start),
            (row_end - row_start) as usize,
            (col_end - col_start) as usize,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_and_containment() {
        let a = BBox::new(0.0, 0.0, 10.0, 10.0);
        let b = BBox::new(5.0, 5.0, 15.0, 15.0);
        let c = BBox::new(20.0, 20.0, 30.0, 30.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.intersection(&b), Some(BBox::new(5.0, 5.0, 10.0, 10.0)));
        assert_eq!(a.intersection(&c), None);
        assert!(a.contains(0.0, 0.0));
        assert!(!a.contains(10.0, 5.0));
    }

    #[test]
    fn pixel_window_selects_covered_centres() {
        // 10x10 grid of unit cells, top-left at (0, 10)
        let gt = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        let bbox = BBox::new(2.0, 3.0, 5.0, 8.0);

        // columns 2,3,4 ; rows whose centre y in [3, 8): y = 7.5..3.5 -> rows 2..=6
        assert_eq!(bbox.pixel_window(&gt, 10, 10), Some((2, 2, 5, 3)));

        let outside = BBox::new(50.0, 50.0, 60.0, 60.0);
        assert_eq!(outside.pixel_window(&gt, 10, 10), None);
    }

    #[test]
    fn grid_on_matches_pixel_window_and_extends_past_the_grid() {
        let gt = GeoTransform::new(0.0, 10.0, 1.0, -1.0);
        let bbox = BBox::new(2.0, 3.0, 5.0, 8.0);
        let (sub, rows, cols) = bbox.grid_on(&gt).unwrap();
        assert_eq!((rows, cols), (5, 3));
        assert!(sub.same_grid(&gt.shifted(2, 2)));

        // Extends west of and above the reference origin
        let (wide, rows, cols) = BBox::new(-2.0, 9.0, 1.0, 12.0).grid_on(&gt).unwrap();
        assert_eq!((rows, cols), (3, 3));
        assert_eq!((wide.origin_x, wide.origin_y), (-2.0, 12.0));

        assert_eq!(BBox::new(0.1, 0.1, 0.4, 0.4).grid_on(&gt), None);
    }

    #[test]
    fn validity() {
        assert!(BBox::new(75.7, 30.2, 76.5, 31.0).is_valid());
        assert!(!BBox::new(1.0, 0.0, 0.0, 1.0).is_valid());
    }
}
