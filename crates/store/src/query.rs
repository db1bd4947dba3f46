//! Fetch requests: where, when and how clear.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use vegscan_core::BBox;

use crate::error::{Result, StoreError};

/// Inclusive range of acquisition dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(StoreError::InvalidQuery(format!(
                "date range starts ({start}) after it ends ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Request for every scene over `bbox` within `dates` whose cloud cover is
/// below `cloud_threshold` percent, restricted to `bands`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileQuery {
    pub bbox: BBox,
    pub dates: DateRange,
    /// Scenes must have strictly less cloud cover than this (percent)
    pub cloud_threshold: f64,
    pub bands: Vec<String>,
}

impl TileQuery {
    /// Query with a 10% cloud threshold and the red/NIR Sentinel-2 bands.
    pub fn new(bbox: BBox, dates: DateRange) -> Self {
        Self {
            bbox,
            dates,
            cloud_threshold: 10.0,
            bands: vec!["B4".into(), "B8".into()],
        }
    }

    pub fn cloud_threshold(mut self, percent: f64) -> Self {
        self.cloud_threshold = percent;
        self
    }

    pub fn bands<S: AsRef<str>>(mut self, bands: &[S]) -> Self {
        self.bands = bands.iter().map(|b| b.as_ref().to_string()).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.bbox.is_valid() {
            return Err(StoreError::InvalidQuery(format!(
                "bbox {:?} is empty or inverted",
                self.bbox
            )));
        }
        if !(0.0..=100.0).contains(&self.cloud_threshold) {
            return Err(StoreError::InvalidQuery(format!(
                "cloud threshold {} is not a percentage",
                self.cloud_threshold
            )));
        }
        if self.bands.is_empty() {
            return Err(StoreError::InvalidQuery("no bands requested".into()));
        }
        Ok(())
    }

    /// Whether a scene's date and cloud cover pass this query. Unknown cloud
    /// cover passes: the store's imagery is already cloud-filtered upstream.
    pub fn accepts(&self, date: NaiveDate, cloud_cover: Option<f64>) -> bool {
        self.dates.contains(date) && cloud_cover.map_or(true, |c| c < self.cloud_threshold)
    }

    pub(crate) fn no_imagery(&self) -> StoreError {
        StoreError::NoImagery {
            bbox: self.bbox,
            start: self.dates.start,
            end: self.dates.end,
            cloud_threshold: self.cloud_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, d).unwrap()
    }

    #[test]
    fn date_range_is_inclusive() {
        let range = DateRange::new(date(10, 1), date(10, 31)).unwrap();
        assert!(range.contains(date(10, 1)));
        assert!(range.contains(date(10, 31)));
        assert!(!range.contains(date(11, 1)));
        assert!(DateRange::new(date(10, 2), date(10, 1)).is_err());
    }

    #[test]
    fn cloud_threshold_is_strict() {
        let q = TileQuery::new(
            BBox::new(0.0, 0.0, 1.0, 1.0),
            DateRange::new(date(10, 1), date(10, 31)).unwrap(),
        );
        assert!(q.accepts(date(10, 5), Some(9.9)));
        assert!(!q.accepts(date(10, 5), Some(10.0)));
        assert!(q.accepts(date(10, 5), None));
        assert!(!q.accepts(date(9, 30), Some(0.0)));
    }

    #[test]
    fn validate_rejects_bad_queries() {
        let range = DateRange::new(date(10, 1), date(10, 31)).unwrap();
        let ok = TileQuery::new(BBox::new(0.0, 0.0, 1.0, 1.0), range);
        assert!(ok.validate().is_ok());
        assert!(ok.clone().cloud_threshold(120.0).validate().is_err());
        assert!(ok.clone().bands::<&str>(&[]).validate().is_err());
        assert!(TileQuery::new(BBox::new(1.0, 0.0, 0.0, 1.0), range)
            .validate()
            .is_err());
    }
}
