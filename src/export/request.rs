//! Export requests
//!
//! `ExportSpec` is what a caller asks for; `AggregationRequest` is the
//! validated, fully resolved unit of work handed to a backend.

use lazy_static::lazy_static;
use log::warn;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;

use crate::errors::{RasterError, RasterResult};
use crate::masking::{DatasetMaskRegistry, MaskFunction, PreFilter};

lazy_static! {
    static ref DATE_PATTERN: Regex = Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").unwrap();
}

/// A calendar day in `YYYY-MM-DD` form
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl CalendarDate {
    pub fn parse(text: &str) -> RasterResult<Self> {
        let invalid = || RasterError::InvalidRequest(format!("invalid date '{}', expected YYYY-MM-DD", text));
        let captures = DATE_PATTERN.captures(text.trim()).ok_or_else(invalid)?;

        let year: u16 = captures[1].parse().map_err(|_| invalid())?;
        let month: u8 = captures[2].parse().map_err(|_| invalid())?;
        let day: u8 = captures[3].parse().map_err(|_| invalid())?;

        if month == 0 || month > 12 || day == 0 || day > days_in_month(year, month) {
            return Err(invalid());
        }
        Ok(CalendarDate { year, month, day })
    }
}

fn days_in_month(year: u16, month: u8) -> u8 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        _ => 31,
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Axis-aligned rectangle in the dataset's coordinate system
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingRect {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl BoundingRect {
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        BoundingRect { xmin, ymin, xmax, ymax }
    }

    /// Same rectangle with min/max ordered on both axes
    pub fn normalized(&self) -> Self {
        BoundingRect {
            xmin: self.xmin.min(self.xmax),
            ymin: self.ymin.min(self.ymax),
            xmax: self.xmin.max(self.xmax),
            ymax: self.ymin.max(self.ymax),
        }
    }

    pub fn is_normalized(&self) -> bool {
        self.xmin <= self.xmax && self.ymin <= self.ymax
    }

    pub fn width(&self) -> f64 {
        (self.xmax - self.xmin).abs()
    }

    pub fn height(&self) -> f64 {
        (self.ymax - self.ymin).abs()
    }

    pub fn center(&self) -> (f64, f64) {
        ((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }
}

impl fmt::Display for BoundingRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}, {}]", self.xmin, self.ymin, self.xmax, self.ymax)
    }
}

/// Temporal reducer applied per pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Mean,
}

/// Export parameters as supplied by the caller
#[derive(Debug, Clone)]
pub struct ExportSpec {
    pub dataset: String,
    pub bands: Vec<String>,
    pub start: String,
    pub end: String,
    pub region: BoundingRect,
    /// Metres per output pixel
    pub scale: f64,
    pub folder: String,
    pub description: String,
}

/// A validated export with masking rules resolved
#[derive(Debug, Clone)]
pub struct AggregationRequest {
    pub dataset: String,
    pub start: CalendarDate,
    pub end: CalendarDate,
    pub pre_filter: PreFilter,
    pub mask: MaskFunction,
    pub bands: Vec<String>,
    pub reducer: Reducer,
    pub region: BoundingRect,
    pub scale: f64,
    pub folder: String,
    pub description: String,
}

impl ExportSpec {
    /// Validates the spec and resolves masking for its dataset
    ///
    /// Swapped rectangle corners are reordered with a warning.
    ///
    /// # Errors
    /// `InvalidRequest` for empty bands or description, malformed or
    /// inverted dates, non-positive scale or a zero-area rectangle.
    pub fn into_request(self, registry: &DatasetMaskRegistry) -> RasterResult<AggregationRequest> {
        if self.dataset.trim().is_empty() {
            return Err(RasterError::InvalidRequest("dataset id is empty".to_string()));
        }
        if self.bands.is_empty() || self.bands.iter().any(|b| b.trim().is_empty()) {
            return Err(RasterError::InvalidRequest("at least one band name is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(RasterError::InvalidRequest("description is empty".to_string()));
        }

        let start = CalendarDate::parse(&self.start)?;
        let end = CalendarDate::parse(&self.end)?;
        if start > end {
            return Err(RasterError::InvalidRequest(format!("start date {} is after end date {}", start, end)));
        }

        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(RasterError::InvalidRequest(format!("scale must be positive, got {}", self.scale)));
        }

        let region = if self.region.is_normalized() {
            self.region
        } else {
            let normalized = self.region.normalized();
            warn!("Region corners {} are swapped, using {}", self.region, normalized);
            normalized
        };
        if !(region.width() > 0.0 && region.height() > 0.0) {
            return Err(RasterError::InvalidRequest(format!("region {} has no area", region)));
        }

        Ok(AggregationRequest {
            pre_filter: registry.pre_filter_for(&self.dataset),
            mask: registry.mask_for(&self.dataset),
            dataset: self.dataset,
            start,
            end,
            bands: self.bands,
            reducer: Reducer::Mean,
            region,
            scale: self.scale,
            folder: self.folder,
            description: self.description,
        })
    }
}

impl AggregationRequest {
    /// Location of the finished file inside backend storage
    pub fn output_name(&self) -> PathBuf {
        PathBuf::from(&self.folder).join(format!("{}.tif", self.description))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ExportSpec {
        ExportSpec {
            dataset: "COPERNICUS/S2_SR".to_string(),
            bands: vec!["B4".to_string(), "B3".to_string(), "B2".to_string()],
            start: "2017-01-01".to_string(),
            end: "2018-12-31".to_string(),
            region: BoundingRect::new(-74.02, 40.71, -73.96, 40.69),
            scale: 30.0,
            folder: "Exports".to_string(),
            description: "harbor".to_string(),
        }
    }

    #[test]
    fn test_valid_spec_resolves_masking_and_orders_corners() {
        let request = spec().into_request(&DatasetMaskRegistry::default()).unwrap();
        assert_eq!(request.mask, MaskFunction::sentinel2_clouds());
        assert_eq!(request.region, BoundingRect::new(-74.02, 40.69, -73.96, 40.71));
        assert_eq!(request.output_name(), PathBuf::from("Exports/harbor.tif"));
        assert_eq!(request.start.to_string(), "2017-01-01");
    }

    #[test]
    fn test_invalid_specs_are_rejected() {
        let registry = DatasetMaskRegistry::default();
        let cases: Vec<Box<dyn Fn(&mut ExportSpec)>> = vec![
            Box::new(|s| s.bands.clear()),
            Box::new(|s| s.description = " ".to_string()),
            Box::new(|s| s.start = "2017-1-01".to_string()),
            Box::new(|s| s.end = "2018-02-30".to_string()),
            Box::new(|s| s.start = "2019-01-01".to_string()),
            Box::new(|s| s.scale = 0.0),
            Box::new(|s| s.region = BoundingRect::new(1.0, 1.0, 1.0, 2.0)),
        ];
        for mutate in cases {
            let mut invalid = spec();
            mutate(&mut invalid);
            assert!(matches!(invalid.into_request(&registry), Err(RasterError::InvalidRequest(_))));
        }
    }

    #[test]
    fn test_leap_day() {
        assert!(CalendarDate::parse("2020-02-29").is_ok());
        assert!(CalendarDate::parse("2019-02-29").is_err());
        assert!(CalendarDate::parse("2019-02-28").unwrap() < CalendarDate::parse("2019-03-01").unwrap());
    }
}
