//! Dataset family registry
//!
//! Maps dataset ids to their pre-filter and mask. Lookup walks families in
//! registration order and takes the first whose pattern matches.

use lazy_static::lazy_static;
use log::debug;
use regex::Regex;

use crate::errors::{RasterError, RasterResult};

use super::filters::PreFilter;
use super::masks::MaskFunction;

lazy_static! {
    static ref SENTINEL2_PATTERN: Regex = Regex::new(r"^COPERNICUS/S2").unwrap();
}

/// Cloud cover threshold for the Sentinel-2 pre-filter, in percent
const S2_MAX_CLOUDY_PERCENTAGE: f64 = 20.0;

/// A group of datasets sharing masking rules
#[derive(Debug, Clone)]
pub struct DatasetFamily {
    pub name: String,
    pattern: Regex,
    pub pre_filter: PreFilter,
    pub mask: MaskFunction,
}

impl DatasetFamily {
    pub fn new(name: &str, pattern: &str, pre_filter: PreFilter, mask: MaskFunction) -> RasterResult<Self> {
        let pattern = Regex::new(pattern)
            .map_err(|e| RasterError::InvalidRequest(format!("invalid dataset pattern '{}': {}", pattern, e)))?;
        Ok(DatasetFamily {
            name: name.to_string(),
            pattern,
            pre_filter,
            mask,
        })
    }

    fn sentinel2() -> Self {
        DatasetFamily {
            name: "Sentinel-2".to_string(),
            pattern: SENTINEL2_PATTERN.clone(),
            pre_filter: PreFilter::PropertyBelow {
                property: "CLOUDY_PIXEL_PERCENTAGE".to_string(),
                threshold: S2_MAX_CLOUDY_PERCENTAGE,
            },
            mask: MaskFunction::sentinel2_clouds(),
        }
    }

    pub fn matches(&self, dataset: &str) -> bool {
        self.pattern.is_match(dataset)
    }
}

/// Ordered collection of dataset families
#[derive(Debug, Clone)]
pub struct DatasetMaskRegistry {
    families: Vec<DatasetFamily>,
}

impl Default for DatasetMaskRegistry {
    /// Registry holding the built-in Sentinel-2 family
    fn default() -> Self {
        DatasetMaskRegistry {
            families: vec![DatasetFamily::sentinel2()],
        }
    }
}

impl DatasetMaskRegistry {
    /// Appends a family; earlier families keep precedence
    pub fn register(&mut self, family: DatasetFamily) {
        debug!("Registered dataset family {}", family.name);
        self.families.push(family);
    }

    pub fn lookup(&self, dataset: &str) -> Option<&DatasetFamily> {
        self.families.iter().find(|family| family.matches(dataset))
    }

    pub fn mask_for(&self, dataset: &str) -> MaskFunction {
        self.lookup(dataset)
            .map(|family| family.mask.clone())
            .unwrap_or(MaskFunction::Identity)
    }

    pub fn pre_filter_for(&self, dataset: &str) -> PreFilter {
        self.lookup(dataset)
            .map(|family| family.pre_filter.clone())
            .unwrap_or(PreFilter::None)
    }

    pub fn len(&self) -> usize {
        self.families.len()
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}
