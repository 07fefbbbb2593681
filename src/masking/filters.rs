//! Observation pre-filters

use log::debug;
use std::collections::BTreeMap;
use std::fmt;

/// Predicate over observation metadata, evaluated before any pixel is read
#[derive(Debug, Clone, PartialEq)]
pub enum PreFilter {
    /// Accepts every observation
    None,
    /// Accepts observations whose `property` is strictly below `threshold`
    PropertyBelow { property: String, threshold: f64 },
}

impl PreFilter {
    /// Whether an observation with these properties passes
    ///
    /// An observation lacking the filtered property is rejected.
    pub fn accepts(&self, properties: &BTreeMap<String, f64>) -> bool {
        match self {
            PreFilter::None => true,
            PreFilter::PropertyBelow { property, threshold } => match properties.get(property) {
                Some(value) => *value < *threshold,
                None => {
                    debug!("Observation has no '{}' property, rejected by {}", property, self);
                    false
                }
            },
        }
    }
}

impl fmt::Display for PreFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreFilter::None => write!(f, "no filter"),
            PreFilter::PropertyBelow { property, threshold } => write!(f, "{} < {}", property, threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_below() {
        let filter = PreFilter::PropertyBelow { property: "CLOUDY_PIXEL_PERCENTAGE".to_string(), threshold: 20.0 };
        let mut properties = BTreeMap::new();

        assert!(!filter.accepts(&properties));
        properties.insert("CLOUDY_PIXEL_PERCENTAGE".to_string(), 19.9);
        assert!(filter.accepts(&properties));
        properties.insert("CLOUDY_PIXEL_PERCENTAGE".to_string(), 20.0);
        assert!(!filter.accepts(&properties));
        assert!(PreFilter::None.accepts(&properties));
    }
}
