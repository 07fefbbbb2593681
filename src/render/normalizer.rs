//! Linear range normalization to 8-bit display values
//!
//! Missing bounds are inferred from the whole channel triple rather than
//! per channel, so the relative balance between red, green and blue is kept.

use image::{GrayImage, Luma};
use log::debug;

use crate::errors::{RasterError, RasterResult};
use crate::extractor::{ChannelTriple, Grid};

/// Bounds of the linear mapping onto 0..=255
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizationRange {
    pub min: f64,
    pub max: f64,
}

impl NormalizationRange {
    /// Explicit bounds; `min > max` is rejected
    pub fn new(min: f64, max: f64) -> RasterResult<Self> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(RasterError::InvalidRange { min, max });
        }
        Ok(NormalizationRange { min, max })
    }

    /// Fills missing bounds with the observed extremes of `triple`
    ///
    /// NaN samples are ignored. A triple without any numeric sample infers
    /// the degenerate range (0, 0).
    pub fn resolve(triple: &ChannelTriple, min: Option<f64>, max: Option<f64>) -> RasterResult<Self> {
        if let (Some(min), Some(max)) = (min, max) {
            return Self::new(min, max);
        }

        let observed = triple.channels()
            .iter()
            .filter_map(|grid| grid.min_max())
            .reduce(|(lo_a, hi_a), (lo_b, hi_b)| (lo_a.min(lo_b), hi_a.max(hi_b)))
            .unwrap_or((0.0, 0.0));

        let range = NormalizationRange {
            min: min.unwrap_or(observed.0),
            max: max.unwrap_or(observed.1),
        };
        debug!("Normalization range: [{}, {}] (observed [{}, {}])", range.min, range.max, observed.0, observed.1);
        Ok(range)
    }

    /// Whether the range collapses to a single value (or is inverted)
    pub fn is_degenerate(&self) -> bool {
        self.min >= self.max
    }

    /// Maps one raw value to a display level
    ///
    /// Ties round away from zero; NaN maps to 0, as does everything when the
    /// range is degenerate.
    pub fn map(&self, value: f64) -> u8 {
        if value.is_nan() || self.is_degenerate() || value <= self.min {
            return 0;
        }
        if value >= self.max {
            return 255;
        }
        ((value - self.min) / (self.max - self.min) * 255.0).round() as u8
    }
}

/// Converts channel triples into three 8-bit grayscale planes
pub struct RangeNormalizer;

impl RangeNormalizer {
    /// Normalizes each channel of `triple` with one shared range
    ///
    /// # Arguments
    /// * `triple` - Raw red, green and blue samples
    /// * `min` - Lower bound, inferred from the triple when `None`
    /// * `max` - Upper bound, inferred from the triple when `None`
    ///
    /// # Returns
    /// Red, green and blue planes in that order
    pub fn normalize(triple: &ChannelTriple, min: Option<f64>, max: Option<f64>) -> RasterResult<[GrayImage; 3]> {
        let range = NormalizationRange::resolve(triple, min, max)?;
        let [red, green, blue] = triple.channels();
        Ok([
            Self::normalize_grid(red, &range),
            Self::normalize_grid(green, &range),
            Self::normalize_grid(blue, &range),
        ])
    }

    fn normalize_grid(grid: &Grid, range: &NormalizationRange) -> GrayImage {
        let (width, height) = grid.dimensions();
        GrayImage::from_fn(width as u32, height as u32, |x, y| {
            Luma([range.map(grid.get(x as usize, y as usize))])
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(values: [Vec<f64>; 3], width: usize, height: usize) -> ChannelTriple {
        let [r, g, b] = values;
        ChannelTriple::new(
            Grid::new(width, height, r).unwrap(),
            Grid::new(width, height, g).unwrap(),
            Grid::new(width, height, b).unwrap(),
        ).unwrap()
    }

    #[test]
    fn test_explicit_range_is_monotonic_and_bounded() {
        let range = NormalizationRange::new(-10.0, 30.0).unwrap();
        let mut previous = 0u8;
        for step in -40..80 {
            let level = range.map(step as f64 * 0.5);
            assert!(level >= previous);
            previous = level;
        }
        assert_eq!(range.map(-1000.0), 0);
        assert_eq!(range.map(1000.0), 255);
    }

    #[test]
    fn test_identity_on_display_range() {
        let levels: Vec<f64> = (0..=255).map(|v| v as f64).collect();
        let input = triple([levels.clone(), levels.clone(), levels.clone()], 16, 16);
        let [red, _, _] = RangeNormalizer::normalize(&input, Some(0.0), Some(255.0)).unwrap();
        let expected: Vec<u8> = (0..=255).collect();
        assert_eq!(red.into_raw(), expected);
    }

    #[test]
    fn test_degenerate_range_gives_zeros() {
        let input = triple([vec![7.0; 6], vec![7.0; 6], vec![7.0; 6]], 3, 2);
        let [red, green, blue] = RangeNormalizer::normalize(&input, None, None).unwrap();
        assert_eq!(red.dimensions(), (3, 2));
        for plane in [red, green, blue] {
            assert!(plane.pixels().all(|p| p[0] == 0));
        }
    }

    #[test]
    fn test_inference_spans_the_whole_triple() {
        let input = triple([vec![0.0, 10.0], vec![5.0, 5.0], vec![f64::NAN, 20.0]], 2, 1);
        let range = NormalizationRange::resolve(&input, None, None).unwrap();
        assert_eq!(range, NormalizationRange { min: 0.0, max: 20.0 });

        let [red, _, blue] = RangeNormalizer::normalize(&input, None, None).unwrap();
        assert_eq!(red.get_pixel(1, 0)[0], 128);
        assert_eq!(blue.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn test_half_levels_round_away_from_zero() {
        let range = NormalizationRange::new(0.0, 2.0).unwrap();
        // 0.5 / 2 * 255 = 63.75, 1 / 2 * 255 = 127.5
        assert_eq!(range.map(0.5), 64);
        assert_eq!(range.map(1.0), 128);
    }

    #[test]
    fn test_inverted_explicit_range_is_rejected() {
        assert!(matches!(NormalizationRange::new(5.0, 1.0), Err(RasterError::InvalidRange { .. })));
    }
}
