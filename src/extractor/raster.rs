//! In-memory raster data model
//!
//! `Grid` holds one band as row-major `f64` samples. Three grids of equal
//! size form a `ChannelTriple`, the unit the renderer works on.

use std::fmt;
use std::path::PathBuf;

use crate::errors::{RasterError, RasterResult};
use crate::tiff::geotags::GeoReference;
use crate::tiff::types::{PlanarConfig, SampleType};

/// One band of samples, row-major
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    data: Vec<f64>,
}

impl Grid {
    /// Wraps `data`, which must hold exactly `width * height` samples
    pub fn new(width: usize, height: usize, data: Vec<f64>) -> RasterResult<Self> {
        if data.len() != width * height {
            return Err(RasterError::DimensionMismatch);
        }
        Ok(Grid { width, height, data })
    }

    /// Grid with every sample set to `value`
    pub fn filled(width: usize, height: usize, value: f64) -> Self {
        Grid { width, height, data: vec![value; width * height] }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Sample at column `x`, row `y`
    ///
    /// # Panics
    /// If the coordinate lies outside the grid.
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }

    pub fn data(&self) -> &[f64] {
        &self.data
    }

    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Smallest and largest non-NaN sample, `None` if there are none
    pub fn min_max(&self) -> Option<(f64, f64)> {
        self.data.iter()
            .filter(|v| !v.is_nan())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

/// Three equally sized grids shown as red, green and blue
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelTriple {
    pub red: Grid,
    pub green: Grid,
    pub blue: Grid,
}

impl ChannelTriple {
    /// Fails with `DimensionMismatch` unless all three grids have the same size
    pub fn new(red: Grid, green: Grid, blue: Grid) -> RasterResult<Self> {
        if red.dimensions() != green.dimensions() || red.dimensions() != blue.dimensions() {
            return Err(RasterError::DimensionMismatch);
        }
        Ok(ChannelTriple { red, green, blue })
    }

    /// Width and height shared by the three channels
    pub fn dimensions(&self) -> (usize, usize) {
        self.red.dimensions()
    }

    /// Channels in red, green, blue order
    pub fn channels(&self) -> [&Grid; 3] {
        [&self.red, &self.green, &self.blue]
    }
}

/// Three 1-indexed band numbers mapped to red, green and blue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSelection {
    pub red: usize,
    pub green: usize,
    pub blue: usize,
}

impl Default for ChannelSelection {
    fn default() -> Self {
        ChannelSelection { red: 1, green: 2, blue: 3 }
    }
}

impl ChannelSelection {
    pub fn new(red: usize, green: usize, blue: usize) -> Self {
        ChannelSelection { red, green, blue }
    }

    /// Parses "r,g,b", e.g. "4,3,2"
    pub fn parse(text: &str) -> RasterResult<Self> {
        let indices = text.split(',')
            .map(|part| part.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| RasterError::GenericError(format!("Invalid channel list '{}': {}", text, e)))?;

        match indices.as_slice() {
            [red, green, blue] => Ok(ChannelSelection::new(*red, *green, *blue)),
            _ => Err(RasterError::GenericError(format!(
                "Expected three channels, got {} in '{}'", indices.len(), text))),
        }
    }

    pub fn indices(&self) -> [usize; 3] {
        [self.red, self.green, self.blue]
    }
}

impl fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.red, self.green, self.blue)
    }
}

/// Description of a raster file, read from its first directory
#[derive(Debug, Clone)]
pub struct RasterSource {
    pub path: PathBuf,
    pub channel_count: usize,
    pub width: usize,
    pub height: usize,
    pub sample_type: SampleType,
    pub planar: PlanarConfig,
    pub tiled: bool,
    pub compression: u64,
    pub geo_reference: Option<GeoReference>,
}

impl RasterSource {
    /// Checks a 1-indexed band number against the channel count
    pub fn check_channel(&self, index: usize) -> RasterResult<()> {
        if index == 0 || index > self.channel_count {
            return Err(RasterError::ChannelIndex {
                requested: index,
                available: self.channel_count,
            });
        }
        Ok(())
    }
}

impl fmt::Display for RasterSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}x{}, {} x {}, {})",
               self.path.display(), self.width, self.height,
               self.channel_count, self.sample_type,
               if self.tiled { "tiled" } else { "stripped" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_skips_nan() {
        let grid = Grid::new(2, 2, vec![f64::NAN, 3.0, -1.0, 2.0]).unwrap();
        assert_eq!(grid.min_max(), Some((-1.0, 3.0)));
        assert_eq!(Grid::filled(1, 1, f64::NAN).min_max(), None);
    }

    #[test]
    fn test_triple_requires_equal_sizes() {
        let result = ChannelTriple::new(Grid::filled(2, 2, 0.0), Grid::filled(2, 2, 0.0), Grid::filled(2, 3, 0.0));
        assert!(matches!(result, Err(RasterError::DimensionMismatch)));
    }

    #[test]
    fn test_selection_parsing() {
        assert_eq!(ChannelSelection::parse("4, 3,2").unwrap(), ChannelSelection::new(4, 3, 2));
        assert!(ChannelSelection::parse("1,2").is_err());
        assert!(ChannelSelection::parse("1,x,3").is_err());
    }
}
