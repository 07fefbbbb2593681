//! 8-bit rendering of channel triples
//!
//! `RangeNormalizer` maps raw samples onto display levels and
//! `ImageComposer` interleaves and writes the result.

mod composer;
mod normalizer;

pub use composer::{ImageComposer, OutputFormat};
pub use normalizer::{NormalizationRange, RangeNormalizer};
