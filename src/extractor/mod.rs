//! Band extraction from raster files
//!
//! `ChannelExtractor` is the entry point; the strip and tile readers decode
//! the two TIFF data organizations underneath it.

mod channel_extractor;
pub(crate) mod layout;
mod raster;
mod strip_reader;
mod tile_reader;

pub use channel_extractor::ChannelExtractor;
pub use raster::{ChannelSelection, ChannelTriple, Grid, RasterSource};
