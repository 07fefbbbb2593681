//! TIFF file format module
//!
//! Directory parsing for TIFF and BigTIFF inputs, plus a GeoTIFF writer
//! for float exports and fixtures.

pub mod builder;
pub mod constants;
pub mod geotags;
pub mod ifd;
pub mod reader;
pub mod types;
pub(crate) mod validation;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use builder::{ChunkLayout, GeoTiffBuilder};
pub use geotags::GeoReference;
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use types::{PlanarConfig, SampleType, TIFF};
