//! Compression handler trait definition

use crate::errors::RasterResult;

/// Strategy trait for handling different compression methods
pub trait CompressionHandler: Send + Sync {
    /// Decompress one strip or tile
    fn decompress(&self, data: &[u8]) -> RasterResult<Vec<u8>>;

    /// Compress one strip or tile
    fn compress(&self, data: &[u8]) -> RasterResult<Vec<u8>>;

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// Compression tag value written for this method
    fn code(&self) -> u16;
}
