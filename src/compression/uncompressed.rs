//! Handler for uncompressed data

use crate::errors::RasterResult;
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;

/// Pass-through handler (compression code 1)
pub struct UncompressedHandler;

impl CompressionHandler for UncompressedHandler {
    fn decompress(&self, data: &[u8]) -> RasterResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn compress(&self, data: &[u8]) -> RasterResult<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn name(&self) -> &'static str {
        "None"
    }

    fn code(&self) -> u16 {
        compression::NONE
    }
}
