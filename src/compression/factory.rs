//! Factory for creating compression handlers

use crate::errors::{RasterError, RasterResult};
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;
use super::uncompressed::UncompressedHandler;
use super::deflate::DeflateHandler;
use super::zstd::ZstdHandler;

/// Factory for creating compression handlers
pub struct CompressionFactory;

impl CompressionFactory {
    /// Create a compression handler for the given Compression tag value
    pub fn create_handler(code: u64) -> RasterResult<Box<dyn CompressionHandler>> {
        match u16::try_from(code).unwrap_or(0) {
            compression::NONE => Ok(Box::new(UncompressedHandler)),
            compression::DEFLATE | compression::DEFLATE_LEGACY => Ok(Box::new(DeflateHandler)),
            compression::ZSTD => Ok(Box::new(ZstdHandler::new())),
            _ => Err(RasterError::UnsupportedCompression(code))
        }
    }

    /// Get a handler by name, as written in catalog files
    pub fn get_handler_by_name(name: &str) -> RasterResult<Box<dyn CompressionHandler>> {
        match name.to_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Box::new(UncompressedHandler)),
            "deflate" | "zip" => Ok(Box::new(DeflateHandler)),
            "zstd" => Ok(Box::new(ZstdHandler::new())),
            _ => Err(RasterError::InvalidRequest(format!("Unknown compression type: {}", name)))
        }
    }
}
