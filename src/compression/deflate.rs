//! Handler for Deflate (zlib) compressed data

use std::io::{Read, Write};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::errors::{RasterError, RasterResult};
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;

/// Deflate handler (compression code 8, also accepts legacy 32946 on read)
pub struct DeflateHandler;

impl CompressionHandler for DeflateHandler {
    fn decompress(&self, data: &[u8]) -> RasterResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut decompressed = Vec::new();
        decoder.read_to_end(&mut decompressed)
            .map_err(|e| RasterError::GenericError(format!("Deflate decompression error: {}", e)))?;
        Ok(decompressed)
    }

    fn compress(&self, data: &[u8]) -> RasterResult<Vec<u8>> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &'static str {
        "Deflate"
    }

    fn code(&self) -> u16 {
        compression::DEFLATE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deflate_restores_input() {
        let data: Vec<u8> = (0..2048u32).map(|i| (i % 7) as u8).collect();
        let handler = DeflateHandler;
        let packed = handler.compress(&data).unwrap();
        assert!(packed.len() < data.len());
        assert_eq!(handler.decompress(&packed).unwrap(), data);
    }

    #[test]
    fn test_corrupt_stream_is_an_error() {
        assert!(DeflateHandler.decompress(&[0x00, 0x01, 0x02]).is_err());
    }
}
