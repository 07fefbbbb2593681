//! Extraction utilities
//!
//! Helpers shared by the strip and tile readers: fetching one compressed
//! chunk from the file and decoding it into samples.

use log::trace;
use std::io::SeekFrom;

use crate::compression::CompressionHandler;
use crate::errors::{RasterError, RasterResult};
use crate::extractor::layout::PixelLayout;
use crate::io::byte_order::ByteOrderHandler;
use crate::io::SeekableReader;
use crate::utils::sample_utils;

/// Reads and decompresses the chunk at `offset`
pub fn read_chunk(
    reader: &mut dyn SeekableReader,
    offset: u64,
    byte_count: u64,
    compression_handler: &dyn CompressionHandler,
) -> RasterResult<Vec<u8>> {
    trace!("Reading chunk at offset {} ({} bytes)", offset, byte_count);
    reader.seek(SeekFrom::Start(offset))?;
    let mut compressed = vec![0u8; byte_count as usize];
    reader.read_exact(&mut compressed)?;
    compression_handler.decompress(&compressed)
}

/// Decodes `rows` rows of `row_pixels` pixels from a decompressed chunk
///
/// Undoes the predictor when the layout uses one. Fails when the chunk
/// is shorter than the geometry requires.
pub fn decode_chunk(
    bytes: &[u8],
    layout: &PixelLayout,
    handler: &dyn ByteOrderHandler,
    row_pixels: usize,
    rows: usize,
) -> RasterResult<Vec<f64>> {
    let stride = layout.chunk_stride();
    let sample_size = layout.sample_type.byte_size();
    let sample_count = row_pixels * rows * stride;

    if bytes.len() < sample_count * sample_size {
        return Err(RasterError::GenericError(format!(
            "Chunk holds {} bytes, expected {}", bytes.len(), sample_count * sample_size)));
    }

    let mut samples: Vec<f64> = bytes
        .chunks_exact(sample_size)
        .take(sample_count)
        .map(|raw| handler.decode_sample(raw, layout.sample_type))
        .collect();

    if layout.uses_predictor() {
        sample_utils::undo_horizontal_differencing(&mut samples, row_pixels * stride, stride, layout.sample_type);
    }

    Ok(samples)
}

/// Fetches one entry from an offsets/byte-counts table
pub fn chunk_location(offsets: &[u64], byte_counts: &[u64], index: usize) -> RasterResult<(u64, u64)> {
    match (offsets.get(index), byte_counts.get(index)) {
        (Some(&offset), Some(&count)) => Ok((offset, count)),
        _ => Err(RasterError::GenericError(format!(
            "Chunk {} missing from offset table ({} entries)", index, offsets.len()))),
    }
}
