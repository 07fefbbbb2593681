//! IFD utilities
//!
//! Utilities for working with Image File Directories (IFDs) in TIFF files.

use log::debug;

use crate::errors::RasterResult;
use crate::io::byte_order::ByteOrderHandler;
use crate::io::SeekableReader;
use crate::tiff::ifd::IFD;

/// Reads the first IFD offset from a TIFF file header
///
/// # Arguments
/// * `reader` - The seekable reader to use
/// * `is_big_tiff` - Whether the file is in BigTIFF format
/// * `byte_order_handler` - Handler for the file's byte order
pub fn read_first_ifd_offset(
    reader: &mut dyn SeekableReader,
    is_big_tiff: bool,
    byte_order_handler: &dyn ByteOrderHandler
) -> RasterResult<u64> {
    debug!("Reading first IFD offset (BigTIFF: {})", is_big_tiff);
    read_next_ifd_offset(reader, is_big_tiff, byte_order_handler)
}

/// Reads the next IFD offset, 0 if there are no more IFDs
pub fn read_next_ifd_offset(
    reader: &mut dyn SeekableReader,
    is_big_tiff: bool,
    byte_order_handler: &dyn ByteOrderHandler
) -> RasterResult<u64> {
    if is_big_tiff {
        Ok(byte_order_handler.read_u64(reader)?)
    } else {
        Ok(byte_order_handler.read_u32(reader)? as u64)
    }
}

/// Size of an offset field (and of an entry's value field)
pub fn next_offset_size(is_big_tiff: bool) -> u64 {
    if is_big_tiff { 8 } else { 4 }
}

/// Size of a single directory entry in bytes
pub fn entry_size(is_big_tiff: bool) -> u64 {
    if is_big_tiff { 20 } else { 12 }
}

/// Calculates the size of an IFD in bytes, including the next-IFD offset
pub fn calculate_ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
    calculate_ifd_size_for(ifd.entries.len(), is_big_tiff)
}

/// Calculates the size of an IFD with `entry_count` entries
pub fn calculate_ifd_size_for(entry_count: usize, is_big_tiff: bool) -> u64 {
    let count_size = if is_big_tiff { 8 } else { 2 };
    count_size + entry_size(is_big_tiff) * entry_count as u64 + next_offset_size(is_big_tiff)
}
