//! TIFF validation utilities
//!
//! Sanity checks applied while walking the directory chain of a file that
//! may be truncated or malformed.

use log::{debug, error, warn};
use std::io::SeekFrom;

use crate::errors::{RasterError, RasterResult};
use crate::io::byte_order::ByteOrderHandler;
use crate::io::SeekableReader;
use crate::tiff::constants::header;

/// Rejects IFD offsets that point inside the header or past the end of file
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> RasterResult<()> {
    if offset >= file_size || offset < 8 {
        return Err(RasterError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// Gets the stream length, restoring the current position afterwards
///
/// Returns `u64::MAX` if the length cannot be determined.
pub fn get_file_size(reader: &mut dyn SeekableReader) -> RasterResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;

    Ok(file_size)
}

/// Validates the BigTIFF header fields following the version number
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler
) -> RasterResult<()> {
    let offset_size = byte_order_handler.read_u16(reader)?;
    let zeros = byte_order_handler.read_u16(reader)?;

    debug!("BigTIFF offset size: {}, reserved: {}", offset_size, zeros);

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(RasterError::InvalidBigTIFFHeader);
    }

    Ok(())
}
