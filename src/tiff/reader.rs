//! TIFF file reader implementation
//!
//! This module implements the TIFF/BigTIFF directory reader that uses the
//! Strategy pattern to handle different byte orders.

use log::{debug, warn};
use std::io::{Cursor, Read, SeekFrom};

use crate::errors::{RasterError, RasterResult};
use crate::io::byte_order::ByteOrderHandler;
use crate::io::SeekableReader;
use crate::tiff::constants::field_types;
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;
use crate::utils::format_utils;
use crate::utils::ifd_utils;
use crate::utils::tag_utils;

/// Upper bound on directories walked before giving up on a looping chain
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF directories
///
/// The reader does not own the stream. Callers open the file, hand the
/// reader a `&mut` to it for parsing, and keep using the same handle for
/// pixel access through `read_tag_values` and the strip/tile readers.
pub struct TiffReader {
    /// Current byte order handler
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Whether currently reading BigTIFF format
    is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            is_big_tiff: false,
        }
    }

    /// Returns the byte order handler of the last parsed file
    pub fn handler(&self) -> RasterResult<&dyn ByteOrderHandler> {
        self.byte_order_handler
            .as_deref()
            .ok_or_else(|| RasterError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Returns whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Reads a TIFF file from the given reader
    ///
    /// This method handles the core process of reading a TIFF file:
    /// 1. Detect byte order (little/big endian)
    /// 2. Check for TIFF or BigTIFF format
    /// 3. Read all IFDs (Image File Directories)
    ///
    /// # Arguments
    /// * `reader` - Any struct implementing the SeekableReader trait
    ///
    /// # Returns
    /// A TIFF structure containing the file's directories
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> RasterResult<TIFF> {
        debug!("TiffReader::read starting");
        reader.seek(SeekFrom::Start(0))?;

        let handler = format_utils::detect_byte_order(reader)?;
        let (is_big_tiff, _) = format_utils::detect_tiff_format(reader, handler.as_ref())?;
        let first_ifd_offset = ifd_utils::read_first_ifd_offset(reader, is_big_tiff, handler.as_ref())?;
        debug!("First IFD offset: {}", first_ifd_offset);

        self.byte_order_handler = Some(handler);
        self.is_big_tiff = is_big_tiff;

        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TIFF::new(is_big_tiff);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        debug!("Read {} IFDs from TIFF file", tiff.ifds.len());
        Ok(tiff)
    }

    /// Reads a chain of IFDs starting from the given offset
    ///
    /// A broken link after the first directory ends the chain with a warning;
    /// only the first directory is required to parse.
    fn read_ifd_chain(
        &self,
        reader: &mut dyn SeekableReader,
        first_ifd_offset: u64,
        file_size: u64,
    ) -> RasterResult<Vec<IFD>> {
        let handler = self.handler()?;
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            let ifd = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(ifd) => ifd,
                Err(e) if !ifds.is_empty() => {
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
                Err(e) => return Err(e),
            };

            let next_offset_position = ifd_offset + ifd_utils::calculate_ifd_size(&ifd, self.is_big_tiff)
                - ifd_utils::next_offset_size(self.is_big_tiff);
            reader.seek(SeekFrom::Start(next_offset_position))?;

            let next_ifd_offset = match ifd_utils::read_next_ifd_offset(reader, self.is_big_tiff, handler) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    0
                }
            };

            ifds.push(ifd);

            if next_ifd_offset != 0 && validation::validate_ifd_offset(next_ifd_offset, file_size).is_err() {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", next_ifd_offset);
                break;
            }
            ifd_offset = next_ifd_offset;
        }

        Ok(ifds)
    }

    /// Reads an IFD from the reader
    ///
    /// # Arguments
    /// * `reader` - The seekable reader to use
    /// * `offset` - Offset in the file where the IFD starts
    /// * `number` - The index of this IFD in the file
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> RasterResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;
        let handler = self.handler()?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };
        debug!("IFD #{} entry count: {}", number, entry_count);

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            let entry = self.read_ifd_entry(reader, handler)?;
            ifd.add_entry(entry);
        }

        Ok(ifd)
    }

    /// Reads a single IFD entry
    ///
    /// Values small enough to live in the value field are decoded right away
    /// so that left-justified SHORTs in big-endian files come out right.
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader, handler: &dyn ByteOrderHandler) -> RasterResult<IFDEntry> {
        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let mut field = vec![0u8; ifd_utils::next_offset_size(self.is_big_tiff) as usize];
        reader.read_exact(&mut field)?;
        let mut cursor = Cursor::new(field.as_slice());

        let entry = IFDEntry::new(tag, field_type, count, 0);
        if tag_utils::is_value_inline(&entry, self.is_big_tiff) {
            let mut values = Vec::with_capacity(count as usize);
            tag_utils::read_tag_value_array(&mut cursor, &entry, handler, &mut values)?;
            return Ok(entry.with_inline_values(values));
        }

        let value_offset = if self.is_big_tiff {
            handler.read_u64(&mut cursor)?
        } else {
            handler.read_u32(&mut cursor)? as u64
        };
        Ok(IFDEntry { value_offset, ..entry })
    }

    /// Reads a tag's value as a vector of u64
    ///
    /// # Arguments
    /// * `reader` - The seekable reader to use
    /// * `ifd` - The IFD containing the tag
    /// * `tag` - The tag number to read
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> RasterResult<Vec<u64>> {
        let entry = ifd.get_entry(tag)
            .ok_or(RasterError::TagNotFound(tag))?;

        if tag_utils::is_value_inline(entry, self.is_big_tiff) {
            return Ok(entry.inline_values.clone());
        }

        let mut values = Vec::with_capacity(entry.count as usize);
        reader.seek(SeekFrom::Start(entry.value_offset))?;
        tag_utils::read_tag_value_array(reader, entry, self.handler()?, &mut values)?;
        Ok(values)
    }

    /// Reads a DOUBLE-typed tag such as ModelPixelScale or ModelTiepoint
    pub fn read_double_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> RasterResult<Vec<f64>> {
        let entry = ifd.get_entry(tag)
            .ok_or(RasterError::TagNotFound(tag))?;
        if entry.field_type != field_types::DOUBLE {
            return Err(RasterError::UnsupportedFieldType(entry.field_type));
        }

        Ok(self.read_tag_values(reader, ifd, tag)?
            .into_iter()
            .map(f64::from_bits)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, WriteBytesExt};
    use crate::tiff::constants::tags;

    /// Hand-assembled big-endian file with one IFD of two SHORT entries
    fn big_endian_tiff() -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"MM");
        data.write_u16::<BigEndian>(42).unwrap();
        data.write_u32::<BigEndian>(8).unwrap();

        data.write_u16::<BigEndian>(2).unwrap();
        for (tag, value) in [(tags::IMAGE_WIDTH, 7u16), (tags::IMAGE_LENGTH, 5u16)] {
            data.write_u16::<BigEndian>(tag).unwrap();
            data.write_u16::<BigEndian>(field_types::SHORT).unwrap();
            data.write_u32::<BigEndian>(1).unwrap();
            data.write_u16::<BigEndian>(value).unwrap();
            data.write_u16::<BigEndian>(0).unwrap();
        }
        data.write_u32::<BigEndian>(0).unwrap();
        data
    }

    #[test]
    fn test_reads_left_justified_shorts() {
        let mut cursor = Cursor::new(big_endian_tiff());
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();

        assert_eq!(tiff.ifd_count(), 1);
        assert!(!reader.is_big_tiff());
        assert_eq!(tiff.main_ifd().unwrap().get_dimensions(), Some((7, 5)));
    }

    #[test]
    fn test_rejects_garbage_header() {
        let mut cursor = Cursor::new(vec![0u8; 16]);
        let mut reader = TiffReader::new();
        assert!(matches!(reader.read(&mut cursor), Err(RasterError::InvalidByteOrder(0))));
    }
}
