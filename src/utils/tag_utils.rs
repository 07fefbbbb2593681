//! TIFF tag utilities
//!
//! Utilities for working with TIFF tags and their values.

use byteorder::ReadBytesExt;

use crate::errors::{RasterError, RasterResult};
use crate::io::byte_order::ByteOrderHandler;
use crate::io::SeekableReader;
use crate::tiff::constants::{field_types, tags};
use crate::tiff::ifd::IFDEntry;

/// Reads an array of tag values based on the field type
///
/// FLOAT and DOUBLE values are returned as their raw bit patterns; use
/// `f32::from_bits` / `f64::from_bits` on the result.
///
/// # Arguments
/// * `reader` - The seekable reader to use
/// * `entry` - The IFD entry with tag information
/// * `handler` - The byte order handler
/// * `values` - The vector to store values in
pub fn read_tag_value_array(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
    values: &mut Vec<u64>
) -> RasterResult<()> {
    for _ in 0..entry.count {
        let value = match entry.field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED | field_types::ASCII => reader.read_u8()? as u64,
            field_types::SHORT | field_types::SSHORT => handler.read_u16(reader)? as u64,
            field_types::LONG | field_types::SLONG | field_types::FLOAT => handler.read_u32(reader)? as u64,
            field_types::RATIONAL | field_types::SRATIONAL => {
                let numerator = handler.read_u32(reader)? as u64;
                let denominator = handler.read_u32(reader)? as u64;
                (numerator << 32) | denominator
            },
            field_types::DOUBLE => handler.read_f64(reader)?.to_bits(),
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.read_u64(reader)?,
            _ => return Err(RasterError::UnsupportedFieldType(entry.field_type)),
        };

        values.push(value);
    }

    Ok(())
}

/// Determines if a tag's value is stored inline or at an offset
pub fn is_value_inline(entry: &IFDEntry, is_big_tiff: bool) -> bool {
    let total_size = entry.get_field_type_size() as u64 * entry.count;

    if is_big_tiff {
        total_size <= 8
    } else {
        total_size <= 4
    }
}

/// Get the name of a TIFF tag, "Unknown" for anything unrecognized
pub fn get_tag_name(tag: u16) -> &'static str {
    match tag {
        tags::IMAGE_WIDTH => "ImageWidth",
        tags::IMAGE_LENGTH => "ImageLength",
        tags::BITS_PER_SAMPLE => "BitsPerSample",
        tags::COMPRESSION => "Compression",
        tags::PHOTOMETRIC_INTERPRETATION => "PhotometricInterpretation",
        tags::STRIP_OFFSETS => "StripOffsets",
        tags::SAMPLES_PER_PIXEL => "SamplesPerPixel",
        tags::ROWS_PER_STRIP => "RowsPerStrip",
        tags::STRIP_BYTE_COUNTS => "StripByteCounts",
        tags::PLANAR_CONFIGURATION => "PlanarConfiguration",
        tags::PREDICTOR => "Predictor",
        tags::TILE_WIDTH => "TileWidth",
        tags::TILE_LENGTH => "TileLength",
        tags::TILE_OFFSETS => "TileOffsets",
        tags::TILE_BYTE_COUNTS => "TileByteCounts",
        tags::SAMPLE_FORMAT => "SampleFormat",
        tags::MODEL_PIXEL_SCALE_TAG => "ModelPixelScale",
        tags::MODEL_TIEPOINT_TAG => "ModelTiepoint",
        tags::GEO_KEY_DIRECTORY_TAG => "GeoKeyDirectory",
        tags::GDAL_NODATA => "GDALNoData",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_detection() {
        let two_shorts = IFDEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, 2, 0);
        let three_shorts = IFDEntry::new(tags::BITS_PER_SAMPLE, field_types::SHORT, 3, 0);
        assert!(is_value_inline(&two_shorts, false));
        assert!(!is_value_inline(&three_shorts, false));
        assert!(is_value_inline(&three_shorts, true));
    }

    #[test]
    fn test_tag_names() {
        assert_eq!(get_tag_name(tags::TILE_WIDTH), "TileWidth");
        assert_eq!(get_tag_name(1), "Unknown");
    }
}
