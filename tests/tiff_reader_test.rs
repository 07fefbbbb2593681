//! Integration tests for reading hand-assembled TIFF and BigTIFF files

use std::io::Cursor;

use rasterfetch::tiff::constants::{field_types, tags};
use rasterfetch::tiff::TiffReader;
use rasterfetch::{ChannelExtractor, RasterError};

/// One BigTIFF directory entry: tag, type, count, 8-byte value field
fn big_entry(buffer: &mut Vec<u8>, tag: u16, field_type: u16, value: u64) {
    buffer.extend_from_slice(&tag.to_le_bytes());
    buffer.extend_from_slice(&field_type.to_le_bytes());
    buffer.extend_from_slice(&1u64.to_le_bytes());
    buffer.extend_from_slice(&value.to_le_bytes());
}

/// 3x1 single-band 8-bit BigTIFF holding [7, 9, 11]
fn small_bigtiff() -> Vec<u8> {
    let mut buffer = Vec::new();
    buffer.extend_from_slice(b"II");
    buffer.extend_from_slice(&43u16.to_le_bytes());
    buffer.extend_from_slice(&8u16.to_le_bytes());  // offset size
    buffer.extend_from_slice(&0u16.to_le_bytes());  // reserved
    buffer.extend_from_slice(&16u64.to_le_bytes()); // first IFD

    let entry_count = 9u64;
    let data_offset = 16 + 8 + entry_count * 20 + 8;

    buffer.extend_from_slice(&entry_count.to_le_bytes());
    big_entry(&mut buffer, tags::IMAGE_WIDTH, field_types::SHORT, 3);
    big_entry(&mut buffer, tags::IMAGE_LENGTH, field_types::SHORT, 1);
    big_entry(&mut buffer, tags::BITS_PER_SAMPLE, field_types::SHORT, 8);
    big_entry(&mut buffer, tags::COMPRESSION, field_types::SHORT, 1);
    big_entry(&mut buffer, tags::PHOTOMETRIC_INTERPRETATION, field_types::SHORT, 1);
    big_entry(&mut buffer, tags::STRIP_OFFSETS, field_types::LONG8, data_offset);
    big_entry(&mut buffer, tags::SAMPLES_PER_PIXEL, field_types::SHORT, 1);
    big_entry(&mut buffer, tags::ROWS_PER_STRIP, field_types::SHORT, 1);
    big_entry(&mut buffer, tags::STRIP_BYTE_COUNTS, field_types::LONG8, 3);
    buffer.extend_from_slice(&0u64.to_le_bytes());

    assert_eq!(buffer.len() as u64, data_offset);
    buffer.extend_from_slice(&[7, 9, 11]);
    buffer
}

#[test]
fn test_bigtiff_directory() {
    let mut cursor = Cursor::new(small_bigtiff());
    let mut reader = TiffReader::new();

    let tiff = reader.read(&mut cursor).unwrap();
    assert!(tiff.is_big_tiff);
    assert_eq!(tiff.ifd_count(), 1);

    let ifd = tiff.main_ifd().unwrap();
    assert_eq!(ifd.get_dimensions(), Some((3, 1)));
    assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::STRIP_BYTE_COUNTS).unwrap(), vec![3]);
}

#[test]
fn test_bigtiff_pixels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("big.tif");
    std::fs::write(&path, small_bigtiff()).unwrap();

    let (source, grids) = ChannelExtractor::read_bands(&path, &[1]).unwrap();
    assert_eq!(source.channel_count, 1);
    assert_eq!(grids[0].data(), &[7.0, 9.0, 11.0]);

    let err = ChannelExtractor::read_bands(&path, &[2]).unwrap_err();
    assert!(matches!(err, RasterError::ChannelIndex { requested: 2, available: 1 }));
}

#[test]
fn test_big_endian_classic_header() {
    // "MM", version 42, IFD at 8 with a single LONG ImageWidth entry
    let mut buffer = vec![0x4D, 0x4D, 0, 42, 0, 0, 0, 8];
    buffer.extend_from_slice(&[0, 1]);
    buffer.extend_from_slice(&[1, 0, 0, 4, 0, 0, 0, 1, 0, 0, 0, 200]);
    buffer.extend_from_slice(&[0, 0, 0, 0]);

    let mut reader = TiffReader::new();
    let tiff = reader.read(&mut Cursor::new(buffer)).unwrap();
    assert!(!tiff.is_big_tiff);
    assert_eq!(tiff.main_ifd().unwrap().get_tag_value(tags::IMAGE_WIDTH), Some(200));
}

#[test]
fn test_unknown_version_is_rejected() {
    let buffer = vec![0x49, 0x49, 41, 0, 8, 0, 0, 0];
    let err = TiffReader::new().read(&mut Cursor::new(buffer)).unwrap_err();
    assert!(matches!(err, RasterError::UnsupportedVersion(41)));
}
