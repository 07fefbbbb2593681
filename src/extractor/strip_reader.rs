//! Strip-based band extraction
//!
//! Stripped TIFFs organize image data in horizontal strips across the entire
//! width of the image. The last strip of a band may hold fewer rows.

use log::debug;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::errors::RasterResult;
use crate::io::SeekableReader;
use crate::tiff::constants::tags;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::types::PlanarConfig;
use crate::utils::image_extraction_utils;

use super::layout::PixelLayout;

/// Reads band samples from stripped TIFF files
pub struct StripReader<'a> {
    /// Open handle on the TIFF file
    reader: &'a mut dyn SeekableReader,
    /// IFD containing the image metadata
    ifd: &'a IFD,
    /// TIFF reader for accessing tag values
    tiff_reader: &'a TiffReader,
    layout: &'a PixelLayout,
}

impl<'a> StripReader<'a> {
    pub fn new(
        reader: &'a mut dyn SeekableReader,
        ifd: &'a IFD,
        tiff_reader: &'a TiffReader,
        layout: &'a PixelLayout,
    ) -> Self {
        StripReader {
            reader,
            ifd,
            tiff_reader,
            layout,
        }
    }

    /// Rows per strip, defaulting to the full image height
    fn rows_per_strip(&self) -> usize {
        match self.ifd.get_tag_value(tags::ROWS_PER_STRIP) {
            Some(rows) if rows > 0 => (rows as usize).min(self.layout.height),
            _ => self.layout.height,
        }
    }

    /// Read the given 0-based bands, one sample vector per band
    ///
    /// Chunky strips are decoded once for all bands; planar files only
    /// touch the strips of the requested bands.
    pub fn read_bands(&mut self, bands: &[usize]) -> RasterResult<Vec<Vec<f64>>> {
        let layout = self.layout;
        let rows_per_strip = self.rows_per_strip().max(1);
        let strips_per_band = layout.height.div_ceil(rows_per_strip);

        let compression_handler = CompressionFactory::create_handler(layout.compression)?;
        let strip_offsets = self.tiff_reader.read_tag_values(self.reader, self.ifd, tags::STRIP_OFFSETS)?;
        let strip_byte_counts = self.tiff_reader.read_tag_values(self.reader, self.ifd, tags::STRIP_BYTE_COUNTS)?;

        debug!("Reading {} strips per band ({} rows each, {})",
              strips_per_band, rows_per_strip, compression_handler.name());

        let stride = layout.chunk_stride();
        let mut outputs = vec![Vec::with_capacity(layout.width * layout.height); bands.len()];

        match layout.planar {
            PlanarConfig::Chunky => {
                for strip in 0..strips_per_band {
                    let rows = rows_per_strip.min(layout.height - strip * rows_per_strip);
                    let samples = self.decode_strip(strip, rows, &strip_offsets, &strip_byte_counts, &*compression_handler)?;
                    for (target, &band) in outputs.iter_mut().zip(bands) {
                        target.extend(samples.iter().skip(band).step_by(stride));
                    }
                }
            }
            PlanarConfig::Planar => {
                for (target, &band) in outputs.iter_mut().zip(bands) {
                    for strip in 0..strips_per_band {
                        let rows = rows_per_strip.min(layout.height - strip * rows_per_strip);
                        let index = band * strips_per_band + strip;
                        let samples = self.decode_strip(index, rows, &strip_offsets, &strip_byte_counts, &*compression_handler)?;
                        target.extend(samples);
                    }
                }
            }
        }

        Ok(outputs)
    }

    /// Read, decompress and decode strip `index` holding `rows` rows
    fn decode_strip(
        &mut self,
        index: usize,
        rows: usize,
        offsets: &[u64],
        byte_counts: &[u64],
        compression_handler: &dyn CompressionHandler,
    ) -> RasterResult<Vec<f64>> {
        let (offset, byte_count) = image_extraction_utils::chunk_location(offsets, byte_counts, index)?;
        debug!("Strip {}: offset {}, {} bytes", index, offset, byte_count);

        let raw = image_extraction_utils::read_chunk(self.reader, offset, byte_count, compression_handler)?;
        image_extraction_utils::decode_chunk(&raw, self.layout, self.tiff_reader.handler()?, self.layout.width, rows)
    }
}
