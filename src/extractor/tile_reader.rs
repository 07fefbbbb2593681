//! Tile-based band extraction
//!
//! Tiled TIFF files organize image data in rectangular tiles of equal size.
//! Edge tiles are stored padded to the full tile size; the padding is
//! dropped while copying into the output grids.

use log::debug;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::errors::{RasterError, RasterResult};
use crate::io::SeekableReader;
use crate::tiff::constants::tags;
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::types::PlanarConfig;
use crate::utils::image_extraction_utils;

use super::layout::PixelLayout;

/// Reads band samples from tiled TIFF files
pub struct TileReader<'a> {
    /// Open handle on the TIFF file
    reader: &'a mut dyn SeekableReader,
    /// IFD containing the image metadata
    ifd: &'a IFD,
    /// TIFF reader for accessing tag values
    tiff_reader: &'a TiffReader,
    layout: &'a PixelLayout,
}

impl<'a> TileReader<'a> {
    pub fn new(
        reader: &'a mut dyn SeekableReader,
        ifd: &'a IFD,
        tiff_reader: &'a TiffReader,
        layout: &'a PixelLayout,
    ) -> Self {
        TileReader {
            reader,
            ifd,
            tiff_reader,
            layout,
        }
    }

    /// Tile width and height in pixels
    fn tile_dimensions(&self) -> RasterResult<(usize, usize)> {
        let width = self.ifd.get_tag_value(tags::TILE_WIDTH).unwrap_or(0) as usize;
        let height = self.ifd.get_tag_value(tags::TILE_LENGTH).unwrap_or(0) as usize;
        if width == 0 || height == 0 {
            return Err(RasterError::GenericError(format!("Invalid tile size {}x{}", width, height)));
        }
        Ok((width, height))
    }

    /// Read the given 0-based bands, one sample vector per band
    pub fn read_bands(&mut self, bands: &[usize]) -> RasterResult<Vec<Vec<f64>>> {
        let layout = self.layout;
        let (tile_width, tile_height) = self.tile_dimensions()?;
        let tiles_across = layout.width.div_ceil(tile_width);
        let tiles_down = layout.height.div_ceil(tile_height);
        let tiles_per_band = tiles_across * tiles_down;

        let compression_handler = CompressionFactory::create_handler(layout.compression)?;
        let tile_offsets = self.tiff_reader.read_tag_values(self.reader, self.ifd, tags::TILE_OFFSETS)?;
        let tile_byte_counts = self.tiff_reader.read_tag_values(self.reader, self.ifd, tags::TILE_BYTE_COUNTS)?;

        debug!("Reading {}x{} tiles of {}x{} pixels ({})",
              tiles_across, tiles_down, tile_width, tile_height, compression_handler.name());

        let stride = layout.chunk_stride();
        let mut outputs = vec![vec![0.0; layout.width * layout.height]; bands.len()];

        for tile_row in 0..tiles_down {
            for tile_col in 0..tiles_across {
                let tile = tile_row * tiles_across + tile_col;
                let x0 = tile_col * tile_width;
                let y0 = tile_row * tile_height;
                let copy_width = tile_width.min(layout.width - x0);
                let copy_height = tile_height.min(layout.height - y0);

                match layout.planar {
                    PlanarConfig::Chunky => {
                        let samples = self.decode_tile(tile, (tile_width, tile_height), &tile_offsets, &tile_byte_counts, &*compression_handler)?;
                        for (target, &band) in outputs.iter_mut().zip(bands) {
                            for row in 0..copy_height {
                                for col in 0..copy_width {
                                    let source = (row * tile_width + col) * stride + band;
                                    target[(y0 + row) * layout.width + x0 + col] = samples[source];
                                }
                            }
                        }
                    }
                    PlanarConfig::Planar => {
                        for (target, &band) in outputs.iter_mut().zip(bands) {
                            let index = band * tiles_per_band + tile;
                            let samples = self.decode_tile(index, (tile_width, tile_height), &tile_offsets, &tile_byte_counts, &*compression_handler)?;
                            for row in 0..copy_height {
                                let source = row * tile_width;
                                let dest = (y0 + row) * layout.width + x0;
                                target[dest..dest + copy_width].copy_from_slice(&samples[source..source + copy_width]);
                            }
                        }
                    }
                }
            }
        }

        Ok(outputs)
    }

    /// Read, decompress and decode tile `index`
    fn decode_tile(
        &mut self,
        index: usize,
        (tile_width, tile_height): (usize, usize),
        offsets: &[u64],
        byte_counts: &[u64],
        compression_handler: &dyn CompressionHandler,
    ) -> RasterResult<Vec<f64>> {
        let (offset, byte_count) = image_extraction_utils::chunk_location(offsets, byte_counts, index)?;
        debug!("Tile {}: offset {}, {} bytes", index, offset, byte_count);

        let raw = image_extraction_utils::read_chunk(self.reader, offset, byte_count, compression_handler)?;
        image_extraction_utils::decode_chunk(&raw, self.layout, self.tiff_reader.handler()?, tile_width, tile_height)
    }
}
