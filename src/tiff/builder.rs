//! GeoTIFF construction
//!
//! Assembles a little-endian classic TIFF in memory from per-band sample
//! grids and publishes it atomically. Layout is header, pixel chunks,
//! out-of-line tag values, then the single IFD.

use log::{debug, info};
use std::path::Path;

use crate::compression::CompressionFactory;
use crate::errors::{RasterError, RasterResult};
use crate::tiff::constants::{compression, field_types, header, photometric, predictor, tags};
use crate::tiff::geotags::GeoReference;
use crate::tiff::types::{PlanarConfig, SampleType};
use crate::utils::{sample_utils, write_utils};

/// How pixel data is split into chunks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkLayout {
    /// Horizontal strips of `rows_per_strip` rows; the last one may be shorter
    Strips { rows_per_strip: u32 },
    /// Fixed-size tiles, padded at the right and bottom edges
    Tiles { width: u32, height: u32 },
}

/// One pending IFD entry with its encoded value bytes
struct PendingEntry {
    tag: u16,
    field_type: u16,
    count: u32,
    payload: Vec<u8>,
}

impl PendingEntry {
    fn shorts(tag: u16, values: &[u16]) -> Self {
        PendingEntry {
            tag,
            field_type: field_types::SHORT,
            count: values.len() as u32,
            payload: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn longs(tag: u16, values: &[u32]) -> Self {
        PendingEntry {
            tag,
            field_type: field_types::LONG,
            count: values.len() as u32,
            payload: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn doubles(tag: u16, values: &[f64]) -> Self {
        PendingEntry {
            tag,
            field_type: field_types::DOUBLE,
            count: values.len() as u32,
            payload: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn ascii(tag: u16, text: &str) -> Self {
        let mut payload = text.as_bytes().to_vec();
        payload.push(0);
        PendingEntry {
            tag,
            field_type: field_types::ASCII,
            count: payload.len() as u32,
            payload,
        }
    }
}

/// Builder for single-image GeoTIFF files
///
/// # Example
/// ```no_run
/// use rasterfetch::tiff::builder::GeoTiffBuilder;
/// use rasterfetch::tiff::types::SampleType;
///
/// let mut builder = GeoTiffBuilder::new(2, 2, SampleType::U16);
/// for _ in 0..3 {
///     builder.add_band(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
/// }
/// builder.write(std::path::Path::new("out.tif")).unwrap();
/// ```
pub struct GeoTiffBuilder {
    width: usize,
    height: usize,
    sample_type: SampleType,
    planar: PlanarConfig,
    layout: ChunkLayout,
    compression: u16,
    horizontal_predictor: bool,
    geo_reference: Option<GeoReference>,
    nodata: Option<String>,
    bands: Vec<Vec<f64>>,
}

impl GeoTiffBuilder {
    /// Create a builder for a `width` x `height` raster of `sample_type` samples
    ///
    /// Defaults: chunky layout, one strip per image, no compression.
    pub fn new(width: usize, height: usize, sample_type: SampleType) -> Self {
        GeoTiffBuilder {
            width,
            height,
            sample_type,
            planar: PlanarConfig::Chunky,
            layout: ChunkLayout::Strips { rows_per_strip: height.max(1) as u32 },
            compression: compression::NONE,
            horizontal_predictor: false,
            geo_reference: None,
            nodata: None,
            bands: Vec::new(),
        }
    }

    pub fn with_planar(mut self, planar: PlanarConfig) -> Self {
        self.planar = planar;
        self
    }

    pub fn with_layout(mut self, layout: ChunkLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the Compression tag; must be a code `CompressionFactory` knows
    pub fn with_compression(mut self, code: u16) -> Self {
        self.compression = code;
        self
    }

    /// Store integer samples with horizontal differencing (Predictor = 2)
    pub fn with_horizontal_predictor(mut self) -> Self {
        self.horizontal_predictor = true;
        self
    }

    pub fn with_geo_reference(mut self, geo_reference: GeoReference) -> Self {
        self.geo_reference = Some(geo_reference);
        self
    }

    /// Set the GDAL_NODATA tag text, e.g. "nan"
    pub fn with_nodata(mut self, nodata: &str) -> Self {
        self.nodata = Some(nodata.to_string());
        self
    }

    /// Append one band of row-major samples
    pub fn add_band(&mut self, samples: Vec<f64>) -> RasterResult<()> {
        if samples.len() != self.width * self.height {
            return Err(RasterError::DimensionMismatch);
        }
        self.bands.push(samples);
        Ok(())
    }

    /// Encode the complete file into memory
    pub fn build(&self) -> RasterResult<Vec<u8>> {
        if self.bands.is_empty() || self.width == 0 || self.height == 0 {
            return Err(RasterError::GenericError("Cannot build a TIFF without pixel data".to_string()));
        }
        if self.horizontal_predictor && self.sample_type.is_float() {
            return Err(RasterError::GenericError(
                "Horizontal differencing requires integer samples".to_string()));
        }
        let handler = CompressionFactory::create_handler(self.compression as u64)?;

        let mut buffer = Vec::new();
        buffer.extend_from_slice(&header::LITTLE_ENDIAN_MARKER);
        buffer.extend_from_slice(&header::TIFF_VERSION.to_le_bytes());
        buffer.extend_from_slice(&[0u8; 4]);

        let mut offsets = Vec::new();
        let mut byte_counts = Vec::new();
        for chunk in self.encode_chunks() {
            let packed = handler.compress(&chunk)?;
            offsets.push(buffer.len() as u32);
            byte_counts.push(packed.len() as u32);
            buffer.extend_from_slice(&packed);
            write_utils::pad_to_4_bytes(&mut buffer);
        }
        debug!("Encoded {} chunks with {}", offsets.len(), handler.name());

        let mut entries = self.tag_entries(offsets, byte_counts);
        entries.sort_by_key(|entry| entry.tag);

        // out-of-line values go before the IFD
        let mut value_fields = Vec::with_capacity(entries.len());
        for entry in &entries {
            if entry.payload.len() <= 4 {
                let mut inline = entry.payload.clone();
                inline.resize(4, 0);
                value_fields.push(inline);
            } else {
                value_fields.push((buffer.len() as u32).to_le_bytes().to_vec());
                buffer.extend_from_slice(&entry.payload);
                write_utils::pad_to_4_bytes(&mut buffer);
            }
        }

        let ifd_offset = buffer.len() as u32;
        buffer[4..8].copy_from_slice(&ifd_offset.to_le_bytes());
        buffer.extend_from_slice(&(entries.len() as u16).to_le_bytes());
        for (entry, value) in entries.iter().zip(value_fields) {
            buffer.extend_from_slice(&entry.tag.to_le_bytes());
            buffer.extend_from_slice(&entry.field_type.to_le_bytes());
            buffer.extend_from_slice(&entry.count.to_le_bytes());
            buffer.extend_from_slice(&value);
        }
        buffer.extend_from_slice(&0u32.to_le_bytes());

        Ok(buffer)
    }

    /// Build and publish the file atomically at `path`
    pub fn write(&self, path: &Path) -> RasterResult<()> {
        let bytes = self.build()?;
        info!("Writing {}x{} {} GeoTIFF ({} bands) to {}",
              self.width, self.height, self.sample_type, self.bands.len(), path.display());
        write_utils::write_atomic(path, &bytes)
    }

    /// Chunk grid as (chunk width, chunk height, chunks across, chunks down)
    fn chunk_grid(&self) -> (usize, usize, usize, usize) {
        match self.layout {
            ChunkLayout::Strips { rows_per_strip } => {
                let rows = (rows_per_strip as usize).clamp(1, self.height);
                (self.width, rows, 1, self.height.div_ceil(rows))
            }
            ChunkLayout::Tiles { width, height } => {
                let (tw, th) = ((width as usize).max(1), (height as usize).max(1));
                (tw, th, self.width.div_ceil(tw), self.height.div_ceil(th))
            }
        }
    }

    /// Raw (uncompressed) bytes of every chunk, in file order
    fn encode_chunks(&self) -> Vec<Vec<u8>> {
        let (chunk_w, chunk_h, across, down) = self.chunk_grid();
        let tiled = matches!(self.layout, ChunkLayout::Tiles { .. });
        let band_groups: Vec<Vec<usize>> = match self.planar {
            PlanarConfig::Chunky => vec![(0..self.bands.len()).collect()],
            PlanarConfig::Planar => (0..self.bands.len()).map(|b| vec![b]).collect(),
        };

        let mut chunks = Vec::with_capacity(band_groups.len() * across * down);
        for group in &band_groups {
            for chunk_row in 0..down {
                for chunk_col in 0..across {
                    let y0 = chunk_row * chunk_h;
                    let x0 = chunk_col * chunk_w;
                    // strips are not padded, tiles always are
                    let rows = if tiled { chunk_h } else { chunk_h.min(self.height - y0) };

                    let mut samples = Vec::with_capacity(rows * chunk_w * group.len());
                    for y in y0..y0 + rows {
                        for x in x0..x0 + chunk_w {
                            for &band in group {
                                let value = if x < self.width && y < self.height {
                                    self.bands[band][y * self.width + x]
                                } else {
                                    0.0
                                };
                                samples.push(value);
                            }
                        }
                    }

                    if self.horizontal_predictor {
                        sample_utils::apply_horizontal_differencing(
                            &mut samples, chunk_w * group.len(), group.len(), self.sample_type);
                    }

                    let mut bytes = Vec::with_capacity(samples.len() * self.sample_type.byte_size());
                    for value in samples {
                        sample_utils::encode_sample_le(value, self.sample_type, &mut bytes);
                    }
                    chunks.push(bytes);
                }
            }
        }
        chunks
    }

    fn tag_entries(&self, offsets: Vec<u32>, byte_counts: Vec<u32>) -> Vec<PendingEntry> {
        let band_count = self.bands.len();
        let interpretation = if band_count == 3 && self.sample_type == SampleType::U8 {
            photometric::RGB
        } else {
            photometric::BLACK_IS_ZERO
        };

        let mut entries = vec![
            PendingEntry::longs(tags::IMAGE_WIDTH, &[self.width as u32]),
            PendingEntry::longs(tags::IMAGE_LENGTH, &[self.height as u32]),
            PendingEntry::shorts(tags::BITS_PER_SAMPLE, &vec![self.sample_type.bits(); band_count]),
            PendingEntry::shorts(tags::COMPRESSION, &[self.compression]),
            PendingEntry::shorts(tags::PHOTOMETRIC_INTERPRETATION, &[interpretation]),
            PendingEntry::shorts(tags::SAMPLES_PER_PIXEL, &[band_count as u16]),
            PendingEntry::shorts(tags::PLANAR_CONFIGURATION, &[self.planar.code()]),
            PendingEntry::shorts(tags::SAMPLE_FORMAT, &vec![self.sample_type.format_code(); band_count]),
        ];

        match self.layout {
            ChunkLayout::Strips { .. } => {
                let (_, rows, _, _) = self.chunk_grid();
                entries.push(PendingEntry::longs(tags::ROWS_PER_STRIP, &[rows as u32]));
                entries.push(PendingEntry::longs(tags::STRIP_OFFSETS, &offsets));
                entries.push(PendingEntry::longs(tags::STRIP_BYTE_COUNTS, &byte_counts));
            }
            ChunkLayout::Tiles { .. } => {
                let (tw, th, _, _) = self.chunk_grid();
                entries.push(PendingEntry::longs(tags::TILE_WIDTH, &[tw as u32]));
                entries.push(PendingEntry::longs(tags::TILE_LENGTH, &[th as u32]));
                entries.push(PendingEntry::longs(tags::TILE_OFFSETS, &offsets));
                entries.push(PendingEntry::longs(tags::TILE_BYTE_COUNTS, &byte_counts));
            }
        }

        if self.horizontal_predictor {
            entries.push(PendingEntry::shorts(tags::PREDICTOR, &[predictor::HORIZONTAL_DIFFERENCING]));
        }

        if let Some(geo) = &self.geo_reference {
            entries.push(PendingEntry::doubles(tags::MODEL_PIXEL_SCALE_TAG, &geo.pixel_scale()));
            entries.push(PendingEntry::doubles(tags::MODEL_TIEPOINT_TAG, &geo.tiepoint()));
            entries.push(PendingEntry::shorts(tags::GEO_KEY_DIRECTORY_TAG, &geo.geo_key_directory()));
        }

        if let Some(nodata) = &self.nodata {
            entries.push(PendingEntry::ascii(tags::GDAL_NODATA, nodata));
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::reader::TiffReader;
    use std::io::Cursor;

    #[test]
    fn test_rejects_wrong_band_length() {
        let mut builder = GeoTiffBuilder::new(3, 2, SampleType::U8);
        assert!(matches!(builder.add_band(vec![0.0; 5]), Err(RasterError::DimensionMismatch)));
    }

    #[test]
    fn test_built_file_parses_with_georeference() {
        let geo = GeoReference { origin_x: -74.0, origin_y: 40.7, pixel_width: 0.01, pixel_height: 0.01, epsg: 4326 };
        let mut builder = GeoTiffBuilder::new(4, 3, SampleType::F32)
            .with_compression(compression::DEFLATE)
            .with_layout(ChunkLayout::Strips { rows_per_strip: 2 })
            .with_geo_reference(geo)
            .with_nodata("nan");
        builder.add_band(vec![1.5; 12]).unwrap();

        let mut cursor = Cursor::new(builder.build().unwrap());
        let mut reader = TiffReader::new();
        let tiff = reader.read(&mut cursor).unwrap();
        let ifd = tiff.main_ifd().unwrap();

        assert_eq!(ifd.get_dimensions(), Some((4, 3)));
        assert_eq!(ifd.get_tag_value(tags::ROWS_PER_STRIP), Some(2));
        assert_eq!(reader.read_tag_values(&mut cursor, ifd, tags::STRIP_OFFSETS).unwrap().len(), 2);

        let parsed = GeoReference::read(&reader, &mut cursor, ifd).unwrap().unwrap();
        assert_eq!(parsed, geo);
    }

    #[test]
    fn test_float_predictor_is_rejected() {
        let mut builder = GeoTiffBuilder::new(1, 1, SampleType::F64).with_horizontal_predictor();
        builder.add_band(vec![0.0]).unwrap();
        assert!(builder.build().is_err());
    }
}
