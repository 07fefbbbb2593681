//! Band extraction from GeoTIFF files
//!
//! Each call opens the file, parses the first image directory, checks the
//! requested band numbers against it and only then touches pixel data.
//! The handle is owned by the call and dropped on every return path.

use log::debug;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::errors::{RasterError, RasterResult};
use crate::tiff::geotags::GeoReference;
use crate::tiff::reader::TiffReader;
use crate::tiff::ifd::IFD;
use crate::utils::path_utils;

use super::layout::PixelLayout;
use super::raster::{ChannelSelection, ChannelTriple, Grid, RasterSource};
use super::strip_reader::StripReader;
use super::tile_reader::TileReader;

/// Read buffer for raster files
const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Parsed directory state of one open raster file
struct OpenRaster {
    file: BufReader<File>,
    tiff_reader: TiffReader,
    ifd: IFD,
    layout: PixelLayout,
    source: RasterSource,
}

/// Reads selected bands of a raster file into memory
pub struct ChannelExtractor;

impl ChannelExtractor {
    /// Describes a raster without reading pixel data
    pub fn inspect(reference: &Path) -> RasterResult<RasterSource> {
        Ok(Self::open(reference)?.source)
    }

    /// Extracts three bands as red, green and blue
    ///
    /// # Arguments
    /// * `reference` - Raster path; `.tif` is appended when no TIFF extension is present
    /// * `selection` - 1-indexed band numbers, (1, 2, 3) by default
    ///
    /// # Errors
    /// `SourceNotFound` if the file cannot be opened or parsed, `ChannelIndex`
    /// if a band number is 0 or exceeds the channel count.
    pub fn extract(reference: &Path, selection: ChannelSelection) -> RasterResult<ChannelTriple> {
        let (source, mut grids) = Self::read_bands(reference, &selection.indices())?;
        debug!("Extracted channels {} from {}", selection, source);

        let blue = grids.pop().ok_or(RasterError::DimensionMismatch)?;
        let green = grids.pop().ok_or(RasterError::DimensionMismatch)?;
        let red = grids.pop().ok_or(RasterError::DimensionMismatch)?;
        ChannelTriple::new(red, green, blue)
    }

    /// Reads an arbitrary list of 1-indexed bands
    pub fn read_bands(reference: &Path, bands: &[usize]) -> RasterResult<(RasterSource, Vec<Grid>)> {
        let mut raster = Self::open(reference)?;
        for &band in bands {
            raster.source.check_channel(band)?;
        }

        let zero_based: Vec<usize> = bands.iter().map(|b| b - 1).collect();
        let samples = if raster.source.tiled {
            TileReader::new(&mut raster.file, &raster.ifd, &raster.tiff_reader, &raster.layout)
                .read_bands(&zero_based)?
        } else {
            StripReader::new(&mut raster.file, &raster.ifd, &raster.tiff_reader, &raster.layout)
                .read_bands(&zero_based)?
        };

        let grids = samples.into_iter()
            .map(|data| Grid::new(raster.source.width, raster.source.height, data))
            .collect::<RasterResult<Vec<_>>>()?;

        Ok((raster.source, grids))
    }

    /// Opens the file and parses everything needed before pixel access
    fn open(reference: &Path) -> RasterResult<OpenRaster> {
        let path = path_utils::ensure_tif_extension(reference);
        let not_found = |reason: String| RasterError::SourceNotFound {
            path: path.display().to_string(),
            reason,
        };

        let file = File::open(&path).map_err(|e| not_found(e.to_string()))?;
        let mut file = BufReader::with_capacity(READ_BUFFER_SIZE, file);

        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.read(&mut file).map_err(|e| not_found(e.to_string()))?;
        let ifd = tiff.main_ifd()
            .cloned()
            .ok_or_else(|| not_found("no image directory".to_string()))?;

        let layout = PixelLayout::from_ifd(&tiff_reader, &mut file, &ifd)?;
        let geo_reference = GeoReference::read(&tiff_reader, &mut file, &ifd)?;

        let source = RasterSource {
            path: PathBuf::from(&path),
            channel_count: layout.samples_per_pixel,
            width: layout.width,
            height: layout.height,
            sample_type: layout.sample_type,
            planar: layout.planar,
            tiled: ifd.is_tiled(),
            compression: layout.compression,
            geo_reference,
        };
        debug!("Opened {}", source);

        Ok(OpenRaster { file, tiff_reader, ifd, layout, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tiff::builder::{ChunkLayout, GeoTiffBuilder};
    use crate::tiff::constants::compression;
    use crate::tiff::types::{PlanarConfig, SampleType};

    fn band(width: usize, height: usize, seed: f64) -> Vec<f64> {
        (0..width * height).map(|i| seed + i as f64).collect()
    }

    fn write_fixture(dir: &Path, name: &str, builder: GeoTiffBuilder) -> PathBuf {
        let path = dir.join(name);
        builder.write(&path).unwrap();
        path
    }

    #[test]
    fn test_planar_tiles_with_predictor() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = GeoTiffBuilder::new(5, 3, SampleType::U16)
            .with_planar(PlanarConfig::Planar)
            .with_layout(ChunkLayout::Tiles { width: 16, height: 16 })
            .with_compression(compression::ZSTD)
            .with_horizontal_predictor();
        for b in 0..4 {
            builder.add_band(band(5, 3, 1000.0 * b as f64)).unwrap();
        }
        let path = write_fixture(dir.path(), "planar.tif", builder);

        let triple = ChannelExtractor::extract(&path, ChannelSelection::new(4, 1, 2)).unwrap();
        assert_eq!(triple.dimensions(), (5, 3));
        assert_eq!(triple.red.data(), band(5, 3, 3000.0).as_slice());
        assert_eq!(triple.green.data(), band(5, 3, 0.0).as_slice());
        assert_eq!(triple.blue.get(4, 2), 1014.0);
    }

    #[test]
    fn test_chunky_strips_with_short_last_strip() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = GeoTiffBuilder::new(3, 5, SampleType::I16)
            .with_layout(ChunkLayout::Strips { rows_per_strip: 2 })
            .with_compression(compression::DEFLATE);
        for b in 0..3 {
            builder.add_band(band(3, 5, -100.0 * b as f64)).unwrap();
        }
        let path = write_fixture(dir.path(), "chunky.tif", builder);

        let triple = ChannelExtractor::extract(&path, ChannelSelection::default()).unwrap();
        assert_eq!(triple.blue.data(), band(3, 5, -200.0).as_slice());
        assert_eq!(triple.red.get(2, 4), 14.0);
    }

    #[test]
    fn test_appends_tif_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = GeoTiffBuilder::new(2, 2, SampleType::F32);
        for _ in 0..3 {
            builder.add_band(vec![0.5; 4]).unwrap();
        }
        write_fixture(dir.path(), "scene.tif", builder);

        let source = ChannelExtractor::inspect(&dir.path().join("scene")).unwrap();
        assert_eq!(source.channel_count, 3);
        assert_eq!(source.sample_type, SampleType::F32);
    }

    #[test]
    fn test_missing_and_unreadable_sources() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ChannelExtractor::extract(&dir.path().join("nope.tif"), ChannelSelection::default());
        assert!(matches!(missing, Err(RasterError::SourceNotFound { .. })));

        let junk = dir.path().join("junk.tif");
        std::fs::write(&junk, b"definitely not a tiff").unwrap();
        let unreadable = ChannelExtractor::extract(&junk, ChannelSelection::default());
        assert!(matches!(unreadable, Err(RasterError::SourceNotFound { .. })));
    }

    #[test]
    fn test_zero_channel_index_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut builder = GeoTiffBuilder::new(1, 1, SampleType::U8);
        builder.add_band(vec![1.0]).unwrap();
        let path = write_fixture(dir.path(), "one.tif", builder);

        let err = ChannelExtractor::extract(&path, ChannelSelection::new(0, 1, 1)).unwrap_err();
        assert!(matches!(err, RasterError::ChannelIndex { requested: 0, available: 1 }));
    }
}
