//! End-to-end conversion of GeoTIFF fixtures into RGB images

use std::fs;
use std::path::{Path, PathBuf};

use rasterfetch::tiff::constants::compression;
use rasterfetch::tiff::{ChunkLayout, GeoTiffBuilder, PlanarConfig, SampleType};
use rasterfetch::{ChannelExtractor, ChannelSelection, ConversionPipeline, RasterError};

/// 4x4 band whose quadrants hold `[[a, b], [c, d]]`
fn quadrants(a: f64, b: f64, c: f64, d: f64) -> Vec<f64> {
    (0..16)
        .map(|i| {
            let (x, y) = (i % 4, i / 4);
            match (x < 2, y < 2) {
                (true, true) => a,
                (false, true) => b,
                (true, false) => c,
                (false, false) => d,
            }
        })
        .collect()
}

fn four_band_fixture(dir: &Path) -> PathBuf {
    let mut builder = GeoTiffBuilder::new(4, 4, SampleType::U16)
        .with_planar(PlanarConfig::Planar)
        .with_compression(compression::DEFLATE);
    builder.add_band(quadrants(0.0, 50.0, 100.0, 150.0)).unwrap();
    builder.add_band(quadrants(150.0, 100.0, 50.0, 0.0)).unwrap();
    builder.add_band(quadrants(75.0, 75.0, 75.0, 75.0)).unwrap();
    builder.add_band(quadrants(1.0, 2.0, 3.0, 4.0)).unwrap();

    let path = dir.join("quad.tif");
    builder.write(&path).unwrap();
    path
}

#[test]
fn test_four_band_scenario_scales_linearly() {
    let dir = tempfile::tempdir().unwrap();
    let source = four_band_fixture(dir.path());
    let out = dir.path().join("out");

    let written = ConversionPipeline::new()
        .convert(&source, "png", &out, Some(0.0), Some(150.0))
        .unwrap();
    assert_eq!(written, out.join("quad.png"));

    let image = image::open(&written).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (4, 4));
    let red: Vec<u8> = [(0, 0), (2, 0), (0, 2), (2, 2)].iter().map(|&(x, y)| image.get_pixel(x, y)[0]).collect();
    assert_eq!(red, vec![0, 85, 170, 255]);
    assert_eq!(image.get_pixel(3, 3).0, [255, 0, 128]);
}

#[test]
fn test_custom_channels_and_inferred_range() {
    let dir = tempfile::tempdir().unwrap();
    let source = four_band_fixture(dir.path());

    let written = ConversionPipeline::new()
        .with_channels(ChannelSelection::new(4, 4, 4))
        .convert(&source, "bmp", &dir.path().join("out"), None, None)
        .unwrap();

    let image = image::open(&written).unwrap().to_rgb8();
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
    assert_eq!(image.get_pixel(3, 3).0, [255, 255, 255]);
    assert_eq!(image.get_pixel(3, 0).0, [85, 85, 85]);
}

#[test]
fn test_out_of_range_channel_fails_before_pixel_data() {
    let dir = tempfile::tempdir().unwrap();
    let mut builder = GeoTiffBuilder::new(4, 4, SampleType::U8)
        .with_compression(compression::DEFLATE);
    for b in 0..3 {
        builder.add_band(vec![b as f64; 16]).unwrap();
    }
    let path = dir.path().join("three.tif");
    builder.write(&path).unwrap();

    // Chunk data starts right after the 8-byte header
    let mut bytes = fs::read(&path).unwrap();
    bytes[8..12].copy_from_slice(&[0xFF; 4]);
    fs::write(&path, &bytes).unwrap();

    let err = ChannelExtractor::extract(&path, ChannelSelection::new(1, 2, 5)).unwrap_err();
    assert!(matches!(err, RasterError::ChannelIndex { requested: 5, available: 3 }));

    let corrupt = ChannelExtractor::extract(&path, ChannelSelection::default()).unwrap_err();
    assert!(!matches!(corrupt, RasterError::ChannelIndex { .. }));
}

#[test]
fn test_unknown_format_leaves_no_output() {
    let dir = tempfile::tempdir().unwrap();
    let source = four_band_fixture(dir.path());
    let out = dir.path().join("out");

    let err = ConversionPipeline::new().convert(&source, "xcf", &out, None, None).unwrap_err();
    assert!(matches!(err, RasterError::UnsupportedFormat(_)));
    assert!(!out.exists());
}

#[test]
fn test_inverted_range_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let source = four_band_fixture(dir.path());

    let err = ConversionPipeline::new()
        .convert(&source, "png", &dir.path().join("out"), Some(10.0), Some(1.0))
        .unwrap_err();
    assert!(matches!(err, RasterError::InvalidRange { .. }));
}

#[test]
fn test_directory_conversion_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("rasters");
    fs::create_dir_all(&sources).unwrap();

    for (name, value) in [("b.tiff", 20.0), ("a.tif", 10.0)] {
        let mut builder = GeoTiffBuilder::new(2, 2, SampleType::F32)
            .with_layout(ChunkLayout::Tiles { width: 16, height: 16 });
        for _ in 0..3 {
            builder.add_band(vec![value; 4]).unwrap();
        }
        builder.write(&sources.join(name)).unwrap();
    }
    fs::write(sources.join("notes.txt"), "not a raster").unwrap();

    let out = dir.path().join("out");
    let written = ConversionPipeline::new()
        .convert_directory(&sources, "png", &out, Some(0.0), Some(20.0))
        .unwrap();
    assert_eq!(written, vec![out.join("a.png"), out.join("b.png")]);

    let first = image::open(&written[0]).unwrap().to_rgb8();
    assert_eq!(first.get_pixel(0, 0).0, [128, 128, 128]);
}

#[test]
fn test_directory_conversion_stops_at_first_error() {
    let dir = tempfile::tempdir().unwrap();
    let sources = dir.path().join("rasters");
    fs::create_dir_all(&sources).unwrap();
    fs::write(sources.join("a.tif"), b"broken").unwrap();

    let mut builder = GeoTiffBuilder::new(1, 1, SampleType::U8);
    for _ in 0..3 {
        builder.add_band(vec![1.0]).unwrap();
    }
    builder.write(&sources.join("b.tif")).unwrap();

    let out = dir.path().join("out");
    let err = ConversionPipeline::new().convert_directory(&sources, "png", &out, None, None).unwrap_err();
    assert!(matches!(err, RasterError::SourceNotFound { .. }));
    assert!(!out.join("b.png").exists());
}
