//! GeoTIFF to RGB image conversion
//!
//! Chains extraction, normalization and composition for one file or for
//! every TIFF in a directory.

use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::errors::{RasterError, RasterResult};
use crate::extractor::{ChannelExtractor, ChannelSelection};
use crate::render::{ImageComposer, OutputFormat, RangeNormalizer};
use crate::utils::path_utils;

/// Converts multi-band rasters into 8-bit RGB images
#[derive(Debug, Clone, Default)]
pub struct ConversionPipeline {
    channels: ChannelSelection,
}

impl ConversionPipeline {
    pub fn new() -> Self {
        ConversionPipeline::default()
    }

    /// Bands used as red, green and blue (1-indexed)
    pub fn with_channels(mut self, channels: ChannelSelection) -> Self {
        self.channels = channels;
        self
    }

    /// Converts one raster and returns the written image path
    ///
    /// # Arguments
    /// * `source` - Raster path, `.tif` appended when it has no TIFF extension
    /// * `format` - Output format identifier ("png", "jpeg", ...)
    /// * `output_dir` - Directory receiving `<name>.<format>`
    /// * `min`, `max` - Normalization bounds, inferred from the image when `None`
    pub fn convert(
        &self,
        source: &Path,
        format: &str,
        output_dir: &Path,
        min: Option<f64>,
        max: Option<f64>,
    ) -> RasterResult<PathBuf> {
        OutputFormat::parse(format)?;
        let name = path_utils::file_name_root(source);
        info!("Converting {} to {}", source.display(), format);

        let triple = ChannelExtractor::extract(source, self.channels)?;
        let planes = RangeNormalizer::normalize(&triple, min, max)?;
        let image = ImageComposer::compose(&planes)?;
        let output = ImageComposer::write(&image, output_dir, &name, format)?;

        info!("Saved {} to {}", name, output.display());
        Ok(output)
    }

    /// Converts every `.tif`/`.tiff` file of `source_dir` in name order
    ///
    /// Stops at the first failing file; images written before it remain.
    pub fn convert_directory(
        &self,
        source_dir: &Path,
        format: &str,
        output_dir: &Path,
        min: Option<f64>,
        max: Option<f64>,
    ) -> RasterResult<Vec<PathBuf>> {
        OutputFormat::parse(format)?;
        let entries = fs::read_dir(source_dir).map_err(|e| RasterError::SourceNotFound {
            path: source_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut sources = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() && path_utils::has_tiff_extension(&path) {
                sources.push(path);
            }
        }
        sources.sort();
        info!("Found {} rasters in {}", sources.len(), source_dir.display());

        sources.iter()
            .map(|source| self.convert(source, format, output_dir, min, max))
            .collect()
    }
}
