//! Pixel layout of a TIFF image
//!
//! Everything the strip and tile readers need to turn raw chunks into band
//! samples, resolved once from the image directory.

use log::debug;

use crate::errors::{RasterError, RasterResult};
use crate::io::SeekableReader;
use crate::tiff::constants::{compression, predictor, sample_format, tags};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::types::{PlanarConfig, SampleType};

#[derive(Debug, Clone, Copy)]
pub struct PixelLayout {
    pub width: usize,
    pub height: usize,
    pub samples_per_pixel: usize,
    pub sample_type: SampleType,
    pub planar: PlanarConfig,
    pub predictor: u16,
    pub compression: u64,
}

impl PixelLayout {
    /// Resolves the layout from the tags of `ifd`
    ///
    /// Mixed bit depths across bands are rejected, as are predictors that
    /// do not apply to the sample type.
    pub fn from_ifd(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> RasterResult<Self> {
        let (width, height) = ifd.get_dimensions().ok_or(RasterError::MissingDimensions)?;
        let samples_per_pixel = ifd.get_samples_per_pixel().max(1) as usize;

        let bits = if ifd.has_tag(tags::BITS_PER_SAMPLE) {
            tiff_reader.read_tag_values(reader, ifd, tags::BITS_PER_SAMPLE)?
        } else {
            vec![1]
        };
        let format = if ifd.has_tag(tags::SAMPLE_FORMAT) {
            tiff_reader.read_tag_values(reader, ifd, tags::SAMPLE_FORMAT)?
        } else {
            vec![sample_format::UNSIGNED as u64]
        };

        let first_bits = bits.first().copied().unwrap_or(1);
        if bits.iter().any(|&b| b != first_bits) {
            return Err(RasterError::GenericError(format!("Mixed bits per sample: {:?}", bits)));
        }
        let first_format = format.first().copied().unwrap_or(sample_format::UNSIGNED as u64);
        let sample_type = SampleType::from_tags(first_bits as u16, first_format as u16)?;

        let predictor_code = ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64) as u16;
        match predictor_code {
            predictor::NONE => {}
            predictor::HORIZONTAL_DIFFERENCING if !sample_type.is_float() => {}
            other => {
                return Err(RasterError::GenericError(format!(
                    "Predictor {} is not supported for {} samples", other, sample_type)));
            }
        }

        let layout = PixelLayout {
            width: width as usize,
            height: height as usize,
            samples_per_pixel,
            sample_type,
            planar: PlanarConfig::from_tag(ifd.get_tag_value(tags::PLANAR_CONFIGURATION).unwrap_or(1)),
            predictor: predictor_code,
            compression: ifd.get_tag_value(tags::COMPRESSION).unwrap_or(compression::NONE as u64),
        };
        debug!("Pixel layout: {:?}", layout);
        Ok(layout)
    }

    /// Samples stored per pixel inside one chunk
    pub fn chunk_stride(&self) -> usize {
        match self.planar {
            PlanarConfig::Chunky => self.samples_per_pixel,
            PlanarConfig::Planar => 1,
        }
    }

    pub fn uses_predictor(&self) -> bool {
        self.predictor == predictor::HORIZONTAL_DIFFERENCING
    }
}
