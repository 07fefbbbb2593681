//! RGB composition and encoding
//!
//! Interleaves three normalized planes into an `RgbImage`, encodes it fully
//! in memory and only then publishes the file.

use image::{GrayImage, ImageFormat, Rgb, RgbImage};
use log::debug;
use std::fmt;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use crate::errors::{RasterError, RasterResult};
use crate::utils::{format_utils, write_utils};

/// Image containers the composer can write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Bmp,
    Tiff,
    Gif,
    Tga,
}

impl OutputFormat {
    /// Parses a format identifier such as "png" or "JPG" (case-insensitive)
    pub fn parse(identifier: &str) -> RasterResult<Self> {
        match identifier.to_ascii_lowercase().as_str() {
            "png" => Ok(OutputFormat::Png),
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "bmp" => Ok(OutputFormat::Bmp),
            "tiff" | "tif" => Ok(OutputFormat::Tiff),
            "gif" => Ok(OutputFormat::Gif),
            "tga" => Ok(OutputFormat::Tga),
            _ => Err(RasterError::UnsupportedFormat(identifier.to_string())),
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Png => ImageFormat::Png,
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Bmp => ImageFormat::Bmp,
            OutputFormat::Tiff => ImageFormat::Tiff,
            OutputFormat::Gif => ImageFormat::Gif,
            OutputFormat::Tga => ImageFormat::Tga,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Png => "PNG",
            OutputFormat::Jpeg => "JPEG",
            OutputFormat::Bmp => "BMP",
            OutputFormat::Tiff => "TIFF",
            OutputFormat::Gif => "GIF",
            OutputFormat::Tga => "TGA",
        };
        write!(f, "{}", name)
    }
}

/// Builds and writes RGB images
pub struct ImageComposer;

impl ImageComposer {
    /// Interleaves red, green and blue planes into one RGB image
    pub fn compose(channels: &[GrayImage; 3]) -> RasterResult<RgbImage> {
        let [red, green, blue] = channels;
        if red.dimensions() != green.dimensions() || red.dimensions() != blue.dimensions() {
            return Err(RasterError::DimensionMismatch);
        }

        let (width, height) = red.dimensions();
        Ok(RgbImage::from_fn(width, height, |x, y| {
            Rgb([red.get_pixel(x, y)[0], green.get_pixel(x, y)[0], blue.get_pixel(x, y)[0]])
        }))
    }

    /// Encodes `image` into the requested container, in memory
    pub fn encode(image: &RgbImage, format: OutputFormat) -> Result<Vec<u8>, image::ImageError> {
        let mut cursor = Cursor::new(Vec::new());
        image.write_to(&mut cursor, format.image_format())?;
        Ok(cursor.into_inner())
    }

    /// Writes `image` to `<output_dir>/<name>.<format>`
    ///
    /// The extension is the format identifier as given, lowercased. The
    /// directory is created if needed. Returns the written path.
    ///
    /// # Errors
    /// `UnsupportedFormat` for unknown identifiers (nothing is created),
    /// `Write` for encoding or filesystem failures.
    pub fn write(image: &RgbImage, output_dir: &Path, name: &str, format: &str) -> RasterResult<PathBuf> {
        let output_format = OutputFormat::parse(format)?;
        let path = output_dir.join(format!("{}.{}", name, format.to_ascii_lowercase()));

        let bytes = Self::encode(image, output_format).map_err(|e| RasterError::Write {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!("Encoded {}x{} {} image ({})", image.width(), image.height(), output_format,
               format_utils::format_size(bytes.len() as u64));

        write_utils::write_atomic(&path, &bytes)?;
        Ok(path)
    }
}
