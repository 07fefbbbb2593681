//! Error types shared by the conversion pipeline and the export protocol

use std::fmt;
use std::io;

/// Errors raised while reading rasters, rendering images or running exports
#[derive(Debug)]
pub enum RasterError {
    /// Source raster is missing or cannot be opened
    SourceNotFound { path: String, reason: String },
    /// Requested band is outside 1..=available
    ChannelIndex { requested: usize, available: usize },
    /// Unknown output image container
    UnsupportedFormat(String),
    /// Filesystem failure while writing output
    Write { path: String, reason: String },
    /// Remote job terminated in the FAILED state
    ExportFailed { job_id: String, reason: Option<String> },
    /// Bounded wait gave up before the job reached a terminal state
    ExportTimeout { job_id: String, waited_secs: u64 },
    /// Explicit normalization bounds with min > max
    InvalidRange { min: f64, max: f64 },
    /// Channel grids do not share the same width and height
    DimensionMismatch,
    /// Export request failed validation
    InvalidRequest(String),
    /// I/O error
    IoError(io::Error),
    /// Invalid byte order marker
    InvalidByteOrder(u16),
    /// Invalid BigTIFF header
    InvalidBigTIFFHeader,
    /// Unsupported TIFF version
    UnsupportedVersion(u16),
    /// Tag not found
    TagNotFound(u16),
    /// Unsupported field type
    UnsupportedFieldType(u16),
    /// Unsupported compression method
    UnsupportedCompression(u64),
    /// Bits per sample / sample format combination we cannot decode
    UnsupportedSampleFormat { bits: u16, format: u16 },
    /// Image dimensions not found
    MissingDimensions,
    /// Generic error with message
    GenericError(String),
}

impl fmt::Display for RasterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RasterError::SourceNotFound { path, reason } =>
                write!(f, "Source raster not found: {} ({})", path, reason),
            RasterError::ChannelIndex { requested, available } =>
                write!(f, "Channel index {} out of range (raster has {} channels)", requested, available),
            RasterError::UnsupportedFormat(format) => write!(f, "Unsupported output format: {}", format),
            RasterError::Write { path, reason } => write!(f, "Failed to write {}: {}", path, reason),
            RasterError::ExportFailed { job_id, reason } => match reason {
                Some(reason) => write!(f, "Export job {} failed: {}", job_id, reason),
                None => write!(f, "Export job {} failed", job_id),
            },
            RasterError::ExportTimeout { job_id, waited_secs } =>
                write!(f, "Export job {} still running after {}s", job_id, waited_secs),
            RasterError::InvalidRange { min, max } =>
                write!(f, "Invalid normalization range: min {} is greater than max {}", min, max),
            RasterError::DimensionMismatch => write!(f, "Channel grids have different dimensions"),
            RasterError::InvalidRequest(msg) => write!(f, "Invalid export request: {}", msg),
            RasterError::IoError(e) => write!(f, "I/O error: {}", e),
            RasterError::InvalidByteOrder(v) => write!(f, "Invalid byte order marker: {:#06x}", v),
            RasterError::InvalidBigTIFFHeader => write!(f, "Invalid BigTIFF header"),
            RasterError::UnsupportedVersion(v) => write!(f, "Unsupported TIFF version: {}", v),
            RasterError::TagNotFound(tag) => write!(f, "Tag not found: {}", tag),
            RasterError::UnsupportedFieldType(ft) => write!(f, "Unsupported field type: {}", ft),
            RasterError::UnsupportedCompression(c) => write!(f, "Unsupported compression method: {}", c),
            RasterError::UnsupportedSampleFormat { bits, format } =>
                write!(f, "Unsupported sample layout: {} bits, sample format {}", bits, format),
            RasterError::MissingDimensions => write!(f, "Image dimensions not found"),
            RasterError::GenericError(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for RasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RasterError::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for RasterError {
    fn from(error: io::Error) -> Self {
        RasterError::IoError(error)
    }
}

impl From<String> for RasterError {
    fn from(msg: String) -> Self {
        RasterError::GenericError(msg)
    }
}

/// Result type for raster and export operations
pub type RasterResult<T> = Result<T, RasterError>;
