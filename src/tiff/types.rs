//! Core TIFF data structures

use std::fmt;

use crate::errors::{RasterError, RasterResult};
use crate::tiff::constants::{planar_config, sample_format};
use crate::tiff::ifd::IFD;

/// Represents a TIFF file with its Image File Directories (IFDs)
#[derive(Debug)]
pub struct TIFF {
    /// Image File Directories in the TIFF file
    pub ifds: Vec<IFD>,
    /// Whether this is a BigTIFF format
    pub is_big_tiff: bool,
}

impl TIFF {
    /// Creates a new empty TIFF structure
    pub fn new(is_big_tiff: bool) -> Self {
        TIFF {
            ifds: Vec::new(),
            is_big_tiff,
        }
    }

    /// Returns the main (first) IFD if available
    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    /// Returns the number of IFDs in the TIFF file
    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }
}

/// Numeric type of a single band sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    U16,
    U32,
    I8,
    I16,
    I32,
    F32,
    F64,
}

impl SampleType {
    /// Resolves BitsPerSample + SampleFormat into a sample type
    pub fn from_tags(bits: u16, format: u16) -> RasterResult<Self> {
        match (format, bits) {
            (sample_format::UNSIGNED, 8) => Ok(SampleType::U8),
            (sample_format::UNSIGNED, 16) => Ok(SampleType::U16),
            (sample_format::UNSIGNED, 32) => Ok(SampleType::U32),
            (sample_format::SIGNED, 8) => Ok(SampleType::I8),
            (sample_format::SIGNED, 16) => Ok(SampleType::I16),
            (sample_format::SIGNED, 32) => Ok(SampleType::I32),
            (sample_format::IEEEFP, 32) => Ok(SampleType::F32),
            (sample_format::IEEEFP, 64) => Ok(SampleType::F64),
            _ => Err(RasterError::UnsupportedSampleFormat { bits, format }),
        }
    }

    /// Size of one sample in bytes
    pub fn byte_size(&self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::F64 => 8,
        }
    }

    /// BitsPerSample tag value
    pub fn bits(&self) -> u16 {
        (self.byte_size() * 8) as u16
    }

    /// SampleFormat tag value
    pub fn format_code(&self) -> u16 {
        match self {
            SampleType::U8 | SampleType::U16 | SampleType::U32 => sample_format::UNSIGNED,
            SampleType::I8 | SampleType::I16 | SampleType::I32 => sample_format::SIGNED,
            SampleType::F32 | SampleType::F64 => sample_format::IEEEFP,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }

    /// Wraps an integer sum back into this type's range
    ///
    /// Used when undoing horizontal differencing, which is defined modulo
    /// the sample width. Float types pass through unchanged.
    pub fn wrap(&self, value: i64) -> i64 {
        match self {
            SampleType::U8 => value as u8 as i64,
            SampleType::U16 => value as u16 as i64,
            SampleType::U32 => value as u32 as i64,
            SampleType::I8 => value as i8 as i64,
            SampleType::I16 => value as i16 as i64,
            SampleType::I32 => value as i32 as i64,
            SampleType::F32 | SampleType::F64 => value,
        }
    }
}

impl fmt::Display for SampleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SampleType::U8 => "uint8",
            SampleType::U16 => "uint16",
            SampleType::U32 => "uint32",
            SampleType::I8 => "int8",
            SampleType::I16 => "int16",
            SampleType::I32 => "int32",
            SampleType::F32 => "float32",
            SampleType::F64 => "float64",
        };
        write!(f, "{}", name)
    }
}

/// How band samples are arranged inside strips or tiles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanarConfig {
    /// All bands of a pixel stored together
    Chunky,
    /// Each band stored in its own set of strips or tiles
    Planar,
}

impl PlanarConfig {
    pub fn from_tag(value: u64) -> Self {
        if value as u16 == planar_config::PLANAR {
            PlanarConfig::Planar
        } else {
            PlanarConfig::Chunky
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            PlanarConfig::Chunky => planar_config::CHUNKY,
            PlanarConfig::Planar => planar_config::PLANAR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_type_from_tags() {
        assert_eq!(SampleType::from_tags(16, 1).unwrap(), SampleType::U16);
        assert_eq!(SampleType::from_tags(32, 3).unwrap(), SampleType::F32);
        assert!(SampleType::from_tags(12, 1).is_err());
    }

    #[test]
    fn test_wrap_is_modular() {
        assert_eq!(SampleType::U8.wrap(300), 44);
        assert_eq!(SampleType::I16.wrap(40000), 40000 - 65536);
    }
}
