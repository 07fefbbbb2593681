//! Per-pixel quality masks

use log::debug;
use std::fmt;

use crate::errors::{RasterError, RasterResult};
use crate::extractor::Grid;

/// Per-pixel validity rule applied to one observation
#[derive(Debug, Clone, PartialEq)]
pub enum MaskFunction {
    /// Every pixel is valid and values are left unchanged
    Identity,
    /// A pixel is valid when none of `bits` is set in the `qa_band` sample;
    /// surviving values are divided by `scale_divisor`
    QaBitmask { qa_band: String, bits: Vec<u8>, scale_divisor: f64 },
}

/// Observation bands after masking
#[derive(Debug, Clone)]
pub struct MaskedBands {
    pub bands: Vec<Grid>,
    /// Row-major validity shared by all bands
    pub valid: Vec<bool>,
}

impl MaskedBands {
    pub fn is_valid(&self, index: usize) -> bool {
        self.valid.get(index).copied().unwrap_or(false)
    }

    pub fn valid_count(&self) -> usize {
        self.valid.iter().filter(|v| **v).count()
    }
}

impl MaskFunction {
    /// The S2 cloud mask: QA60 bits 10 (opaque cloud) and 11 (cirrus), reflectance scaled by 10000
    pub fn sentinel2_clouds() -> Self {
        MaskFunction::QaBitmask {
            qa_band: "QA60".to_string(),
            bits: vec![10, 11],
            scale_divisor: 10000.0,
        }
    }

    /// Extra band the mask needs read alongside the selected ones
    pub fn required_band(&self) -> Option<&str> {
        match self {
            MaskFunction::Identity => None,
            MaskFunction::QaBitmask { qa_band, .. } => Some(qa_band),
        }
    }

    /// Applies the mask to one observation
    ///
    /// # Arguments
    /// * `bands` - Selected bands, all of the same size
    /// * `qa` - The band named by `required_band`, when there is one
    pub fn apply(&self, bands: Vec<Grid>, qa: Option<&Grid>) -> RasterResult<MaskedBands> {
        let dimensions = match bands.first() {
            Some(first) => first.dimensions(),
            None => return Err(RasterError::InvalidRequest("no bands to mask".to_string())),
        };
        if bands.iter().any(|b| b.dimensions() != dimensions) {
            return Err(RasterError::DimensionMismatch);
        }
        let pixel_count = dimensions.0 * dimensions.1;

        match self {
            MaskFunction::Identity => Ok(MaskedBands {
                bands,
                valid: vec![true; pixel_count],
            }),
            MaskFunction::QaBitmask { qa_band, bits, scale_divisor } => {
                let qa = qa.ok_or_else(|| RasterError::InvalidRequest(
                    format!("mask needs the '{}' band", qa_band)))?;
                if qa.dimensions() != dimensions {
                    return Err(RasterError::DimensionMismatch);
                }

                let flags = bits.iter().fold(0u64, |acc, bit| acc | (1u64 << bit));
                let valid: Vec<bool> = qa.data().iter()
                    .map(|&sample| !sample.is_nan() && (sample as u64) & flags == 0)
                    .collect();

                let bands = bands.into_iter()
                    .map(|band| {
                        let (width, height) = band.dimensions();
                        let scaled = band.into_data().into_iter().map(|v| v / scale_divisor).collect();
                        Grid::new(width, height, scaled)
                    })
                    .collect::<RasterResult<Vec<_>>>()?;

                let masked = MaskedBands { bands, valid };
                debug!("{} kept {} of {} pixels", self, masked.valid_count(), pixel_count);
                Ok(masked)
            }
        }
    }
}

impl fmt::Display for MaskFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MaskFunction::Identity => write!(f, "identity mask"),
            MaskFunction::QaBitmask { qa_band, bits, scale_divisor } => {
                write!(f, "{} bitmask {:?} (/{})", qa_band, bits, scale_divisor)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel2_mask_excludes_cloud_and_cirrus() {
        let qa = Grid::new(4, 1, vec![0.0, 1024.0, 2048.0, 512.0]).unwrap();
        let band = Grid::new(4, 1, vec![10000.0, 5000.0, 2500.0, 1500.0]).unwrap();

        let masked = MaskFunction::sentinel2_clouds().apply(vec![band], Some(&qa)).unwrap();
        assert_eq!(masked.valid, vec![true, false, false, true]);
        assert_eq!(masked.bands[0].data(), &[1.0, 0.5, 0.25, 0.15]);
    }

    #[test]
    fn test_identity_keeps_everything() {
        let band = Grid::new(2, 1, vec![3.0, 4.0]).unwrap();
        let masked = MaskFunction::Identity.apply(vec![band], None).unwrap();
        assert_eq!(masked.valid_count(), 2);
        assert_eq!(masked.bands[0].data(), &[3.0, 4.0]);
    }

    #[test]
    fn test_missing_qa_band_is_an_error() {
        let band = Grid::new(1, 1, vec![1.0]).unwrap();
        let err = MaskFunction::sentinel2_clouds().apply(vec![band], None).unwrap_err();
        assert!(matches!(err, RasterError::InvalidRequest(_)));
    }
}
