//! Sample encoding and predictor helpers
//!
//! Pixel samples travel through the crate as `f64`. These helpers move them
//! in and out of their on-disk representation and apply or undo TIFF
//! horizontal differencing (Predictor = 2).

use crate::tiff::types::SampleType;

/// Appends one sample to `out` in little-endian byte order
///
/// Out-of-range values saturate; NaN becomes 0 for integer types.
pub fn encode_sample_le(value: f64, sample_type: SampleType, out: &mut Vec<u8>) {
    match sample_type {
        SampleType::U8 => out.push(value as u8),
        SampleType::I8 => out.push(value as i8 as u8),
        SampleType::U16 => out.extend_from_slice(&(value as u16).to_le_bytes()),
        SampleType::I16 => out.extend_from_slice(&(value as i16).to_le_bytes()),
        SampleType::U32 => out.extend_from_slice(&(value as u32).to_le_bytes()),
        SampleType::I32 => out.extend_from_slice(&(value as i32).to_le_bytes()),
        SampleType::F32 => out.extend_from_slice(&(value as f32).to_le_bytes()),
        SampleType::F64 => out.extend_from_slice(&value.to_le_bytes()),
    }
}

/// Reverses horizontal differencing in place
///
/// `samples` holds whole rows of `row_len` samples each; `stride` is the
/// number of samples per pixel inside the chunk.
pub fn undo_horizontal_differencing(samples: &mut [f64], row_len: usize, stride: usize, sample_type: SampleType) {
    if row_len == 0 || stride == 0 {
        return;
    }
    for row in samples.chunks_mut(row_len) {
        for i in stride..row.len() {
            let sum = row[i] as i64 + row[i - stride] as i64;
            row[i] = sample_type.wrap(sum) as f64;
        }
    }
}

/// Applies horizontal differencing in place, the inverse of
/// [`undo_horizontal_differencing`]
pub fn apply_horizontal_differencing(samples: &mut [f64], row_len: usize, stride: usize, sample_type: SampleType) {
    if row_len == 0 || stride == 0 {
        return;
    }
    for row in samples.chunks_mut(row_len) {
        for i in (stride..row.len()).rev() {
            let diff = row[i] as i64 - row[i - stride] as i64;
            row[i] = sample_type.wrap(diff) as f64;
        }
    }
}
