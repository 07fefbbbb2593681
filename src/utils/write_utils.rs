//! File writing utilities
//!
//! Helpers for laying out TIFF data blocks and for publishing output files
//! so that a reader never observes a half-written file.

use log::debug;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::errors::{RasterError, RasterResult};

/// Align an offset to a 4-byte boundary
pub fn align_to_4_bytes(offset: u64) -> u64 {
    let remainder = offset % 4;
    if remainder == 0 {
        offset
    } else {
        offset + (4 - remainder)
    }
}

/// Pads `buffer` with zeros up to the next 4-byte boundary
pub fn pad_to_4_bytes(buffer: &mut Vec<u8>) {
    let aligned = align_to_4_bytes(buffer.len() as u64) as usize;
    buffer.resize(aligned, 0);
}

/// Writes `bytes` to `path` through a sibling temporary file
///
/// Parent directories are created as needed. The destination only appears
/// once the rename succeeds; on failure the temporary file is removed.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> RasterResult<()> {
    let write_error = |reason: String| RasterError::Write {
        path: path.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| write_error(e.to_string()))?;
        }
    }

    let temp_path = temp_path_for(path);
    debug!("Writing {} bytes to {}", bytes.len(), temp_path.display());

    let result = fs::File::create(&temp_path)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&temp_path, path));

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(write_error(e.to_string()));
    }

    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".partial");
    path.with_file_name(name)
}
