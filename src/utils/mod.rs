//! Utility modules for common functionality
//!
//! Low-level TIFF helpers, path and file writing helpers, logging and
//! progress reporting.

pub mod logger;
pub(crate) mod progress;
pub(crate) mod write_utils;
pub(crate) mod ifd_utils;
pub(crate) mod format_utils;
pub(crate) mod tag_utils;
pub(crate) mod sample_utils;
pub(crate) mod image_extraction_utils;
pub mod path_utils;
