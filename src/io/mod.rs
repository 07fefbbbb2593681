//! I/O utilities for raster file handling
//!
//! Byte-order aware readers used by the TIFF directory parser and the
//! band decoders.

pub mod byte_order;

use std::io::{Read, Seek};

/// Trait for readers that can both read and seek
///
/// Files, buffered files and in-memory cursors all satisfy this, so the
/// TIFF reader can be exercised without touching the filesystem.
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
