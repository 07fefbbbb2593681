//! Compression handling for TIFF strips and tiles
//!
//! Each supported TIFF compression code maps to a `CompressionHandler`;
//! readers pick one per file through `CompressionFactory`.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod zstd;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::DeflateHandler;
pub use factory::CompressionFactory;
pub use zstd::ZstdHandler;
