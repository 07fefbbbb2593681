pub mod errors;
pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod extractor;
pub mod render;
pub mod masking;
pub mod export;
pub mod pipeline;
pub mod commands;

pub use errors::{RasterError, RasterResult};
pub use tiff::TiffReader;
pub use extractor::{ChannelExtractor, ChannelSelection, ChannelTriple, Grid, RasterSource};
pub use render::{ImageComposer, NormalizationRange, OutputFormat, RangeNormalizer};
pub use masking::{DatasetMaskRegistry, MaskFunction, PreFilter};
pub use export::{ExportBackend, ExportJob, ExportSpec, JobState, LocalExportBackend, PollPolicy};
pub use pipeline::ConversionPipeline;
