//! Dataset-specific quality masking
//!
//! Datasets are grouped into families by id pattern. Each family carries a
//! pre-filter applied to whole observations and a per-pixel mask applied
//! before aggregation.

mod filters;
mod masks;
mod registry;

pub use filters::PreFilter;
pub use masks::{MaskFunction, MaskedBands};
pub use registry::{DatasetFamily, DatasetMaskRegistry};
