//! Asynchronous composite export
//!
//! An `ExportJob` submits a validated `AggregationRequest` to an
//! `ExportBackend` and polls it to completion. `LocalExportBackend` runs
//! the aggregation itself over a TOML catalog of GeoTIFF observations.

mod backend;
mod catalog;
mod job;
mod local_backend;
mod request;

pub use backend::{BackendStatus, ExportBackend};
pub use catalog::{Catalog, Collection, Observation};
pub use job::{ExportJob, JobState, PollPolicy};
pub use local_backend::{LocalExportBackend, MAX_PIXELS};
pub use request::{AggregationRequest, BoundingRect, CalendarDate, ExportSpec, Reducer};
