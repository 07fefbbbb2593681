//! Export backend seam

use std::path::PathBuf;

use crate::errors::RasterResult;

use super::request::AggregationRequest;

/// Status reported by a backend for one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendStatus {
    /// Queued or running
    Active,
    Completed,
    /// Finished unsuccessfully, with the backend's reason when it gives one
    Failed(Option<String>),
}

/// A service that runs aggregation exports asynchronously
pub trait ExportBackend {
    /// Queues `request` and returns the backend job id
    fn submit(&self, request: &AggregationRequest) -> RasterResult<String>;

    /// One non-blocking status query
    fn status(&self, job_id: &str) -> RasterResult<BackendStatus>;

    /// Local path of a completed export, for backends with local storage
    fn local_output(&self, _job_id: &str) -> Option<PathBuf> {
        None
    }

    fn name(&self) -> &str;
}
