//! Export job lifecycle
//!
//! A job moves `Submitted -> Active* -> Completed | Failed`. Once terminal it
//! is never queried or mutated again.

use log::{debug, info};
use std::fmt;
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use crate::errors::{RasterError, RasterResult};
use crate::masking::DatasetMaskRegistry;

use super::backend::{BackendStatus, ExportBackend};
use super::request::{AggregationRequest, ExportSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Submitted,
    Active,
    Completed,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobState::Submitted => "SUBMITTED",
            JobState::Active => "ACTIVE",
            JobState::Completed => "COMPLETED",
            JobState::Failed => "FAILED",
        };
        write!(f, "{}", name)
    }
}

/// How `ExportJob::wait` polls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// `None` waits for as long as the job stays active
    pub timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        PollPolicy {
            interval: Duration::from_secs(1),
            timeout: None,
        }
    }
}

impl PollPolicy {
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A submitted export and what is known about its progress
#[derive(Debug, Clone)]
pub struct ExportJob {
    id: String,
    request: AggregationRequest,
    state: JobState,
    status_checks: usize,
    failure_reason: Option<String>,
}

impl ExportJob {
    /// Validates `spec`, resolves its masking rules and submits it
    ///
    /// Returns a job in the `Submitted` state carrying the backend id.
    pub fn submit(backend: &dyn ExportBackend, spec: ExportSpec, registry: &DatasetMaskRegistry) -> RasterResult<Self> {
        let request = spec.into_request(registry)?;
        let id = backend.submit(&request)?;
        info!("Working on export task (id: {}) on {} backend", id, backend.name());
        debug!("Export {}: {} {}..{} bands {:?} region {} at {} m/px, {}, {}",
               id, request.dataset, request.start, request.end, request.bands,
               request.region, request.scale, request.pre_filter, request.mask);

        Ok(ExportJob {
            id,
            request,
            state: JobState::Submitted,
            status_checks: 0,
            failure_reason: None,
        })
    }

    /// Queries the backend once, unless the job is already terminal
    pub fn refresh(&mut self, backend: &dyn ExportBackend) -> RasterResult<JobState> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }

        let status = backend.status(&self.id)?;
        self.status_checks += 1;
        self.state = match status {
            BackendStatus::Active => JobState::Active,
            BackendStatus::Completed => JobState::Completed,
            BackendStatus::Failed(reason) => {
                self.failure_reason = reason;
                JobState::Failed
            }
        };
        debug!("Export {} is {} after {} checks", self.id, self.state, self.status_checks);
        Ok(self.state)
    }

    /// Blocks until the job completes
    ///
    /// # Errors
    /// `ExportFailed` when the backend reports failure, `ExportTimeout` when
    /// the policy's timeout elapses first. Backend query errors propagate.
    pub fn wait(&mut self, backend: &dyn ExportBackend, policy: &PollPolicy) -> RasterResult<()> {
        let started = Instant::now();
        loop {
            match self.refresh(backend)? {
                JobState::Completed => {
                    info!("Export complete. File available at /{}", self.output_name().display());
                    return Ok(());
                }
                JobState::Failed => {
                    return Err(RasterError::ExportFailed {
                        job_id: self.id.clone(),
                        reason: self.failure_reason.clone(),
                    });
                }
                JobState::Submitted | JobState::Active => {}
            }

            if let Some(timeout) = policy.timeout {
                if started.elapsed() >= timeout {
                    return Err(RasterError::ExportTimeout {
                        job_id: self.id.clone(),
                        waited_secs: started.elapsed().as_secs(),
                    });
                }
            }
            thread::sleep(policy.interval);
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn status_checks(&self) -> usize {
        self.status_checks
    }

    pub fn failure_reason(&self) -> Option<&str> {
        self.failure_reason.as_deref()
    }

    pub fn request(&self) -> &AggregationRequest {
        &self.request
    }

    /// `<folder>/<description>.tif` in backend storage
    pub fn output_name(&self) -> PathBuf {
        self.request.output_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::request::BoundingRect;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    struct ScriptedBackend {
        statuses: RefCell<VecDeque<BackendStatus>>,
        queries: RefCell<usize>,
    }

    impl ScriptedBackend {
        fn new(statuses: Vec<BackendStatus>) -> Self {
            ScriptedBackend {
                statuses: RefCell::new(statuses.into()),
                queries: RefCell::new(0),
            }
        }
    }

    impl ExportBackend for ScriptedBackend {
        fn submit(&self, _request: &AggregationRequest) -> RasterResult<String> {
            Ok("scripted-1".to_string())
        }

        fn status(&self, _job_id: &str) -> RasterResult<BackendStatus> {
            *self.queries.borrow_mut() += 1;
            let mut statuses = self.statuses.borrow_mut();
            let next = statuses.pop_front().unwrap_or(BackendStatus::Active);
            if statuses.is_empty() {
                statuses.push_back(next.clone());
            }
            Ok(next)
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn spec() -> ExportSpec {
        ExportSpec {
            dataset: "USDA/NAIP/DOQQ".to_string(),
            bands: vec!["R".to_string(), "G".to_string(), "B".to_string()],
            start: "2017-01-01".to_string(),
            end: "2018-12-31".to_string(),
            region: BoundingRect::new(0.0, 0.0, 1.0, 1.0),
            scale: 30.0,
            folder: "out".to_string(),
            description: "scene".to_string(),
        }
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let backend = ScriptedBackend::new(vec![BackendStatus::Completed, BackendStatus::Failed(None)]);
        let mut job = ExportJob::submit(&backend, spec(), &DatasetMaskRegistry::default()).unwrap();
        assert_eq!(job.state(), JobState::Submitted);

        assert_eq!(job.refresh(&backend).unwrap(), JobState::Completed);
        assert_eq!(job.refresh(&backend).unwrap(), JobState::Completed);
        assert_eq!(job.status_checks(), 1);
        assert_eq!(*backend.queries.borrow(), 1);
    }

    #[test]
    fn test_failure_reason_is_kept() {
        let backend = ScriptedBackend::new(vec![BackendStatus::Active, BackendStatus::Failed(Some("quota".to_string()))]);
        let mut job = ExportJob::submit(&backend, spec(), &DatasetMaskRegistry::default()).unwrap();
        let policy = PollPolicy::default().with_interval(Duration::ZERO);

        let err = job.wait(&backend, &policy).unwrap_err();
        assert!(matches!(err, RasterError::ExportFailed { ref job_id, reason: Some(ref r) } if job_id == "scripted-1" && r == "quota"));
        assert_eq!(job.failure_reason(), Some("quota"));
    }

    #[test]
    fn test_invalid_spec_is_not_submitted() {
        let backend = ScriptedBackend::new(vec![]);
        let mut invalid = spec();
        invalid.scale = -1.0;
        assert!(ExportJob::submit(&backend, invalid, &DatasetMaskRegistry::default()).is_err());
    }
}
