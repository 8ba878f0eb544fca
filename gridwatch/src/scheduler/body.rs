//! The service-specific job body.
//!
//! The scheduling loop is generic; what a job actually does is supplied by
//! the service through the [`JobBody`] trait. Analysis and collector services
//! each provide one implementation.

use super::job::JobId;
use super::process_log::RunId;
use crate::catalog::CatalogError;
use crate::zonal::ZonalError;
use chrono::{DateTime, Utc};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// One execution request handed to a job body.
#[derive(Debug, Clone, Copy)]
pub struct JobRequest {
    pub job_id: JobId,
    /// The trigger timestamp the execution was enqueued with.
    pub trigger: DateTime<Utc>,
    /// The run record opened for this execution.
    pub run: RunId,
}

/// What a finished run reports back.
#[derive(Debug, Clone, Copy, Default)]
pub struct JobOutcome {
    /// Timestamp of the data produced or consumed; the trigger timestamp is
    /// reported when absent.
    pub data_timestamp: Option<DateTime<Utc>>,
}

impl JobOutcome {
    /// Outcome carrying a data timestamp.
    pub fn at(data_timestamp: DateTime<Utc>) -> Self {
        Self {
            data_timestamp: Some(data_timestamp),
        }
    }

    /// Outcome of a run that produced no data.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Failure of one job run.
///
/// Fails the run only; the scheduling loop logs it and keeps going.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("job {0} has no configuration in the registry")]
    UnknownJob(JobId),

    #[error(transparent)]
    Zonal(#[from] ZonalError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("{0}")]
    Failed(String),
}

/// Boxed future returned by [`JobBody::execute`].
pub type JobFuture<'a> = Pin<Box<dyn Future<Output = Result<JobOutcome, JobError>> + Send + 'a>>;

/// A service-specific job implementation.
///
/// Executed inside a worker slot; the body owns any I/O it needs and reports
/// success or failure synchronously through its returned future. There is no
/// mid-run cancellation: a started body always runs to completion or failure,
/// and timeouts, if desired, are the body's own business.
pub trait JobBody: Send + Sync + 'static {
    /// Short name for logging, like "analysis" or "collector".
    fn name(&self) -> &str;

    fn execute<'a>(&'a self, request: &'a JobRequest) -> JobFuture<'a>;
}
