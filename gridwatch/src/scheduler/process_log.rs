//! Run history reporting.
//!
//! Every job run is reported to a [`ProcessLog`]: `start` opens a run record
//! and hands back its [`RunId`], `done`/`error` close it. The trait keeps the
//! scheduler independent of where run history actually lands; the crate ships
//! a tracing-backed implementation and an in-memory one for tests. Database
//! persistence belongs to the embedding application.

use super::job::JobId;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

/// Identifier of one run record opened by [`ProcessLog::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Failure talking to the run history backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProcessLogError {
    #[error("run history storage failure: {0}")]
    Storage(String),
}

/// Destination of run start/finish records.
///
/// Shared across workers as `Arc<dyn ProcessLog>`; implementations must be
/// safe to call from concurrent runs.
pub trait ProcessLog: Send + Sync {
    /// Opens a run record for a job; the returned id ties the later
    /// `done`/`error` call to this run.
    fn start(&self, job: JobId) -> Result<RunId, ProcessLogError>;

    /// Closes a run as successful, recording the timestamp of the data the
    /// run produced or consumed.
    fn done(&self, run: RunId, data_timestamp: DateTime<Utc>) -> Result<(), ProcessLogError>;

    /// Closes a run as failed with a human-readable reason.
    fn error(&self, run: RunId, description: &str) -> Result<(), ProcessLogError>;
}

/// [`ProcessLog`] backed by the `tracing` subscriber.
///
/// Suitable for deployments where run history only needs to reach the
/// operational log stream.
#[derive(Debug, Default)]
pub struct TracingProcessLog {
    next_run: AtomicU64,
}

impl TracingProcessLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProcessLog for TracingProcessLog {
    fn start(&self, job: JobId) -> Result<RunId, ProcessLogError> {
        let run = RunId(self.next_run.fetch_add(1, Ordering::Relaxed));
        tracing::info!(job = %job, run = %run, "run started");
        Ok(run)
    }

    fn done(&self, run: RunId, data_timestamp: DateTime<Utc>) -> Result<(), ProcessLogError> {
        tracing::info!(run = %run, data_timestamp = %data_timestamp, "run finished");
        Ok(())
    }

    fn error(&self, run: RunId, description: &str) -> Result<(), ProcessLogError> {
        tracing::error!(run = %run, description, "run failed");
        Ok(())
    }
}

/// Final state of a recorded run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Started,
    Done(DateTime<Utc>),
    Error(String),
}

/// One run record kept by [`MemoryProcessLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub run: RunId,
    pub job: JobId,
    pub status: RunStatus,
}

/// In-memory [`ProcessLog`] for tests and diagnostics.
#[derive(Debug, Default)]
pub struct MemoryProcessLog {
    next_run: AtomicU64,
    records: Mutex<Vec<RunRecord>>,
}

impl MemoryProcessLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records, in start order.
    pub fn records(&self) -> Vec<RunRecord> {
        self.records.lock().clone()
    }

    /// The data timestamp of the most recent successful run of a job.
    pub fn last_data_timestamp(&self, job: JobId) -> Option<DateTime<Utc>> {
        self.records
            .lock()
            .iter()
            .rev()
            .find_map(|r| match (&r.status, r.job) {
                (RunStatus::Done(ts), j) if j == job => Some(*ts),
                _ => None,
            })
    }
}

impl ProcessLog for MemoryProcessLog {
    fn start(&self, job: JobId) -> Result<RunId, ProcessLogError> {
        let run = RunId(self.next_run.fetch_add(1, Ordering::Relaxed));
        self.records.lock().push(RunRecord {
            run,
            job,
            status: RunStatus::Started,
        });
        Ok(run)
    }

    fn done(&self, run: RunId, data_timestamp: DateTime<Utc>) -> Result<(), ProcessLogError> {
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|r| r.run == run)
            .ok_or_else(|| ProcessLogError::Storage(format!("unknown run {run}")))?;
        record.status = RunStatus::Done(data_timestamp);
        Ok(())
    }

    fn error(&self, run: RunId, description: &str) -> Result<(), ProcessLogError> {
        let mut records = self.records.lock();
        let record = records
            .iter_mut()
            .find(|r| r.run == run)
            .ok_or_else(|| ProcessLogError::Storage(format!("unknown run {run}")))?;
        record.status = RunStatus::Error(description.to_string());
        Ok(())
    }
}
