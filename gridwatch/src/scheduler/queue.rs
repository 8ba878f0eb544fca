//! The pending-jobs queue and per-job run state.
//!
//! All shared scheduling state lives here, behind one mutex: the FIFO order
//! of first enqueue, the pending trigger per queued job, the set of running
//! jobs, and triggers remembered while their job runs. Callers only get the
//! atomic operations; run state itself is not observable from outside, which
//! is what makes "is this job already queued or running" race-free with the
//! enqueue decision.

use super::job::{InstanceId, JobId, QueueEntry};
use crate::catalog::JobRegistry;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Queued,
    Running,
}

#[derive(Debug, Default)]
struct QueueState {
    /// Job ids in FIFO order of first enqueue. Every id here has a pending
    /// trigger.
    order: VecDeque<JobId>,
    /// Trigger timestamp per queued job; re-enqueues overwrite.
    pending: HashMap<JobId, DateTime<Utc>>,
    /// Jobs currently executing.
    running: HashSet<JobId>,
    /// Triggers that arrived while their job was running; re-queued on
    /// finish, last trigger wins.
    remembered: HashMap<JobId, DateTime<Utc>>,
}

impl QueueState {
    fn run_state(&self, job: JobId) -> RunState {
        if self.running.contains(&job) {
            RunState::Running
        } else if self.pending.contains_key(&job) {
            RunState::Queued
        } else {
            RunState::Idle
        }
    }
}

/// Deduplicated FIFO of pending job executions.
///
/// Holds at most one pending entry per job id and never hands out a job that
/// is already running. Jobs not assigned to this queue's instance are
/// rejected at enqueue time so no queue entries build up for work this
/// process will never run.
pub struct JobQueue {
    instance_id: InstanceId,
    registry: Arc<dyn JobRegistry>,
    state: Mutex<QueueState>,
}

impl JobQueue {
    pub fn new(instance_id: InstanceId, registry: Arc<dyn JobRegistry>) -> Self {
        Self {
            instance_id,
            registry,
            state: Mutex::new(QueueState::default()),
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Requests an execution of `job` for trigger time `trigger`.
    ///
    /// Idempotent per job id: while the job is queued the stored timestamp is
    /// replaced (the FIFO position is kept); while it is running the request
    /// is remembered and re-queued the moment the run finishes. Jobs assigned
    /// to another instance, or unknown to the registry, are silently dropped.
    ///
    /// Returns whether the request was accepted.
    pub fn enqueue(&self, job: JobId, trigger: DateTime<Utc>) -> bool {
        match self.registry.owner_instance(job) {
            Some(owner) if owner == self.instance_id => {}
            Some(owner) => {
                tracing::debug!(
                    job = %job,
                    owner = %owner,
                    instance = %self.instance_id,
                    "job belongs to another instance, dropping trigger"
                );
                return false;
            }
            None => {
                tracing::debug!(job = %job, "unknown job, dropping trigger");
                return false;
            }
        }

        let mut state = self.state.lock();
        match state.run_state(job) {
            RunState::Running => {
                state.remembered.insert(job, trigger);
            }
            RunState::Queued => {
                state.pending.insert(job, trigger);
            }
            RunState::Idle => {
                state.pending.insert(job, trigger);
                state.order.push_back(job);
            }
        }
        true
    }

    /// Takes the next pending entry in FIFO order of first enqueue and marks
    /// it running.
    pub fn dequeue_next(&self) -> Option<QueueEntry> {
        let mut state = self.state.lock();
        let job = state.order.pop_front()?;
        let trigger = state
            .pending
            .remove(&job)
            .expect("queued job always has a pending trigger");
        state.running.insert(job);
        Some(QueueEntry { job_id: job, trigger })
    }

    /// Whether a pending entry exists for `job`.
    pub fn contains(&self, job: JobId) -> bool {
        self.state.lock().pending.contains_key(&job)
    }

    /// Marks a run finished and re-queues a trigger remembered during it.
    ///
    /// Returns true when a remembered trigger was re-queued, so the caller
    /// can wake the scheduling loop.
    pub fn finish(&self, job: JobId) -> bool {
        let mut state = self.state.lock();
        state.running.remove(&job);
        if let Some(trigger) = state.remembered.remove(&job) {
            state.pending.insert(job, trigger);
            state.order.push_back(job);
            true
        } else {
            false
        }
    }

    /// Number of pending entries.
    pub fn len(&self) -> usize {
        self.state.lock().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().order.is_empty()
    }
}

impl std::fmt::Debug for JobQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("JobQueue")
            .field("instance_id", &self.instance_id)
            .field("pending", &state.order.len())
            .field("running", &state.running.len())
            .finish_non_exhaustive()
    }
}
