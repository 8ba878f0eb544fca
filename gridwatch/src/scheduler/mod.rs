//! Process scheduling engine.
//!
//! Every service type shares the same scheduling machinery:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      ServiceCore                          │
//! │  add_to_queue() from timers, loop drains with N workers  │
//! ├──────────────────────────────────────────────────────────┤
//! │  ┌────────────┐  ┌──────────────┐  ┌──────────────────┐  │
//! │  │ JobQueue   │  │ JobBody      │  │ ProcessLog       │  │
//! │  │ dedup+FIFO │  │ per service  │  │ run history      │  │
//! │  └────────────┘  └──────────────┘  └──────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! Per job id the lifecycle is Idle -> Queued -> Running -> Idle. The queue
//! guarantees at most one pending entry and at most one active run per id;
//! a trigger arriving mid-run is remembered and re-queued when the run ends.
//! Jobs assigned to another service instance are filtered out at enqueue
//! time.

mod body;
mod config;
mod job;
mod process_log;
mod queue;
mod service;

pub use body::{JobBody, JobError, JobFuture, JobOutcome, JobRequest};
pub use config::{ServiceConfig, FALLBACK_WORKER_COUNT};
pub use job::{InstanceId, JobId, QueueEntry};
pub use process_log::{
    MemoryProcessLog, ProcessLog, ProcessLogError, RunId, RunRecord, RunStatus, TracingProcessLog,
};
pub use queue::JobQueue;
pub use service::ServiceCore;
