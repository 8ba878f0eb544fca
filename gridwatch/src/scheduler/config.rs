//! Service configuration.

use super::job::InstanceId;
use serde::{Deserialize, Serialize};

/// Worker count used when hardware detection fails.
pub const FALLBACK_WORKER_COUNT: usize = 4;

/// Configuration of one service instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Which partition of the job catalog this process executes.
    pub instance_id: InstanceId,

    /// Upper bound on simultaneously running jobs.
    ///
    /// Zero means "detect": the number of workers follows the hardware's
    /// available parallelism, falling back to [`FALLBACK_WORKER_COUNT`] when
    /// detection fails.
    #[serde(default)]
    pub worker_count: usize,
}

impl ServiceConfig {
    pub fn new(instance_id: InstanceId) -> Self {
        Self {
            instance_id,
            worker_count: 0,
        }
    }

    pub fn with_workers(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count;
        self
    }

    /// The worker bound actually applied, never zero.
    pub fn effective_worker_count(&self) -> usize {
        if self.worker_count > 0 {
            return self.worker_count;
        }
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(FALLBACK_WORKER_COUNT)
    }
}
