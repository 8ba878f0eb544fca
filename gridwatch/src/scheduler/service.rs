//! The scheduling and execution loop.
//!
//! [`ServiceCore`] owns the loop every service type shares: triggers enqueue
//! job ids, a bounded pool of workers drains the queue honoring one active
//! run per job id, and every run is reported to the injected process log.
//! The service-specific work itself is the injected [`JobBody`].

use super::body::{JobBody, JobRequest};
use super::config::ServiceConfig;
use super::job::{JobId, QueueEntry};
use super::process_log::ProcessLog;
use super::queue::JobQueue;
use crate::catalog::JobRegistry;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

struct ServiceInner {
    config: ServiceConfig,
    queue: Arc<JobQueue>,
    body: Arc<dyn JobBody>,
    process_log: Arc<dyn ProcessLog>,
    work_notify: Notify,
    shutdown: CancellationToken,
    workers: Arc<Semaphore>,
    tracker: TaskTracker,
    started: AtomicBool,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
}

/// Scheduling engine shared by collector, analysis and view services.
///
/// Cloning is cheap and clones drive the same loop; timers and external
/// event sources keep a clone to call [`add_to_queue`](Self::add_to_queue).
#[derive(Clone)]
pub struct ServiceCore {
    inner: Arc<ServiceInner>,
}

impl ServiceCore {
    pub fn new(
        config: ServiceConfig,
        registry: Arc<dyn JobRegistry>,
        body: Arc<dyn JobBody>,
        process_log: Arc<dyn ProcessLog>,
    ) -> Self {
        let workers = config.effective_worker_count();
        let queue = Arc::new(JobQueue::new(config.instance_id, registry));
        Self {
            inner: Arc::new(ServiceInner {
                config,
                queue,
                body,
                process_log,
                work_notify: Notify::new(),
                shutdown: CancellationToken::new(),
                workers: Arc::new(Semaphore::new(workers)),
                tracker: TaskTracker::new(),
                started: AtomicBool::new(false),
                loop_handle: Mutex::new(None),
            }),
        }
    }

    /// The queue this service drains. Exposes only the queue's atomic
    /// operations; run state stays internal to it.
    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.inner.queue
    }

    /// Starts the scheduling loop on the current tokio runtime.
    ///
    /// Calling `start` a second time is a no-op reported in the log, not an
    /// error.
    pub fn start(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            tracing::warn!(
                instance = %self.inner.config.instance_id,
                "service already started"
            );
            return;
        }
        let inner = Arc::clone(&self.inner);
        let handle = tokio::spawn(run_loop(inner));
        *self.inner.loop_handle.lock() = Some(handle);
        tracing::info!(
            instance = %self.inner.config.instance_id,
            workers = self.inner.config.effective_worker_count(),
            body = self.inner.body.name(),
            "service started"
        );
    }

    /// Stops accepting new dequeues and waits for the loop and all in-flight
    /// runs to finish.
    ///
    /// No new job body starts after `stop` returns. An entry dequeued but not
    /// yet started when the stop fires is dropped; it will run again on its
    /// next external trigger.
    pub async fn stop(&self) {
        if !self.inner.started.load(Ordering::SeqCst) {
            return;
        }
        self.inner.shutdown.cancel();
        let handle = self.inner.loop_handle.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.inner.tracker.close();
        self.inner.tracker.wait().await;
        tracing::info!(instance = %self.inner.config.instance_id, "service stopped");
    }

    /// Requests an execution of `job` for trigger time `trigger`.
    ///
    /// Honors the instance-ownership filter; callable from any thread or
    /// timer concurrently with the loop.
    pub fn add_to_queue(&self, job: JobId, trigger: DateTime<Utc>) {
        if self.inner.queue.enqueue(job, trigger) {
            self.inner.work_notify.notify_one();
        }
    }

    /// Whether the loop has been started and not yet stopped.
    pub fn is_running(&self) -> bool {
        self.inner.started.load(Ordering::SeqCst) && !self.inner.shutdown.is_cancelled()
    }
}

impl std::fmt::Debug for ServiceCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCore")
            .field("instance_id", &self.inner.config.instance_id)
            .field("queue", &self.inner.queue)
            .finish_non_exhaustive()
    }
}

async fn run_loop(inner: Arc<ServiceInner>) {
    loop {
        tokio::select! {
            biased;

            _ = inner.shutdown.cancelled() => break,

            _ = inner.work_notify.notified() => {}
        }

        while let Some(entry) = inner.queue.dequeue_next() {
            // Wait for a worker slot; a dequeued entry waits rather than
            // being dropped while the pool is saturated.
            let permit = tokio::select! {
                biased;

                _ = inner.shutdown.cancelled() => {
                    tracing::warn!(
                        job = %entry.job_id,
                        "stop requested before the run started, dropping entry"
                    );
                    return;
                }

                permit = Arc::clone(&inner.workers).acquire_owned() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return,
                },
            };

            let worker = Arc::clone(&inner);
            inner.tracker.spawn(run_one(worker, entry, permit));
        }
    }
}

async fn run_one(inner: Arc<ServiceInner>, entry: QueueEntry, _permit: OwnedSemaphorePermit) {
    let job = entry.job_id;

    let run = match inner.process_log.start(job) {
        Ok(run) => run,
        Err(err) => {
            tracing::error!(job = %job, error = %err, "could not open a run record, skipping run");
            finish(&inner, job);
            return;
        }
    };

    tracing::info!(job = %job, run = %run, body = inner.body.name(), "job started");
    let request = JobRequest {
        job_id: job,
        trigger: entry.trigger,
        run,
    };

    // Catch both error returns and panics: one job's failure must never stop
    // the loop or starve other jobs.
    let result = AssertUnwindSafe(inner.body.execute(&request))
        .catch_unwind()
        .await;

    match result {
        Ok(Ok(outcome)) => {
            let data_timestamp = outcome.data_timestamp.unwrap_or(entry.trigger);
            if let Err(err) = inner.process_log.done(run, data_timestamp) {
                tracing::warn!(run = %run, error = %err, "could not record run completion");
            }
            tracing::info!(job = %job, run = %run, "job finished");
        }
        Ok(Err(job_err)) => {
            let description = job_err.to_string();
            if let Err(err) = inner.process_log.error(run, &description) {
                tracing::warn!(run = %run, error = %err, "could not record run failure");
            }
            tracing::warn!(job = %job, run = %run, error = %description, "job failed");
        }
        Err(payload) => {
            let description = panic_description(payload);
            if let Err(err) = inner.process_log.error(run, &description) {
                tracing::warn!(run = %run, error = %err, "could not record run failure");
            }
            tracing::error!(job = %job, run = %run, error = %description, "job body panicked");
        }
    }

    finish(&inner, job);
}

fn finish(inner: &ServiceInner, job: JobId) {
    // Transition back to idle; a trigger remembered mid-run becomes a fresh
    // queue entry and the loop is woken for it.
    if inner.queue.finish(job) {
        inner.work_notify.notify_one();
    }
}

fn panic_description(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "job body panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::JobRegistry;
    use crate::scheduler::body::{JobError, JobFuture, JobOutcome};
    use crate::scheduler::config::ServiceConfig;
    use crate::scheduler::job::InstanceId;
    use crate::scheduler::process_log::{MemoryProcessLog, RunStatus};
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    struct StaticRegistry(HashMap<JobId, InstanceId>);

    impl JobRegistry for StaticRegistry {
        fn owner_instance(&self, job: JobId) -> Option<InstanceId> {
            self.0.get(&job).copied()
        }
    }

    fn registry(entries: &[(u64, u32)]) -> Arc<dyn JobRegistry> {
        Arc::new(StaticRegistry(
            entries
                .iter()
                .map(|&(j, i)| (JobId(j), InstanceId(i)))
                .collect(),
        ))
    }

    fn ts(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, minute, 0).unwrap()
    }

    /// Body that counts executions and optionally fails.
    struct CountingBody {
        executions: AtomicUsize,
        fail: AtomicBool,
    }

    impl CountingBody {
        fn new() -> Self {
            Self {
                executions: AtomicUsize::new(0),
                fail: AtomicBool::new(false),
            }
        }
    }

    impl JobBody for CountingBody {
        fn name(&self) -> &str {
            "counting"
        }

        fn execute<'a>(&'a self, request: &'a JobRequest) -> JobFuture<'a> {
            Box::pin(async move {
                self.executions.fetch_add(1, Ordering::SeqCst);
                if self.fail.load(Ordering::SeqCst) {
                    Err(JobError::Failed("configured to fail".to_string()))
                } else {
                    Ok(JobOutcome::at(request.trigger))
                }
            })
        }
    }

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..500 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("condition not reached in time");
    }

    #[tokio::test]
    async fn test_executes_enqueued_job() {
        let body = Arc::new(CountingBody::new());
        let log = Arc::new(MemoryProcessLog::new());
        let service = ServiceCore::new(
            ServiceConfig::new(InstanceId(1)).with_workers(2),
            registry(&[(1, 1)]),
            body.clone(),
            log.clone(),
        );
        service.start();
        service.add_to_queue(JobId(1), ts(0));

        wait_until(|| body.executions.load(Ordering::SeqCst) == 1).await;
        service.stop().await;

        let records = log.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, RunStatus::Done(ts(0)));
    }

    #[tokio::test]
    async fn test_double_start_is_noop() {
        let body = Arc::new(CountingBody::new());
        let log = Arc::new(MemoryProcessLog::new());
        let service = ServiceCore::new(
            ServiceConfig::new(InstanceId(1)).with_workers(1),
            registry(&[(1, 1)]),
            body.clone(),
            log,
        );
        service.start();
        service.start();
        assert!(service.is_running());
        service.stop().await;
        assert!(!service.is_running());
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let body = Arc::new(CountingBody::new());
        body.fail.store(true, Ordering::SeqCst);
        let log = Arc::new(MemoryProcessLog::new());
        let service = ServiceCore::new(
            ServiceConfig::new(InstanceId(1)).with_workers(1),
            registry(&[(1, 1), (2, 1)]),
            body.clone(),
            log.clone(),
        );
        service.start();
        service.add_to_queue(JobId(1), ts(0));
        wait_until(|| body.executions.load(Ordering::SeqCst) == 1).await;

        // The loop survives the failure and runs the next job.
        body.fail.store(false, Ordering::SeqCst);
        service.add_to_queue(JobId(2), ts(1));
        wait_until(|| body.executions.load(Ordering::SeqCst) == 2).await;
        service.stop().await;

        let records = log.records();
        assert!(matches!(records[0].status, RunStatus::Error(_)));
        assert!(matches!(records[1].status, RunStatus::Done(_)));
    }

    #[tokio::test]
    async fn test_panicking_body_does_not_kill_loop() {
        struct PanickingBody;
        impl JobBody for PanickingBody {
            fn name(&self) -> &str {
                "panicking"
            }
            fn execute<'a>(&'a self, request: &'a JobRequest) -> JobFuture<'a> {
                let job = request.job_id;
                Box::pin(async move {
                    if job == JobId(1) {
                        panic!("boom");
                    }
                    Ok(JobOutcome::empty())
                })
            }
        }

        let log = Arc::new(MemoryProcessLog::new());
        let service = ServiceCore::new(
            ServiceConfig::new(InstanceId(1)).with_workers(1),
            registry(&[(1, 1), (2, 1)]),
            Arc::new(PanickingBody),
            log.clone(),
        );
        service.start();
        service.add_to_queue(JobId(1), ts(0));
        service.add_to_queue(JobId(2), ts(1));

        wait_until(|| log.records().len() == 2).await;
        wait_until(|| {
            log.records()
                .iter()
                .all(|r| r.status != RunStatus::Started)
        })
        .await;
        service.stop().await;

        let records = log.records();
        assert_eq!(records[0].status, RunStatus::Error("boom".to_string()));
        assert!(matches!(records[1].status, RunStatus::Done(_)));
    }

    #[tokio::test]
    async fn test_no_new_runs_after_stop() {
        let body = Arc::new(CountingBody::new());
        let log = Arc::new(MemoryProcessLog::new());
        let service = ServiceCore::new(
            ServiceConfig::new(InstanceId(1)).with_workers(1),
            registry(&[(1, 1)]),
            body.clone(),
            log,
        );
        service.start();
        service.stop().await;

        service.add_to_queue(JobId(1), ts(0));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(body.executions.load(Ordering::SeqCst), 0);
    }
}
