//! End-to-end scheduler behavior: ownership filtering, trigger coalescing,
//! mutual exclusion and failure isolation.

use chrono::{DateTime, TimeZone, Utc};
use gridwatch::catalog::JobRegistry;
use gridwatch::scheduler::{
    InstanceId, JobBody, JobError, JobFuture, JobId, JobOutcome, JobRequest, MemoryProcessLog,
    RunStatus, ServiceConfig, ServiceCore,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
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

async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}

/// Records every execution with its job id and trigger, with a configurable
/// per-run delay and failure switch.
struct RecordingBody {
    executions: Mutex<Vec<(JobId, DateTime<Utc>)>>,
    delay: Duration,
    fail: AtomicBool,
}

impl RecordingBody {
    fn new(delay: Duration) -> Self {
        Self {
            executions: Mutex::new(Vec::new()),
            delay,
            fail: AtomicBool::new(false),
        }
    }

    fn executions(&self) -> Vec<(JobId, DateTime<Utc>)> {
        self.executions.lock().clone()
    }
}

impl JobBody for RecordingBody {
    fn name(&self) -> &str {
        "recording"
    }

    fn execute<'a>(&'a self, request: &'a JobRequest) -> JobFuture<'a> {
        Box::pin(async move {
            self.executions.lock().push((request.job_id, request.trigger));
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                Err(JobError::Failed("induced failure".to_string()))
            } else {
                Ok(JobOutcome::at(request.trigger))
            }
        })
    }
}

#[tokio::test]
async fn ownership_filter_runs_only_owned_jobs() {
    // Job 1 belongs to instance 1, job 2 to instance 2; this service is
    // instance 1.
    let body = Arc::new(RecordingBody::new(Duration::ZERO));
    let log = Arc::new(MemoryProcessLog::new());
    let service = ServiceCore::new(
        ServiceConfig::new(InstanceId(1)).with_workers(2),
        registry(&[(1, 1), (2, 2)]),
        body.clone(),
        log.clone(),
    );
    service.start();

    service.add_to_queue(JobId(1), ts(0));
    service.add_to_queue(JobId(2), ts(0));

    wait_until(|| body.executions().len() == 1).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    service.stop().await;

    let executions = body.executions();
    assert_eq!(executions, vec![(JobId(1), ts(0))]);
    assert!(log.records().iter().all(|r| r.job == JobId(1)));
}

#[tokio::test]
async fn rapid_triggers_coalesce_to_one_run_with_latest_timestamp() {
    let body = Arc::new(RecordingBody::new(Duration::ZERO));
    let log = Arc::new(MemoryProcessLog::new());
    let service = ServiceCore::new(
        ServiceConfig::new(InstanceId(1)).with_workers(2),
        registry(&[(1, 1)]),
        body.clone(),
        log,
    );

    // Enqueue twice before the loop ever starts draining.
    service.add_to_queue(JobId(1), ts(0));
    service.add_to_queue(JobId(1), ts(5));
    assert_eq!(service.queue().len(), 1);

    service.start();
    wait_until(|| !body.executions().is_empty()).await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    service.stop().await;

    assert_eq!(body.executions(), vec![(JobId(1), ts(5))]);
}

#[tokio::test]
async fn failed_run_does_not_block_the_next_trigger() {
    let body = Arc::new(RecordingBody::new(Duration::ZERO));
    body.fail.store(true, Ordering::SeqCst);
    let log = Arc::new(MemoryProcessLog::new());
    let service = ServiceCore::new(
        ServiceConfig::new(InstanceId(1)).with_workers(1),
        registry(&[(1, 1)]),
        body.clone(),
        log.clone(),
    );
    service.start();

    service.add_to_queue(JobId(1), ts(0));
    wait_until(|| body.executions().len() == 1).await;
    wait_until(|| {
        log.records()
            .iter()
            .any(|r| matches!(r.status, RunStatus::Error(_)))
    })
    .await;

    // The job went Running -> Idle; a fresh trigger takes it Queued ->
    // Running again despite the first failure.
    body.fail.store(false, Ordering::SeqCst);
    service.add_to_queue(JobId(1), ts(9));
    wait_until(|| body.executions().len() == 2).await;
    service.stop().await;

    let executions = body.executions();
    assert_eq!(executions[1], (JobId(1), ts(9)));
    let records = log.records();
    assert_eq!(records.len(), 2);
    assert!(matches!(records[0].status, RunStatus::Error(_)));
    assert_eq!(records[1].status, RunStatus::Done(ts(9)));
}

#[tokio::test]
async fn trigger_during_run_is_not_lost() {
    let body = Arc::new(RecordingBody::new(Duration::from_millis(50)));
    let log = Arc::new(MemoryProcessLog::new());
    let service = ServiceCore::new(
        ServiceConfig::new(InstanceId(1)).with_workers(2),
        registry(&[(1, 1)]),
        body.clone(),
        log,
    );
    service.start();

    service.add_to_queue(JobId(1), ts(0));
    wait_until(|| body.executions().len() == 1).await;

    // The first run is still sleeping; this trigger must be remembered and
    // executed afterwards, not dropped and not run concurrently.
    service.add_to_queue(JobId(1), ts(7));
    wait_until(|| body.executions().len() == 2).await;
    service.stop().await;

    assert_eq!(body.executions(), vec![(JobId(1), ts(0)), (JobId(1), ts(7))]);
}

/// Body asserting that no job id ever has two overlapping executions.
struct ExclusionProbe {
    active: Mutex<HashMap<JobId, usize>>,
    max_active: AtomicUsize,
    total: AtomicUsize,
}

impl ExclusionProbe {
    fn new() -> Self {
        Self {
            active: Mutex::new(HashMap::new()),
            max_active: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
        }
    }
}

impl JobBody for ExclusionProbe {
    fn name(&self) -> &str {
        "exclusion-probe"
    }

    fn execute<'a>(&'a self, request: &'a JobRequest) -> JobFuture<'a> {
        Box::pin(async move {
            {
                let mut active = self.active.lock();
                let count = active.entry(request.job_id).or_insert(0);
                *count += 1;
                self.max_active.fetch_max(*count, Ordering::SeqCst);
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            {
                let mut active = self.active.lock();
                *active.get_mut(&request.job_id).unwrap() -= 1;
            }
            self.total.fetch_add(1, Ordering::SeqCst);
            Ok(JobOutcome::empty())
        })
    }
}

#[tokio::test]
async fn one_job_id_never_runs_twice_concurrently() {
    let body = Arc::new(ExclusionProbe::new());
    let log = Arc::new(MemoryProcessLog::new());
    let service = ServiceCore::new(
        ServiceConfig::new(InstanceId(1)).with_workers(8),
        registry(&[(1, 1), (2, 1)]),
        body.clone(),
        log,
    );
    service.start();

    // Hammer both jobs with triggers while runs are in flight.
    for round in 0..20u32 {
        service.add_to_queue(JobId(1), ts(round % 60));
        service.add_to_queue(JobId(2), ts(round % 60));
        tokio::time::sleep(Duration::from_millis(3)).await;
    }

    wait_until(|| body.active.lock().values().all(|&v| v == 0)).await;
    service.stop().await;

    assert_eq!(body.max_active.load(Ordering::SeqCst), 1);
    assert!(body.total.load(Ordering::SeqCst) >= 2);
}

#[tokio::test]
async fn worker_bound_limits_concurrency_without_dropping_entries() {
    struct ConcurrencyProbe {
        active: AtomicUsize,
        max_active: AtomicUsize,
        total: AtomicUsize,
    }

    impl JobBody for ConcurrencyProbe {
        fn name(&self) -> &str {
            "concurrency-probe"
        }

        fn execute<'a>(&'a self, _request: &'a JobRequest) -> JobFuture<'a> {
            Box::pin(async move {
                let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_active.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(20)).await;
                self.active.fetch_sub(1, Ordering::SeqCst);
                self.total.fetch_add(1, Ordering::SeqCst);
                Ok(JobOutcome::empty())
            })
        }
    }

    let body = Arc::new(ConcurrencyProbe {
        active: AtomicUsize::new(0),
        max_active: AtomicUsize::new(0),
        total: AtomicUsize::new(0),
    });
    let log = Arc::new(MemoryProcessLog::new());
    let jobs: Vec<(u64, u32)> = (1..=6).map(|j| (j, 1)).collect();
    let service = ServiceCore::new(
        ServiceConfig::new(InstanceId(1)).with_workers(2),
        registry(&jobs),
        body.clone(),
        log,
    );
    service.start();

    for job in 1..=6u64 {
        service.add_to_queue(JobId(job), ts(0));
    }

    // Every entry eventually runs; never more than two at once.
    wait_until(|| body.total.load(Ordering::SeqCst) == 6).await;
    service.stop().await;
    assert!(body.max_active.load(Ordering::SeqCst) <= 2);
}
