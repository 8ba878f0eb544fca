//! Collector job body.
//!
//! A collector job pulls the raster slices of an input series that appeared
//! since its last successful run and hands them to the storage sink. The
//! sink's newest stored timestamp is the watermark for the next run, so a
//! collector catches up after downtime without double-storing.

use crate::catalog::{CatalogError, DatasetId, JobRegistry, SeriesCatalog};
use crate::raster::RasterSlice;
use crate::scheduler::{JobBody, JobError, JobFuture, JobId, JobOutcome, JobRequest};
use crate::time::TimeWindow;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Configuration of one collector job.
#[derive(Debug, Clone)]
pub struct CollectorSpec {
    pub name: String,
    /// Series the collector acquires from.
    pub input_series: String,
    /// Dataset new slices are stored into.
    pub output_dataset: DatasetId,
}

/// Resolves collector jobs to their configuration.
pub trait CollectorRegistry: JobRegistry {
    fn collector(&self, job: JobId) -> Result<Arc<CollectorSpec>, CatalogError>;
}

/// Destination of collected slices.
pub trait DataSink: Send + Sync {
    fn store(&self, dataset: DatasetId, slice: &RasterSlice) -> Result<(), CatalogError>;

    /// Timestamp of the newest slice previously stored for a dataset.
    fn last_stored(&self, dataset: DatasetId) -> Option<DateTime<Utc>>;
}

/// Job body acquiring new raster slices of configured series.
pub struct CollectorExecutor {
    registry: Arc<dyn CollectorRegistry>,
    catalog: Arc<dyn SeriesCatalog>,
    sink: Arc<dyn DataSink>,
}

impl CollectorExecutor {
    pub fn new(
        registry: Arc<dyn CollectorRegistry>,
        catalog: Arc<dyn SeriesCatalog>,
        sink: Arc<dyn DataSink>,
    ) -> Self {
        Self {
            registry,
            catalog,
            sink,
        }
    }

    fn run(&self, request: &JobRequest) -> Result<JobOutcome, JobError> {
        let spec = self.registry.collector(request.job_id)?;
        let watermark = self.sink.last_stored(spec.output_dataset);
        // A window without a start would mean "most recent slice only"; a
        // first collector run wants everything up to the trigger instead.
        let since = watermark.unwrap_or(DateTime::<Utc>::MIN_UTC);
        let window = TimeWindow::new(Some(since), request.trigger);

        let series = self.catalog.series(&spec.input_series)?;

        let mut stored = 0usize;
        let mut newest: Option<DateTime<Utc>> = None;
        for dataset in series.datasets {
            for slice in self.catalog.raster_slices(dataset, &window)? {
                // The watermark slice itself comes back because the window is
                // inclusive; skip it instead of double-storing.
                if watermark.is_some_and(|w| slice.timestamp() <= w) {
                    continue;
                }
                self.sink.store(spec.output_dataset, &slice)?;
                stored += 1;
                newest = Some(match newest {
                    Some(n) => n.max(slice.timestamp()),
                    None => slice.timestamp(),
                });
            }
        }

        tracing::info!(
            job = %request.job_id,
            collector = %spec.name,
            stored,
            "collector run complete"
        );

        // No new slices is a successful no-op.
        Ok(match newest {
            Some(newest) => JobOutcome::at(newest),
            None => JobOutcome::empty(),
        })
    }
}

impl JobBody for CollectorExecutor {
    fn name(&self) -> &str {
        "collector"
    }

    fn execute<'a>(&'a self, request: &'a JobRequest) -> JobFuture<'a> {
        Box::pin(async move { self.run(request) })
    }
}
