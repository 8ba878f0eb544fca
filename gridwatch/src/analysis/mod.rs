//! Analysis job body.
//!
//! An analysis job reduces a raster series over a monitored geometry to one
//! number: it accumulates per-cell values through the zonal engine, derives
//! the configured statistic from the accumulated sums and publishes the
//! result. An analysis with no intersecting data publishes a NaN result and
//! still counts as a successful run; only an unreadable source fails it.

use crate::catalog::{CatalogError, JobRegistry, SeriesCatalog};
use crate::geom::Geometry;
use crate::scheduler::{JobBody, JobError, JobFuture, JobId, JobOutcome, JobRequest};
use crate::time::TimeWindow;
use crate::zonal::{self, Statistic, StatisticsSummary};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// How an analysis derives its slice window from the trigger timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WindowPolicy {
    /// Only the most recent slice at or before the trigger.
    MostRecent,
    /// All slices in the closed interval of `seconds` before the trigger.
    LookBack { seconds: i64 },
}

impl WindowPolicy {
    /// The concrete window for a trigger timestamp.
    pub fn window_ending_at(&self, end: DateTime<Utc>) -> TimeWindow {
        match *self {
            WindowPolicy::MostRecent => TimeWindow::most_recent(end),
            WindowPolicy::LookBack { seconds } => {
                TimeWindow::new(Some(end - Duration::seconds(seconds)), end)
            }
        }
    }
}

/// Configuration of one analysis job.
#[derive(Debug, Clone)]
pub struct AnalysisSpec {
    pub name: String,
    /// The monitored region, already buffered by the catalog if a buffer was
    /// configured.
    pub geometry: Geometry,
    /// Raster series the analysis reads.
    pub series: String,
    pub band: usize,
    pub window: WindowPolicy,
    pub statistic: Statistic,
}

/// Resolves analysis jobs to their configuration.
pub trait AnalysisRegistry: JobRegistry {
    fn analysis(&self, job: JobId) -> Result<Arc<AnalysisSpec>, CatalogError>;
}

/// One published analysis value.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub job_id: JobId,
    pub analysis: String,
    pub executed_at: DateTime<Utc>,
    /// The derived statistic; NaN means the analysis saw no data.
    pub value: f64,
    /// Number of cells that contributed values.
    pub cell_count: usize,
}

/// Destination of analysis results.
pub trait ResultSink: Send + Sync {
    fn publish(&self, result: &AnalysisResult) -> Result<(), CatalogError>;
}

/// Job body executing grid zonal analyses.
pub struct AnalysisExecutor {
    registry: Arc<dyn AnalysisRegistry>,
    catalog: Arc<dyn SeriesCatalog>,
    sink: Arc<dyn ResultSink>,
}

impl AnalysisExecutor {
    pub fn new(
        registry: Arc<dyn AnalysisRegistry>,
        catalog: Arc<dyn SeriesCatalog>,
        sink: Arc<dyn ResultSink>,
    ) -> Self {
        Self {
            registry,
            catalog,
            sink,
        }
    }

    fn run(&self, request: &JobRequest) -> Result<JobOutcome, JobError> {
        let spec = self.registry.analysis(request.job_id)?;
        let window = spec.window.window_ending_at(request.trigger);

        let cells = zonal::accumulate(
            self.catalog.as_ref(),
            &spec.geometry,
            &spec.series,
            &window,
            spec.band,
        )?;

        let summary = StatisticsSummary::from_cell_sums(&cells);
        let value = spec.statistic.evaluate(&summary);
        if cells.is_empty() {
            tracing::debug!(job = %request.job_id, analysis = %spec.name, "analysis saw no data");
        }

        let result = AnalysisResult {
            job_id: request.job_id,
            analysis: spec.name.clone(),
            executed_at: request.trigger,
            value,
            cell_count: cells.len(),
        };
        self.sink.publish(&result)?;

        Ok(JobOutcome::at(request.trigger))
    }
}

impl JobBody for AnalysisExecutor {
    fn name(&self) -> &str {
        "analysis"
    }

    fn execute<'a>(&'a self, request: &'a JobRequest) -> JobFuture<'a> {
        Box::pin(async move { self.run(request) })
    }
}
