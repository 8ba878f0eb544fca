//! Catalog boundary traits.
//!
//! The scheduling core and the job bodies never own the catalog of providers,
//! series and jobs; they consume it through the traits in this module. A real
//! deployment backs them with the platform's data manager, tests back them
//! with in-memory maps.

mod format;

pub use format::{FormatError, SeriesFormat};

use crate::raster::RasterSlice;
use crate::scheduler::{InstanceId, JobId};
use crate::time::TimeWindow;
use std::sync::Arc;
use thiserror::Error;

/// Identifier of one dataset inside a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct DatasetId(pub u64);

impl std::fmt::Display for DatasetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named, ordered collection of raster datasets.
///
/// Datasets of one series are alternative sources for the same logical data,
/// ordered by preference.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSeries {
    pub name: String,
    pub datasets: Vec<DatasetId>,
}

/// Failures crossing the catalog boundary.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("unknown data series {0:?}")]
    UnknownSeries(String),

    #[error("job {0} is not registered")]
    UnknownJob(JobId),

    #[error("dataset {0} unavailable: {1}")]
    Unavailable(DatasetId, String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Resolves which service instance owns which job.
pub trait JobRegistry: Send + Sync {
    /// The instance a job is assigned to, or `None` for an unknown job.
    fn owner_instance(&self, job: JobId) -> Option<InstanceId>;
}

/// Read access to the raster series catalog.
pub trait SeriesCatalog: Send + Sync {
    /// Resolves a series by name.
    fn series(&self, name: &str) -> Result<DataSeries, CatalogError>;

    /// Raster slices of a dataset whose timestamps fall inside the window,
    /// ordered by timestamp ascending.
    ///
    /// For a window without a start, implementations return at most the
    /// single most recent slice at or before the window end; callers treat
    /// more than one as a consistency violation.
    fn raster_slices(
        &self,
        dataset: DatasetId,
        window: &TimeWindow,
    ) -> Result<Vec<Arc<RasterSlice>>, CatalogError>;
}
