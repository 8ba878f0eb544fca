//! Zonal accumulation over raster series.
//!
//! [`accumulate`] walks the raster slices of a named series inside a time
//! window and folds the per-cell values that fall inside a geometry into
//! running (sum, count) accumulators. The per-cell selection mask is computed
//! once per dataset through [`BitsetIntersection`] and reused across that
//! dataset's slices, which share one reference system and alignment.

pub mod statistics;

pub use statistics::{Statistic, StatisticsSummary};

use crate::catalog::{CatalogError, DatasetId, SeriesCatalog};
use crate::geom::{reproject_envelope, reproject_geometry, Geometry, ReprojectionError};
use crate::intersection::BitsetIntersection;
use crate::time::TimeWindow;
use std::collections::HashMap;
use thiserror::Error;

/// Grid cell key: (column, row).
pub type CellKey = (u32, u32);

/// Running accumulator for one cell.
///
/// A present key always has `count >= 1`; "no observed value" is expressed by
/// the key being absent, never by a zero count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulatedCell {
    pub sum: f64,
    pub count: u32,
}

impl AccumulatedCell {
    pub fn mean(&self) -> f64 {
        self.sum / f64::from(self.count)
    }
}

/// Failures of the zonal accumulation path.
#[derive(Debug, Error)]
pub enum ZonalError {
    #[error(transparent)]
    Reprojection(#[from] ReprojectionError),

    #[error("unknown data series {0:?}")]
    UnknownSeries(String),

    #[error("no readable raster data for dataset {dataset}: {reason}")]
    DataUnavailable { dataset: DatasetId, reason: String },

    #[error("catalog consistency violation: {0}")]
    Consistency(String),
}

/// Accumulates per-cell (sum, count) pairs for a geometry over a series.
///
/// Datasets of the series are alternatives: the first one that yields a
/// non-empty accumulator wins and the rest are not scanned. A dataset whose
/// extent does not reach the geometry's bounding box is skipped without
/// computing an intersection mask.
///
/// An invalid or empty geometry yields an empty map, a "no data" outcome
/// rather than an error. A dataset that cannot be read at all is
/// [`ZonalError::DataUnavailable`]: "cannot read the source" is kept distinct
/// from "nothing intersects".
pub fn accumulate(
    catalog: &dyn SeriesCatalog,
    geometry: &Geometry,
    series_name: &str,
    window: &TimeWindow,
    band: usize,
) -> Result<HashMap<CellKey, AccumulatedCell>, ZonalError> {
    let mut values: HashMap<CellKey, AccumulatedCell> = HashMap::new();

    if geometry.is_empty() || !geometry.is_valid() {
        return Ok(values);
    }
    let bbox = match geometry.envelope() {
        Some(bbox) => bbox,
        None => return Ok(values),
    };

    let series = catalog.series(series_name).map_err(ZonalError::from)?;

    for dataset in series.datasets {
        let slices = catalog
            .raster_slices(dataset, window)
            .map_err(|e| ZonalError::DataUnavailable {
                dataset,
                reason: e.to_string(),
            })?;

        // Sanity check: without a window start only the most recent slice
        // may be returned.
        if window.expects_single_slice() && slices.len() > 1 {
            return Err(ZonalError::Consistency(format!(
                "dataset {dataset} returned {} slices for a most-recent-only window",
                slices.len()
            )));
        }
        if slices.is_empty() {
            return Err(ZonalError::DataUnavailable {
                dataset,
                reason: "no raster slices in the requested window".to_string(),
            });
        }

        let first = &slices[0];
        let raster_extent =
            reproject_envelope(first.grid().extent(), first.grid().srid(), geometry.srid())?;
        if !raster_extent.intersects(&bbox) {
            tracing::debug!(dataset = %dataset, "raster extent disjoint from geometry, skipping");
            continue;
        }

        // Reproject once per dataset; slices share reference system and
        // alignment, so the mask from the first slice serves all of them.
        let local_geometry = reproject_geometry(geometry, first.grid().srid())?;
        let mask = BitsetIntersection::compute(&local_geometry, first.grid())?;

        for slice in &slices {
            for (column, row) in mask.cells() {
                if let Some(value) = slice.value(band, column, row) {
                    values
                        .entry((column, row))
                        .and_modify(|cell| {
                            cell.sum += value;
                            cell.count += 1;
                        })
                        .or_insert(AccumulatedCell {
                            sum: value,
                            count: 1,
                        });
                }
            }
        }

        // Alternative sources: the first dataset with data wins.
        if !values.is_empty() {
            break;
        }
    }

    Ok(values)
}

impl From<CatalogError> for ZonalError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::UnknownSeries(name) => ZonalError::UnknownSeries(name),
            CatalogError::Unavailable(dataset, reason) => {
                ZonalError::DataUnavailable { dataset, reason }
            }
            other => ZonalError::Consistency(other.to_string()),
        }
    }
}
