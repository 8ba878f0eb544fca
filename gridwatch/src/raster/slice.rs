//! Timestamped raster slices.

use super::grid::{GridError, GridGeometry};
use chrono::{DateTime, Utc};

/// One band of cell values, stored row-major from the grid's top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct Band {
    values: Vec<f64>,
    no_data: Option<f64>,
}

impl Band {
    pub fn new(values: Vec<f64>, no_data: Option<f64>) -> Self {
        Self { values, no_data }
    }

    pub fn no_data(&self) -> Option<f64> {
        self.no_data
    }

    fn value(&self, index: usize) -> Option<f64> {
        let v = *self.values.get(index)?;
        match self.no_data {
            Some(no_data) if v == no_data => None,
            _ => Some(v),
        }
    }
}

/// One time-stamped raster belonging to a dataset of a series.
///
/// Slices arrive in memory through the catalog boundary; file decoding lives
/// outside this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSlice {
    grid: GridGeometry,
    timestamp: DateTime<Utc>,
    bands: Vec<Band>,
}

impl RasterSlice {
    pub fn new(
        grid: GridGeometry,
        timestamp: DateTime<Utc>,
        bands: Vec<Band>,
    ) -> Result<Self, GridError> {
        let expected = grid.cell_count();
        for band in &bands {
            if band.values.len() != expected {
                return Err(GridError::BandLength {
                    expected,
                    actual: band.values.len(),
                });
            }
        }
        Ok(Self {
            grid,
            timestamp,
            bands,
        })
    }

    pub fn grid(&self) -> &GridGeometry {
        &self.grid
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Reads one cell value.
    ///
    /// `None` for an unknown band, an out-of-grid cell, or a cell holding the
    /// band's no-data marker.
    pub fn value(&self, band: usize, column: u32, row: u32) -> Option<f64> {
        if !self.grid.contains_cell(column, row) {
            return None;
        }
        let index = row as usize * self.grid.columns() as usize + column as usize;
        self.bands.get(band)?.value(index)
    }
}
