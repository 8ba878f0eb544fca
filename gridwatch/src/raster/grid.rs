//! Raster grid geometry.
//!
//! A [`GridGeometry`] describes the pixel layout of a raster: column/row
//! counts, geographic extent and spatial reference. Conversions between grid
//! and geographic space use the cell-center convention with row 0 at the top
//! of the extent, and are constant-time arithmetic in both directions.

use crate::geom::{Coord2D, Envelope, Srid};
use thiserror::Error;

/// Errors building a grid or slice.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    #[error("grid must have at least one column and one row, got {columns}x{rows}")]
    EmptyGrid { columns: u32, rows: u32 },

    #[error("grid extent must have positive width and height")]
    EmptyExtent,

    #[error("band data length {actual} does not match grid cell count {expected}")]
    BandLength { expected: usize, actual: usize },
}

/// Pixel layout and geo-referencing of a raster.
#[derive(Debug, Clone, PartialEq)]
pub struct GridGeometry {
    columns: u32,
    rows: u32,
    extent: Envelope,
    srid: Srid,
}

impl GridGeometry {
    pub fn new(columns: u32, rows: u32, extent: Envelope, srid: Srid) -> Result<Self, GridError> {
        if columns == 0 || rows == 0 {
            return Err(GridError::EmptyGrid { columns, rows });
        }
        if extent.width() <= 0.0 || extent.height() <= 0.0 {
            return Err(GridError::EmptyExtent);
        }
        Ok(Self {
            columns,
            rows,
            extent,
            srid,
        })
    }

    pub fn columns(&self) -> u32 {
        self.columns
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    pub fn extent(&self) -> &Envelope {
        &self.extent
    }

    pub fn srid(&self) -> Srid {
        self.srid
    }

    /// Pixel width in extent units.
    pub fn x_resolution(&self) -> f64 {
        self.extent.width() / f64::from(self.columns)
    }

    /// Pixel height in extent units.
    pub fn y_resolution(&self) -> f64 {
        self.extent.height() / f64::from(self.rows)
    }

    pub fn contains_cell(&self, column: u32, row: u32) -> bool {
        column < self.columns && row < self.rows
    }

    /// Geographic coordinate of a cell center. Row 0 is the top row.
    pub fn cell_center(&self, column: u32, row: u32) -> Coord2D {
        Coord2D::new(
            self.extent.min_x + (f64::from(column) + 0.5) * self.x_resolution(),
            self.extent.max_y - (f64::from(row) + 0.5) * self.y_resolution(),
        )
    }

    /// Footprint rectangle of a cell: its center plus/minus half a pixel in
    /// each direction.
    pub fn cell_envelope(&self, column: u32, row: u32) -> Envelope {
        let center = self.cell_center(column, row);
        let half_x = self.x_resolution() / 2.0;
        let half_y = self.y_resolution() / 2.0;
        Envelope::new(
            center.x - half_x,
            center.y - half_y,
            center.x + half_x,
            center.y + half_y,
        )
    }

    /// Converts a geographic coordinate to the nearest cell, per axis.
    ///
    /// Each axis resolves independently: `None` marks a coordinate outside
    /// the grid on that axis, so callers can clamp column and row separately
    /// when a bounding box only partially overlaps the raster.
    pub fn geo_to_grid(&self, c: Coord2D) -> (Option<u32>, Option<u32>) {
        let col_f = ((c.x - self.extent.min_x) / self.x_resolution() - 0.5).round();
        let row_f = ((self.extent.max_y - c.y) / self.y_resolution() - 0.5).round();

        let column = if col_f >= 0.0 && col_f < f64::from(self.columns) {
            Some(col_f as u32)
        } else {
            None
        };
        let row = if row_f >= 0.0 && row_f < f64::from(self.rows) {
            Some(row_f as u32)
        } else {
            None
        };
        (column, row)
    }
}
