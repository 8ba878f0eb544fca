//! Geometry-to-raster bitset intersection.
//!
//! [`BitsetIntersection::compute`] marks, for every cell of the raster
//! sub-grid covered by a geometry's bounding box, whether the cell footprint
//! overlaps the geometry. Analyses use the resulting mask to restrict value
//! extraction to the cells inside a monitored region, and reuse it across all
//! slices of a dataset that share the same grid.

mod bitset;

pub use bitset::CellBitset;

use crate::geom::{
    geometry_overlaps_rect, reproject_geometry, ClipScratch, Coord2D, Geometry, ReprojectionError,
};
use crate::raster::GridGeometry;

/// Per-cell intersection mask between one geometry and one raster grid.
///
/// The mask is computed fresh per (geometry, grid) pair. Before applying it
/// to a different raster, [`matches_grid`](Self::matches_grid) must be
/// checked: a raster with another resolution or extent invalidates the mask.
#[derive(Debug, Clone, PartialEq)]
pub struct BitsetIntersection {
    lower_left: Coord2D,
    upper_right: Coord2D,
    x_resolution: f64,
    y_resolution: f64,
    first_column: u32,
    last_column: u32,
    first_row: u32,
    last_row: u32,
    bits: CellBitset,
}

impl BitsetIntersection {
    /// Computes the intersection mask of `geometry` over `grid`.
    ///
    /// The geometry is reprojected into the grid's reference system first;
    /// irreconcilable reference systems fail with [`ReprojectionError`].
    /// Degenerate (empty or invalid) geometries and geometries disjoint from
    /// the grid extent yield an empty mask, not an error.
    ///
    /// Bounding-box corners falling outside the raster extent clamp to the
    /// boundary column/row, so partial overlap is valid input. Cells are
    /// tested row-major, top row first; a cell's bit is set when its footprint
    /// interior overlaps the geometry.
    pub fn compute(
        geometry: &Geometry,
        grid: &GridGeometry,
    ) -> Result<BitsetIntersection, ReprojectionError> {
        if geometry.is_empty() || !geometry.is_valid() {
            return Ok(Self::empty(grid));
        }

        let reprojected;
        let geometry = if geometry.srid() == grid.srid() {
            geometry
        } else {
            reprojected = reproject_geometry(geometry, grid.srid())?;
            &reprojected
        };

        // Non-empty valid geometry always has an envelope.
        let bbox = match geometry.envelope() {
            Some(bbox) => bbox,
            None => return Ok(Self::empty(grid)),
        };
        if !bbox.intersects(grid.extent()) {
            return Ok(Self::empty(grid));
        }

        let (ll_column, ll_row) = grid.geo_to_grid(bbox.lower_left());
        let (ur_column, ur_row) = grid.geo_to_grid(bbox.upper_right());

        // Clamp out-of-extent corners to the grid boundary.
        let first_column = ll_column.unwrap_or(0);
        let last_column = ur_column.unwrap_or(grid.columns() - 1);
        let first_row = ur_row.unwrap_or(0);
        let last_row = ll_row.unwrap_or(grid.rows() - 1);

        let width = (last_column - first_column + 1) as usize;
        let height = (last_row - first_row + 1) as usize;
        let mut bits = CellBitset::with_len(width * height);
        let mut scratch = ClipScratch::new();

        let mut index = 0;
        for row in first_row..=last_row {
            for column in first_column..=last_column {
                let footprint = grid.cell_envelope(column, row);
                if geometry_overlaps_rect(geometry, &footprint, &mut scratch) {
                    bits.set(index);
                }
                index += 1;
            }
        }

        Ok(Self {
            lower_left: grid.cell_center(first_column, last_row),
            upper_right: grid.cell_center(last_column, first_row),
            x_resolution: grid.x_resolution(),
            y_resolution: grid.y_resolution(),
            first_column,
            last_column,
            first_row,
            last_row,
            bits,
        })
    }

    fn empty(grid: &GridGeometry) -> Self {
        let origin = grid.extent().lower_left();
        Self {
            lower_left: origin,
            upper_right: origin,
            x_resolution: grid.x_resolution(),
            y_resolution: grid.y_resolution(),
            first_column: 0,
            last_column: 0,
            first_row: 0,
            last_row: 0,
            bits: CellBitset::empty(),
        }
    }

    /// Geographic coordinate of the sub-grid's lower-left cell center.
    pub fn lower_left(&self) -> Coord2D {
        self.lower_left
    }

    /// Geographic coordinate of the sub-grid's upper-right cell center.
    pub fn upper_right(&self) -> Coord2D {
        self.upper_right
    }

    /// Pixel width of the grid at computation time.
    pub fn x_resolution(&self) -> f64 {
        self.x_resolution
    }

    /// Pixel height of the grid at computation time.
    pub fn y_resolution(&self) -> f64 {
        self.y_resolution
    }

    pub fn bitset(&self) -> &CellBitset {
        &self.bits
    }

    /// True when no cell was tested (degenerate or disjoint input).
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// Whether this mask was computed on a grid with the same pixel layout.
    pub fn matches_grid(&self, grid: &GridGeometry) -> bool {
        self.x_resolution == grid.x_resolution()
            && self.y_resolution == grid.y_resolution()
            && (self.bits.is_empty() || grid.contains_cell(self.last_column, self.last_row))
    }

    /// Iterator over the selected cells as grid (column, row) pairs.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let width = (self.last_column - self.first_column + 1) as usize;
        self.bits.ones().map(move |index| {
            let column = self.first_column + (index % width) as u32;
            let row = self.first_row + (index / width) as u32;
            (column, row)
        })
    }
}
