//! Geometry primitives and predicates.
//!
//! Provides the coordinate, envelope and polygon types used by the raster
//! intersection engine, plus the interior-overlap predicate that decides
//! whether a raster cell footprint is selected by a geometry.
//!
//! The overlap test clips the polygon rings against the cell rectangle
//! (Sutherland-Hodgman against the four half-planes) and checks the clipped
//! area. A geometry that only touches a cell along an edge therefore does
//! not select it, which keeps pixel selection reproducible across adjacent
//! cells.

pub mod srs;
mod types;

pub use srs::{
    reproject_coord, reproject_envelope, reproject_geometry, ReprojectionError, Srid,
    GEOGRAPHIC_WGS84, WEB_MERCATOR,
};
pub use types::{Coord2D, Envelope, Geometry, LinearRing, MultiPolygon, Polygon};

/// Relative area threshold below which a clipped overlap counts as empty.
///
/// Large enough to absorb slivers introduced by reprojection round-trips,
/// small enough that any real footprint overlap clears it. Exact edge
/// touching clips to area zero and never reaches the threshold.
const AREA_EPS_RATIO: f64 = 1e-9;

/// Signed shoelace area of an open coordinate sequence.
fn signed_area(coords: &[Coord2D]) -> f64 {
    if coords.len() < 3 {
        return 0.0;
    }
    let mut acc = 0.0;
    for i in 0..coords.len() {
        let a = coords[i];
        let b = coords[(i + 1) % coords.len()];
        acc += a.x * b.y - b.x * a.y;
    }
    acc / 2.0
}

/// Even-odd (ray casting) point-in-ring test.
///
/// The ring is the closed coordinate sequence of a [`LinearRing`]; boundary
/// points may fall on either side depending on floating-point rounding, which
/// is acceptable for the interior-overlap uses in this crate.
pub fn point_in_ring(p: Coord2D, ring: &[Coord2D]) -> bool {
    let mut inside = false;
    if ring.len() < 4 {
        return false;
    }
    let n = ring.len() - 1; // skip the closing coordinate
    let mut j = n - 1;
    for i in 0..n {
        let a = ring[i];
        let b = ring[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

/// Point-in-polygon test honoring interior holes.
pub fn point_in_polygon(p: Coord2D, poly: &Polygon) -> bool {
    if !point_in_ring(p, poly.exterior().coords()) {
        return false;
    }
    !poly
        .interiors()
        .iter()
        .any(|hole| point_in_ring(p, hole.coords()))
}

/// Reusable buffers for ring clipping.
///
/// The cell loop in the bitset intersection runs this clip once per raster
/// cell; reusing the two vertex buffers keeps that loop allocation-free after
/// the first cell.
#[derive(Debug, Default)]
pub struct ClipScratch {
    a: Vec<Coord2D>,
    b: Vec<Coord2D>,
}

impl ClipScratch {
    pub fn new() -> Self {
        Self::default()
    }
}

enum RectEdge {
    MinX(f64),
    MaxX(f64),
    MinY(f64),
    MaxY(f64),
}

impl RectEdge {
    fn inside(&self, c: Coord2D) -> bool {
        match *self {
            RectEdge::MinX(x) => c.x >= x,
            RectEdge::MaxX(x) => c.x <= x,
            RectEdge::MinY(y) => c.y >= y,
            RectEdge::MaxY(y) => c.y <= y,
        }
    }

    fn crossing(&self, p: Coord2D, q: Coord2D) -> Coord2D {
        match *self {
            RectEdge::MinX(x) | RectEdge::MaxX(x) => {
                let t = (x - p.x) / (q.x - p.x);
                Coord2D::new(x, p.y + (q.y - p.y) * t)
            }
            RectEdge::MinY(y) | RectEdge::MaxY(y) => {
                let t = (y - p.y) / (q.y - p.y);
                Coord2D::new(p.x + (q.x - p.x) * t, y)
            }
        }
    }
}

fn clip_against_edge(input: &[Coord2D], output: &mut Vec<Coord2D>, edge: &RectEdge) {
    output.clear();
    if input.is_empty() {
        return;
    }
    let mut prev = input[input.len() - 1];
    let mut prev_inside = edge.inside(prev);
    for &curr in input {
        let curr_inside = edge.inside(curr);
        if curr_inside {
            if !prev_inside {
                output.push(edge.crossing(prev, curr));
            }
            output.push(curr);
        } else if prev_inside {
            output.push(edge.crossing(prev, curr));
        }
        prev = curr;
        prev_inside = curr_inside;
    }
}

/// Absolute area of a ring clipped to a rectangle.
///
/// The ring must be closed; invalid rings contribute zero area.
pub fn clipped_ring_area(ring: &LinearRing, rect: &Envelope, scratch: &mut ClipScratch) -> f64 {
    if !ring.is_valid() {
        return 0.0;
    }
    let coords = ring.coords();
    scratch.a.clear();
    scratch.a.extend_from_slice(&coords[..coords.len() - 1]);

    clip_against_edge(&scratch.a, &mut scratch.b, &RectEdge::MinX(rect.min_x));
    clip_against_edge(&scratch.b, &mut scratch.a, &RectEdge::MaxX(rect.max_x));
    clip_against_edge(&scratch.a, &mut scratch.b, &RectEdge::MinY(rect.min_y));
    clip_against_edge(&scratch.b, &mut scratch.a, &RectEdge::MaxY(rect.max_y));

    signed_area(&scratch.a).abs()
}

/// Interior-overlap area between a polygon (holes honored) and a rectangle.
fn polygon_rect_overlap_area(poly: &Polygon, rect: &Envelope, scratch: &mut ClipScratch) -> f64 {
    let shell = clipped_ring_area(poly.exterior(), rect, scratch);
    if shell == 0.0 {
        return 0.0;
    }
    let holes: f64 = poly
        .interiors()
        .iter()
        .map(|hole| clipped_ring_area(hole, rect, scratch))
        .sum();
    (shell - holes).max(0.0)
}

/// Whether a geometry's interior overlaps a rectangle.
///
/// This is the cell selection predicate of the bitset intersection: a pure
/// shared edge or shared corner yields no overlap area and is not selected.
pub fn geometry_overlaps_rect(geom: &Geometry, rect: &Envelope, scratch: &mut ClipScratch) -> bool {
    let threshold = rect.area() * AREA_EPS_RATIO;
    let area = match geom {
        Geometry::Polygon(p) => polygon_rect_overlap_area(p, rect, scratch),
        Geometry::MultiPolygon(m) => m
            .polygons()
            .iter()
            .map(|p| polygon_rect_overlap_area(p, rect, scratch))
            .sum(),
    };
    area > threshold
}
