//! Spatial reference identifiers and coordinate reprojection.
//!
//! The core works with two reference systems: geographic WGS84 (EPSG:4326)
//! and spherical Web Mercator (EPSG:3857). Conversion between them is plain
//! spherical math; any other pair of reference systems fails with a
//! [`ReprojectionError`].

use super::types::{Coord2D, Envelope, Geometry, LinearRing, MultiPolygon, Polygon};
use std::fmt;
use thiserror::Error;

/// An EPSG spatial reference identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Srid(pub u32);

impl fmt::Display for Srid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.0)
    }
}

/// Geographic WGS84 coordinates (degrees).
pub const GEOGRAPHIC_WGS84: Srid = Srid(4326);

/// Spherical Web Mercator coordinates (meters).
pub const WEB_MERCATOR: Srid = Srid(3857);

/// WGS84 spherical radius used by Web Mercator, in meters.
pub const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Web Mercator valid latitude range.
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Failure to reconcile two spatial reference systems.
///
/// Fatal to the single computation that required the transform; other queued
/// work is unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no coordinate transform from {from} to {to}")]
pub struct ReprojectionError {
    pub from: Srid,
    pub to: Srid,
}

fn wgs84_to_mercator(c: Coord2D) -> Coord2D {
    let lat = c.y.clamp(MIN_LAT, MAX_LAT);
    let x = EARTH_RADIUS_M * c.x.to_radians();
    let y = EARTH_RADIUS_M * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    Coord2D::new(x, y)
}

fn mercator_to_wgs84(c: Coord2D) -> Coord2D {
    let lon = (c.x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (c.y / EARTH_RADIUS_M).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    Coord2D::new(lon, lat)
}

/// Transforms one coordinate between reference systems.
pub fn reproject_coord(c: Coord2D, from: Srid, to: Srid) -> Result<Coord2D, ReprojectionError> {
    if from == to {
        return Ok(c);
    }
    match (from, to) {
        (GEOGRAPHIC_WGS84, WEB_MERCATOR) => Ok(wgs84_to_mercator(c)),
        (WEB_MERCATOR, GEOGRAPHIC_WGS84) => Ok(mercator_to_wgs84(c)),
        _ => Err(ReprojectionError { from, to }),
    }
}

/// Transforms an envelope by reprojecting its corners.
///
/// Exact for identity, and monotonic (hence corner-sufficient) for the
/// supported WGS84/Web Mercator pair.
pub fn reproject_envelope(
    env: &Envelope,
    from: Srid,
    to: Srid,
) -> Result<Envelope, ReprojectionError> {
    let ll = reproject_coord(env.lower_left(), from, to)?;
    let ur = reproject_coord(env.upper_right(), from, to)?;
    Ok(Envelope::new(ll.x, ll.y, ur.x, ur.y))
}

fn reproject_ring(ring: &LinearRing, from: Srid, to: Srid) -> Result<LinearRing, ReprojectionError> {
    let coords = ring
        .coords()
        .iter()
        .map(|c| reproject_coord(*c, from, to))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(LinearRing::new(coords))
}

fn reproject_polygon(poly: &Polygon, to: Srid) -> Result<Polygon, ReprojectionError> {
    let from = poly.srid();
    let exterior = reproject_ring(poly.exterior(), from, to)?;
    let interiors = poly
        .interiors()
        .iter()
        .map(|r| reproject_ring(r, from, to))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(to, exterior, interiors))
}

/// Transforms a geometry into the target reference system.
pub fn reproject_geometry(geom: &Geometry, to: Srid) -> Result<Geometry, ReprojectionError> {
    match geom {
        Geometry::Polygon(p) => Ok(Geometry::Polygon(reproject_polygon(p, to)?)),
        Geometry::MultiPolygon(m) => {
            let polygons = m
                .polygons()
                .iter()
                .map(|p| reproject_polygon(p, to))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Geometry::MultiPolygon(MultiPolygon::new(to, polygons)))
        }
    }
}
