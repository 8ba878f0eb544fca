//! Geometry type definitions.

use super::srs::Srid;
use std::fmt;

/// A 2D coordinate in some spatial reference system.
///
/// The reference system is carried by the containing geometry, not by the
/// coordinate itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord2D {
    pub x: f64,
    pub y: f64,
}

impl Coord2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// An axis-aligned bounding rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Envelope {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Builds the envelope of a coordinate sequence.
    ///
    /// Returns `None` for an empty sequence.
    pub fn of_coords<'a, I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coord2D>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut env = Envelope::new(first.x, first.y, first.x, first.y);
        for c in iter {
            env.expand_to(c);
        }
        Some(env)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    pub fn center(&self) -> Coord2D {
        Coord2D::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Lower-left corner.
    pub fn lower_left(&self) -> Coord2D {
        Coord2D::new(self.min_x, self.min_y)
    }

    /// Upper-right corner.
    pub fn upper_right(&self) -> Coord2D {
        Coord2D::new(self.max_x, self.max_y)
    }

    /// Closed-boundary intersection test between two envelopes.
    pub fn intersects(&self, other: &Envelope) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }

    /// Closed-boundary containment test for a coordinate.
    pub fn contains(&self, c: Coord2D) -> bool {
        c.x >= self.min_x && c.x <= self.max_x && c.y >= self.min_y && c.y <= self.max_y
    }

    pub fn expand_to(&mut self, c: &Coord2D) {
        self.min_x = self.min_x.min(c.x);
        self.min_y = self.min_y.min(c.y);
        self.max_x = self.max_x.max(c.x);
        self.max_y = self.max_y.max(c.y);
    }
}

/// A closed sequence of coordinates.
///
/// A well-formed ring has at least four coordinates and its first and last
/// coordinates are equal.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearRing(Vec<Coord2D>);

impl LinearRing {
    pub fn new(coords: Vec<Coord2D>) -> Self {
        Self(coords)
    }

    pub fn coords(&self) -> &[Coord2D] {
        &self.0
    }

    pub fn is_closed(&self) -> bool {
        match (self.0.first(), self.0.last()) {
            (Some(first), Some(last)) => first == last,
            _ => false,
        }
    }

    /// A ring is well formed when it is closed and encloses at least a
    /// triangle (four coordinates counting the closing one).
    pub fn is_valid(&self) -> bool {
        self.0.len() >= 4 && self.is_closed()
    }
}

/// A polygon with an exterior shell and zero or more interior holes.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    srid: Srid,
    exterior: LinearRing,
    interiors: Vec<LinearRing>,
}

impl Polygon {
    pub fn new(srid: Srid, exterior: LinearRing, interiors: Vec<LinearRing>) -> Self {
        Self {
            srid,
            exterior,
            interiors,
        }
    }

    /// Builds the rectangular polygon covering an envelope.
    pub fn from_envelope(srid: Srid, env: &Envelope) -> Self {
        let ring = LinearRing::new(vec![
            Coord2D::new(env.min_x, env.min_y),
            Coord2D::new(env.max_x, env.min_y),
            Coord2D::new(env.max_x, env.max_y),
            Coord2D::new(env.min_x, env.max_y),
            Coord2D::new(env.min_x, env.min_y),
        ]);
        Self::new(srid, ring, Vec::new())
    }

    pub fn srid(&self) -> Srid {
        self.srid
    }

    pub fn exterior(&self) -> &LinearRing {
        &self.exterior
    }

    pub fn interiors(&self) -> &[LinearRing] {
        &self.interiors
    }

    pub fn is_empty(&self) -> bool {
        self.exterior.coords().is_empty()
    }

    pub fn is_valid(&self) -> bool {
        self.exterior.is_valid() && self.interiors.iter().all(LinearRing::is_valid)
    }

    pub fn envelope(&self) -> Option<Envelope> {
        Envelope::of_coords(self.exterior.coords())
    }
}

/// A collection of polygons sharing one spatial reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiPolygon {
    srid: Srid,
    polygons: Vec<Polygon>,
}

impl MultiPolygon {
    pub fn new(srid: Srid, polygons: Vec<Polygon>) -> Self {
        Self { srid, polygons }
    }

    pub fn srid(&self) -> Srid {
        self.srid
    }

    pub fn polygons(&self) -> &[Polygon] {
        &self.polygons
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.iter().all(Polygon::is_empty)
    }

    pub fn is_valid(&self) -> bool {
        !self.polygons.is_empty() && self.polygons.iter().all(Polygon::is_valid)
    }

    pub fn envelope(&self) -> Option<Envelope> {
        let mut result: Option<Envelope> = None;
        for poly in &self.polygons {
            if let Some(env) = poly.envelope() {
                match &mut result {
                    Some(acc) => {
                        acc.expand_to(&env.lower_left());
                        acc.expand_to(&env.upper_right());
                    }
                    None => result = Some(env),
                }
            }
        }
        result
    }
}

/// A monitored-area geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Polygon(Polygon),
    MultiPolygon(MultiPolygon),
}

impl Geometry {
    pub fn srid(&self) -> Srid {
        match self {
            Geometry::Polygon(p) => p.srid(),
            Geometry::MultiPolygon(m) => m.srid(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Geometry::Polygon(p) => p.is_empty(),
            Geometry::MultiPolygon(m) => m.is_empty(),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Geometry::Polygon(p) => p.is_valid(),
            Geometry::MultiPolygon(m) => m.is_valid(),
        }
    }

    pub fn envelope(&self) -> Option<Envelope> {
        match self {
            Geometry::Polygon(p) => p.envelope(),
            Geometry::MultiPolygon(m) => m.envelope(),
        }
    }
}

impl From<Polygon> for Geometry {
    fn from(p: Polygon) -> Self {
        Geometry::Polygon(p)
    }
}

impl From<MultiPolygon> for Geometry {
    fn from(m: MultiPolygon) -> Self {
        Geometry::MultiPolygon(m)
    }
}
