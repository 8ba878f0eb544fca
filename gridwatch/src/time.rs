//! Time window filtering for raster series queries.

use chrono::{DateTime, Utc};

/// An inclusive time filter over the slices of a raster series.
///
/// A window without a start means "exactly the most recent slice at or before
/// the end": the catalog is expected to return a single slice, and returning
/// more than one is a consistency violation surfaced by the analysis path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    start: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: Option<DateTime<Utc>>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// The most-recent-slice-only window ending at `end`.
    pub fn most_recent(end: DateTime<Utc>) -> Self {
        Self { start: None, end }
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Whether exactly one slice is expected from the catalog.
    pub fn expects_single_slice(&self) -> bool {
        self.start.is_none()
    }

    /// Inclusive containment test.
    pub fn contains(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp <= self.end && self.start.map_or(true, |start| timestamp >= start)
    }
}
