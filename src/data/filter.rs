use std::fmt;

use serde::Serialize;

use super::model::Table;

// ---------------------------------------------------------------------------
// TimeRange – closed interval over the Time axis
// ---------------------------------------------------------------------------

/// Closed interval `[min, max]` over `Time`. Always satisfies `min <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeRange {
    min: f64,
    max: f64,
}

impl TimeRange {
    /// Build a range from two bounds in either order. Returns `None` for
    /// non-finite bounds.
    pub fn new(a: f64, b: f64) -> Option<Self> {
        if !a.is_finite() || !b.is_finite() {
            return None;
        }
        Some(TimeRange {
            min: a.min(b),
            max: a.max(b),
        })
    }

    /// The full span of a table's `Time` column.
    pub fn spanning(table: &Table) -> Option<Self> {
        table
            .time_bounds()
            .and_then(|(lo, hi)| TimeRange::new(lo, hi))
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn contains(&self, t: f64) -> bool {
        self.min <= t && t <= self.max
    }

    /// Clamp both bounds into `bounds`.
    pub fn clamp_to(&self, bounds: TimeRange) -> TimeRange {
        TimeRange {
            min: self.min.clamp(bounds.min, bounds.max),
            max: self.max.clamp(bounds.min, bounds.max),
        }
    }
}

impl Default for TimeRange {
    /// Control range shown before any metrics have been loaded.
    fn default() -> Self {
        TimeRange {
            min: 0.0,
            max: 100.0,
        }
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}–{}", self.min, self.max)
    }
}

// ---------------------------------------------------------------------------
// Row filter
// ---------------------------------------------------------------------------

/// Indices of rows whose `Time` lies inside `range`, in table order.
pub fn rows_in_range(table: &Table, range: TimeRange) -> Vec<usize> {
    table
        .time
        .iter()
        .enumerate()
        .filter(|&(_, &t)| range.contains(t))
        .map(|(i, _)| i)
        .collect()
}

/// Return the rows of `table` inside `range`, preserving order.
///
/// An absent table yields an empty table.
pub fn filter_by_time(table: Option<&Table>, range: TimeRange) -> Table {
    match table {
        Some(table) => table.select_rows(&rows_in_range(table, range)),
        None => Table::default(),
    }
}
