use std::collections::BTreeMap;

/// Name of the column every table is indexed by.
pub const TIME_COLUMN: &str = "Time";

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Coerce a raw CSV field to a number, pandas `to_numeric(errors="coerce")`
/// style: anything unparsable or non-finite becomes missing.
pub fn coerce_numeric(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Table – one uploaded CSV file
// ---------------------------------------------------------------------------

/// A time-indexed table stored column-wise.
///
/// Every row has a finite `Time` value; other cells are `None` when the
/// source field was empty or not numeric.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    /// `Time` value of each row, in file order.
    pub time: Vec<f64>,
    /// Non-`Time` column names in header order.
    pub column_names: Vec<String>,
    /// Column name → one cell per row.
    pub columns: BTreeMap<String, Vec<Option<f64>>>,
    /// Rows discarded on load because `Time` could not be coerced.
    pub dropped_rows: usize,
}

impl Table {
    /// A table with the given columns and no rows.
    pub fn empty_with_columns(column_names: Vec<String>) -> Self {
        let columns = column_names
            .iter()
            .map(|name| (name.clone(), Vec::new()))
            .collect();
        Table {
            time: Vec::new(),
            column_names,
            columns,
            dropped_rows: 0,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Cells of a non-`Time` column.
    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Column values with missing cells mapped to NaN, the way a plotting
    /// backend expects gaps.
    pub fn column_or_nan(&self, name: &str) -> Option<Vec<f64>> {
        self.column(name)
            .map(|cells| cells.iter().map(|c| c.unwrap_or(f64::NAN)).collect())
    }

    /// Observed `(min, max)` of the `Time` column, `None` when empty.
    pub fn time_bounds(&self) -> Option<(f64, f64)> {
        let mut iter = self.time.iter().copied();
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }

    /// Build a new table holding only the rows at `indices`, in that order.
    pub fn select_rows(&self, indices: &[usize]) -> Table {
        let time = indices.iter().map(|&i| self.time[i]).collect();
        let columns = self
            .columns
            .iter()
            .map(|(name, cells)| {
                let picked = indices.iter().map(|&i| cells[i]).collect();
                (name.clone(), picked)
            })
            .collect();
        Table {
            time,
            column_names: self.column_names.clone(),
            columns,
            dropped_rows: 0,
        }
    }
}
