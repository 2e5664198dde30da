use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

use super::model::{coerce_numeric, Table, TIME_COLUMN};

/// Reasons an upload is rejected. The previously loaded table is kept.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not parse CSV: {0}")]
    Parse(#[from] csv::Error),
    #[error("CSV has no 'Time' column")]
    MissingTimeColumn,
}

// ---------------------------------------------------------------------------
// Public entry-points
// ---------------------------------------------------------------------------

/// Parse an uploaded metrics file.
pub fn load_metrics(bytes: &[u8]) -> Result<Table, LoadError> {
    load_table(bytes)
}

/// Parse an uploaded iControl file. Same layout rules as metrics; the
/// `Temperature` and `Volume` columns are optional.
pub fn load_icontrol(bytes: &[u8]) -> Result<Table, LoadError> {
    load_table(bytes)
}

/// Read a CSV file from disk and parse it.
pub fn load_file(path: &Path) -> Result<Table> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("reading {}", path.display()))?;
    let table = load_table(&bytes).with_context(|| format!("loading {}", path.display()))?;
    Ok(table)
}

// ---------------------------------------------------------------------------
// CSV parser
// ---------------------------------------------------------------------------

/// CSV layout: header row with a `Time` column plus any number of numeric
/// columns. Rows whose `Time` field is not a finite number are dropped and
/// counted in [`Table::dropped_rows`]; other non-numeric cells become
/// missing values.
pub fn load_table(bytes: &[u8]) -> Result<Table, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let raw_headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let time_idx = raw_headers
        .iter()
        .position(|h| h == TIME_COLUMN)
        .ok_or(LoadError::MissingTimeColumn)?;

    // (field index, unique column name) for every non-Time column.
    let value_cols = dedupe_headers(&raw_headers, time_idx);
    let column_names: Vec<String> = value_cols.iter().map(|(_, name)| name.clone()).collect();

    let mut time = Vec::new();
    let mut cells: Vec<Vec<Option<f64>>> = vec![Vec::new(); value_cols.len()];
    let mut dropped_rows = 0;

    for result in reader.records() {
        let record = result?;
        let Some(t) = record.get(time_idx).and_then(coerce_numeric) else {
            dropped_rows += 1;
            continue;
        };
        time.push(t);
        for (slot, (field_idx, _)) in cells.iter_mut().zip(&value_cols) {
            slot.push(record.get(*field_idx).and_then(coerce_numeric));
        }
    }

    if dropped_rows > 0 {
        log::warn!("Dropped {dropped_rows} row(s) with a non-numeric '{TIME_COLUMN}' value");
    }
    log::debug!(
        "Parsed {} row(s) with columns {:?}",
        time.len(),
        column_names
    );

    let columns: BTreeMap<String, Vec<Option<f64>>> =
        column_names.iter().cloned().zip(cells).collect();

    Ok(Table {
        time,
        column_names,
        columns,
        dropped_rows,
    })
}

/// Give repeated header names a `.N` suffix so every column stays
/// addressable.
fn dedupe_headers(headers: &[String], time_idx: usize) -> Vec<(usize, String)> {
    let mut seen: BTreeMap<&str, usize> = BTreeMap::new();
    seen.insert(TIME_COLUMN, 1);
    let mut out = Vec::with_capacity(headers.len().saturating_sub(1));

    for (idx, name) in headers.iter().enumerate() {
        if idx == time_idx {
            continue;
        }
        let count = seen.entry(name.as_str()).or_insert(0);
        let unique = if *count == 0 {
            name.clone()
        } else {
            format!("{name}.{count}")
        };
        *count += 1;
        out.push((idx, unique));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_time_and_value_columns() {
        let csv = b"Time,Speed,Area\n1,0.5,10\n2,0.7,\n3,abc,12\n";
        let table = load_table(csv).unwrap();

        assert_eq!(table.time, vec![1.0, 2.0, 3.0]);
        assert_eq!(table.column_names, vec!["Speed", "Area"]);
        assert_eq!(table.column("Speed").unwrap(), &[Some(0.5), Some(0.7), None]);
        assert_eq!(table.column("Area").unwrap(), &[Some(10.0), None, Some(12.0)]);
        assert_eq!(table.dropped_rows, 0);
    }

    #[test]
    fn drops_and_counts_rows_with_bad_time() {
        let csv = b"Time,Speed\n1,0.5\n,0.6\nnoon,0.7\n4,0.8\n";
        let table = load_table(csv).unwrap();

        assert_eq!(table.time, vec![1.0, 4.0]);
        assert_eq!(table.column("Speed").unwrap(), &[Some(0.5), Some(0.8)]);
        assert_eq!(table.dropped_rows, 2);
    }

    #[test]
    fn time_column_need_not_be_first() {
        let csv = b"Speed, Time \n0.5, 10\n0.6, 20\n";
        let table = load_table(csv).unwrap();
        assert_eq!(table.time, vec![10.0, 20.0]);
        assert_eq!(table.column_names, vec!["Speed"]);
    }

    #[test]
    fn missing_time_column_is_rejected() {
        let err = load_table(b"Speed,Area\n1,2\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingTimeColumn));

        let err = load_table(b"").unwrap_err();
        assert!(matches!(err, LoadError::MissingTimeColumn));
    }

    #[test]
    fn ragged_rows_are_a_parse_error() {
        let err = load_table(b"Time,Speed\n1,2\n3,4,5\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn invalid_utf8_is_a_parse_error() {
        let err = load_table(b"Time,Speed\n1,\xff\xfe\n").unwrap_err();
        assert!(matches!(err, LoadError::Parse(_)));
    }

    #[test]
    fn duplicate_headers_get_suffixes() {
        let table = load_table(b"Time,a,a,b\n1,2,3,4\n").unwrap();
        assert_eq!(table.column_names, vec!["a", "a.1", "b"]);
        assert_eq!(table.column("a.1").unwrap(), &[Some(3.0)]);
    }

    #[test]
    fn load_file_reports_missing_path() {
        let err = load_file(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(format!("{err:#}").contains("reading"));
    }
}
