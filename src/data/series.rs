use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::model::Table;

/// How the selected column is transformed before plotting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DisplayMode {
    #[default]
    Raw,
    Smoothed,
    /// Currently the same transform as `Smoothed`.
    Filtered,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 3] = [DisplayMode::Raw, DisplayMode::Smoothed, DisplayMode::Filtered];

    pub fn label(&self) -> &'static str {
        match self {
            DisplayMode::Raw => "Raw",
            DisplayMode::Smoothed => "Smoothed",
            DisplayMode::Filtered => "Filtered",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ---------------------------------------------------------------------------
// Trailing mean
// ---------------------------------------------------------------------------

/// Trailing mean over up to `window` samples with a shrinking window at the
/// start. Missing samples are skipped; a window with nothing present gives
/// NaN.
///
/// Every output is summed afresh from the cells currently in the window.
#[derive(Debug, Clone)]
struct TrailingMean {
    window: VecDeque<Option<f64>>,
    period: usize,
}

impl TrailingMean {
    fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            window: VecDeque::with_capacity(period),
            period,
        }
    }

    fn update(&mut self, sample: Option<f64>) -> f64 {
        self.window.push_back(sample);
        if self.window.len() > self.period {
            self.window.pop_front();
        }
        let (sum, present) = self
            .window
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        if present == 0 {
            f64::NAN
        } else {
            sum / present as f64
        }
    }
}

/// Smooth `cells` with a trailing mean of `window` samples.
pub fn rolling_mean(cells: &[Option<f64>], window: usize) -> Vec<f64> {
    let mut mean = TrailingMean::new(window);
    cells.iter().map(|&c| mean.update(c)).collect()
}

// ---------------------------------------------------------------------------
// Series processing
// ---------------------------------------------------------------------------

/// Values to plot for `column` of an already time-filtered table.
///
/// Returns an empty vector when the table is empty or lacks the column.
pub fn process(table: &Table, column: &str, mode: DisplayMode, window: usize) -> Vec<f64> {
    if table.is_empty() {
        return Vec::new();
    }
    let Some(cells) = table.column(column) else {
        return Vec::new();
    };
    match mode {
        DisplayMode::Raw => cells.iter().map(|c| c.unwrap_or(f64::NAN)).collect(),
        DisplayMode::Smoothed | DisplayMode::Filtered => rolling_mean(cells, window),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(values: &[f64]) -> Table {
        let mut t = Table::empty_with_columns(vec!["x".into()]);
        t.time = (0..values.len()).map(|i| i as f64).collect();
        t.columns
            .insert("x".into(), values.iter().copied().map(Some).collect());
        t
    }

    #[test]
    fn raw_passes_values_through() {
        let t = table(&[3.0, 1.0, 4.0]);
        assert_eq!(process(&t, "x", DisplayMode::Raw, 5), vec![3.0, 1.0, 4.0]);
    }

    #[test]
    fn smoothing_uses_shrinking_window_at_start() {
        let t = table(&[2.0, 4.0, 6.0, 8.0, 10.0]);
        let out = process(&t, "x", DisplayMode::Smoothed, 3);
        assert_eq!(out, vec![2.0, 3.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn first_output_equals_first_value_for_any_window() {
        let t = table(&[7.5, 1.0, 2.0]);
        for w in 1..=10 {
            let out = process(&t, "x", DisplayMode::Smoothed, w);
            assert_eq!(out.len(), 3);
            assert_eq!(out[0], 7.5, "window {w}");
        }
    }

    #[test]
    fn trailing_mean_after_warmup() {
        let values: Vec<f64> = (0..20).map(|i| ((i * 7) % 11) as f64).collect();
        let t = table(&values);
        let w = 4;
        let out = process(&t, "x", DisplayMode::Smoothed, w);
        for i in (w - 1)..values.len() {
            let expected: f64 = values[i + 1 - w..=i].iter().sum::<f64>() / w as f64;
            assert!((out[i] - expected).abs() < 1e-12, "index {i}");
        }
    }

    #[test]
    fn filtered_matches_smoothed() {
        let t = table(&[1.0, 5.0, 2.0, 8.0]);
        assert_eq!(
            process(&t, "x", DisplayMode::Filtered, 2),
            process(&t, "x", DisplayMode::Smoothed, 2)
        );
    }

    #[test]
    fn window_of_one_is_identity() {
        let t = table(&[1.0, 5.0, 2.0]);
        assert_eq!(process(&t, "x", DisplayMode::Smoothed, 1), vec![1.0, 5.0, 2.0]);
        assert_eq!(process(&t, "x", DisplayMode::Smoothed, 0), vec![1.0, 5.0, 2.0]);
    }

    #[test]
    fn missing_cells_are_skipped_in_window() {
        let out = rolling_mean(&[None, Some(2.0), None, Some(4.0), None, None], 2);
        assert!(out[0].is_nan());
        assert_eq!(out[1], 2.0);
        assert_eq!(out[2], 2.0);
        assert_eq!(out[3], 4.0);
        assert_eq!(out[4], 4.0);
        assert!(out[5].is_nan());
    }

    #[test]
    fn outlier_does_not_linger_after_leaving_window() {
        let cells = [Some(1e17), Some(1.0), Some(2.0), Some(3.0)];
        assert_eq!(rolling_mean(&cells, 1), vec![1e17, 1.0, 2.0, 3.0]);

        let mut values = vec![1e17];
        values.extend((0..200).map(|i| 1e6 + (i % 7) as f64 * 0.1));
        let cells: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        let w = 5;
        let out = rolling_mean(&cells, w);
        for i in w..values.len() {
            let window = &values[i + 1 - w..=i];
            let expected = window.iter().sum::<f64>() / w as f64;
            assert_eq!(out[i], expected, "index {i}");
        }
    }

    #[test]
    fn absent_column_or_empty_table_gives_nothing() {
        let t = table(&[1.0, 2.0]);
        assert!(process(&t, "nope", DisplayMode::Smoothed, 3).is_empty());
        assert!(process(&Table::default(), "x", DisplayMode::Raw, 3).is_empty());
    }
}
