//! Gaussian kernel density estimates and the snapshot store that collects
//! them.

use std::f64::consts::PI;

use serde::Serialize;
use thiserror::Error;

use super::filter::TimeRange;

#[derive(Debug, Error, PartialEq)]
pub enum KdeError {
    #[error("no column selected")]
    NoColumnSelected,
    #[error("column '{0}' is not in the metrics table")]
    UnknownColumn(String),
    #[error("not enough spread for a density estimate ({distinct} distinct value(s))")]
    InsufficientData { distinct: usize },
}

/// Grid used when evaluating an estimate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KdeSettings {
    /// Number of evenly spaced evaluation points.
    pub grid_points: usize,
    /// Padding added on both sides of the data range, as a fraction of it.
    pub padding_fraction: f64,
}

impl Default for KdeSettings {
    fn default() -> Self {
        Self {
            grid_points: 100,
            padding_fraction: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// Estimator
// ---------------------------------------------------------------------------

/// Gaussian KDE with Scott's rule bandwidth.
#[derive(Debug, Clone)]
pub struct GaussianKde {
    samples: Vec<f64>,
    bandwidth: f64,
    distinct: usize,
}

impl GaussianKde {
    /// Fit to the finite values in `values`.
    pub fn fit(values: &[f64]) -> Result<Self, KdeError> {
        let samples: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        let distinct = count_distinct(&samples);
        if distinct < 2 {
            return Err(KdeError::InsufficientData { distinct });
        }

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        let scott_factor = n.powf(-1.0 / 5.0);
        let bandwidth = variance.sqrt() * scott_factor;
        if !(bandwidth.is_finite() && bandwidth > 0.0) {
            return Err(KdeError::InsufficientData { distinct });
        }

        Ok(Self {
            bandwidth,
            samples,
            distinct,
        })
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth
    }

    /// Density at `x`.
    pub fn density(&self, x: f64) -> f64 {
        let h = self.bandwidth;
        let norm = 1.0 / (self.samples.len() as f64 * h * (2.0 * PI).sqrt());
        let sum: f64 = self
            .samples
            .iter()
            .map(|&xi| {
                let z = (x - xi) / h;
                (-0.5 * z * z).exp()
            })
            .sum();
        norm * sum
    }

    /// Evaluation grid spanning the sample range plus padding.
    pub fn grid(&self, settings: KdeSettings) -> Vec<f64> {
        let lo = self.samples.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = self.samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let pad = settings.padding_fraction * (hi - lo);
        linspace(lo - pad, hi + pad, settings.grid_points.max(2))
    }
}

fn count_distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup();
    sorted.len()
}

fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    let step = (end - start) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == n - 1 { end } else { start + step * i as f64 })
        .collect()
}

// ---------------------------------------------------------------------------
// Snapshots
// ---------------------------------------------------------------------------

/// One density curve, frozen at the moment it was requested.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KdeTrace {
    pub x_values: Vec<f64>,
    pub y_values: Vec<f64>,
    pub column: String,
    pub time_window: TimeRange,
}

impl KdeTrace {
    pub fn label(&self) -> String {
        format!("{} @ Time {}", self.column, self.time_window)
    }
}

/// Append-only list of density snapshots, in request order.
#[derive(Debug, Clone, Default)]
pub struct KdeSnapshotStore {
    traces: Vec<KdeTrace>,
    settings: KdeSettings,
}

impl KdeSnapshotStore {
    pub fn new(settings: KdeSettings) -> Self {
        Self {
            traces: Vec::new(),
            settings,
        }
    }

    /// Estimate the density of `values` and append it. Nothing is appended
    /// on error, including when the curve cannot be evaluated.
    pub fn snapshot(
        &mut self,
        values: &[f64],
        column: &str,
        time_window: TimeRange,
    ) -> Result<&KdeTrace, KdeError> {
        let kde = GaussianKde::fit(values)?;
        let x_values = kde.grid(self.settings);
        let y_values: Vec<f64> = x_values.iter().map(|&x| kde.density(x)).collect();
        if y_values.iter().any(|y| !y.is_finite()) {
            log::warn!("density of '{column}' over {time_window} is not finite, snapshot skipped");
            return Err(KdeError::InsufficientData {
                distinct: kde.distinct,
            });
        }

        log::info!(
            "KDE snapshot #{} for '{column}' over {time_window} (bandwidth {:.4})",
            self.traces.len() + 1,
            kde.bandwidth()
        );

        self.traces.push(KdeTrace {
            x_values,
            y_values,
            column: column.to_string(),
            time_window,
        });
        Ok(&self.traces[self.traces.len() - 1])
    }

    /// Snapshots taken for `column`, oldest first.
    pub fn traces_for<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a KdeTrace> + 'a {
        self.traces.iter().filter(move |t| t.column == column)
    }

    pub fn len(&self) -> usize {
        self.traces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.traces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(a: f64, b: f64) -> TimeRange {
        TimeRange::new(a, b).unwrap()
    }

    #[test]
    fn scott_bandwidth() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let kde = GaussianKde::fit(&values).unwrap();
        // sample std = sqrt(2.5), factor = 5^(-1/5)
        let expected = 2.5f64.sqrt() * 5f64.powf(-0.2);
        assert!((kde.bandwidth() - expected).abs() < 1e-12);
    }

    #[test]
    fn density_integrates_to_about_one() {
        let values = [0.0, 1.0, 1.5, 2.0, 4.0];
        let kde = GaussianKde::fit(&values).unwrap();
        let settings = KdeSettings {
            grid_points: 2001,
            padding_fraction: 3.0,
        };
        let xs = kde.grid(settings);
        let dx = xs[1] - xs[0];
        let area: f64 = xs.iter().map(|&x| kde.density(x) * dx).sum();
        assert!((area - 1.0).abs() < 1e-3, "area {area}");
    }

    #[test]
    fn grid_spans_padded_range() {
        let mut store = KdeSnapshotStore::default();
        let trace = store
            .snapshot(&[10.0, 20.0, f64::NAN, 15.0], "speed", window(0.0, 5.0))
            .unwrap();
        assert_eq!(trace.x_values.len(), 100);
        assert_eq!(trace.y_values.len(), 100);
        assert!((trace.x_values[0] - 9.0).abs() < 1e-12);
        assert!((trace.x_values[99] - 21.0).abs() < 1e-12);
        assert!(trace.y_values.iter().all(|y| *y > 0.0));
    }

    #[test]
    fn constant_values_are_rejected_without_appending() {
        let mut store = KdeSnapshotStore::default();
        let err = store
            .snapshot(&[5.0, 5.0, 5.0, f64::NAN], "speed", window(0.0, 1.0))
            .unwrap_err();
        assert_eq!(err, KdeError::InsufficientData { distinct: 1 });
        assert!(store.is_empty());

        let err = store.snapshot(&[], "speed", window(0.0, 1.0)).unwrap_err();
        assert_eq!(err, KdeError::InsufficientData { distinct: 0 });
        assert!(store.is_empty());
    }

    #[test]
    fn vanishing_spread_is_rejected_without_appending() {
        let mut store = KdeSnapshotStore::default();
        let err = store
            .snapshot(&[0.0, 5e-324, 0.0], "speed", window(0.0, 1.0))
            .unwrap_err();
        assert_eq!(err, KdeError::InsufficientData { distinct: 2 });
        assert!(store.is_empty());
    }

    #[test]
    fn traces_filtered_by_column_in_insertion_order() {
        let mut store = KdeSnapshotStore::default();
        store.snapshot(&[1.0, 2.0], "a", window(0.0, 1.0)).unwrap();
        store.snapshot(&[1.0, 3.0], "b", window(0.0, 2.0)).unwrap();
        store.snapshot(&[2.0, 3.0], "a", window(1.0, 3.0)).unwrap();

        let windows: Vec<f64> = store.traces_for("a").map(|t| t.time_window.max()).collect();
        assert_eq!(windows, vec![1.0, 3.0]);
        assert_eq!(store.traces_for("b").count(), 1);
        assert_eq!(store.traces_for("A").count(), 0);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn label_names_column_and_window() {
        let trace = KdeTrace {
            x_values: vec![],
            y_values: vec![],
            column: "speed".into(),
            time_window: window(10.0, 40.5),
        };
        assert_eq!(trace.label(), "speed @ Time 10–40.5");
    }
}
