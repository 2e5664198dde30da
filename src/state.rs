use std::path::Path;

use anyhow::Result;

use crate::chart::ChartExport;
use crate::config::DashboardConfig;
use crate::data::kde::KdeError;
use crate::data::loader;
use crate::graph::{MetricsLoaded, RecomputeGraph};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Inputs, derived values and KDE snapshots of this session.
    pub graph: RecomputeGraph,

    pub config: DashboardConfig,

    /// File name of the current metrics upload.
    pub metrics_file: Option<String>,

    /// File name of the current iControl upload.
    pub icontrol_file: Option<String>,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(DashboardConfig::default())
    }
}

impl AppState {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            graph: RecomputeGraph::new(&config),
            config,
            metrics_file: None,
            icontrol_file: None,
            status_message: None,
        }
    }

    /// Load a metrics CSV. On failure the previous table stays and the
    /// error is shown in the status line.
    pub fn open_metrics(&mut self, path: &Path) {
        match loader::load_file(path) {
            Ok(table) => {
                let loaded = self.graph.set_metrics_table(table);
                self.metrics_file = Some(display_name(path));
                self.status_message = dropped_rows_note(&loaded);
            }
            Err(e) => {
                log::error!("Failed to load metrics file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Load an iControl CSV, same failure policy as [`Self::open_metrics`].
    pub fn open_icontrol(&mut self, path: &Path) {
        match loader::load_file(path) {
            Ok(table) => {
                let dropped = table.dropped_rows;
                self.graph.set_icontrol_table(table);
                self.icontrol_file = Some(display_name(path));
                self.status_message = (dropped > 0)
                    .then(|| format!("{dropped} iControl row(s) without a numeric Time were skipped"));
            }
            Err(e) => {
                log::error!("Failed to load iControl file: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Handle the "Update KDE" button. A rejected snapshot only updates the
    /// status line.
    pub fn update_kde(&mut self) {
        self.status_message = match self.graph.request_kde_snapshot() {
            Ok(_) => None,
            Err(KdeError::InsufficientData { .. }) => {
                Some("Not enough distinct values in this window for a KDE".to_string())
            }
            Err(e) => Some(format!("KDE not updated: {e}")),
        };
    }

    pub fn export_charts(&mut self, path: &Path) -> Result<()> {
        ChartExport::from_view(&self.graph.view()).save(path)
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn dropped_rows_note(loaded: &MetricsLoaded) -> Option<String> {
    (loaded.dropped_rows > 0).then(|| {
        format!(
            "{} metrics row(s) without a numeric Time were skipped",
            loaded.dropped_rows
        )
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn csv_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn open_metrics_reports_dropped_rows() {
        let file = csv_file("Time,Speed\n1,2\nx,3\n4,5\n");
        let mut state = AppState::default();
        state.open_metrics(file.path());

        assert_eq!(state.graph.metrics_table().unwrap().len(), 2);
        assert!(state.metrics_file.is_some());
        assert!(state.status_message.unwrap().contains("1 metrics row(s)"));
    }

    #[test]
    fn failed_open_keeps_previous_table() {
        let good = csv_file("Time,Speed\n1,2\n4,5\n");
        let bad = csv_file("Speed\n1\n");
        let mut state = AppState::default();
        state.open_metrics(good.path());
        state.open_metrics(bad.path());

        assert_eq!(state.graph.metrics_table().unwrap().len(), 2);
        assert!(state.status_message.unwrap().starts_with("Error:"));
    }

    #[test]
    fn degenerate_kde_only_sets_status() {
        let file = csv_file("Time,Flat\n1,5\n2,5\n3,5\n");
        let mut state = AppState::default();
        state.open_metrics(file.path());
        state.update_kde();

        assert!(state.graph.kde_store().is_empty());
        assert!(state.status_message.is_some());
    }

    #[test]
    fn export_writes_both_charts() {
        let file = csv_file("Time,Speed\n1,2\n2,3\n3,5\n");
        let out = tempfile::NamedTempFile::new().unwrap();
        let mut state = AppState::default();
        state.open_metrics(file.path());
        state.update_kde();
        state.export_charts(out.path()).unwrap();

        let text = std::fs::read_to_string(out.path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["kde"]["series"].as_array().unwrap().len(), 1);
        assert_eq!(json["time_series"]["series"][0]["name"], "Raw Speed");
    }
}
