use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::kde::KdeSettings;

/// Environment variable naming an optional JSON config file.
pub const CONFIG_ENV_VAR: &str = "EVENT_VIEWER_CONFIG";

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Startup defaults for a dashboard session. Every field is optional in the
/// JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Initial smoothing window, in samples.
    pub default_smoothing_window: usize,
    /// Upper end of the smoothing slider.
    pub max_smoothing_window: usize,
    /// Evaluation points per KDE curve.
    pub kde_grid_points: usize,
    /// Padding on each side of a KDE curve, as a fraction of the data range.
    pub kde_padding_fraction: f64,
    /// Initial native window size `[width, height]`.
    pub window_size: [f32; 2],
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            default_smoothing_window: 5,
            max_smoothing_window: 100,
            kde_grid_points: 100,
            kde_padding_fraction: 0.1,
            window_size: [1200.0, 800.0],
        }
    }
}

impl DashboardConfig {
    /// Load from the file named by [`CONFIG_ENV_VAR`], or defaults when the
    /// variable is unset.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV_VAR) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        log::info!("Loaded config from {}", path.display());
        Ok(config.sanitized())
    }

    /// Clamp values the rest of the app cannot work with.
    pub fn sanitized(mut self) -> Self {
        self.max_smoothing_window = self.max_smoothing_window.max(1);
        self.default_smoothing_window = self
            .default_smoothing_window
            .clamp(1, self.max_smoothing_window);
        self.kde_grid_points = self.kde_grid_points.max(2);
        if !self.kde_padding_fraction.is_finite() || self.kde_padding_fraction < 0.0 {
            self.kde_padding_fraction = 0.0;
        }
        self
    }

    pub fn kde_settings(&self) -> KdeSettings {
        KdeSettings {
            grid_points: self.kde_grid_points,
            padding_fraction: self.kde_padding_fraction,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "default_smoothing_window": 12, "kde_grid_points": 50 }}"#).unwrap();

        let config = DashboardConfig::load(file.path()).unwrap();
        assert_eq!(config.default_smoothing_window, 12);
        assert_eq!(config.kde_grid_points, 50);
        assert_eq!(config.max_smoothing_window, 100);
        assert_eq!(config.kde_padding_fraction, 0.1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = DashboardConfig::load(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("parsing config"));
    }

    #[test]
    fn sanitize_clamps_unusable_values() {
        let config = DashboardConfig {
            default_smoothing_window: 0,
            max_smoothing_window: 0,
            kde_grid_points: 1,
            kde_padding_fraction: -1.0,
            ..DashboardConfig::default()
        }
        .sanitized();
        assert_eq!(config.default_smoothing_window, 1);
        assert_eq!(config.max_smoothing_window, 1);
        assert_eq!(config.kde_grid_points, 2);
        assert_eq!(config.kde_padding_fraction, 0.0);
    }
}
