//! Declarative descriptions of the two dashboard charts.
//!
//! Nothing here holds state: each chart is a projection of a [`GraphView`].

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::color::{generate_palette, Rgb, METRIC_BLUE, TEMPERATURE_ORANGE, VOLUME_GREEN};
use crate::data::model::Table;
use crate::graph::GraphView;

pub const TEMPERATURE_COLUMN: &str = "Temperature";
pub const VOLUME_COLUMN: &str = "Volume";

// ---------------------------------------------------------------------------
// Chart description types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum YAxis {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Anchor {
    Left,
    Top,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSpec {
    pub title: String,
    pub side: Side,
    /// Title and tick colour.
    pub color: Option<Rgb>,
    /// Fraction of the plot width this axis spans.
    pub domain: Option<[f64; 2]>,
    /// Free position along the x domain, for an overlaying axis.
    pub position: Option<f64>,
}

impl AxisSpec {
    fn titled(title: impl Into<String>, side: Side) -> Self {
        Self {
            title: title.into(),
            side,
            color: None,
            domain: None,
            position: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSpec {
    pub name: String,
    pub axis: YAxis,
    pub color: Option<Rgb>,
    /// `[x, y]` pairs; NaN `y` marks a gap.
    pub points: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendSpec {
    pub x: f64,
    pub y: f64,
    pub x_anchor: Anchor,
    pub y_anchor: Anchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Margin {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub title: Option<String>,
    pub x_axis: AxisSpec,
    pub y_axis: AxisSpec,
    /// Independent right-hand axis, overlaying the primary one.
    pub y2_axis: Option<AxisSpec>,
    pub series: Vec<SeriesSpec>,
    pub legend: Option<LegendSpec>,
    pub margin: Margin,
}

impl ChartSpec {
    pub fn series_named(&self, name: &str) -> Option<&SeriesSpec> {
        self.series.iter().find(|s| s.name == name)
    }
}

// ---------------------------------------------------------------------------
// Time series chart
// ---------------------------------------------------------------------------

/// Selected metric on the left axis, Temperature and Volume on the right.
pub fn time_series_chart(view: &GraphView<'_>) -> ChartSpec {
    let column = view.selected_column.unwrap_or_default();
    let mut series = Vec::with_capacity(3);

    let overlays = [
        (TEMPERATURE_COLUMN, TEMPERATURE_ORANGE),
        (VOLUME_COLUMN, VOLUME_GREEN),
    ];
    for (name, color) in overlays {
        if let Some(points) = column_points(view.filtered_icontrol, name) {
            series.push(SeriesSpec {
                name: name.to_string(),
                axis: YAxis::Secondary,
                color: Some(color),
                points,
            });
        }
    }

    let metrics = view.filtered_metrics;
    if !metrics.is_empty() && metrics.has_column(column) && !view.processed_series.is_empty() {
        series.push(SeriesSpec {
            name: format!("{} {column}", view.display_mode),
            axis: YAxis::Primary,
            color: Some(METRIC_BLUE),
            points: metrics
                .time
                .iter()
                .zip(view.processed_series)
                .map(|(&t, &y)| [t, y])
                .collect(),
        });
    }

    ChartSpec {
        title: None,
        x_axis: AxisSpec::titled("Time [hour]", Side::Bottom),
        y_axis: AxisSpec {
            color: Some(METRIC_BLUE),
            domain: Some([0.0, 0.85]),
            ..AxisSpec::titled(column, Side::Left)
        },
        y2_axis: Some(AxisSpec {
            color: Some(TEMPERATURE_ORANGE),
            position: Some(0.86),
            ..AxisSpec::titled("Temperature / Volume", Side::Right)
        }),
        series,
        legend: Some(LegendSpec {
            x: 1.05,
            y: 1.0,
            x_anchor: Anchor::Left,
            y_anchor: Anchor::Top,
        }),
        margin: Margin {
            left: 50,
            right: 180,
            top: 50,
            bottom: 50,
        },
    }
}

/// `(Time, value)` pairs of a column, `None` when the table is empty or the
/// column is absent.
fn column_points(table: &Table, column: &str) -> Option<Vec<[f64; 2]>> {
    if table.is_empty() {
        return None;
    }
    let values = table.column_or_nan(column)?;
    Some(table.time.iter().zip(values).map(|(&t, y)| [t, y]).collect())
}

// ---------------------------------------------------------------------------
// KDE chart
// ---------------------------------------------------------------------------

/// One density line per stored snapshot of the selected column.
pub fn kde_chart(view: &GraphView<'_>) -> ChartSpec {
    let column = view.selected_column.unwrap_or_default();
    let traces: Vec<_> = view.kde.traces_for(column).collect();
    let colors = generate_palette(traces.len());

    let series = traces
        .iter()
        .zip(colors)
        .map(|(trace, color)| SeriesSpec {
            name: trace.label(),
            axis: YAxis::Primary,
            color: Some(color),
            points: trace
                .x_values
                .iter()
                .zip(&trace.y_values)
                .map(|(&x, &y)| [x, y])
                .collect(),
        })
        .collect();

    ChartSpec {
        title: Some("KDE Distribution".to_string()),
        x_axis: AxisSpec::titled(column, Side::Bottom),
        y_axis: AxisSpec::titled("Density", Side::Left),
        y2_axis: None,
        series,
        legend: None,
        margin: Margin {
            left: 40,
            right: 40,
            top: 40,
            bottom: 40,
        },
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Both charts, as written by "Export charts…".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartExport {
    pub time_series: ChartSpec,
    pub kde: ChartSpec,
}

impl ChartExport {
    pub fn from_view(view: &GraphView<'_>) -> Self {
        Self {
            time_series: time_series_chart(view),
            kde: kde_chart(view),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing charts")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = self.to_json()?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        log::info!("Exported charts to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::filter::TimeRange;
    use crate::data::kde::KdeSnapshotStore;
    use crate::data::series::DisplayMode;

    fn table(time: &[f64], columns: Vec<(&str, Vec<f64>)>) -> Table {
        let mut t = Table::empty_with_columns(columns.iter().map(|(n, _)| n.to_string()).collect());
        t.time = time.to_vec();
        for (name, values) in columns {
            t.columns
                .insert(name.to_string(), values.into_iter().map(Some).collect());
        }
        t
    }

    fn view<'a>(
        metrics: &'a Table,
        icontrol: &'a Table,
        series: &'a [f64],
        kde: &'a KdeSnapshotStore,
        column: Option<&'a str>,
    ) -> GraphView<'a> {
        GraphView {
            filtered_metrics: metrics,
            filtered_icontrol: icontrol,
            processed_series: series,
            selected_column: column,
            display_mode: DisplayMode::Smoothed,
            time_range: TimeRange::default(),
            kde,
        }
    }

    #[test]
    fn three_series_on_two_axes() {
        let metrics = table(&[1.0, 2.0], vec![("Speed", vec![1.0, 2.0])]);
        let icontrol = table(
            &[1.0, 2.0],
            vec![("Temperature", vec![37.0, 38.0]), ("Volume", vec![5.0, 6.0])],
        );
        let kde = KdeSnapshotStore::default();
        let series = [1.0, 1.5];
        let chart = time_series_chart(&view(&metrics, &icontrol, &series, &kde, Some("Speed")));

        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Temperature", "Volume", "Smoothed Speed"]);

        let metric = chart.series_named("Smoothed Speed").unwrap();
        assert_eq!(metric.axis, YAxis::Primary);
        assert_eq!(metric.points, vec![[1.0, 1.0], [2.0, 1.5]]);
        assert_eq!(chart.series_named("Volume").unwrap().axis, YAxis::Secondary);

        assert_eq!(chart.y_axis.title, "Speed");
        assert_eq!(chart.y_axis.domain, Some([0.0, 0.85]));
        let y2 = chart.y2_axis.unwrap();
        assert_eq!(y2.title, "Temperature / Volume");
        assert_eq!(y2.color, Some(TEMPERATURE_ORANGE));
    }

    #[test]
    fn absent_overlay_columns_are_omitted() {
        let metrics = Table::default();
        let icontrol = table(&[1.0], vec![("Temperature", vec![37.0])]);
        let kde = KdeSnapshotStore::default();
        let chart = time_series_chart(&view(&metrics, &icontrol, &[], &kde, None));

        assert!(chart.series_named("Temperature").is_some());
        assert!(chart.series_named("Volume").is_none());
        assert_eq!(chart.series.len(), 1);
    }

    #[test]
    fn unknown_metric_column_is_omitted() {
        let metrics = table(&[1.0], vec![("Speed", vec![1.0])]);
        let icontrol = Table::default();
        let kde = KdeSnapshotStore::default();
        let chart = time_series_chart(&view(&metrics, &icontrol, &[], &kde, Some("Area")));
        assert!(chart.series.is_empty());
    }

    #[test]
    fn kde_chart_shows_selected_column_only() {
        let mut kde = KdeSnapshotStore::default();
        let w = TimeRange::new(0.0, 10.0).unwrap();
        kde.snapshot(&[1.0, 2.0, 3.0], "Speed", w).unwrap();
        kde.snapshot(&[1.0, 5.0], "Area", w).unwrap();
        kde.snapshot(&[2.0, 3.0], "Speed", TimeRange::new(5.0, 10.0).unwrap())
            .unwrap();

        let empty = Table::default();
        let chart = kde_chart(&view(&empty, &empty, &[], &kde, Some("Speed")));
        let names: Vec<&str> = chart.series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Speed @ Time 0–10", "Speed @ Time 5–10"]);
        assert_eq!(chart.series[0].points.len(), 100);
        assert_eq!(chart.x_axis.title, "Speed");
        assert_eq!(chart.y_axis.title, "Density");
        assert_ne!(chart.series[0].color, chart.series[1].color);
    }

    #[test]
    fn export_is_json_with_gaps_as_null() {
        let metrics = Table::default();
        let mut icontrol = table(&[1.0, 2.0], vec![("Temperature", vec![37.0, 0.0])]);
        icontrol
            .columns
            .insert("Temperature".into(), vec![Some(37.0), None]);
        let kde = KdeSnapshotStore::default();
        let export = ChartExport::from_view(&view(&metrics, &icontrol, &[], &kde, None));

        let json: serde_json::Value = serde_json::from_str(&export.to_json().unwrap()).unwrap();
        let points = &json["time_series"]["series"][0]["points"];
        assert_eq!(points[0][1], 37.0);
        assert!(points[1][1].is_null());
        assert_eq!(json["kde"]["title"], "KDE Distribution");
        assert_eq!(json["time_series"]["y2_axis"]["color"], "#ffa500");
    }
}
