use eframe::egui::{Color32, Ui};
use egui_plot::{Legend, Line, Plot, PlotPoints};

use crate::chart::{kde_chart, time_series_chart, ChartSpec, SeriesSpec, YAxis};
use crate::color::Rgb;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Chart area (central panel)
// ---------------------------------------------------------------------------

/// Render both charts in the central panel.
pub fn charts(ui: &mut Ui, state: &mut AppState) {
    if state.graph.metrics_table().is_none() && state.graph.icontrol_table().is_none() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Upload a metrics CSV to begin  (File → Open metrics…)");
        });
        return;
    }

    let view = state.graph.view();
    let time_series = time_series_chart(&view);
    let kde = kde_chart(&view);

    let height = ui.available_height();

    ui.strong("Time Series with Temperature and Volume");
    time_series_plot(ui, &time_series, height * 0.55);
    ui.separator();

    ui.strong("KDE Distribution of Selected Metric");
    Plot::new("kde_plot")
        .legend(Legend::default())
        .height(ui.available_height())
        .x_axis_label(kde.x_axis.title.as_str())
        .y_axis_label(kde.y_axis.title.as_str())
        .show(ui, |plot_ui| {
            for series in &kde.series {
                plot_ui.line(line(series));
            }
        });
}

/// egui_plot axes share one y scale, so the right-axis series get their own
/// plot below the metric, linked on x.
fn time_series_plot(ui: &mut Ui, chart: &ChartSpec, height: f32) {
    let primary: Vec<&SeriesSpec> = chart
        .series
        .iter()
        .filter(|s| s.axis == YAxis::Primary)
        .collect();
    let secondary: Vec<&SeriesSpec> = chart
        .series
        .iter()
        .filter(|s| s.axis == YAxis::Secondary)
        .collect();

    let primary_height = if secondary.is_empty() { height } else { height * 0.6 };

    Plot::new("time_series_metric")
        .legend(Legend::default())
        .height(primary_height)
        .link_axis("time_series_x", [true, false])
        .y_axis_label(chart.y_axis.title.as_str())
        .show(ui, |plot_ui| {
            for series in &primary {
                plot_ui.line(line(series));
            }
        });

    if let Some(axis) = chart.y2_axis.as_ref().filter(|_| !secondary.is_empty()) {
        Plot::new("time_series_overlay")
            .legend(Legend::default())
            .height(height - primary_height)
            .link_axis("time_series_x", [true, false])
            .x_axis_label(chart.x_axis.title.as_str())
            .y_axis_label(axis.title.as_str())
            .show(ui, |plot_ui| {
                for series in &secondary {
                    plot_ui.line(line(series));
                }
            });
    }
}

fn line(series: &SeriesSpec) -> Line {
    // Gaps are not drawn; missing samples are skipped.
    let points: PlotPoints = series
        .points
        .iter()
        .filter(|[x, y]| x.is_finite() && y.is_finite())
        .copied()
        .collect();

    let mut line = Line::new(points).name(&series.name).width(1.5);
    if let Some(color) = series.color {
        line = line.color(to_color32(color));
    }
    line
}

fn to_color32(Rgb(r, g, b): Rgb) -> Color32 {
    Color32::from_rgb(r, g, b)
}
