use eframe::egui::{self, Color32, RichText, Ui};

use crate::data::filter::TimeRange;
use crate::data::series::DisplayMode;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – uploads and controls
// ---------------------------------------------------------------------------

/// Render the left control panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Controls");
    ui.separator();

    // ---- Uploads ----
    if ui.button("Upload Event Tracking Metrics CSV…").clicked() {
        if let Some(path) = pick_csv("Open event tracking metrics") {
            state.open_metrics(&path);
        }
    }
    file_label(ui, state.metrics_file.as_deref());

    if ui.button("Upload iControl Data CSV…").clicked() {
        if let Some(path) = pick_csv("Open iControl data") {
            state.open_icontrol(&path);
        }
    }
    file_label(ui, state.icontrol_file.as_deref());
    ui.separator();

    // ---- Column selector ----
    ui.strong("Select Data Column");
    let choices = state.graph.column_choices().to_vec();
    let current = state.graph.selected_column().unwrap_or_default().to_string();
    egui::ComboBox::from_id_salt("selected_column")
        .selected_text(&current)
        .show_ui(ui, |ui: &mut Ui| {
            for col in &choices {
                if ui.selectable_label(current == *col, col).clicked() {
                    state.graph.set_selected_column(Some(col.clone()));
                }
            }
        });
    ui.add_space(6.0);

    // ---- Time range ----
    ui.strong("Select Time Range");
    let bounds = state.graph.time_bounds().unwrap_or_default();
    let range = state.graph.time_range();
    let (mut from, mut to) = (range.min(), range.max());
    let from_changed = ui
        .add(egui::Slider::new(&mut from, bounds.min()..=bounds.max()).text("from"))
        .changed();
    let to_changed = ui
        .add(egui::Slider::new(&mut to, bounds.min()..=bounds.max()).text("to"))
        .changed();
    if from_changed || to_changed {
        if let Some(range) = TimeRange::new(from, to) {
            state.graph.set_time_range(range);
        }
    }
    ui.add_space(6.0);

    // ---- Smoothing ----
    ui.strong("Smoothing Window Size");
    let mut window = state.graph.smoothing_window();
    if ui
        .add(egui::Slider::new(&mut window, 1..=state.config.max_smoothing_window))
        .changed()
    {
        state.graph.set_smoothing_window(window);
    }
    ui.add_space(6.0);

    // ---- Display mode ----
    ui.strong("Select Plot Type");
    let mut mode = state.graph.display_mode();
    for option in DisplayMode::ALL {
        ui.radio_value(&mut mode, option, option.label());
    }
    state.graph.set_display_mode(mode);
    ui.separator();

    if ui.button("Update KDE").clicked() {
        state.update_kde();
    }
    ui.label(format!("{} KDE snapshot(s) taken", state.graph.kde_store().len()));
}

fn file_label(ui: &mut Ui, name: Option<&str>) {
    match name {
        Some(name) => ui.label(RichText::new(name).small()),
        None => ui.label(RichText::new("no file").small().weak()),
    };
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open metrics…").clicked() {
                if let Some(path) = pick_csv("Open event tracking metrics") {
                    state.open_metrics(&path);
                }
                ui.close_menu();
            }
            if ui.button("Open iControl…").clicked() {
                if let Some(path) = pick_csv("Open iControl data") {
                    state.open_icontrol(&path);
                }
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Export charts…").clicked() {
                export_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let Some(total) = state.graph.metrics_table().map(|t| t.len()) {
            let visible = state.graph.filtered_metrics().len();
            ui.label(format!("{total} metric rows loaded, {visible} in window"));
        }

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn pick_csv(title: &str) -> Option<std::path::PathBuf> {
    rfd::FileDialog::new()
        .set_title(title)
        .add_filter("CSV", &["csv"])
        .pick_file()
}

fn export_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export charts")
        .add_filter("JSON", &["json"])
        .set_file_name("charts.json")
        .save_file();

    if let Some(path) = file {
        if let Err(e) = state.export_charts(&path) {
            log::error!("Failed to export charts: {e:#}");
            state.status_message = Some(format!("Error: {e:#}"));
        }
    }
}
