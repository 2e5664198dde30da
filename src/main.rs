use eframe::egui;
use event_viewer::app::EventViewerApp;
use event_viewer::config::DashboardConfig;

fn main() -> eframe::Result {
    env_logger::init();

    let config = DashboardConfig::from_env().unwrap_or_else(|e| {
        log::error!("Falling back to default config: {e:#}");
        DashboardConfig::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(config.window_size)
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Event Tracking Visualization",
        options,
        Box::new(|_cc| Ok(Box::new(EventViewerApp::new(config)))),
    )
}
