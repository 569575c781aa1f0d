#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod ui;

fn main() -> eframe::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fleet_timeline=info,warn")),
        )
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1440.0, 810.0])
            .with_min_inner_size([900.0, 480.0])
            .with_title("Fleet Timeline"),
        ..Default::default()
    };

    eframe::run_native(
        "Fleet Timeline",
        options,
        Box::new(|cc| Ok(Box::new(app::FleetApp::new(cc)))),
    )
}
