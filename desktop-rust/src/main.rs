mod app;
mod io;
mod model;

use answer_review_common::Config;
use app::{DesktopApp, configure_fonts};
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> eframe::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load().unwrap_or_else(|err| {
        warn!("Failed to load config, using defaults: {}", err);
        Config::default()
    });

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        "Answer Review",
        options,
        Box::new(move |cc| {
            configure_fonts(&cc.egui_ctx);
            let app: Box<dyn eframe::App> = match DesktopApp::open(config) {
                Ok(app) => Box::new(app),
                Err(err) => Box::new(app::StartupError(format!("{err:#}"))),
            };
            app
        }),
    )
}
