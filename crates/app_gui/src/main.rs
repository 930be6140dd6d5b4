use anyhow::{Result, anyhow};
use eframe::{NativeOptions, egui};
use lesion_core::ClientConfig;

mod app;

use app::UiApp;

fn main() {
    tracing_subscriber::fmt::init();
    if let Err(e) = run() {
        tracing::error!("Application stopped with error: {e:#}");
        eprintln!("Application stopped with error: {e:#}");
    }
}

fn run() -> Result<()> {
    let config = ClientConfig::load()?;
    let app = UiApp::new(config)?;

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([460.0, 680.0])
            .with_min_inner_size([360.0, 420.0]),
        ..Default::default()
    };
    let title = format!(
        "Skin Cancer Classifier {}",
        env!("LESION_UPLOAD_VERSION")
    );
    eframe::run_native(
        &title,
        options,
        Box::new(move |_cc| {
            Ok::<_, Box<dyn std::error::Error + Send + Sync>>(Box::new(app))
        }),
    )
    .map_err(|e| anyhow!("{e}"))
}
