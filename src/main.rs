mod app;
mod cli;
mod error;
mod image_loader;
mod overlay;
mod state;
mod status;
mod tonemap;
mod view;

use anyhow::{anyhow, Result};
use eframe::egui;
use log::info;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = cli::parse_args();

    match &config.image_path {
        Some(path) => info!("Opening {}", path.display()),
        None => info!("Starting without an image"),
    }
    info!(
        "Exposure {:+.2} EV, {} curve, channel {}",
        config.tone.exposure,
        if config.tone.srgb { "sRGB" } else { "gamma" },
        config.tone.channel.name()
    );

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("hdrpeek")
            .with_inner_size(config.window_size)
            .with_min_inner_size([320.0, 240.0])
            .with_app_id("hdrpeek")
            .with_drag_and_drop(true),
        ..Default::default()
    };

    eframe::run_native(
        "hdrpeek",
        options,
        Box::new(move |cc| Ok(Box::new(app::HdrViewer::new(cc, config)))),
    )
    .map_err(|e| anyhow!("viewer exited with an error: {e}"))?;

    info!("Exiting");
    Ok(())
}
