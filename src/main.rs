mod app;
mod color;
mod state;
mod ui;

use std::path::PathBuf;

use app::RasterPreviewApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    // Optional raster table / npy directory to open at startup.
    let initial_path = std::env::args_os().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Multi-trial Raster – Preview",
        options,
        Box::new(move |_cc| {
            let mut app = RasterPreviewApp::default();
            if let Some(path) = initial_path {
                ui::panels::open_path(&mut app.state, &path);
            }
            Ok(Box::new(app))
        }),
    )
}
