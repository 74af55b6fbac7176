//! # nuclide_viewer
//!
//! Part of the nuclide_viewer crate family.
//!
//! This is the application to plot radionuclide activity from HDF5 files with a GUI using
//! [egui](https://github.com/emilk/egui).
//!
//! ## Install
//!
//! Use `cargo install --path ./nuclide_viewer`
//!
//! ## Use
//!
//! To launch the application simply invoke it after it is installed
//!
//! ```bash
//! nuclide_viewer
//! ```
//!
//! Upload one or more HDF5 files with File->Upload, pick a primary (and optionally a
//! secondary) file, a table key and the radionuclides to plot. The chart updates as the
//! selection changes.
//!
//! ## Controls
//!
//! - Primary file: drawn as solid lines, also the source of the table keys and radionuclides
//! - Secondary file: drawn as crosses, in the same colour as the matching primary line
//! - Table key: the group the values are read from
//! - Radionuclides: the order they are ticked in sets their colour
//! - X/Y axis: scale (linear or log) and bounds, in data units
//! - Limit value: draws a dashed reference line; leave blank for none
//! - Download Image: renders the chart to a PNG of the given width and height
//!
//! Configurations can be saved using File->Save and loaded using File->Open

mod app;
mod plot;
use app::ViewerApp;
use std::path::PathBuf;
use std::sync::Arc;

/// The program entry point
fn main() {
    // Setup logging to a file
    let file_sink = Arc::new(
        spdlog::sink::FileSink::builder()
            .path(PathBuf::from("./nuclide_viewer.log"))
            .formatter(*Box::new(spdlog::formatter::PatternFormatter::new(
                spdlog::formatter::pattern!(
                    "[{date_short} {time_short}] - [{^{level}}] - {payload}{eol}"
                ),
            )))
            .truncate(true)
            .build()
            .unwrap(),
    );
    let logger = Arc::new(
        spdlog::Logger::builder()
            .flush_level_filter(spdlog::LevelFilter::All)
            .sink(file_sink)
            .build()
            .unwrap(),
    );
    spdlog::set_default_logger(logger);
    spdlog::info!("Starting Nuclide Viewer UI");

    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_title("Nuclide Viewer")
            .with_inner_size(eframe::epaint::vec2(1100.0, 750.0))
            .with_min_inner_size(eframe::epaint::vec2(800.0, 500.0)),
        ..Default::default()
    };
    match eframe::run_native(
        "nuclide_viewer",
        native_options,
        Box::new(|cc| Ok(Box::new(ViewerApp::new(cc)))),
    ) {
        Ok(()) => (),
        Err(e) => spdlog::error!("Eframe error: {}", e),
    }
}
