use std::path::{Path, PathBuf};
use std::sync::Arc;

use eframe::egui::{Color32, ComboBox, DragValue, RichText};
use rfd::FileDialog;

use libnuclide_viewer::chart::{AxisConfig, AxisScale};
use libnuclide_viewer::config::ViewerConfig;
use libnuclide_viewer::hdf_reader::Hdf5Decoder;
use libnuclide_viewer::selection::Input;
use libnuclide_viewer::session::Session;
use libnuclide_viewer::upload::UploadedFile;

use super::plot::show_chart;

fn render_error_dialog(show: &mut bool, message: &str, ctx: &eframe::egui::Context) {
    eframe::egui::Window::new("Error")
        .open(show)
        .show(ctx, |ui| {
            ui.label(message);
            ui.label("Check the log file nuclide_viewer.log for more information.");
        });
}

fn start_directory() -> PathBuf {
    std::env::current_dir().unwrap_or_default()
}

/// Combo box over the uploaded file names. Returns the new selection if it changed.
fn file_combo(
    ui: &mut eframe::egui::Ui,
    id: &str,
    current: &Option<String>,
    options: &[String],
) -> Option<Option<String>> {
    let mut selected = current.clone();
    ComboBox::from_id_salt(id)
        .selected_text(selected.clone().unwrap_or_else(|| String::from("None")))
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut selected, None, "None");
            for name in options.iter() {
                ui.selectable_value(&mut selected, Some(name.clone()), name.as_str());
            }
        });
    (selected != *current).then_some(selected)
}

/// Scale and bounds for one axis. Returns the new axis if anything was edited.
fn axis_controls(ui: &mut eframe::egui::Ui, id: &str, current: AxisConfig) -> Option<AxisConfig> {
    let mut axis = current;
    ComboBox::from_id_salt(id)
        .selected_text(axis.scale.to_string())
        .show_ui(ui, |ui| {
            ui.selectable_value(&mut axis.scale, AxisScale::Linear, "Linear");
            ui.selectable_value(&mut axis.scale, AxisScale::Log, "Log");
        });
    ui.label("Min");
    ui.add(DragValue::new(&mut axis.min).speed(1.0));
    ui.label("Max");
    ui.add(DragValue::new(&mut axis.max).speed(1.0));
    (axis != current).then_some(axis)
}

/// Read the limit value box. Blank means no limit line.
fn parse_threshold(text: &str) -> Result<Option<f64>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<f64>()
        .map(Some)
        .map_err(|_| format!("\"{text}\" is not a number"))
}

/// The UI app which inherits the eframe::App trait.
///
/// Owns a single viewer session. Widgets read the session state and every edit made during a
/// frame is applied to the session as one batch at the end of that frame.
#[derive(Debug)]
pub struct ViewerApp {
    session: Session,
    uploaded_paths: Vec<PathBuf>,
    threshold_text: String,
    export_width: u32,
    export_height: u32,
    reset_bounds: bool,
    show_error_window: bool,
    error_message: String,
}

impl ViewerApp {
    /// Create the application
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut visuals = eframe::egui::Visuals::dark();
        visuals.override_text_color = Some(Color32::LIGHT_GRAY);
        cc.egui_ctx.set_visuals(visuals);
        cc.egui_ctx.set_theme(eframe::egui::Theme::Dark);
        let config = ViewerConfig::default();
        ViewerApp {
            session: Session::with_hdf5(config.max_upload_bytes)
                .expect("Selection graph declarations are invalid"),
            uploaded_paths: vec![],
            threshold_text: String::new(),
            export_width: config.export_width,
            export_height: config.export_height,
            reset_bounds: true,
            show_error_window: false,
            error_message: String::new(),
        }
    }

    fn report_error(&mut self, message: String) {
        spdlog::error!("{}", message);
        self.error_message = message;
        self.show_error_window = true;
    }

    fn apply(&mut self, inputs: Vec<Input>) {
        if inputs.is_empty() {
            return;
        }
        let before = self.session.chart().layout.clone();
        let report = self.session.apply(inputs);
        if let Some(warning) = report.warnings.into_iter().next() {
            self.report_error(warning);
        }
        if self.session.chart().layout != before {
            self.reset_bounds = true;
        }
    }

    /// Upload HDF5 files picked from disk
    fn upload_files(&mut self, paths: Vec<PathBuf>) {
        let mut files = vec![];
        for path in paths {
            match UploadedFile::from_path(&path) {
                Ok(file) => {
                    if !self.uploaded_paths.contains(&path) {
                        self.uploaded_paths.push(path);
                    }
                    files.push(file);
                }
                Err(e) => self.report_error(format!("Could not read {}: {e}", path.display())),
            }
        }
        if !files.is_empty() {
            self.apply(vec![Input::Upload(files)]);
        }
    }

    /// Snapshot the current selection as a configuration
    fn current_config(&self) -> ViewerConfig {
        let state = self.session.state();
        ViewerConfig {
            files: self.uploaded_paths.clone(),
            primary_file: state.primary_file.clone(),
            secondary_file: state.secondary_file.clone(),
            table_key: state.table_key.clone(),
            series: state.series.clone(),
            x_axis: state.x_axis,
            y_axis: state.y_axis,
            threshold: state.threshold,
            export_width: self.export_width,
            export_height: self.export_height,
            export_path: PathBuf::from(libnuclide_viewer::constants::EXPORT_FILE_NAME),
            max_upload_bytes: self.session.store().max_upload_bytes(),
        }
    }

    /// Write the current ViewerConfig to a file
    fn write_config(&mut self, path: &Path) {
        if let Err(e) = self.current_config().write_config_file(path) {
            self.report_error(format!(
                "Could not write config to file {}: {e}",
                path.display()
            ));
        }
    }

    /// Read the ViewerConfig from a file and replay it in a fresh session
    fn read_config(&mut self, path: &Path) {
        let config = match ViewerConfig::read_config_file(path) {
            Ok(conf) => conf,
            Err(e) => {
                self.report_error(e.to_string());
                return;
            }
        };
        match Session::from_config(&config, Arc::new(Hdf5Decoder)) {
            Ok(session) => {
                self.session = session;
                self.uploaded_paths = config.files.clone();
                self.threshold_text = config.threshold.map(|v| v.to_string()).unwrap_or_default();
                self.export_width = config.export_width;
                self.export_height = config.export_height;
                self.reset_bounds = true;
            }
            Err(e) => self.report_error(e.to_string()),
        }
    }

    /// Render the current chart and save it where the user asks
    fn download_image(&mut self) {
        let download = match self.session.export(self.export_width, self.export_height) {
            Ok(download) => download,
            Err(e) => {
                self.report_error(e.to_string());
                return;
            }
        };
        if let Some(path) = FileDialog::new()
            .set_directory(start_directory())
            .set_file_name(&download.filename)
            .add_filter("PNG image", &["png"])
            .save_file()
        {
            match download.write_to(&path) {
                Ok(()) => spdlog::info!("Saved chart to {}", path.display()),
                Err(e) => self.report_error(e.to_string()),
            }
        }
    }
}

impl eframe::App for ViewerApp {
    fn update(&mut self, ctx: &eframe::egui::Context, _frame: &mut eframe::Frame) {
        render_error_dialog(&mut self.show_error_window, &self.error_message, ctx);
        let mut inputs: Vec<Input> = vec![];

        eframe::egui::SidePanel::left("Controls")
            .min_width(280.0)
            .show(ctx, |ui| {
                //Menus
                ui.menu_button("File", |ui| {
                    if ui.button("Open...").clicked() {
                        if let Some(path) = FileDialog::new()
                            .set_directory(start_directory())
                            .add_filter("YAML file", &["yaml", "yml"])
                            .pick_file()
                        {
                            self.read_config(&path);
                        }
                    }
                    if ui.button("Save...").clicked() {
                        if let Some(path) = FileDialog::new()
                            .set_directory(start_directory())
                            .add_filter("YAML file", &["yaml", "yml"])
                            .save_file()
                        {
                            self.write_config(&path);
                        }
                    }
                    if ui.button("Upload HDF5...").clicked() {
                        if let Some(paths) = FileDialog::new()
                            .set_directory(start_directory())
                            .add_filter("HDF5 file", &["h5", "hdf5"])
                            .pick_files()
                        {
                            self.upload_files(paths);
                        }
                    }
                });

                let state = self.session.state();

                //Files
                ui.separator();
                ui.label(RichText::new("Data").color(Color32::LIGHT_BLUE).size(18.0));
                eframe::egui::Grid::new("DataGrid").show(ui, |ui| {
                    ui.label("Primary file");
                    if let Some(name) =
                        file_combo(ui, "PrimaryFile", &state.primary_file, &state.file_options)
                    {
                        inputs.push(Input::SelectPrimaryFile(name));
                    }
                    ui.end_row();

                    ui.label("Secondary file");
                    if let Some(name) = file_combo(
                        ui,
                        "SecondaryFile",
                        &state.secondary_file,
                        &state.file_options,
                    ) {
                        inputs.push(Input::SelectSecondaryFile(name));
                    }
                    ui.end_row();

                    ui.label("Table key");
                    if let Some(key) = file_combo(
                        ui,
                        "TableKey",
                        &state.table_key,
                        &state.table_key_options,
                    ) {
                        inputs.push(Input::SelectTableKey(key));
                    }
                    ui.end_row();
                });

                //Series, in the order they were ticked
                ui.separator();
                ui.label(
                    RichText::new("Radionuclides")
                        .color(Color32::LIGHT_BLUE)
                        .size(18.0),
                );
                eframe::egui::ScrollArea::vertical()
                    .max_height(220.0)
                    .show(ui, |ui| {
                        let mut series = state.series.clone();
                        let mut toggled = false;
                        for name in state.series_options.iter() {
                            let mut checked = series.contains(name);
                            if ui.checkbox(&mut checked, name.as_str()).changed() {
                                toggled = true;
                                if checked {
                                    series.push(name.clone());
                                } else {
                                    series.retain(|s| s != name);
                                }
                            }
                        }
                        if toggled {
                            inputs.push(Input::SelectSeries(series));
                        }
                    });

                //Axes
                ui.separator();
                ui.label(RichText::new("Axes").color(Color32::LIGHT_BLUE).size(18.0));
                eframe::egui::Grid::new("AxisGrid").show(ui, |ui| {
                    ui.label("X axis");
                    if let Some(axis) = axis_controls(ui, "XScale", state.x_axis) {
                        inputs.push(Input::SetXAxis(axis));
                    }
                    ui.end_row();

                    ui.label("Y axis");
                    if let Some(axis) = axis_controls(ui, "YScale", state.y_axis) {
                        inputs.push(Input::SetYAxis(axis));
                    }
                    ui.end_row();

                    ui.label("Limit value");
                    let edited = ui.text_edit_singleline(&mut self.threshold_text).changed();
                    match parse_threshold(&self.threshold_text) {
                        Ok(threshold) => {
                            if edited {
                                inputs.push(Input::SetThreshold(threshold));
                            }
                        }
                        Err(message) => {
                            // An unreadable limit clears the line instead of leaving a stale one
                            if edited {
                                inputs.push(Input::SetThreshold(None));
                            }
                            ui.colored_label(Color32::RED, message);
                        }
                    }
                    ui.end_row();
                });

                //Export
                ui.separator();
                ui.label(RichText::new("Export").color(Color32::LIGHT_BLUE).size(18.0));
                eframe::egui::Grid::new("ExportGrid").show(ui, |ui| {
                    ui.label("Width");
                    ui.add(
                        DragValue::new(&mut self.export_width)
                            .speed(1)
                            .range(std::ops::RangeInclusive::new(1, 8000)),
                    );
                    ui.end_row();
                    ui.label("Height");
                    ui.add(
                        DragValue::new(&mut self.export_height)
                            .speed(1)
                            .range(std::ops::RangeInclusive::new(1, 8000)),
                    );
                    ui.end_row();
                });
                if ui.button("Download Image").clicked() {
                    self.download_image();
                }
            });

        eframe::egui::CentralPanel::default().show(ctx, |ui| {
            let state = self.session.state();
            ui.label(
                RichText::new(libnuclide_viewer::constants::CHART_TITLE)
                    .color(Color32::LIGHT_BLUE)
                    .size(18.0),
            );
            if let Some(warning) = &state.chart_warning {
                ui.label(RichText::new(warning).color(Color32::LIGHT_RED));
            }
            show_chart(ui, &state.chart, self.reset_bounds);
        });
        self.reset_bounds = false;

        self.apply(inputs);
    }
}
