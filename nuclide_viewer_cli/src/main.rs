use clap::{Arg, ArgAction, Command};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libnuclide_viewer::config::ViewerConfig;
use libnuclide_viewer::constants::OUTFLOW_GROUP_NAME;
use libnuclide_viewer::container::ContainerDecoder;
use libnuclide_viewer::hdf_reader::Hdf5Decoder;
use libnuclide_viewer::session::Session;

fn make_template_config(path: &Path) {
    let config = ViewerConfig {
        files: vec![PathBuf::from("/path/to/case.h5")],
        primary_file: Some(String::from("case.h5")),
        table_key: Some(String::from(OUTFLOW_GROUP_NAME)),
        ..Default::default()
    };
    match config.write_config_file(path) {
        Ok(()) => log::info!("Done."),
        Err(e) => log::error!("Could not write template config: {e}"),
    }
}

/// The library logs through spdlog, which only reports Info and above by default
fn library_log_level(verbose: bool) -> spdlog::LevelFilter {
    if verbose {
        spdlog::LevelFilter::All
    } else {
        spdlog::LevelFilter::MoreSevereEqual(spdlog::Level::Info)
    }
}

/// List what a file offers for selection
fn inspect_file(path: &Path) {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            log::error!("Could not read {}: {e}", path.display());
            return;
        }
    };
    let container = match Hdf5Decoder.open(&bytes) {
        Ok(c) => c,
        Err(e) => {
            log::error!("Could not decode {}: {e}", path.display());
            return;
        }
    };
    match container.list_groups() {
        Ok(groups) => log::info!("Table keys: {}", groups.join(", ")),
        Err(e) => log::error!("Could not list table keys: {e}"),
    }
    match container.list_entries(OUTFLOW_GROUP_NAME) {
        Ok(entries) => log::info!("Radionuclides: {}", entries.join(", ")),
        Err(e) => log::warn!("No radionuclide list: {e}"),
    }
}

fn main() {
    // Create a cli
    let matches = Command::new("nuclide_viewer_cli")
        .arg_required_else_help(true)
        .subcommand(Command::new("new").about("Make a template configuration yaml file"))
        .subcommand(
            Command::new("inspect")
                .about("List the table keys and radionuclides of an HDF5 file")
                .arg(Arg::new("file").required(true).help("Path to the HDF5 file")),
        )
        .arg(
            Arg::new("path")
                .short('p')
                .long("path")
                .help("Path to the configuration file"),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Also write the chart description as JSON to this path"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Log every update pass"),
        )
        .get_matches();

    // Initialize feedback
    let verbose = matches.get_flag("verbose");
    spdlog::default_logger().set_level_filter(library_log_level(verbose));
    let level = if verbose {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("Could not create logging!");

    if let Some(("inspect", sub)) = matches.subcommand() {
        if let Some(file) = sub.get_one::<String>("file") {
            inspect_file(Path::new(file));
        }
        return;
    }

    // Parse the cli
    let config_path = match matches.get_one::<String>("path") {
        Some(p) => PathBuf::from(p),
        None => {
            log::error!("A configuration path is required (--path)");
            return;
        }
    };

    if let Some(("new", _)) = matches.subcommand() {
        log::info!(
            "Making a template config at {}...",
            config_path.to_string_lossy()
        );
        make_template_config(&config_path);
        return;
    }

    // Load our config
    log::info!("Loading config from {}...", config_path.to_string_lossy());
    let config = match ViewerConfig::read_config_file(&config_path) {
        Ok(c) => c,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    if let Err(e) = config.validate() {
        log::error!("{e}");
        return;
    }
    log::info!("Config successfully loaded.");
    log::info!("Files: {}", config.files.len());
    log::info!(
        "Primary: {} Secondary: {}",
        config.primary_file.as_deref().unwrap_or("None"),
        config.secondary_file.as_deref().unwrap_or("None")
    );
    log::info!("Table key: {}", config.table_key.as_deref().unwrap_or("None"));
    log::info!("Radionuclides: {}", config.series.join(", "));

    let session = match Session::from_config(&config, Arc::new(Hdf5Decoder)) {
        Ok(s) => s,
        Err(e) => {
            log::error!("{e}");
            return;
        }
    };
    if let Some(warning) = &session.state().chart_warning {
        log::warn!("Chart is empty: {warning}");
    } else if session.chart().is_empty() {
        log::warn!("Nothing selected to plot; the image will be blank");
    }

    if let Some(json_path) = matches.get_one::<String>("json") {
        match serde_json::to_string_pretty(session.chart()) {
            Ok(json) => match std::fs::write(json_path, json) {
                Ok(()) => log::info!("Wrote chart description to {json_path}"),
                Err(e) => log::error!("Could not write {json_path}: {e}"),
            },
            Err(e) => log::error!("Could not serialize chart: {e}"),
        }
    }

    match session
        .export(config.export_width, config.export_height)
        .and_then(|download| download.write_to(&config.export_path))
    {
        Ok(()) => log::info!("Wrote {}", config.export_path.display()),
        Err(e) => log::error!("Export failed with error: {e}"),
    }

    log::info!("Done.");
}
