use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Container payload is malformed: {0}")]
    Malformed(String),
    #[error("Container has no group or dataset at path {0}")]
    MissingPath(String),
    #[error("Dataset {path} has unsupported rank {rank}; expected a 1-D or 2-D array")]
    UnsupportedShape { path: String, rank: usize },
    #[error("Table {0} has no columns")]
    EmptyTable(String),
    #[error("Container decode failed due to HDF5 error: {0}")]
    HDF5Error(#[from] hdf5::Error),
    #[error("Container decode failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Log scale axis requires positive bounds; found min {min}, max {max}")]
    NonPositiveLogBound { min: f64, max: f64 },
    #[error("Axis bounds must be finite; found min {min}, max {max}")]
    NonFiniteBound { min: f64, max: f64 },
    #[error("Axis minimum {min} must be less than the maximum {max}")]
    InvertedBounds { min: f64, max: f64 },
    #[error("Failed to load configuration as file {0:?} does not exist")]
    BadFilePath(PathBuf),
    #[error("Config failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("Config failed to parse YAML: {0}")]
    ParsingError(#[from] serde_yaml::Error),
}

#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("Selected file {0} is not present in the upload store")]
    StaleFile(String),
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Upload {name} is {size} which exceeds the upload limit of {limit}")]
    TooLarge {
        name: String,
        size: String,
        limit: String,
    },
    #[error("Upload {0} is not a base64 data URL")]
    MalformedDataUrl(String),
    #[error("Upload {0} failed to decode base64 content: {1}")]
    BadBase64(String, base64::DecodeError),
    #[error("Upload path {0:?} has no file name")]
    BadFilePath(PathBuf),
    #[error("Upload failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("Chart failed due to configuration error: {0}")]
    ConfigError(#[from] ConfigError),
    #[error("Chart failed due to decode error: {0}")]
    DecodeError(#[from] DecodeError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export dimensions must be positive; found {width}x{height}")]
    ZeroDimension { width: u32, height: u32 },
    #[error("Export surface {width}x{height} exceeds the limit of {limit} pixels")]
    SurfaceTooLarge { width: u32, height: u32, limit: u64 },
    #[error("Export failed while drawing the chart: {0}")]
    DrawingError(String),
    #[error("Export failed to encode PNG: {0}")]
    EncodeError(#[from] image::ImageError),
    #[error("Export failed due to IO error: {0}")]
    IOError(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Dependency graph contains a cycle through node {0}")]
    Cycle(String),
    #[error("Dependency graph node {0} is listed twice")]
    DuplicateNode(String),
    #[error("Dependency graph node {0} depends on an undeclared node")]
    UnknownUpstream(String),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session failed due to upload error: {0}")]
    UploadError(#[from] UploadError),
    #[error("Session failed due to graph error: {0}")]
    GraphError(#[from] GraphError),
    #[error("Session failed due to export error: {0}")]
    ExportError(#[from] ExportError),
    #[error("Session failed due to configuration error: {0}")]
    ConfigError(#[from] ConfigError),
}
