use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::chart::AxisConfig;
use super::constants::{DEFAULT_MAX_UPLOAD_BYTES, EXPORT_FILE_NAME};
use super::error::{ConfigError, UploadError};
use super::selection::Input;
use super::upload::UploadedFile;

/// Structure representing the viewer configuration. Contains the files to load and the
/// selection to plot.
/// Configs are seralizable and deserializable to YAML using serde and serde_yaml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// HDF5 files to upload. Each is known by its file name.
    pub files: Vec<PathBuf>,
    pub primary_file: Option<String>,
    pub secondary_file: Option<String>,
    pub table_key: Option<String>,
    pub series: Vec<String>,
    pub x_axis: AxisConfig,
    pub y_axis: AxisConfig,
    pub threshold: Option<f64>,
    pub export_width: u32,
    pub export_height: u32,
    pub export_path: PathBuf,
    pub max_upload_bytes: u64,
}

impl Default for ViewerConfig {
    /// Generate a new ViewerConfig with nothing selected and the stock axes and image size
    fn default() -> Self {
        Self {
            files: vec![],
            primary_file: None,
            secondary_file: None,
            table_key: None,
            series: vec![],
            x_axis: AxisConfig::default_x(),
            y_axis: AxisConfig::default_y(),
            threshold: None,
            export_width: 800,
            export_height: 600,
            export_path: PathBuf::from(EXPORT_FILE_NAME),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ViewerConfig {
    /// Read the configuration in a YAML file
    /// Returns a ViewerConfig if successful
    pub fn read_config_file(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Err(ConfigError::BadFilePath(config_path.to_path_buf()));
        }

        let yaml_str = std::fs::read_to_string(config_path)?;

        Ok(serde_yaml::from_str::<Self>(&yaml_str)?)
    }

    /// Write the configuration to a YAML file
    pub fn write_config_file(&self, config_path: &Path) -> Result<(), ConfigError> {
        let yaml_str = serde_yaml::to_string(self)?;
        std::fs::write(config_path, yaml_str)?;
        Ok(())
    }

    /// Read every configured file into an upload
    pub fn upload_input(&self) -> Result<Input, UploadError> {
        let files = self
            .files
            .iter()
            .map(|path| UploadedFile::from_path(path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Input::Upload(files))
    }

    /// The configured selection as a batch of inputs
    pub fn selection_inputs(&self) -> Vec<Input> {
        vec![
            Input::SelectPrimaryFile(self.primary_file.clone()),
            Input::SelectSecondaryFile(self.secondary_file.clone()),
            Input::SelectTableKey(self.table_key.clone()),
            Input::SelectSeries(self.series.clone()),
            Input::SetXAxis(self.x_axis),
            Input::SetYAxis(self.y_axis),
            Input::SetThreshold(self.threshold),
        ]
    }

    /// Check the axes before any file is touched
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.x_axis.display_range()?;
        self.y_axis.display_range()?;
        Ok(())
    }
}
