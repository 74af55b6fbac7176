use serde::{Deserialize, Serialize};

use super::constants::*;
use super::container::{join_path, read_table, read_vector, value_column, Container};
use super::error::{ChartError, ConfigError, DecodeError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisScale {
    Linear,
    #[default]
    Log,
}

impl std::fmt::Display for AxisScale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AxisScale::Linear => write!(f, "Linear"),
            AxisScale::Log => write!(f, "Log"),
        }
    }
}

/// Scale and bounds of one axis. Bounds are always stored in data units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisConfig {
    pub scale: AxisScale,
    pub min: f64,
    pub max: f64,
}

impl AxisConfig {
    pub fn new(scale: AxisScale, min: f64, max: f64) -> Self {
        Self { scale, min, max }
    }

    /// The x-axis default of the viewer: log scale, 1e3 to 1e5 years
    pub fn default_x() -> Self {
        Self::new(AxisScale::Log, 1_000.0, 100_000.0)
    }

    /// The y-axis default of the viewer: log scale, 1 to 1e8 Bq
    pub fn default_y() -> Self {
        Self::new(AxisScale::Log, 1.0, 1e8)
    }

    /// The range as displayed: log10 of the bounds under a log scale, the bounds otherwise
    pub fn display_range(&self) -> Result<[f64; 2], ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::NonFiniteBound {
                min: self.min,
                max: self.max,
            });
        }
        if self.min >= self.max {
            return Err(ConfigError::InvertedBounds {
                min: self.min,
                max: self.max,
            });
        }
        match self.scale {
            AxisScale::Linear => Ok([self.min, self.max]),
            AxisScale::Log => {
                if self.min <= 0.0 || self.max <= 0.0 {
                    return Err(ConfigError::NonPositiveLogBound {
                        min: self.min,
                        max: self.max,
                    });
                }
                Ok([self.min.log10(), self.max.log10()])
            }
        }
    }
}

/// Which file slot a series was read from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileSlot {
    Primary,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    /// Palette colour for the series at `index` in the selection
    pub fn from_palette(index: usize) -> Self {
        let (r, g, b) = SERIES_PALETTE[index % SERIES_PALETTE.len()];
        Self { r, g, b }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineDash {
    Solid,
    Dash,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerSymbol {
    Cross,
}

/// How a series is drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesStyle {
    Line { color: Rgb, dash: LineDash },
    Markers { color: Rgb, symbol: MarkerSymbol },
}

impl SeriesStyle {
    pub fn color(&self) -> Rgb {
        match self {
            SeriesStyle::Line { color, .. } | SeriesStyle::Markers { color, .. } => *color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeriesKind {
    Reference,
    Data(FileSlot),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub kind: SeriesKind,
    pub style: SeriesStyle,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl ChartSeries {
    /// The points in display units of `layout`. Non-finite values are dropped.
    pub fn display_points(&self, layout: &ChartLayout) -> Vec<(f64, f64)> {
        self.x
            .iter()
            .zip(self.y.iter())
            .filter_map(|(x, y)| Some((layout.x_axis.project(*x)?, layout.y_axis.project(*y)?)))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisLayout {
    pub title: String,
    pub scale: AxisScale,
    /// In display units (log10 for a log axis)
    pub range: [f64; 2],
}

impl AxisLayout {
    /// Map a data value into display units.
    ///
    /// On a log axis a value with no logarithm is placed `LOG_CLIP_SPANS` range widths below
    /// the low edge, so a line running to it leaves the chart through the bottom (or left)
    /// instead of disappearing.
    pub fn project(&self, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return None;
        }
        match self.scale {
            AxisScale::Linear => Some(value),
            AxisScale::Log if value > 0.0 => Some(value.log10()),
            AxisScale::Log => {
                let [low, high] = self.range;
                Some(low - LOG_CLIP_SPANS * (high - low))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartLayout {
    pub title: String,
    pub x_axis: AxisLayout,
    pub y_axis: AxisLayout,
}

/// Everything needed to draw the chart. `layout` is None for the empty chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDescription {
    pub layout: Option<ChartLayout>,
    pub series: Vec<ChartSeries>,
}

impl ChartDescription {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.layout.is_none() && self.series.is_empty()
    }

    pub fn data_series(&self) -> impl Iterator<Item = &ChartSeries> {
        self.series
            .iter()
            .filter(|s| matches!(s.kind, SeriesKind::Data(_)))
    }

    pub fn reference_series(&self) -> Option<&ChartSeries> {
        self.series.iter().find(|s| s.kind == SeriesKind::Reference)
    }
}

/// One opened file feeding the chart
pub struct ChartSource<'a> {
    pub slot: FileSlot,
    pub file_name: &'a str,
    pub container: &'a dyn Container,
}

pub struct ChartRequest<'a> {
    pub sources: Vec<ChartSource<'a>>,
    pub table_key: Option<&'a str>,
    pub series: &'a [String],
    pub x_axis: AxisConfig,
    pub y_axis: AxisConfig,
    pub threshold: Option<f64>,
}

/// Build the chart for the current selection.
///
/// Absent table key, empty series selection, or no readable file all produce the empty chart.
/// Axis configuration problems are errors; a series missing from one file is skipped.
pub fn build_chart(request: &ChartRequest<'_>) -> Result<ChartDescription, ChartError> {
    let table_key = match request.table_key {
        Some(key) if !key.is_empty() => key,
        _ => return Ok(ChartDescription::empty()),
    };
    if request.series.is_empty() || request.sources.is_empty() {
        return Ok(ChartDescription::empty());
    }

    let layout = ChartLayout {
        title: String::from(CHART_TITLE),
        x_axis: AxisLayout {
            title: String::from(X_AXIS_TITLE),
            scale: request.x_axis.scale,
            range: request.x_axis.display_range()?,
        },
        y_axis: AxisLayout {
            title: String::from(Y_AXIS_TITLE),
            scale: request.y_axis.scale,
            range: request.y_axis.display_range()?,
        },
    };

    let mut series = Vec::new();
    if let Some(limit) = request.threshold {
        series.push(ChartSeries {
            name: String::from(THRESHOLD_NAME),
            kind: SeriesKind::Reference,
            style: SeriesStyle::Line {
                color: Rgb::BLACK,
                dash: LineDash::Dash,
            },
            x: THRESHOLD_EXTENT.to_vec(),
            y: vec![limit, limit],
        });
    }

    for source in request.sources.iter() {
        if !source.container.has_group(table_key) {
            spdlog::debug!("File {} has no table {}", source.file_name, table_key);
            continue;
        }
        let time = match read_time(source.container, table_key) {
            Ok(time) => time,
            Err(e) => {
                spdlog::warn!("Skipping file {}: {}", source.file_name, e);
                continue;
            }
        };
        for (idx, name) in request.series.iter().enumerate() {
            match build_data_series(source, table_key, name, idx, &time) {
                Ok(s) => series.push(s),
                Err(e) => spdlog::warn!(
                    "Skipping series {} of file {}: {}",
                    name,
                    source.file_name,
                    e
                ),
            }
        }
    }

    Ok(ChartDescription {
        layout: Some(layout),
        series,
    })
}

/// The time coordinate of a table; the table's own `time` wins over the file-level one
fn read_time(container: &dyn Container, table_key: &str) -> Result<Vec<f64>, DecodeError> {
    let local = join_path(table_key, TIME_NAME);
    if container.has_dataset(&local) {
        read_vector(container, &local)
    } else {
        read_vector(container, TIME_NAME)
    }
}

fn build_data_series(
    source: &ChartSource<'_>,
    table_key: &str,
    name: &str,
    index: usize,
    time: &[f64],
) -> Result<ChartSeries, DecodeError> {
    let path = join_path(table_key, name);
    let table = read_table(source.container, &path)?;
    let mut values = value_column(&table, &path)?.to_vec();
    let mut x = time.to_vec();
    if x.len() != values.len() {
        spdlog::warn!(
            "Series {} has {} values against {} time points; truncating",
            path,
            values.len(),
            x.len()
        );
        let len = x.len().min(values.len());
        x.truncate(len);
        values.truncate(len);
    }

    let color = Rgb::from_palette(index);
    let style = match source.slot {
        FileSlot::Primary => SeriesStyle::Line {
            color,
            dash: LineDash::Solid,
        },
        FileSlot::Secondary => SeriesStyle::Markers {
            color,
            symbol: MarkerSymbol::Cross,
        },
    };
    Ok(ChartSeries {
        name: format!("{} ({})", name, source.file_name),
        kind: SeriesKind::Data(source.slot),
        style,
        x,
        y: values,
    })
}
