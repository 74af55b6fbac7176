/// Group holding one entry per radionuclide; the series options come from here
pub const OUTFLOW_GROUP_NAME: &str = "OutflowGeosphere";
/// Shared time coordinate, looked up in the table first and then at the file root
pub const TIME_NAME: &str = "time";

/// Horizontal extent of the threshold line. Independent of the x-axis bounds.
pub const THRESHOLD_EXTENT: [f64; 2] = [0.0, 100_000.0];
pub const THRESHOLD_NAME: &str = "Limit Value";

pub const CHART_TITLE: &str = "Radionuclide Activity (Bq)";
pub const X_AXIS_TITLE: &str = "Time (years)";
pub const Y_AXIS_TITLE: &str = "Activity (Bq)";

pub const EXPORT_FILE_NAME: &str = "figure.png";
pub const EXPORT_MIME_TYPE: &str = "image/png";
/// Largest surface the exporter will allocate (width * height)
pub const MAX_EXPORT_PIXELS: u64 = 64_000_000;
/// Where non-positive values land on a log axis, in range widths below the low edge
pub const LOG_CLIP_SPANS: f64 = 1.0;

/// 256 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 256 * 1024 * 1024;

/// Qualitative "Set3" palette, cycled by the position of a series in the selection
pub const SERIES_PALETTE: [(u8, u8, u8); 12] = [
    (141, 211, 199),
    (255, 255, 179),
    (190, 186, 218),
    (251, 128, 114),
    (128, 177, 211),
    (253, 180, 98),
    (179, 222, 105),
    (252, 205, 229),
    (217, 217, 217),
    (188, 128, 189),
    (204, 235, 197),
    (255, 237, 111),
];
