use base64::Engine;
use plotters::prelude::*;
use std::panic;
use std::path::Path;

use super::chart::{AxisScale, ChartDescription, LineDash, SeriesStyle};
use super::constants::{EXPORT_FILE_NAME, EXPORT_MIME_TYPE, MAX_EXPORT_PIXELS};
use super::error::ExportError;

/// An encoded image ready to be handed to the user as a download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageDownload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

impl ImageDownload {
    /// The payload in the base64 form used for transport
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), ExportError> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// Rasterize a chart to PNG.
///
/// The chart is taken as a snapshot; an empty chart yields a blank image of the requested size.
/// If labels cannot be drawn (typically no usable system font) the chart is drawn again
/// without any text rather than failing.
pub fn export_png(
    chart: &ChartDescription,
    width: u32,
    height: u32,
) -> Result<ImageDownload, ExportError> {
    if width == 0 || height == 0 {
        return Err(ExportError::ZeroDimension { width, height });
    }
    if width as u64 * height as u64 > MAX_EXPORT_PIXELS {
        return Err(ExportError::SurfaceTooLarge {
            width,
            height,
            limit: MAX_EXPORT_PIXELS,
        });
    }

    let mut buffer = vec![255u8; width as usize * height as usize * 3];
    if !chart.is_empty() {
        if let Err(e) = render_guarded(chart, &mut buffer, (width, height), true) {
            spdlog::warn!("Redrawing chart without labels: {}", e);
            buffer.fill(255);
            render_guarded(chart, &mut buffer, (width, height), false)?;
        }
    }

    let image = image::RgbImage::from_raw(width, height, buffer).ok_or_else(|| {
        ExportError::DrawingError(String::from("buffer does not match the image size"))
    })?;
    let mut bytes = Vec::new();
    image.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)?;
    spdlog::info!(
        "Exported {}x{} chart ({})",
        width,
        height,
        human_bytes::human_bytes(bytes.len() as f64)
    );

    Ok(ImageDownload {
        bytes,
        filename: String::from(EXPORT_FILE_NAME),
        mime_type: String::from(EXPORT_MIME_TYPE),
    })
}

fn render_guarded(
    chart: &ChartDescription,
    buffer: &mut [u8],
    size: (u32, u32),
    labels: bool,
) -> Result<(), ExportError> {
    panic::catch_unwind(panic::AssertUnwindSafe(|| {
        draw_chart(chart, buffer, size, labels)
    }))
    .map_err(|_| ExportError::DrawingError(String::from("plotting backend panicked")))?
}

fn drawing_error<E: std::fmt::Display>(err: E) -> ExportError {
    ExportError::DrawingError(err.to_string())
}

fn draw_chart(
    chart: &ChartDescription,
    buffer: &mut [u8],
    size: (u32, u32),
    labels: bool,
) -> Result<(), ExportError> {
    let root = BitMapBackend::with_buffer(buffer, size).into_drawing_area();
    root.fill(&WHITE).map_err(drawing_error)?;
    let layout = match &chart.layout {
        Some(layout) => layout,
        None => return root.present().map_err(drawing_error),
    };
    let [x0, x1] = layout.x_axis.range;
    let [y0, y1] = layout.y_axis.range;
    let x_log = layout.x_axis.scale == AxisScale::Log;
    let y_log = layout.y_axis.scale == AxisScale::Log;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(20);
    if labels {
        builder
            .caption(&layout.title, ("sans-serif", 22))
            .x_label_area_size(50)
            .y_label_area_size(80);
    }
    let mut plot = builder
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(drawing_error)?;

    if labels {
        plot.configure_mesh()
            .x_desc(layout.x_axis.title.as_str())
            .y_desc(layout.y_axis.title.as_str())
            .x_label_formatter(&|v| tick_label(*v, x_log))
            .y_label_formatter(&|v| tick_label(*v, y_log))
            .light_line_style(&BLACK.mix(0.05))
            .bold_line_style(&BLACK.mix(0.2))
            .axis_style(BLACK.stroke_width(2))
            .draw()
            .map_err(drawing_error)?;
    }

    let x_range = [x0, x1];
    let y_range = [y0, y1];
    for series in chart.series.iter() {
        let c = series.style.color();
        let color = RGBColor(c.r, c.g, c.b);
        let points = series.display_points(layout);

        match series.style {
            SeriesStyle::Line { dash, .. } => {
                let style = color.stroke_width(2);
                if labels {
                    // Legend entry only; the clipped runs are drawn below
                    plot.draw_series(LineSeries::new(std::iter::empty::<(f64, f64)>(), style))
                        .map_err(drawing_error)?
                        .label(series.name.as_str())
                        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], style));
                }
                for run in clipped_runs(&points, x_range, y_range) {
                    match dash {
                        LineDash::Solid => plot.draw_series(LineSeries::new(run, style)),
                        LineDash::Dash => plot.draw_series(DashedLineSeries::new(run, 8, 6, style)),
                    }
                    .map_err(drawing_error)?;
                }
            }
            SeriesStyle::Markers { .. } => {
                let style = color.stroke_width(2);
                let in_range = |p: &(f64, f64)| {
                    (x0..=x1).contains(&p.0) && (y0..=y1).contains(&p.1)
                };
                let drawn = plot
                    .draw_series(
                        points
                            .iter()
                            .filter(|p| in_range(*p))
                            .map(|p| Cross::new(*p, 4, style)),
                    )
                    .map_err(drawing_error)?;
                if labels {
                    drawn
                        .label(series.name.as_str())
                        .legend(move |(x, y)| Cross::new((x + 10, y), 4, style));
                }
            }
        }
    }

    if labels && !chart.series.is_empty() {
        plot.configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK.mix(0.3))
            .position(SeriesLabelPosition::UpperRight)
            .draw()
            .map_err(drawing_error)?;
    }

    root.present().map_err(drawing_error)
}

/// Clip the segment `a`-`b` to the rectangle (Liang-Barsky). Returns the kept parameter
/// interval along the segment, if any part of it is inside.
fn clip_segment(
    a: (f64, f64),
    b: (f64, f64),
    x_range: [f64; 2],
    y_range: [f64; 2],
) -> Option<(f64, f64)> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0;
    let mut t1 = 1.0;
    for (p, q) in [
        (-dx, a.0 - x_range[0]),
        (dx, x_range[1] - a.0),
        (-dy, a.1 - y_range[0]),
        (dy, y_range[1] - a.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let r = q / p;
            if p < 0.0 {
                if r > t1 {
                    return None;
                }
                t0 = f64::max(t0, r);
            } else {
                if r < t0 {
                    return None;
                }
                t1 = f64::min(t1, r);
            }
        }
    }
    Some((t0, t1))
}

/// Clip a polyline to the plotted rectangle.
///
/// Segments leaving the rectangle are cut at its edge; each returned run is a connected
/// polyline lying inside.
fn clipped_runs(
    points: &[(f64, f64)],
    x_range: [f64; 2],
    y_range: [f64; 2],
) -> Vec<Vec<(f64, f64)>> {
    let lerp = |a: (f64, f64), b: (f64, f64), t: f64| (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1));
    let mut runs = Vec::new();
    let mut current: Vec<(f64, f64)> = Vec::new();
    let mut open_end = false;

    if let [only] = points {
        if clip_segment(*only, *only, x_range, y_range).is_some() {
            runs.push(vec![*only]);
        }
        return runs;
    }
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        match clip_segment(a, b, x_range, y_range) {
            Some((t0, t1)) => {
                let start = if t0 == 0.0 { a } else { lerp(a, b, t0) };
                let end = if t1 == 1.0 { b } else { lerp(a, b, t1) };
                if !(open_end && t0 == 0.0) {
                    if current.len() > 1 {
                        runs.push(std::mem::take(&mut current));
                    }
                    current.clear();
                    current.push(start);
                }
                current.push(end);
                open_end = t1 == 1.0;
            }
            None => open_end = false,
        }
    }
    if current.len() > 1 {
        runs.push(current);
    }
    runs
}

fn tick_label(value: f64, log: bool) -> String {
    if log {
        let decade = value.round();
        if (value - decade).abs() < 1e-9 {
            format!("{:.0e}", 10f64.powf(decade))
        } else {
            format!("{:.1e}", 10f64.powf(value))
        }
    } else if value != 0.0 && (value.abs() >= 1e5 || value.abs() < 1e-2) {
        format!("{value:.1e}")
    } else {
        let text = format!("{value:.2}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::{AxisLayout, ChartLayout, ChartSeries, FileSlot, MarkerSymbol, Rgb, SeriesKind};

    fn chart() -> ChartDescription {
        ChartDescription {
            layout: Some(ChartLayout {
                title: String::from("Radionuclide Activity (Bq)"),
                x_axis: AxisLayout {
                    title: String::from("Time (years)"),
                    scale: AxisScale::Linear,
                    range: [0.0, 2.0],
                },
                y_axis: AxisLayout {
                    title: String::from("Activity (Bq)"),
                    scale: AxisScale::Log,
                    range: [0.0, 2.0],
                },
            }),
            series: vec![
                ChartSeries {
                    name: String::from("Cs-137 (a.h5)"),
                    kind: SeriesKind::Data(FileSlot::Primary),
                    style: SeriesStyle::Line {
                        color: Rgb::from_palette(0),
                        dash: LineDash::Solid,
                    },
                    x: vec![0.0, 1.0, 2.0],
                    y: vec![10.0, 20.0, 30.0],
                },
                ChartSeries {
                    name: String::from("Cs-137 (b.h5)"),
                    kind: SeriesKind::Data(FileSlot::Secondary),
                    style: SeriesStyle::Markers {
                        color: Rgb::from_palette(0),
                        symbol: MarkerSymbol::Cross,
                    },
                    x: vec![0.0, 1.0, 2.0],
                    y: vec![12.0, 22.0, 0.0],
                },
            ],
        }
    }

    const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";

    #[test]
    fn exports_named_png() {
        let download = export_png(&chart(), 800, 600).unwrap();
        assert!(download.bytes.starts_with(PNG_SIGNATURE));
        assert_eq!(download.filename, "figure.png");
        assert_eq!(download.mime_type, "image/png");
        assert!(!download.to_base64().is_empty());
    }

    #[test]
    fn empty_chart_exports_blank_image_of_requested_size() {
        let download = export_png(&ChartDescription::empty(), 320, 200).unwrap();
        let image = image::load_from_memory(&download.bytes).unwrap().to_rgb8();
        assert_eq!(image.dimensions(), (320, 200));
        assert!(image.pixels().all(|p| p.0 == [255, 255, 255]));
    }

    #[test]
    fn zero_dimension_is_rejected() {
        assert!(matches!(
            export_png(&chart(), 0, 600),
            Err(ExportError::ZeroDimension { .. })
        ));
    }

    #[test]
    fn oversized_surface_is_rejected() {
        assert!(matches!(
            export_png(&chart(), 100_000, 100_000),
            Err(ExportError::SurfaceTooLarge { .. })
        ));
    }

    #[test]
    fn log_projection_keeps_non_positive_values_off_chart() {
        let chart = chart();
        let points = chart.series[1].display_points(chart.layout.as_ref().unwrap());
        assert_eq!(points.len(), 3);
        assert!((points[0].1 - 12f64.log10()).abs() < 1e-12);
        assert!(points[2].1 < 0.0);
    }

    #[test]
    fn runs_are_cut_at_the_range_edge() {
        let points = [(0.0, 1.0), (1.0, 5.0), (2.0, 1.0), (3.0, 1.0)];
        let runs = clipped_runs(&points, [0.0, 3.0], [0.0, 2.0]);
        assert_eq!(
            runs,
            vec![vec![(0.0, 1.0), (0.25, 2.0)], vec![(1.75, 2.0), (2.0, 1.0), (3.0, 1.0)]]
        );
    }

    #[test]
    fn segment_spanning_the_range_is_kept() {
        // Both ends outside, the middle crosses the whole plot
        let runs = clipped_runs(&[(-1.0, 0.5), (4.0, 0.5)], [0.0, 3.0], [0.0, 1.0]);
        assert_eq!(runs, vec![vec![(0.0, 0.5), (3.0, 0.5)]]);
        assert!(clipped_runs(&[(-1.0, 5.0), (4.0, 5.0)], [0.0, 3.0], [0.0, 1.0]).is_empty());
    }

    fn render(chart: &ChartDescription, size: (u32, u32)) -> image::RgbImage {
        let mut buffer = vec![255u8; size.0 as usize * size.1 as usize * 3];
        render_guarded(chart, &mut buffer, size, false).unwrap();
        image::RgbImage::from_raw(size.0, size.1, buffer).unwrap()
    }

    fn count_near(image: &image::RgbImage, rows: std::ops::Range<u32>, c: Rgb) -> usize {
        let near = |a: u8, b: u8| (a as i32 - b as i32).abs() <= 12;
        image
            .enumerate_pixels()
            .filter(|(_, y, _)| rows.contains(y))
            .filter(|(_, _, p)| near(p.0[0], c.r) && near(p.0[1], c.g) && near(p.0[2], c.b))
            .count()
    }

    #[test]
    fn threshold_line_is_drawn_on_default_log_axes() {
        let log_axis = |title: &str, range| AxisLayout {
            title: String::from(title),
            scale: AxisScale::Log,
            range,
        };
        let chart = ChartDescription {
            layout: Some(ChartLayout {
                title: String::from("Radionuclide Activity (Bq)"),
                x_axis: log_axis("Time (years)", [3.0, 5.0]),
                y_axis: log_axis("Activity (Bq)", [0.0, 8.0]),
            }),
            series: vec![ChartSeries {
                name: String::from("Limit Value"),
                kind: SeriesKind::Reference,
                style: SeriesStyle::Line {
                    color: Rgb::BLACK,
                    dash: LineDash::Dash,
                },
                x: vec![0.0, 100_000.0],
                y: vec![500.0, 500.0],
            }],
        };
        let image = render(&chart, (400, 300));

        // Plot area is rows 20..280; log10(500) sits 66% of the way down
        let (best_row, best) = (0..300)
            .map(|row| (row, count_near(&image, row..row + 1, Rgb::BLACK)))
            .max_by_key(|(_, n)| *n)
            .unwrap();
        assert!(best > 100, "only {best} dark pixels on the densest row");
        assert!((186..=198).contains(&best_row), "threshold drawn at row {best_row}");
    }

    #[test]
    fn line_crossing_the_top_keeps_its_visible_part() {
        let linear = |title: &str| AxisLayout {
            title: String::from(title),
            scale: AxisScale::Linear,
            range: [0.0, 2.0],
        };
        let color = Rgb::from_palette(3);
        let chart = ChartDescription {
            layout: Some(ChartLayout {
                title: String::from("Radionuclide Activity (Bq)"),
                x_axis: linear("Time (years)"),
                y_axis: linear("Activity (Bq)"),
            }),
            series: vec![ChartSeries {
                name: String::from("Cs-137 (a.h5)"),
                kind: SeriesKind::Data(FileSlot::Primary),
                style: SeriesStyle::Line {
                    color,
                    dash: LineDash::Solid,
                },
                x: vec![0.0, 1.0, 2.0],
                y: vec![1.0, 5.0, 1.0],
            }],
        };
        let image = render(&chart, (400, 300));
        assert!(count_near(&image, 0..300, color) > 50);
        // Nothing spills into the top margin
        assert_eq!(count_near(&image, 0..15, color), 0);
    }

    #[test]
    fn tick_labels() {
        assert_eq!(tick_label(3.0, true), "1e3");
        assert_eq!(tick_label(3.2, true), "1.6e3");
        assert_eq!(tick_label(2.5, false), "2.5");
        assert_eq!(tick_label(0.0, false), "0");
        assert_eq!(tick_label(250_000.0, false), "2.5e5");
    }
}
