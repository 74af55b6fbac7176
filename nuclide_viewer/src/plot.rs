use eframe::egui::{Color32, Ui};
use egui_plot::{
    GridInput, GridMark, Legend, Line, LineStyle, MarkerShape, Plot, PlotBounds, PlotPoints,
    Points,
};

use libnuclide_viewer::chart::{AxisScale, ChartDescription, LineDash, Rgb, SeriesStyle};

fn color32(c: Rgb) -> Color32 {
    Color32::from_rgb(c.r, c.g, c.b)
}

/// Draw a chart description with egui_plot.
///
/// Log axes are drawn in log10 space with log spaced grid marks. When `reset_bounds` is
/// set the view snaps back to the configured axis ranges.
pub fn show_chart(ui: &mut Ui, chart: &ChartDescription, reset_bounds: bool) {
    let layout = match &chart.layout {
        Some(layout) => layout,
        None => {
            ui.centered_and_justified(|ui| ui.label("Nothing to plot"));
            return;
        }
    };
    let x_log = layout.x_axis.scale == AxisScale::Log;
    let y_log = layout.y_axis.scale == AxisScale::Log;

    let mut plot = Plot::new("ChartPlot")
        .legend(Legend::default())
        .x_axis_label(layout.x_axis.title.clone())
        .y_axis_label(layout.y_axis.title.clone())
        .label_formatter(move |name, value| {
            let x = if x_log { 10.0f64.powf(value.x) } else { value.x };
            let y = if y_log { 10.0f64.powf(value.y) } else { value.y };
            if !name.is_empty() {
                format!("{name}: {x:.2}, {y:.3e}")
            } else {
                format!("{x:.2}, {y:.3e}")
            }
        });
    if x_log {
        plot = plot
            .x_grid_spacer(log_axis_spacer)
            .x_axis_formatter(|gm, _bounds| log_axis_formatter(gm));
    }
    if y_log {
        plot = plot
            .y_grid_spacer(log_axis_spacer)
            .y_axis_formatter(|gm, _bounds| log_axis_formatter(gm));
    }

    let [x0, x1] = layout.x_axis.range;
    let [y0, y1] = layout.y_axis.range;
    plot.show(ui, |plot_ui| {
        if reset_bounds {
            plot_ui.set_plot_bounds(PlotBounds::from_min_max([x0, y0], [x1, y1]));
        }
        for series in chart.series.iter() {
            let points: Vec<[f64; 2]> = series
                .display_points(layout)
                .into_iter()
                .map(|(x, y)| [x, y])
                .collect();
            match series.style {
                SeriesStyle::Line { color, dash } => {
                    let style = match dash {
                        LineDash::Solid => LineStyle::Solid,
                        LineDash::Dash => LineStyle::dashed_loose(),
                    };
                    plot_ui.line(
                        Line::new(PlotPoints::from(points))
                            .name(&series.name)
                            .color(color32(color))
                            .style(style)
                            .width(2.0),
                    );
                }
                SeriesStyle::Markers { color, .. } => {
                    plot_ui.points(
                        Points::new(PlotPoints::from(points))
                            .name(&series.name)
                            .color(color32(color))
                            .shape(MarkerShape::Cross)
                            .radius(4.0),
                    );
                }
            }
        }
    });
}

/// Grid marks at every decade, with finer marks at the integer multiples within it
fn log_axis_spacer(input: GridInput) -> Vec<GridMark> {
    let (min, max) = input.bounds;
    let mut marks = vec![];
    for decade in min.floor() as i32..=max.ceil() as i32 {
        marks.extend(
            (1..10)
                .map(|j| {
                    let value = decade as f64 + (j as f64).log10();
                    let step_size = if j == 1 { 1.0 } else { 0.1 };
                    GridMark { value, step_size }
                })
                .filter(|gm| (min..=max).contains(&gm.value)),
        );
    }
    marks
}

fn log_axis_formatter(gm: GridMark) -> String {
    // Only decades are labelled
    if gm.step_size < 1.0 {
        return String::new();
    }
    format!("{:.0e}", 10.0f64.powf(gm.value))
}
