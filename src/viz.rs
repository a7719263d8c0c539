//! Chart rendering using Plotters
//!
//! Every chart is drawn onto a PNG `BitMapBackend`. Drawing errors are boxed
//! inside the private `draw_*` functions and converted to
//! [`PipelineError::Chart`] at the public boundary.

use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;
use tracing::debug;

use crate::aggregate::{KeyedTotal, Pivot};
use crate::error::PipelineError;

type DrawResult = Result<(), Box<dyn std::error::Error>>;

/// Slice colours for pie charts
const PALETTE: [RGBColor; 12] = [
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
    RGBColor(188, 189, 34),
    RGBColor(23, 190, 207),
    RGBColor(174, 199, 232),
    RGBColor(255, 187, 120),
];

const SERIES_COLOR: RGBColor = RGBColor(31, 119, 180);

/// Axis titles shared by the cartesian charts
#[derive(Debug, Clone, Copy)]
pub struct Axes<'a> {
    pub x: &'a str,
    pub y: &'a str,
}

/// Line chart over labelled categories; `None` values leave a gap
pub fn line_chart(
    output_path: &Path,
    title: &str,
    axes: Axes<'_>,
    labels: &[String],
    values: &[Option<f64>],
) -> crate::Result<()> {
    finish(output_path, draw_line_chart(output_path, title, axes, labels, values))
}

/// Vertical bar chart, bars drawn in the given order
pub fn bar_chart(
    output_path: &Path,
    title: &str,
    axes: Axes<'_>,
    bars: &[KeyedTotal],
) -> crate::Result<()> {
    finish(output_path, draw_bar_chart(output_path, title, axes, bars))
}

/// Horizontal bar chart; the first entry is drawn at the top
pub fn horizontal_bar_chart(
    output_path: &Path,
    title: &str,
    x_desc: &str,
    bars: &[KeyedTotal],
) -> crate::Result<()> {
    finish(
        output_path,
        draw_horizontal_bar_chart(output_path, title, x_desc, bars),
    )
}

/// Pie chart with percentage labels
pub fn pie_chart(output_path: &Path, title: &str, slices: &[KeyedTotal]) -> crate::Result<()> {
    finish(output_path, draw_pie_chart(output_path, title, slices))
}

pub fn scatter_plot(
    output_path: &Path,
    title: &str,
    axes: Axes<'_>,
    points: &[(f64, f64)],
) -> crate::Result<()> {
    finish(output_path, draw_scatter_plot(output_path, title, axes, points))
}

/// Colour grid of a store × month pivot with a value legend on the right
pub fn heatmap(output_path: &Path, title: &str, pivot: &Pivot) -> crate::Result<()> {
    finish(output_path, draw_heatmap(output_path, title, pivot))
}

fn finish(output_path: &Path, result: DrawResult) -> crate::Result<()> {
    result.map_err(|e| PipelineError::Chart {
        path: output_path.to_path_buf(),
        message: e.to_string(),
    })?;
    debug!(path = %output_path.display(), "chart saved");
    Ok(())
}

fn draw_line_chart(
    output_path: &Path,
    title: &str,
    axes: Axes<'_>,
    labels: &[String],
    values: &[Option<f64>],
) -> DrawResult {
    let root = BitMapBackend::new(output_path, (1000, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let n = labels.len().max(1) as i32;
    let y_range = value_range(values.iter().flatten().copied());

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(80)
        .build_cartesian_2d((0..n).into_segmented(), y_range)?;

    chart
        .configure_mesh()
        .x_labels(labels.len().max(1))
        .x_label_formatter(&|v| segment_label(labels, v))
        .x_desc(axes.x)
        .y_desc(axes.y)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    for run in present_runs(values) {
        chart.draw_series(LineSeries::new(
            run.iter().map(|&(i, v)| (SegmentValue::CenterOf(i), v)),
            &SERIES_COLOR,
        ))?;
        chart.draw_series(
            run.iter()
                .map(|&(i, v)| Circle::new((SegmentValue::CenterOf(i), v), 4, SERIES_COLOR.filled())),
        )?;
    }

    root.present()?;
    Ok(())
}

fn draw_bar_chart(output_path: &Path, title: &str, axes: Axes<'_>, bars: &[KeyedTotal]) -> DrawResult {
    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let labels: Vec<String> = bars.iter().map(|(k, _)| k.clone()).collect();
    let n = bars.len().max(1) as i32;
    let y_range = value_range(bars.iter().map(|(_, v)| *v));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d((0..n).into_segmented(), y_range)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len().max(1))
        .x_label_formatter(&|v| segment_label(&labels, v))
        .x_desc(axes.x)
        .y_desc(axes.y)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(SERIES_COLOR.filled())
            .margin(8)
            .data(bars.iter().enumerate().map(|(i, (_, v))| (i as i32, *v))),
    )?;

    root.present()?;
    Ok(())
}

fn draw_horizontal_bar_chart(
    output_path: &Path,
    title: &str,
    x_desc: &str,
    bars: &[KeyedTotal],
) -> DrawResult {
    let root = BitMapBackend::new(output_path, (1000, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    // Row 0 is at the bottom, so the first bar takes the highest row
    let labels: Vec<String> = bars.iter().rev().map(|(k, _)| k.clone()).collect();
    let n = bars.len().max(1) as i32;
    let x_range = value_range(bars.iter().map(|(_, v)| *v));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 30))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(200)
        .build_cartesian_2d(x_range, (0..n).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(bars.len().max(1))
        .y_label_formatter(&|v| segment_label(&labels, v))
        .x_desc(x_desc)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let last = bars.len() as i32 - 1;
    chart.draw_series(
        Histogram::horizontal(&chart)
            .style(SERIES_COLOR.filled())
            .margin(6)
            .data(bars.iter().enumerate().map(|(i, (_, v))| (last - i as i32, *v))),
    )?;

    root.present()?;
    Ok(())
}

fn draw_pie_chart(output_path: &Path, title: &str, slices: &[KeyedTotal]) -> DrawResult {
    let root = BitMapBackend::new(output_path, (800, 800)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, ("sans-serif", 30))?;

    let sizes: Vec<f64> = slices.iter().map(|(_, v)| v.max(0.0)).collect();
    // A pie of nothing has no angles to draw
    if sizes.iter().sum::<f64>() > 0.0 {
        let (width, height) = root.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        let radius = f64::from(width.min(height)) * 0.32;
        let colors: Vec<RGBColor> = (0..sizes.len()).map(|i| PALETTE[i % PALETTE.len()]).collect();
        let labels: Vec<&str> = slices.iter().map(|(k, _)| k.as_str()).collect();

        let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
        pie.start_angle(140.0);
        pie.label_style(("sans-serif", 16).into_font().color(&BLACK));
        pie.percentages(("sans-serif", 14).into_font().color(&WHITE));
        root.draw(&pie)?;
    }

    root.present()?;
    Ok(())
}

fn draw_scatter_plot(
    output_path: &Path,
    title: &str,
    axes: Axes<'_>,
    points: &[(f64, f64)],
) -> DrawResult {
    let root = BitMapBackend::new(output_path, (700, 500)).into_drawing_area();
    root.fill(&WHITE)?;

    let x_range = padded_range(points.iter().map(|(x, _)| *x));
    let y_range = padded_range(points.iter().map(|(_, y)| *y));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(50)
        .y_label_area_size(70)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc(axes.x)
        .y_desc(axes.y)
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    chart.draw_series(
        points
            .iter()
            .map(|&(x, y)| Circle::new((x, y), 3, SERIES_COLOR.mix(0.6).filled())),
    )?;

    root.present()?;
    Ok(())
}

fn draw_heatmap(output_path: &Path, title: &str, pivot: &Pivot) -> DrawResult {
    let root = BitMapBackend::new(output_path, (1200, 600)).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(title, ("sans-serif", 28))?;
    let (grid_area, legend_area) = root.split_horizontally(1060);

    let max = pivot.max_cell();
    let n_months = pivot.months.len().max(1) as i32;
    let n_stores = pivot.stores.len().max(1) as i32;
    // Highest-ranked store on the top row
    let store_labels: Vec<String> = pivot.stores.iter().rev().cloned().collect();

    let mut chart = ChartBuilder::on(&grid_area)
        .margin(10)
        .x_label_area_size(60)
        .y_label_area_size(180)
        .build_cartesian_2d((0..n_months).into_segmented(), (0..n_stores).into_segmented())?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(pivot.months.len().max(1))
        .y_labels(pivot.stores.len().max(1))
        .x_label_formatter(&|v| segment_label(&pivot.months, v))
        .y_label_formatter(&|v| segment_label(&store_labels, v))
        .x_desc("Month")
        .y_desc("Store")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let top_row = pivot.stores.len() as i32 - 1;
    chart.draw_series(pivot.cells.iter().enumerate().flat_map(|(r, row)| {
        let y = top_row - r as i32;
        row.iter().enumerate().map(move |(c, &value)| {
            let x = c as i32;
            Rectangle::new(
                [
                    (SegmentValue::Exact(x), SegmentValue::Exact(y)),
                    (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1)),
                ],
                heat_color(intensity(value, max)).filled(),
            )
        })
    }))?;

    draw_color_legend(&legend_area, max)?;

    root.present()?;
    Ok(())
}

fn draw_color_legend(area: &DrawingArea<BitMapBackend<'_>, Shift>, max: f64) -> DrawResult {
    const STEPS: usize = 50;
    let top = if max > 0.0 { max } else { 1.0 };

    let mut legend = ChartBuilder::on(area)
        .margin_top(20)
        .margin_bottom(70)
        .margin_right(10)
        .y_label_area_size(70)
        .build_cartesian_2d(0f64..1f64, 0f64..top)?;

    legend
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc("Sales")
        .axis_desc_style(("sans-serif", 15))
        .draw()?;

    let step = top / STEPS as f64;
    legend.draw_series((0..STEPS).map(|i| {
        let low = i as f64 * step;
        Rectangle::new(
            [(0.0, low), (1.0, low + step)],
            heat_color(intensity(low + step / 2.0, top)).filled(),
        )
    }))?;

    Ok(())
}

fn segment_label(labels: &[String], value: &SegmentValue<i32>) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => usize::try_from(*i)
            .ok()
            .and_then(|i| labels.get(i))
            .cloned()
            .unwrap_or_default(),
        SegmentValue::Last => String::new(),
    }
}

/// Consecutive present values, as (index, value) runs
fn present_runs(values: &[Option<f64>]) -> Vec<Vec<(i32, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) => current.push((i as i32, *v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}

/// Axis range covering zero and every value, with headroom above the max
fn value_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((0.0f64, 0.0f64), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if max - min <= f64::EPSILON {
        return min..min + 1.0;
    }
    let pad = (max - min) * 0.1;
    (if min < 0.0 { min - pad } else { min })..max + pad
}

/// Range spanning the values with 5% padding on each side
fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        return 0.0..1.0;
    }
    let pad = ((max - min) * 0.05).max(0.5);
    (min - pad)..(max + pad)
}

fn intensity(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        (value / max).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Dark blue for low values through to red for the maximum
fn heat_color(t: f64) -> HSLColor {
    HSLColor(0.66 * (1.0 - t), 0.85, 0.25 + 0.3 * t)
}
