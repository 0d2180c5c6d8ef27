//! Chart rendering.
//!
//! Produces PNG bytes in memory: a filled-cell heatmap of an interpolated
//! grid with the original samples overlaid and a labeled color scale, and a
//! before/after line chart for decimation previews.

use std::io::Cursor;

use anyhow::{bail, Context, Result};
use image::{ImageFormat, RgbImage};
use plotters::prelude::*;

use crate::interpolate::GridSurface;

const WIDTH: u32 = 900;
const HEIGHT: u32 = 700;
const COLORBAR_WIDTH: u32 = 110;

/// Gradient stops: darkblue through green and yellow to darkred.
const STOPS: [(f64, (u8, u8, u8)); 8] = [
    (0.0, (0, 0, 139)),
    (0.2, (0, 0, 255)),
    (0.4, (173, 216, 230)),
    (0.5, (0, 128, 0)),
    (0.6, (255, 255, 0)),
    (0.7, (255, 165, 0)),
    (0.8, (255, 0, 0)),
    (1.0, (139, 0, 0)),
];

/// Map a normalized value in [0, 1] onto the gradient.
fn colormap(t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0);
    for pair in STOPS.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let f = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            let lerp = |a: u8, b: u8| (a as f64 + f * (b as f64 - a as f64)).round() as u8;
            return RGBColor(lerp(c0.0, c1.0), lerp(c0.1, c1.1), lerp(c0.2, c1.2));
        }
    }
    let (_, c) = STOPS[STOPS.len() - 1];
    RGBColor(c.0, c.1, c.2)
}

fn encode_png(buf: Vec<u8>) -> Result<Vec<u8>> {
    let img = RgbImage::from_raw(WIDTH, HEIGHT, buf).context("pixel buffer size mismatch")?;
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Render an interpolated surface as a heatmap PNG.
///
/// Undefined (NaN) cells are left blank. The original sample points are drawn
/// on top as black-edged markers and the color scale on the right is labeled
/// with the value column's name.
pub fn heatmap_png(
    surface: &GridSurface,
    x: &[f64],
    y: &[f64],
    z: &[f64],
    x_label: &str,
    y_label: &str,
    value_label: &str,
) -> Result<Vec<u8>> {
    let (mut vmin, mut vmax) = surface
        .value_range()
        .context("surface has no defined nodes")?;
    for &v in z.iter().filter(|v| v.is_finite()) {
        vmin = vmin.min(v);
        vmax = vmax.max(v);
    }
    if vmax <= vmin {
        vmax = vmin + 1.0;
    }
    let norm = |v: f64| (v - vmin) / (vmax - vmin);

    let x_min = surface.xs[0];
    let x_max = surface.xs[surface.xs.len() - 1].max(x_min + f64::EPSILON);
    let y_min = surface.ys[0];
    let y_max = surface.ys[surface.ys.len() - 1].max(y_min + f64::EPSILON);

    let mut buf = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;
        let (plot, bar) = root.split_horizontally(WIDTH - COLORBAR_WIDTH);

        let mut chart = ChartBuilder::on(&plot)
            .caption(format!("{value_label} heatmap"), ("sans-serif", 28))
            .margin(10)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_desc(x_label)
            .y_desc(y_label)
            .draw()?;

        // One node-centered cell per defined grid value.
        let res = surface.resolution();
        let half_x = (x_max - x_min) / (2.0 * (res - 1) as f64);
        let half_y = (y_max - y_min) / (2.0 * (res - 1) as f64);
        let mut cells = Vec::new();
        for (row, gy) in surface.ys.iter().enumerate() {
            for (col, gx) in surface.xs.iter().enumerate() {
                let v = surface.values[row][col];
                if v.is_nan() {
                    continue;
                }
                cells.push(Rectangle::new(
                    [(gx - half_x, gy - half_y), (gx + half_x, gy + half_y)],
                    colormap(norm(v)).filled(),
                ));
            }
        }
        chart.draw_series(cells)?;

        // Original samples on top, colored by value with a black edge.
        chart.draw_series(
            x.iter()
                .zip(y)
                .zip(z)
                .filter(|((px, py), pz)| px.is_finite() && py.is_finite() && pz.is_finite())
                .map(|((&px, &py), &pz)| Circle::new((px, py), 4, colormap(norm(pz)).filled())),
        )?;
        chart.draw_series(
            x.iter()
                .zip(y)
                .filter(|(px, py)| px.is_finite() && py.is_finite())
                .map(|(&px, &py)| Circle::new((px, py), 4, BLACK.stroke_width(1))),
        )?;

        // Color scale strip.
        let mut scale = ChartBuilder::on(&bar)
            .margin(10)
            .y_label_area_size(45)
            .build_cartesian_2d(0.0..1.0, vmin..vmax)?;
        scale
            .configure_mesh()
            .disable_x_mesh()
            .disable_y_mesh()
            .x_labels(0)
            .y_desc(value_label)
            .draw()?;
        let steps = 100;
        let step = (vmax - vmin) / steps as f64;
        scale.draw_series((0..steps).map(|i| {
            let lo = vmin + step * i as f64;
            Rectangle::new(
                [(0.0, lo), (1.0, lo + step)],
                colormap(norm(lo + step / 2.0)).filled(),
            )
        }))?;

        root.present()?;
    }

    encode_png(buf)
}

/// Line chart of a numeric column before and after decimation by factor k.
/// Decimated samples are plotted at their source row index so the two traces
/// line up.
pub fn comparison_png(
    original: &[f64],
    decimated: &[f64],
    k: usize,
    label: &str,
) -> Result<Vec<u8>> {
    let finite: Vec<f64> = original
        .iter()
        .chain(decimated)
        .copied()
        .filter(|v| v.is_finite())
        .collect();
    if finite.is_empty() {
        bail!("nothing to plot: no finite values");
    }
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;
    for v in finite {
        y_min = y_min.min(v);
        y_max = y_max.max(v);
    }
    if y_max <= y_min {
        y_max = y_min + 1.0;
    }
    let x_max = original.len().max(1) as f64;

    let mut buf = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(format!("{label}: original vs decimated"), ("sans-serif", 28))
            .margin(10)
            .x_label_area_size(45)
            .y_label_area_size(60)
            .build_cartesian_2d(0.0..x_max, y_min..y_max)?;

        chart
            .configure_mesh()
            .x_desc("row")
            .y_desc(label)
            .draw()?;

        chart
            .draw_series(LineSeries::new(
                original.iter().enumerate().map(|(i, &v)| (i as f64, v)),
                &BLUE,
            ))?
            .label("original")
            .legend(|(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 20, ly)], BLUE));

        chart
            .draw_series(LineSeries::new(
                decimated
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| ((i * k) as f64, v)),
                &RED,
            ))?
            .label(format!("decimated ({k}:1)"))
            .legend(|(lx, ly)| PathElement::new(vec![(lx, ly), (lx + 20, ly)], RED));

        chart
            .configure_series_labels()
            .border_style(BLACK)
            .background_style(WHITE.mix(0.8))
            .draw()?;

        root.present()?;
    }

    encode_png(buf)
}
