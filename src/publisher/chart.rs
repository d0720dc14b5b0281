use std::path::Path;

use plotters::prelude::*;

use crate::error::{AppError, Result};

pub const CHART_WIDTH: u32 = 1200;
pub const CHART_HEIGHT: u32 = 600;

const BAR_COLOR: RGBColor = RGBColor(54, 96, 146);
const ZERO_LINE_COLOR: RGBColor = RGBColor(231, 76, 60);

#[derive(Debug, Clone, PartialEq)]
pub struct Bin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

/// Equal-width bins over `[min, max]` of `values`. The last bin is closed on
/// the right so the maximum lands in it. A zero-width range is widened by 0.5
/// either side. No values, no bins.
pub fn histogram(values: &[f64], bin_count: usize) -> Vec<Bin> {
    if values.is_empty() || bin_count == 0 {
        return Vec::new();
    }

    let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }
    let width = (hi - lo) / bin_count as f64;

    let mut bins: Vec<Bin> = (0..bin_count)
        .map(|i| Bin {
            lower: lo + width * i as f64,
            upper: if i + 1 == bin_count { hi } else { lo + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();

    for v in values {
        let idx = (((v - lo) / width).floor() as usize).min(bin_count - 1);
        bins[idx].count += 1;
    }
    bins
}

/// Draw the bins as a bar chart PNG at `path`, overwriting any previous chart.
/// A red marker shows where 0% falls when it is inside the range.
pub fn render_histogram(bins: &[Bin], path: &Path) -> Result<()> {
    let root = BitMapBackend::new(path, (CHART_WIDTH, CHART_HEIGHT)).into_drawing_area();
    root.fill(&WHITE).map_err(chart_err)?;

    let (left, right) = (60i32, CHART_WIDTH as i32 - 30);
    let (top, bottom) = (30i32, CHART_HEIGHT as i32 - 50);
    let plot_height = (bottom - top) as f64;
    let bar_width = (right - left) as f64 / bins.len().max(1) as f64;
    let max_count = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1) as f64;

    for (i, bin) in bins.iter().enumerate() {
        if bin.count == 0 {
            continue;
        }
        let x0 = left + (i as f64 * bar_width).round() as i32;
        let x1 = left + ((i + 1) as f64 * bar_width).round() as i32 - 1;
        let y0 = bottom - (bin.count as f64 / max_count * plot_height).round() as i32;
        root.draw(&Rectangle::new([(x0, y0), (x1, bottom)], BAR_COLOR.filled()))
            .map_err(chart_err)?;
        root.draw(&Rectangle::new([(x0, y0), (x1, bottom)], BLACK.stroke_width(1)))
            .map_err(chart_err)?;
    }

    if let (Some(first), Some(last)) = (bins.first(), bins.last()) {
        if first.lower < 0.0 && last.upper > 0.0 {
            let frac = -first.lower / (last.upper - first.lower);
            let x = left + (frac * (right - left) as f64).round() as i32;
            root.draw(&PathElement::new(vec![(x, top), (x, bottom)], ZERO_LINE_COLOR.stroke_width(2)))
                .map_err(chart_err)?;
        }
    }

    root.draw(&PathElement::new(
        vec![(left, top), (left, bottom), (right, bottom)],
        BLACK.stroke_width(2),
    ))
    .map_err(chart_err)?;

    root.present().map_err(chart_err)?;
    Ok(())
}

fn chart_err<E: std::fmt::Display>(e: E) -> AppError {
    AppError::Chart(e.to_string())
}
