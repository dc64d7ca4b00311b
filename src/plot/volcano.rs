//! Volcano plot of a differential expression table.

use crate::data::DeResultTable;
use crate::error::{RnaError, Result};
use plotters::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Rendering options for the volcano plot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolcanoOptions {
    /// Adjusted p-value below which a gene is drawn as significant.
    pub alpha: f64,
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
}

impl Default for VolcanoOptions {
    fn default() -> Self {
        Self {
            alpha: 0.05,
            width: 1000,
            height: 800,
        }
    }
}

/// A point on the volcano plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolcanoPoint {
    pub x: f64,
    pub y: f64,
}

/// Plot coordinates split by significance.
#[derive(Debug, Clone, Default)]
pub struct VolcanoPoints {
    pub significant: Vec<VolcanoPoint>,
    pub not_significant: Vec<VolcanoPoint>,
}

impl VolcanoPoints {
    /// x = log2 fold change, y = -log10(padj).
    ///
    /// Rows with NaN padj or NaN fold change have no position and are left
    /// out. padj = 0 maps to y = +inf; such points are pinned to the top of
    /// the axis when drawn.
    pub fn from_table(table: &DeResultTable, alpha: f64) -> Self {
        let mut points = Self::default();
        for r in table.iter() {
            if r.padj.is_nan() || r.log2_fold_change.is_nan() {
                continue;
            }
            let point = VolcanoPoint {
                x: r.log2_fold_change,
                y: r.neg_log10_padj(),
            };
            if r.is_significant_at(alpha) {
                points.significant.push(point);
            } else {
                points.not_significant.push(point);
            }
        }
        points
    }

    pub fn len(&self) -> usize {
        self.significant.len() + self.not_significant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Axis ranges `(x_range, y_range)` with a small margin.
    ///
    /// x is symmetric around zero so up- and down-regulated genes are
    /// comparable. Infinite y values are ignored when sizing the y axis.
    pub fn axis_ranges(&self) -> ((f64, f64), (f64, f64)) {
        let all = self.significant.iter().chain(&self.not_significant);
        let x_extent = all
            .clone()
            .map(|p| p.x.abs())
            .filter(|x| x.is_finite())
            .fold(0.0_f64, f64::max);
        let y_max = all
            .map(|p| p.y)
            .filter(|y| y.is_finite())
            .fold(0.0_f64, f64::max);

        let x_extent = if x_extent > 0.0 { x_extent * 1.1 } else { 1.0 };
        let y_max = if y_max > 0.0 { y_max * 1.1 } else { 1.0 };
        ((-x_extent, x_extent), (0.0, y_max))
    }
}

/// Render the volcano plot for `table` to a PNG at `path`.
///
/// If text cannot be drawn (no usable system font), the plot is rendered
/// again with points and axes only.
pub fn plot_volcano<P: AsRef<Path>>(table: &DeResultTable, path: P, options: &VolcanoOptions) -> Result<()> {
    let path = path.as_ref();
    let points = VolcanoPoints::from_table(table, options.alpha);
    match render(&points, &table.treatment, path, options, true) {
        Ok(()) => Ok(()),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "volcano labels failed, drawing without text");
            render(&points, &table.treatment, path, options, false).map_err(|e| RnaError::Plot(e.to_string()))
        }
    }
}

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn render(points: &VolcanoPoints, treatment: &str, path: &Path, options: &VolcanoOptions, with_text: bool) -> DrawResult {
    let ((x_min, x_max), (y_min, y_max)) = points.axis_ranges();
    let clamp = |p: &VolcanoPoint| (p.x.clamp(x_min, x_max), p.y.min(y_max));

    let root = BitMapBackend::new(path, (options.width, options.height)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut builder = ChartBuilder::on(&root);
    builder.margin(15);
    if with_text {
        builder
            .caption(format!("Volcano Plot: {} vs Control", treatment), ("sans-serif", 28))
            .x_label_area_size(50)
            .y_label_area_size(70);
    }
    let mut chart = builder.build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    if with_text {
        chart
            .configure_mesh()
            .x_desc("log2 Fold Change")
            .y_desc("-log10(adjusted p-value)")
            .disable_x_mesh()
            .disable_y_mesh()
            .draw()?;
    } else {
        let axes = [
            vec![(x_min, y_min), (x_max, y_min)],
            vec![(0.0, y_min), (0.0, y_max)],
        ];
        chart.draw_series(axes.into_iter().map(|line| PathElement::new(line, BLACK)))?;
    }

    let grey = RGBColor(128, 128, 128).mix(0.5);
    let red = RED.mix(0.7);
    let not_significant = chart.draw_series(
        points
            .not_significant
            .iter()
            .map(|p| Circle::new(clamp(p), 3, grey.filled())),
    )?;
    if with_text {
        not_significant
            .label("Not significant")
            .legend(move |(x, y)| Circle::new((x, y), 5, grey.filled()));
    }
    let significant = chart.draw_series(
        points
            .significant
            .iter()
            .map(|p| Circle::new(clamp(p), 3, red.filled())),
    )?;
    if with_text {
        significant
            .label("Significant")
            .legend(move |(x, y)| Circle::new((x, y), 5, red.filled()));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .position(SeriesLabelPosition::UpperRight)
            .draw()?;
    }

    root.present()?;
    Ok(())
}
