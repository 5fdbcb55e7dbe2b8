//! SVG rendering with plotters

use super::{BarChart, Histogram};
use crate::error::{CarestarError, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::path::PathBuf;
use tracing::info;

const CAPTION_SIZE: u32 = 13;
const LINE_HEIGHT: i32 = 16;

fn plot_err<E: std::fmt::Display>(err: E) -> CarestarError {
    CarestarError::PlotError(err.to_string())
}

/// Writes charts as SVG files into one directory
#[derive(Debug, Clone)]
pub struct SvgRenderer {
    dir: PathBuf,
}

impl SvgRenderer {
    /// Create the renderer, creating `dir` if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// All histograms in a near-square grid under one title
    pub fn histogram_grid(&self, file: &str, title: &str, hists: &[Histogram]) -> Result<PathBuf> {
        let path = self.dir.join(file);
        let n = hists.len().max(1);
        let cols = (n as f64).sqrt().ceil() as usize;
        let rows = (n + cols - 1) / cols;

        {
            let size = ((cols * 420) as u32, (rows * 320 + 40) as u32);
            let root = SVGBackend::new(&path, size).into_drawing_area();
            root.fill(&WHITE).map_err(plot_err)?;
            let body = root.titled(title, ("sans-serif", 24)).map_err(plot_err)?;

            for (area, hist) in body.split_evenly((rows, cols)).iter().zip(hists) {
                draw_histogram(area, hist)?;
            }
            root.present().map_err(plot_err)?;
        }

        info!(path = %path.display(), charts = hists.len(), "Wrote histogram grid");
        Ok(path)
    }

    /// One histogram
    pub fn histogram(&self, file: &str, hist: &Histogram) -> Result<PathBuf> {
        let path = self.dir.join(file);
        {
            let root = SVGBackend::new(&path, (800, 400)).into_drawing_area();
            root.fill(&WHITE).map_err(plot_err)?;
            draw_histogram(&root, hist)?;
            root.present().map_err(plot_err)?;
        }
        info!(path = %path.display(), "Wrote histogram");
        Ok(path)
    }

    /// Horizontal bar chart, first bar on top
    pub fn bar_chart(&self, file: &str, chart: &BarChart) -> Result<PathBuf> {
        let path = self.dir.join(file);
        {
            let root = SVGBackend::new(&path, (1000, 600)).into_drawing_area();
            root.fill(&WHITE).map_err(plot_err)?;
            draw_bar_chart(&root, chart)?;
            root.present().map_err(plot_err)?;
        }
        info!(path = %path.display(), "Wrote bar chart");
        Ok(path)
    }
}

/// Draw multi-line `title` at the top of `area`, return the area below it
fn draw_caption<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    title: &str,
) -> Result<DrawingArea<DB, Shift>> {
    let lines: Vec<&str> = title.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        area.draw(&Text::new(
            line.to_string(),
            (10, 4 + i as i32 * LINE_HEIGHT),
            ("sans-serif", CAPTION_SIZE).into_font(),
        ))
        .map_err(plot_err)?;
    }
    Ok(area.margin(lines.len() as i32 * LINE_HEIGHT + 8, 0, 0, 0))
}

fn draw_histogram<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, hist: &Histogram) -> Result<()> {
    let body = draw_caption(area, &hist.title)?;

    let lo = hist.edges.first().copied().unwrap_or(0.0);
    let hi = hist.edges.last().copied().unwrap_or(1.0);
    let y_max = hist.max_count().max(1) as f64 * 1.1;

    let mut chart = ChartBuilder::on(&body)
        .margin(6)
        .x_label_area_size(28)
        .y_label_area_size(36)
        .build_cartesian_2d(lo..hi, 0f64..y_max)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc(hist.x_label.as_str())
        .y_desc(hist.y_label.as_str())
        .x_labels(6)
        .draw()
        .map_err(plot_err)?;

    chart
        .draw_series(hist.bins().map(|(l, h, count)| {
            Rectangle::new([(l, 0.0), (h, count as f64)], BLUE.mix(0.5).filled())
        }))
        .map_err(plot_err)?;

    if let Some(marker) = &hist.marker {
        chart
            .draw_series(LineSeries::new(
                vec![(marker.value, 0.0), (marker.value, y_max)],
                RED.stroke_width(2),
            ))
            .map_err(plot_err)?
            .label(format!("{} = {:+.2}", marker.label, marker.value))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(plot_err)?;
    }

    Ok(())
}

fn draw_bar_chart<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, bars: &BarChart) -> Result<()> {
    let body = draw_caption(area, &bars.title)?;

    let n = bars.bars.len().max(1) as f64;
    let x_max = bars.max_value().max(f64::EPSILON) * 1.15;

    let mut chart = ChartBuilder::on(&body)
        .margin(10)
        .x_label_area_size(30)
        .y_label_area_size(10)
        .build_cartesian_2d(0f64..x_max, 0f64..n)
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_desc(bars.x_label.as_str())
        .draw()
        .map_err(plot_err)?;

    // slot 0 is the top row
    let slot = |i: usize| n - 1.0 - i as f64;

    chart
        .draw_series(bars.bars.iter().enumerate().map(|(i, (_, value))| {
            let y = slot(i);
            Rectangle::new([(0.0, y + 0.1), (*value, y + 0.55)], RGBColor(135, 206, 235).filled())
        }))
        .map_err(plot_err)?;

    chart
        .draw_series(bars.bars.iter().enumerate().map(|(i, (label, value))| {
            Text::new(
                format!("{}  ({:.4})", label, value),
                (0.0, slot(i) + 0.92),
                ("sans-serif", 12).into_font(),
            )
        }))
        .map_err(plot_err)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writes_svg_files() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SvgRenderer::new(dir.path().join("plots")).unwrap();

        let hists = vec![
            Histogram::from_values("first\nline two", &[1.0, 2.0, 2.5, 3.0], 3),
            Histogram::from_values("second", &[5.0, 5.0], 3),
        ];
        let grid = renderer.histogram_grid("histograms.svg", "Histograms", &hists).unwrap();
        assert!(grid.exists());

        let single = renderer
            .histogram(
                "whatif.svg",
                &Histogram::from_values("delta", &[-0.1, 0.0, 0.2], 4).with_marker("Avg Change", 0.03),
            )
            .unwrap();
        let content = std::fs::read_to_string(&single).unwrap();
        assert!(content.contains("<svg"));

        let chart = BarChart::new("Top", "Importance Score", vec![("a".into(), 0.6), ("b".into(), 0.4)]);
        let bars = renderer.bar_chart("importances.svg", &chart).unwrap();
        assert!(bars.exists());
    }
}
