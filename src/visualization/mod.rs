//! Visualization module: histograms and bar charts.
//!
//! Charts are plain data ([`Histogram`], [`BarChart`]) rendered either as
//! terminal text or, through [`svg::SvgRenderer`], as SVG files.

pub mod svg;

pub use svg::SvgRenderer;

use crate::error::{CarestarError, Result};
use crate::preprocessing::{integer_columns_with_nulls, is_float_dtype};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Settings for the distribution profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub bins: usize,
    /// Title wrap width in characters
    pub title_width: usize,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            bins: 15,
            title_width: 40,
        }
    }
}

impl ProfileConfig {
    pub fn validate(&self) -> Result<()> {
        if self.bins == 0 {
            return Err(CarestarError::ConfigError("histogram bins must be at least 1".to_string()));
        }
        if self.title_width == 0 {
            return Err(CarestarError::ConfigError("title width must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Vertical marker drawn over a histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub label: String,
    pub value: f64,
}

/// Equal-width histogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    /// `counts.len() + 1` bin edges
    pub edges: Vec<f64>,
    pub counts: Vec<usize>,
    pub marker: Option<Marker>,
}

impl Histogram {
    /// Bin finite `values` into `bins` equal-width bins over their range.
    ///
    /// The last bin is closed on the right. A constant sample is spread over
    /// `[v - 0.5, v + 0.5]`.
    pub fn from_values(title: impl Into<String>, values: &[f64], bins: usize) -> Self {
        let bins = bins.max(1);
        let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();

        let (mut lo, mut hi) = finite
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        if finite.is_empty() {
            lo = 0.0;
            hi = 1.0;
        } else if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();

        let mut counts = vec![0usize; bins];
        for v in finite {
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Self {
            title: title.into(),
            x_label: String::new(),
            y_label: "Count".to_string(),
            edges,
            counts,
            marker: None,
        }
    }

    pub fn with_labels(mut self, x_label: impl Into<String>, y_label: impl Into<String>) -> Self {
        self.x_label = x_label.into();
        self.y_label = y_label.into();
        self
    }

    pub fn with_marker(mut self, label: impl Into<String>, value: f64) -> Self {
        self.marker = Some(Marker {
            label: label.into(),
            value,
        });
        self
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// (low edge, high edge, count) per bin
    pub fn bins(&self) -> impl Iterator<Item = (f64, f64, usize)> + '_ {
        self.edges
            .windows(2)
            .zip(self.counts.iter())
            .map(|(e, &c)| (e[0], e[1], c))
    }

    /// Text rendering, one line per bin
    pub fn render_text(&self, bar_width: usize) -> String {
        let max = self.max_count().max(1);
        let mut out = String::new();
        for (lo, hi, count) in self.bins() {
            let len = (count * bar_width + max - 1) / max;
            out.push_str(&format!(
                "{:>10.2} .. {:<10.2} {:<width$} {}\n",
                lo,
                hi,
                "█".repeat(len),
                count,
                width = bar_width
            ));
        }
        if let Some(marker) = &self.marker {
            out.push_str(&format!("{} = {:+.2}\n", marker.label, marker.value));
        }
        out
    }
}

/// Horizontal bar chart, first bar drawn on top
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarChart {
    pub title: String,
    pub x_label: String,
    pub bars: Vec<(String, f64)>,
}

impl BarChart {
    pub fn new(title: impl Into<String>, x_label: impl Into<String>, bars: Vec<(String, f64)>) -> Self {
        Self {
            title: title.into(),
            x_label: x_label.into(),
            bars,
        }
    }

    pub fn max_value(&self) -> f64 {
        self.bars.iter().map(|(_, v)| *v).fold(0.0, f64::max)
    }

    /// Text rendering with labels truncated to `label_width`
    pub fn render_text(&self, label_width: usize, bar_width: usize) -> String {
        let max = self.max_value();
        let mut out = String::new();
        for (label, value) in &self.bars {
            let len = if max > 0.0 {
                ((value / max) * bar_width as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "{:<lw$} {:<bw$} {:.4}\n",
                truncate(label, label_width),
                "█".repeat(len),
                value,
                lw = label_width,
                bw = bar_width
            ));
        }
        out
    }
}

/// Greedy word wrap; words longer than `width` are split.
pub fn wrap_title(text: &str, width: usize) -> String {
    let width = width.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }

        let needed = if current.is_empty() { word.len() } else { current.chars().count() + 1 + word.len() };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }

    lines.join("\n")
}

/// Shorten `text` to `width` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// One histogram per floating-point column, titles wrapped
pub fn profile_frame(df: &DataFrame, config: &ProfileConfig) -> Result<Vec<Histogram>> {
    config.validate()?;

    for name in integer_columns_with_nulls(df) {
        warn!(column = %name, "Integer column with missing values has no histogram");
    }

    df.get_columns()
        .iter()
        .filter(|c| is_float_dtype(c.dtype()))
        .map(|column| -> Result<Histogram> {
            let series = column.as_materialized_series();
            let cast = series.cast(&DataType::Float64)?;
            let values: Vec<f64> = cast.f64()?.into_iter().flatten().collect();
            let title = wrap_title(series.name().as_str(), config.title_width);
            Ok(Histogram::from_values(title, &values, config.bins))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_binning() {
        let h = Histogram::from_values("x", &[0.0, 1.0, 2.0, 3.0, 4.0], 4);
        assert_eq!(h.edges, vec![0.0, 1.0, 2.0, 3.0, 4.0]);
        // last bin closed on the right
        assert_eq!(h.counts, vec![1, 1, 1, 2]);
        assert_eq!(h.total(), 5);
    }

    #[test]
    fn test_histogram_constant_values() {
        let h = Histogram::from_values("x", &[3.0, 3.0], 10);
        assert_eq!(h.edges.first(), Some(&2.5));
        assert_eq!(h.edges.last(), Some(&3.5));
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn test_histogram_ignores_nan() {
        let h = Histogram::from_values("x", &[1.0, f64::NAN, 2.0], 2);
        assert_eq!(h.total(), 2);
    }

    #[test]
    fn test_wrap_title() {
        let title = "How often the home health team determined whether patients received a flu shot";
        let wrapped = wrap_title(title, 40);
        for line in wrapped.lines() {
            assert!(line.chars().count() <= 40, "line too long: {}", line);
        }
        assert_eq!(wrapped.replace('\n', " "), title);
        assert_eq!(wrap_title("abcdefghij", 4), "abcd\nefgh\nij");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("Percentage of patients", 10), "Percentag…");
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcd", 4), "abcd");
        assert_eq!(truncate("abcdé", 4).chars().count(), 4);
    }

    #[test]
    fn test_bar_chart_text() {
        let chart = BarChart::new("t", "x", vec![("big".into(), 0.5), ("small".into(), 0.25)]);
        let text = chart.render_text(8, 10);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("big"));
        assert_eq!(lines[0].matches('█').count(), 10);
        assert_eq!(lines[1].matches('█').count(), 5);
    }

    #[test]
    fn test_profile_frame_float_columns_only() {
        let df = df!(
            "State" => &["AK", "AL"],
            "rate" => &[Some(1.0), None],
            "count" => &[1i64, 2],
            "visits" => &[Some(3i64), None]
        )
        .unwrap();

        let hists = profile_frame(&df, &ProfileConfig::default()).unwrap();
        assert_eq!(hists.len(), 1);
        assert_eq!(hists[0].title, "rate");
        assert_eq!(hists[0].counts.len(), 15);
        assert_eq!(hists[0].total(), 1);
    }
}
