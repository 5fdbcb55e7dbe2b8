//! Analysis pipeline
//!
//! Runs the named stages in order: load, profile, split, train, explain
//! and scenario. Each stage borrows its inputs, returns an owned output
//! and runs inside a `tracing` span named after it.

mod config;

pub use config::{AnalysisConfig, DEFAULT_TARGET};

use crate::error::Result;
use crate::explainability::{FeatureImportance, FeatureRanking};
use crate::preprocessing::FeatureSplit;
use crate::scenario::{ScenarioStatus, WhatIfScenario};
use crate::training::{ModelMetrics, TrainEngine, TrainedModel};
use crate::utils::{DataLoader, DatasetReport};
use crate::visualization::{profile_frame, wrap_title, BarChart, Histogram, SvgRenderer};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, info_span};

/// A named step of the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Profile,
    Split,
    Train,
    Explain,
    Scenario,
}

impl Stage {
    /// Execution order
    pub const ALL: [Stage; 6] = [
        Stage::Load,
        Stage::Profile,
        Stage::Split,
        Stage::Train,
        Stage::Explain,
        Stage::Scenario,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Load => "load",
            Stage::Profile => "profile",
            Stage::Split => "split",
            Stage::Train => "train",
            Stage::Explain => "explain",
            Stage::Scenario => "scenario",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Output of the load stage
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub frame: DataFrame,
    pub report: DatasetReport,
}

/// Output of the split stage: the rows used for modelling and their columns
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub frame: DataFrame,
    pub features: FeatureSplit,
    /// Rows removed by the missing-value policy
    pub dropped_rows: usize,
}

/// Everything a full run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub dataset: DatasetReport,
    pub histograms: Vec<Histogram>,
    pub features: FeatureSplit,
    pub dropped_rows: usize,
    pub metrics: ModelMetrics,
    /// (train rows, test rows)
    pub split_sizes: (usize, usize),
    pub ranking: FeatureRanking,
    pub scenario: ScenarioStatus,
    top_k: usize,
    scenario_bins: usize,
    title_width: usize,
}

impl AnalysisReport {
    /// The configured number of most important features
    pub fn top_features(&self) -> &[FeatureImportance] {
        self.ranking.top(self.top_k)
    }

    /// Horizontal bars, most important feature on top
    pub fn importance_chart(&self) -> BarChart {
        let top = self.top_features();
        let bars = top
            .iter()
            .map(|f| (f.feature.clone(), f.importance))
            .collect();
        BarChart::new(
            format!("Top {} Features Influencing Star Rating", top.len()),
            "Importance Score",
            bars,
        )
    }

    /// Histogram of per-row rating changes with the mean marked
    pub fn scenario_chart(&self) -> Option<Histogram> {
        let outcome = self.scenario.outcome()?;
        let title = wrap_title(
            &format!(
                "Impact of {:+} points in '{}' on Predicted Ratings",
                outcome.delta, outcome.column
            ),
            self.title_width * 2,
        );
        Some(
            Histogram::from_values(title, &outcome.deltas, self.scenario_bins)
                .with_labels("Change in Stars", "Number of States")
                .with_marker("Avg Change", outcome.mean_delta),
        )
    }

    /// Write `histograms.svg`, `importances.svg` and, when the scenario ran,
    /// `whatif.svg` into `dir`
    pub fn render_plots(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let renderer = SvgRenderer::new(dir)?;
        let mut written = Vec::new();

        if !self.histograms.is_empty() {
            written.push(renderer.histogram_grid(
                "histograms.svg",
                "Histograms of Numeric Features",
                &self.histograms,
            )?);
        }
        written.push(renderer.bar_chart("importances.svg", &self.importance_chart())?);
        if let Some(chart) = self.scenario_chart() {
            written.push(renderer.histogram("whatif.svg", &chart)?);
        }

        Ok(written)
    }
}

/// Stage runner for one configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: AnalysisConfig,
}

impl Pipeline {
    /// Validate `config` and build the pipeline
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Read the CSV at `path` and describe it
    pub fn load(&self, path: &Path) -> Result<LoadedData> {
        in_stage(Stage::Load, || {
            let frame = DataLoader::new()
                .with_separator(self.config.separator_byte())
                .load_csv(path)?;
            let report = DatasetReport::from_frame(&frame)?;
            Ok(LoadedData { frame, report })
        })
    }

    /// Describe an in-memory table as the load stage would
    pub fn inspect(&self, frame: DataFrame) -> Result<LoadedData> {
        in_stage(Stage::Load, || {
            let report = DatasetReport::from_frame(&frame)?;
            Ok(LoadedData { frame, report })
        })
    }

    pub fn profile(&self, df: &DataFrame) -> Result<Vec<Histogram>> {
        in_stage(Stage::Profile, || {
            let hists = profile_frame(df, &self.config.profile)?;
            info!(histograms = hists.len(), "Profiled numeric columns");
            Ok(hists)
        })
    }

    /// Pick features and target, then apply the missing-value policy
    pub fn split(&self, df: &DataFrame) -> Result<PreparedData> {
        in_stage(Stage::Split, || {
            let features = FeatureSplit::from_frame(df, &self.config.target_column, &self.config.leakage)?;
            let (frame, dropped_rows) = features.handle_missing(df, self.config.missing)?;
            info!(
                features = features.features.len(),
                leakage = features.leakage.len(),
                rows = frame.height(),
                "Selected features"
            );
            Ok(PreparedData {
                frame,
                features,
                dropped_rows,
            })
        })
    }

    pub fn train(&self, prepared: &PreparedData) -> Result<TrainedModel> {
        in_stage(Stage::Train, || {
            TrainEngine::new(self.config.training.clone()).fit(&prepared.frame, &prepared.features)
        })
    }

    pub fn explain(&self, model: &TrainedModel) -> Result<FeatureRanking> {
        in_stage(Stage::Explain, || {
            let ranking = FeatureRanking::from_model(model)?;
            if let Some(first) = ranking.top(1).first() {
                info!(feature = %first.feature, importance = first.importance, "Most important feature");
            }
            Ok(ranking)
        })
    }

    /// Re-predict every prepared row with the scenario column raised
    pub fn scenario(&self, prepared: &PreparedData, model: &TrainedModel) -> Result<ScenarioStatus> {
        in_stage(Stage::Scenario, || {
            WhatIfScenario::new(self.config.scenario.clone()).run(&prepared.frame, &prepared.features, model)
        })
    }

    /// Run every stage against the CSV at `path`
    pub fn run(&self, path: &Path) -> Result<AnalysisReport> {
        let loaded = self.load(path)?;
        self.run_loaded(loaded)
    }

    /// Run every stage against an in-memory table
    pub fn run_frame(&self, df: DataFrame) -> Result<AnalysisReport> {
        let loaded = self.inspect(df)?;
        self.run_loaded(loaded)
    }

    fn run_loaded(&self, loaded: LoadedData) -> Result<AnalysisReport> {
        let start = Instant::now();

        let histograms = self.profile(&loaded.frame)?;
        let prepared = self.split(&loaded.frame)?;
        let model = self.train(&prepared)?;
        let ranking = self.explain(&model)?;
        let scenario = self.scenario(&prepared, &model)?;

        let report = self.report(loaded, histograms, prepared, &model, ranking, scenario);
        self.render(&report)?;

        info!(elapsed_ms = start.elapsed().as_millis() as u64, "Analysis complete");
        Ok(report)
    }

    /// Collect stage outputs into a report
    pub fn report(
        &self,
        loaded: LoadedData,
        histograms: Vec<Histogram>,
        prepared: PreparedData,
        model: &TrainedModel,
        ranking: FeatureRanking,
        scenario: ScenarioStatus,
    ) -> AnalysisReport {
        AnalysisReport {
            dataset: loaded.report,
            histograms,
            features: prepared.features,
            dropped_rows: prepared.dropped_rows,
            metrics: model.metrics().clone(),
            split_sizes: model.split_sizes(),
            ranking,
            scenario,
            top_k: self.config.top_features,
            scenario_bins: self.config.scenario.bins,
            title_width: self.config.profile.title_width,
        }
    }

    /// Write the report's SVGs when a plot directory is configured
    pub fn render(&self, report: &AnalysisReport) -> Result<Vec<PathBuf>> {
        match &self.config.plot_dir {
            Some(dir) => {
                let written = report.render_plots(dir)?;
                info!(files = written.len(), dir = %dir.display(), "Rendered plots");
                Ok(written)
            }
            None => Ok(Vec::new()),
        }
    }
}

fn in_stage<T>(stage: Stage, f: impl FnOnce() -> Result<T>) -> Result<T> {
    let span = info_span!("stage", name = stage.name());
    let _guard = span.enter();

    let start = Instant::now();
    let result = f();
    match &result {
        Ok(_) => debug!(elapsed_ms = start.elapsed().as_millis() as u64, "Stage finished"),
        Err(e) => error!(error = %e, "Stage failed"),
    }
    result
}
