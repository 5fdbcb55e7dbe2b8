//! What-if scenario simulation
//!
//! Raises one indicator by a fixed number of points (capped), re-predicts
//! every row with the already-fitted model and reports the change in
//! predicted rating per row and per state.

use crate::error::{CarestarError, Result};
use crate::preprocessing::FeatureSplit;
use crate::training::{column_to_array1, TrainedModel};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Flu-shot compliance indicator in the CMS state-level file
pub const FLU_SHOT_COLUMN: &str =
    "How often the home health team determined whether patients received a flu shot for the current flu season";

/// Configuration for the what-if stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub enabled: bool,
    /// Feature to perturb
    pub column: String,
    /// Points added to every row
    pub delta: f64,
    /// Upper bound after adjustment
    pub cap: f64,
    /// Row label column for the per-state table
    pub state_column: String,
    /// Rows reported as largest improvements
    pub top_states: usize,
    /// Bins of the delta histogram
    pub bins: usize,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            column: FLU_SHOT_COLUMN.to_string(),
            delta: 10.0,
            cap: 100.0,
            state_column: "State".to_string(),
            top_states: 5,
            bins: 10,
        }
    }
}

impl ScenarioConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to choose the perturbed column
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = column.into();
        self
    }

    /// Builder method to set the delta and cap
    pub fn with_adjustment(mut self, delta: f64, cap: f64) -> Self {
        self.delta = delta;
        self.cap = cap;
        self
    }

    /// Builder method to set the state label column
    pub fn with_state_column(mut self, column: impl Into<String>) -> Self {
        self.state_column = column.into();
        self
    }

    /// Builder method to turn the stage off
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !self.delta.is_finite() || !self.cap.is_finite() {
            return Err(CarestarError::ConfigError(
                "scenario delta and cap must be finite".to_string(),
            ));
        }
        if self.cap <= 0.0 {
            return Err(CarestarError::ConfigError(format!(
                "scenario cap must be positive, got {}",
                self.cap
            )));
        }
        if self.bins == 0 {
            return Err(CarestarError::ConfigError("scenario bins must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Predicted ratings of one row before and after the adjustment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateImpact {
    pub state: String,
    pub baseline: f64,
    pub whatif: f64,
    pub delta: f64,
}

/// Result of a completed what-if run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    pub column: String,
    pub delta: f64,
    pub cap: f64,
    /// Column values before and after adjustment, per row
    pub original: Vec<f64>,
    pub adjusted: Vec<f64>,
    pub baseline: Vec<f64>,
    pub whatif: Vec<f64>,
    /// whatif - baseline, per row
    pub deltas: Vec<f64>,
    pub mean_delta: f64,
    /// Rows sorted by descending delta; None without a state column
    pub states: Option<Vec<StateImpact>>,
}

impl ScenarioOutcome {
    /// The `k` rows with the largest predicted improvement
    pub fn top_states(&self, k: usize) -> &[StateImpact] {
        match &self.states {
            Some(states) => &states[..k.min(states.len())],
            None => &[],
        }
    }

    /// Rows whose predicted rating went up
    pub fn n_improved(&self) -> usize {
        self.deltas.iter().filter(|&&d| d > 0.0).count()
    }

    pub fn max_abs_delta(&self) -> f64 {
        self.deltas.iter().fold(0.0, |acc, d| acc.max(d.abs()))
    }
}

/// Outcome of the optional scenario stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScenarioStatus {
    Completed(ScenarioOutcome),
    Skipped { reason: String },
}

impl ScenarioStatus {
    pub fn outcome(&self) -> Option<&ScenarioOutcome> {
        match self {
            ScenarioStatus::Completed(outcome) => Some(outcome),
            ScenarioStatus::Skipped { .. } => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ScenarioStatus::Skipped { .. })
    }
}

/// Counterfactual simulator for one indicator
#[derive(Debug, Clone)]
pub struct WhatIfScenario {
    config: ScenarioConfig,
}

impl WhatIfScenario {
    pub fn new(config: ScenarioConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    /// Why the stage would be skipped for this feature set, if it would
    pub fn skip_reason(&self, features: &FeatureSplit) -> Option<String> {
        if !self.config.enabled {
            return Some("scenario disabled".to_string());
        }
        if !features.contains_feature(&self.config.column) {
            return Some(format!("column '{}' is not a model feature", self.config.column));
        }
        None
    }

    /// `min(value + delta, cap)`
    pub fn adjust_value(&self, value: f64) -> f64 {
        (value + self.config.delta).min(self.config.cap)
    }

    /// Copy of `df` with the scenario column adjusted
    pub fn adjust(&self, df: &DataFrame) -> Result<DataFrame> {
        let column = df
            .column(&self.config.column)
            .map_err(|_| CarestarError::FeatureNotFound(self.config.column.clone()))?;
        let series = column.as_materialized_series();
        let cast = series.cast(&DataType::Float64)?;
        let ca = cast.f64()?;

        let adjusted: Float64Chunked = ca
            .into_iter()
            .map(|opt| opt.map(|v| self.adjust_value(v)))
            .collect();

        let mut result = df.clone();
        result.with_column(adjusted.with_name(series.name().clone()).into_series())?;
        Ok(result)
    }

    /// Run the stage, honoring the skip condition
    pub fn run(&self, df: &DataFrame, features: &FeatureSplit, model: &TrainedModel) -> Result<ScenarioStatus> {
        if let Some(reason) = self.skip_reason(features) {
            info!(reason = %reason, "What-if scenario skipped");
            return Ok(ScenarioStatus::Skipped { reason });
        }
        self.simulate(df, model).map(ScenarioStatus::Completed)
    }

    /// Baseline vs adjusted predictions for every row of `df`
    pub fn simulate(&self, df: &DataFrame, model: &TrainedModel) -> Result<ScenarioOutcome> {
        self.config.validate()?;
        if df.height() == 0 {
            return Err(CarestarError::ComputationError(
                "what-if scenario needs at least one row".to_string(),
            ));
        }

        let adjusted_df = self.adjust(df)?;
        let baseline = model.predict_frame(df)?;
        let whatif = model.predict_frame(&adjusted_df)?;

        let deltas: Vec<f64> = whatif.iter().zip(baseline.iter()).map(|(w, b)| w - b).collect();
        let mean_delta = deltas.iter().sum::<f64>() / deltas.len() as f64;

        let states = match df.column(&self.config.state_column) {
            Ok(column) => {
                let labels = state_labels(column.as_materialized_series())?;
                let mut table: Vec<StateImpact> = labels
                    .into_iter()
                    .zip(baseline.iter().zip(whatif.iter()))
                    .zip(deltas.iter())
                    .map(|((state, (&b, &w)), &d)| StateImpact {
                        state,
                        baseline: b,
                        whatif: w,
                        delta: d,
                    })
                    .collect();
                table.sort_by(|a, b| {
                    b.delta
                        .partial_cmp(&a.delta)
                        .unwrap_or(std::cmp::Ordering::Equal)
                });
                Some(table)
            }
            Err(_) => {
                debug!(column = %self.config.state_column, "No state column; per-state table omitted");
                None
            }
        };

        let original = column_to_array1(df, &self.config.column)?.to_vec();
        let adjusted = column_to_array1(&adjusted_df, &self.config.column)?.to_vec();

        info!(
            column = %self.config.column,
            delta = self.config.delta,
            mean_change = mean_delta,
            "What-if scenario complete"
        );

        Ok(ScenarioOutcome {
            column: self.config.column.clone(),
            delta: self.config.delta,
            cap: self.config.cap,
            original,
            adjusted,
            baseline: baseline.to_vec(),
            whatif: whatif.to_vec(),
            deltas,
            mean_delta,
            states,
        })
    }
}

fn state_labels(series: &Series) -> Result<Vec<String>> {
    let cast = series.cast(&DataType::String)?;
    let labels = cast
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or("").to_string())
        .collect();
    Ok(labels)
}
