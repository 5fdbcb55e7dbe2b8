//! carestar - home healthcare quality star-rating analysis
//!
//! This crate analyzes state-level home healthcare quality indicators:
//! - Dataset loading and descriptive statistics
//! - Distribution profiling of numeric indicators
//! - Random-forest regression of the quality star rating
//! - Impurity-based feature importance ranking
//! - What-if scenarios that perturb one indicator and re-predict
//!
//! # Modules
//!
//! - [`utils`] - CSV loading and dataset reports
//! - [`preprocessing`] - Column summaries, standard scaling, feature/target selection
//! - [`training`] - Decision trees, random forest, train/test split, metrics
//! - [`explainability`] - Feature importance ranking
//! - [`scenario`] - Counterfactual what-if simulation
//! - [`visualization`] - Histograms and bar charts (terminal and SVG)
//! - [`pipeline`] - Named analysis stages and their configuration
//! - [`cli`] - Command-line interface

// Core error handling
pub mod error;

// Data and model
pub mod utils;
pub mod preprocessing;
pub mod training;

// Analysis
pub mod explainability;
pub mod scenario;
pub mod visualization;

// Orchestration
pub mod pipeline;
pub mod cli;

pub use error::{CarestarError, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::error::{CarestarError, Result};

    pub use crate::utils::{DataLoader, DatasetReport};
    pub use crate::preprocessing::{
        ColumnSummary, FeatureSplit, LeakageRule, MissingPolicy, StandardScaler,
    };
    pub use crate::training::{
        DecisionTree, MaxFeatures, ModelMetrics, RandomForest, TrainEngine, TrainedModel,
        TrainingConfig,
    };
    pub use crate::explainability::{FeatureImportance, FeatureRanking};
    pub use crate::scenario::{ScenarioConfig, ScenarioOutcome, ScenarioStatus, StateImpact, WhatIfScenario};
    pub use crate::visualization::{BarChart, Histogram, ProfileConfig};
    pub use crate::pipeline::{AnalysisConfig, AnalysisReport, Pipeline, Stage};
}
