//! Training engine: split, scale, fit, evaluate

use super::random_forest::RandomForest;
use super::split::TrainTestSplit;
use super::{ModelMetrics, TrainingConfig};
use crate::error::{CarestarError, Result};
use crate::preprocessing::{FeatureSplit, StandardScaler};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// A fitted scaler + forest pair and its held-out evaluation.
///
/// Read-only once built. Every prediction goes through the scaler fitted
/// on the training rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainedModel {
    feature_names: Vec<String>,
    target: String,
    scaler: StandardScaler,
    forest: RandomForest,
    metrics: ModelMetrics,
    split: (usize, usize),
    target_range: (f64, f64),
}

impl TrainedModel {
    /// Predict for every row of `df` (unscaled feature columns)
    pub fn predict_frame(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let scaled = self.scaler.transform(df)?;
        let x = columns_to_array2(&scaled, &self.feature_names)?;
        self.forest.predict(&x)
    }

    pub fn metrics(&self) -> &ModelMetrics {
        &self.metrics
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn forest(&self) -> &RandomForest {
        &self.forest
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }

    /// (train rows, test rows)
    pub fn split_sizes(&self) -> (usize, usize) {
        self.split
    }

    /// Min and max training target; forest outputs never leave this range
    pub fn target_range(&self) -> (f64, f64) {
        self.target_range
    }
}

/// Main training engine
#[derive(Debug, Clone)]
pub struct TrainEngine {
    config: TrainingConfig,
}

impl TrainEngine {
    /// Create a new training engine
    pub fn new(config: TrainingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Split `df`, fit scaler and forest on the training rows, evaluate on the rest.
    pub fn fit(&self, df: &DataFrame, features: &FeatureSplit) -> Result<TrainedModel> {
        self.config.validate()?;
        let start = Instant::now();

        let split = TrainTestSplit::new(df.height(), self.config.test_size, self.config.random_seed)?;
        let train_df = split.take_train(df)?;
        let test_df = split.take_test(df)?;
        debug!(train = split.train.len(), test = split.test.len(), "Split rows");

        let mut scaler = StandardScaler::new();
        let train_scaled = scaler.fit_transform(&train_df, &features.features)?;
        let test_scaled = scaler.transform(&test_df)?;

        let x_train = columns_to_array2(&train_scaled, &features.features)?;
        let y_train = column_to_array1(&train_df, &features.target)?;
        let x_test = columns_to_array2(&test_scaled, &features.features)?;
        let y_test = column_to_array1(&test_df, &features.target)?;

        let mut forest = RandomForest::new_regressor(self.config.n_estimators)
            .with_min_samples_split(self.config.min_samples_split)
            .with_min_samples_leaf(self.config.min_samples_leaf)
            .with_max_features(self.config.max_features)
            .with_random_state(self.config.random_seed);
        if let Some(depth) = self.config.max_depth {
            forest = forest.with_max_depth(depth);
        }
        forest.fit(&x_train, &y_train)?;

        let y_pred = forest.predict(&x_test)?;
        let mut metrics = ModelMetrics::compute_regression(&y_test, &y_pred);
        metrics.training_time_secs = start.elapsed().as_secs_f64();
        metrics.n_features = features.features.len();

        let target_range = y_train
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        info!(
            trees = forest.n_trees(),
            features = metrics.n_features,
            mse = metrics.mse,
            r2 = metrics.r2,
            "Model trained"
        );

        Ok(TrainedModel {
            feature_names: features.features.clone(),
            target: features.target.clone(),
            scaler,
            forest,
            metrics,
            split: (split.train.len(), split.test.len()),
            target_range,
        })
    }
}

/// Extract named columns from a DataFrame into a row-major `Array2<f64>`.
///
/// Missing values are rejected; callers apply the missing-value policy first.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|name| column_values(df, name))
        .collect::<Result<Vec<_>>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_data[c][r]))
}

/// Extract one numeric column as `Array1<f64>`
pub fn column_to_array1(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
    Ok(Array1::from_vec(column_values(df, name)?))
}

fn column_values(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let column = df
        .column(name)
        .map_err(|_| CarestarError::FeatureNotFound(name.to_string()))?;
    let cast = column.as_materialized_series().cast(&DataType::Float64)?;
    let values = cast
        .f64()?
        .into_iter()
        .map(|v| {
            v.ok_or_else(|| {
                CarestarError::ValidationError(format!("column '{}' contains missing values", name))
            })
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(values)
}
