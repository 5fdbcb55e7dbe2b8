//! Standard (z-score) feature scaling

use crate::error::{CarestarError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Parameters for one fitted column
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalerParams {
    column: String,
    mean: f64,
    /// Population std; 1.0 for constant columns
    scale: f64,
}

/// Zero-mean, unit-variance scaler.
///
/// A scaler is fitted exactly once. Every later frame (held-out rows, the
/// full table, counterfactual copies) goes through [`StandardScaler::transform`]
/// with the training statistics, so predictions stay in comparable units.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StandardScaler {
    params: Vec<ScalerParams>,
    is_fitted: bool,
}

impl StandardScaler {
    /// Create an unfitted scaler
    pub fn new() -> Self {
        Self::default()
    }

    /// Fit per-column mean and std.
    ///
    /// Fails if the scaler was already fitted.
    pub fn fit(&mut self, df: &DataFrame, columns: &[String]) -> Result<&mut Self> {
        if self.is_fitted {
            return Err(CarestarError::ValidationError(
                "scaler is already fitted; use transform".to_string(),
            ));
        }

        let params = columns
            .iter()
            .map(|name| -> Result<ScalerParams> {
                let column = df
                    .column(name)
                    .map_err(|_| CarestarError::FeatureNotFound(name.clone()))?;
                let cast = column.as_materialized_series().cast(&DataType::Float64)?;
                let ca = cast.f64()?;

                let mean = ca.mean().ok_or_else(|| {
                    CarestarError::ComputationError(format!("column '{}' has no values", name))
                })?;
                let std = ca.std(0).unwrap_or(0.0);

                Ok(ScalerParams {
                    column: name.clone(),
                    mean,
                    scale: if std == 0.0 || !std.is_finite() { 1.0 } else { std },
                })
            })
            .collect::<Result<Vec<_>>>()?;

        self.params = params;
        self.is_fitted = true;
        Ok(self)
    }

    /// Scale the fitted columns of `df`; other columns pass through.
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(CarestarError::ModelNotFitted);
        }

        // Build all scaled columns first
        let replacements = self
            .params
            .iter()
            .map(|params| -> Result<Series> {
                let column = df
                    .column(&params.column)
                    .map_err(|_| CarestarError::FeatureNotFound(params.column.clone()))?;
                Self::scale_series(column.as_materialized_series(), params)
            })
            .collect::<Result<Vec<Series>>>()?;

        let mut result = df.clone();
        for scaled in replacements {
            result.with_column(scaled)?;
        }

        Ok(result)
    }

    /// Fit and transform in one step
    pub fn fit_transform(&mut self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        self.fit(df, columns)?;
        self.transform(df)
    }

    /// Whether `fit` has run
    pub fn is_fitted(&self) -> bool {
        self.is_fitted
    }

    /// Fitted columns, in fit order
    pub fn columns(&self) -> Vec<&str> {
        self.params.iter().map(|p| p.column.as_str()).collect()
    }

    /// Fitted (mean, scale) for a column
    pub fn params(&self, column: &str) -> Option<(f64, f64)> {
        self.params
            .iter()
            .find(|p| p.column == column)
            .map(|p| (p.mean, p.scale))
    }

    fn scale_series(series: &Series, params: &ScalerParams) -> Result<Series> {
        let cast = series.cast(&DataType::Float64)?;
        let ca = cast.f64()?;

        let scaled: Float64Chunked = ca
            .into_iter()
            .map(|opt| opt.map(|v| (v - params.mean) / params.scale))
            .collect();

        Ok(scaled.with_name(series.name().clone()).into_series())
    }
}
