//! Data preprocessing module
//!
//! Provides the preparation steps between loading and model fitting:
//! - Per-column descriptive statistics
//! - Standard (z-score) scaling fitted on training rows only
//! - Feature/target selection with leakage exclusion
//! - Missing-value handling

mod scaler;
pub mod features;

pub use scaler::StandardScaler;
pub use features::{FeatureSplit, LeakageRule, MissingPolicy};

use crate::error::Result;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Whether a dtype holds numbers
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Whether a dtype is floating point
pub fn is_float_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Float32 | DataType::Float64)
}

/// Integer columns that contain nulls.
///
/// Feature selection and profiling read floating-point columns only, so
/// these columns are skipped there.
pub fn integer_columns_with_nulls(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()) && !is_float_dtype(c.dtype()) && c.null_count() > 0)
        .map(|c| c.name().to_string())
        .collect()
}

/// Descriptive statistics for a numeric column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    /// Non-null values
    pub count: usize,
    pub null_count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (ddof = 1)
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q25: Option<f64>,
    pub median: Option<f64>,
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    /// Compute statistics from a numeric series
    pub fn from_series(series: &Series) -> Result<Self> {
        let cast = series.cast(&DataType::Float64)?;
        let ca = cast.f64()?;

        Ok(Self {
            name: series.name().to_string(),
            count: ca.len() - ca.null_count(),
            null_count: ca.null_count(),
            mean: ca.mean(),
            std: ca.std(1),
            min: ca.min(),
            q25: ca.quantile(0.25, QuantileMethod::Linear)?,
            median: ca.median(),
            q75: ca.quantile(0.75, QuantileMethod::Linear)?,
            max: ca.max(),
        })
    }
}
