//! Feature/target selection with leakage exclusion

use super::is_float_dtype;
use crate::error::{CarestarError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Name rule for columns that re-encode the target.
///
/// A column leaks when its name starts with `prefix` and contains `marker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeakageRule {
    pub enabled: bool,
    pub prefix: String,
    pub marker: String,
}

impl Default for LeakageRule {
    fn default() -> Self {
        Self {
            enabled: true,
            prefix: "Star Rating".to_string(),
            marker: "Percentage".to_string(),
        }
    }
}

impl LeakageRule {
    /// Rule with a custom prefix and marker
    pub fn new(prefix: impl Into<String>, marker: impl Into<String>) -> Self {
        Self {
            enabled: true,
            prefix: prefix.into(),
            marker: marker.into(),
        }
    }

    /// Rule that matches nothing
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.enabled && name.starts_with(&self.prefix) && name.contains(&self.marker)
    }
}

/// What to do with rows that have a missing target or feature value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingPolicy {
    /// Remove incomplete rows before splitting
    #[default]
    DropRows,
    /// Treat any missing value as a fatal error
    Fail,
}

/// Feature columns, target column and the columns excluded as leakage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSplit {
    pub target: String,
    pub features: Vec<String>,
    pub leakage: Vec<String>,
}

impl FeatureSplit {
    /// Select features from the floating-point columns of `df`.
    ///
    /// The target must exist in `df` (any numeric dtype). It and every
    /// column matched by `rule` are left out of the feature list.
    pub fn from_frame(df: &DataFrame, target: &str, rule: &LeakageRule) -> Result<Self> {
        let target_col = df
            .column(target)
            .map_err(|_| CarestarError::FeatureNotFound(target.to_string()))?;
        if !super::is_numeric_dtype(target_col.dtype()) {
            return Err(CarestarError::ValidationError(format!(
                "target column '{}' is not numeric ({})",
                target,
                target_col.dtype()
            )));
        }

        let leakage: Vec<String> = df
            .get_column_names()
            .into_iter()
            .filter(|name| rule.matches(name.as_str()))
            .map(|name| name.to_string())
            .collect();

        let features: Vec<String> = df
            .get_columns()
            .iter()
            .filter(|c| is_float_dtype(c.dtype()))
            .map(|c| c.name().to_string())
            .filter(|name| name != target && !leakage.contains(name))
            .collect();

        for name in super::integer_columns_with_nulls(df) {
            if name != target && !leakage.contains(&name) {
                warn!(column = %name, "Integer column with missing values is not used as a feature");
            }
        }

        if features.is_empty() {
            return Err(CarestarError::ValidationError(format!(
                "no floating-point feature columns remain after excluding '{}' and {} leakage column(s)",
                target,
                leakage.len()
            )));
        }

        debug!(
            target = target,
            features = features.len(),
            leakage = leakage.len(),
            "Selected feature columns"
        );

        Ok(Self {
            target: target.to_string(),
            features,
            leakage,
        })
    }

    /// Target plus features, the columns the model reads
    pub fn model_columns(&self) -> Vec<String> {
        std::iter::once(self.target.clone())
            .chain(self.features.iter().cloned())
            .collect()
    }

    pub fn contains_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| f == name)
    }

    /// Apply `policy` to the model columns of `df`.
    ///
    /// Returns the (possibly filtered) frame and the number of rows removed.
    pub fn handle_missing(&self, df: &DataFrame, policy: MissingPolicy) -> Result<(DataFrame, usize)> {
        let mut mask = BooleanChunked::full("complete".into(), true, df.height());
        for name in self.model_columns() {
            let column = df
                .column(&name)
                .map_err(|_| CarestarError::FeatureNotFound(name.clone()))?;
            let series = column.as_materialized_series();
            if series.null_count() == 0 {
                continue;
            }

            match policy {
                MissingPolicy::Fail => {
                    return Err(CarestarError::ValidationError(format!(
                        "column '{}' has {} missing value(s)",
                        name,
                        series.null_count()
                    )));
                }
                MissingPolicy::DropRows => {
                    mask = &mask & &series.is_not_null();
                }
            }
        }

        let filtered = df.filter(&mask)?;
        let dropped = df.height() - filtered.height();
        if dropped > 0 {
            warn!(dropped, remaining = filtered.height(), "Dropped rows with missing values");
        }
        Ok((filtered, dropped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quality_df() -> DataFrame {
        df!(
            "State" => &["AK", "AL", "AR", "AZ"],
            "Quality of Patient Care Star Rating" => &[3.0, 3.5, 4.0, 3.0],
            "Star Rating (1-5) Percentage of HHAs with 5 stars" => &[10.0, 20.0, 30.0, 10.0],
            "Star Rating Count" => &[1.0, 2.0, 3.0, 4.0],
            "Timely start of care" => &[90.0, 91.0, 92.0, 93.0],
            "Number of agencies" => &[10i64, 20, 30, 40]
        )
        .unwrap()
    }

    #[test]
    fn test_leakage_rule_matches() {
        let rule = LeakageRule::default();
        assert!(rule.matches("Star Rating (1-5) Percentage of HHAs with 5 stars"));
        assert!(!rule.matches("Star Rating Count"));
        assert!(!rule.matches("Percentage Star Rating"));
        assert!(!LeakageRule::disabled().matches("Star Rating Percentage"));
    }

    #[test]
    fn test_split_excludes_target_and_leakage() {
        let df = quality_df();
        let split = FeatureSplit::from_frame(
            &df,
            "Quality of Patient Care Star Rating",
            &LeakageRule::default(),
        )
        .unwrap();

        assert_eq!(split.features, vec!["Star Rating Count", "Timely start of care"]);
        assert_eq!(
            split.leakage,
            vec!["Star Rating (1-5) Percentage of HHAs with 5 stars"]
        );
        assert!(!split.contains_feature(&split.target));
        for leak in &split.leakage {
            assert!(!split.contains_feature(leak));
        }
    }

    #[test]
    fn test_split_custom_rule() {
        let df = quality_df();
        let split = FeatureSplit::from_frame(
            &df,
            "Quality of Patient Care Star Rating",
            &LeakageRule::new("Star Rating", "Count"),
        )
        .unwrap();

        assert_eq!(split.leakage, vec!["Star Rating Count"]);
        assert!(split.contains_feature("Star Rating (1-5) Percentage of HHAs with 5 stars"));
    }

    #[test]
    fn test_split_missing_target() {
        let df = quality_df();
        let result = FeatureSplit::from_frame(&df, "Overall Rating", &LeakageRule::default());
        assert!(matches!(result, Err(CarestarError::FeatureNotFound(_))));
    }

    #[test]
    fn test_split_non_numeric_target() {
        let df = quality_df();
        let result = FeatureSplit::from_frame(&df, "State", &LeakageRule::default());
        assert!(matches!(result, Err(CarestarError::ValidationError(_))));
    }

    #[test]
    fn test_split_skips_integer_columns_with_nulls() {
        let df = df!(
            "rate" => &[1.0, 2.0, 3.0],
            "visits" => &[Some(4i64), None, Some(6)],
            "rating" => &[2.0, 3.0, 4.0]
        )
        .unwrap();
        let split = FeatureSplit::from_frame(&df, "rating", &LeakageRule::default()).unwrap();
        assert_eq!(split.features, vec!["rate".to_string()]);
    }

    #[test]
    fn test_handle_missing_drop_rows() {
        let df = df!(
            "y" => &[Some(1.0), Some(2.0), None, Some(4.0)],
            "x" => &[Some(1.0), None, Some(3.0), Some(4.0)],
            "unused" => &[None::<f64>, None, None, None]
        )
        .unwrap();
        let split = FeatureSplit {
            target: "y".into(),
            features: vec!["x".into()],
            leakage: vec![],
        };

        let (filtered, dropped) = split.handle_missing(&df, MissingPolicy::DropRows).unwrap();
        assert_eq!(dropped, 2);
        assert_eq!(filtered.height(), 2);
    }

    #[test]
    fn test_handle_missing_fail() {
        let df = df!(
            "y" => &[Some(1.0), None],
            "x" => &[1.0, 2.0]
        )
        .unwrap();
        let split = FeatureSplit {
            target: "y".into(),
            features: vec!["x".into()],
            leakage: vec![],
        };

        let result = split.handle_missing(&df, MissingPolicy::Fail);
        assert!(matches!(result, Err(CarestarError::ValidationError(_))));
    }
}
