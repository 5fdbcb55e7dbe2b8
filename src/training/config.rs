//! Training configuration

use super::random_forest::MaxFeatures;
use crate::error::{CarestarError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for the train/evaluate stage
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation
    pub test_size: f64,

    /// Seed for the row shuffle and the forest
    pub random_seed: u64,

    /// Number of trees
    pub n_estimators: usize,

    /// Maximum tree depth (None = grow until pure)
    pub max_depth: Option<usize>,

    pub min_samples_split: usize,

    pub min_samples_leaf: usize,

    /// Features considered per split
    pub max_features: MaxFeatures,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            random_seed: 42,
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::All,
        }
    }
}

impl TrainingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the held-out fraction
    pub fn with_test_size(mut self, test_size: f64) -> Self {
        self.test_size = test_size;
        self
    }

    /// Builder method to set the seed
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    /// Builder method to set the number of trees
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    /// Builder method to cap tree depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(CarestarError::ConfigError(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        if self.n_estimators == 0 {
            return Err(CarestarError::ConfigError(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if let MaxFeatures::Fraction(f) = self.max_features {
            if !(f > 0.0 && f <= 1.0) {
                return Err(CarestarError::ConfigError(format!(
                    "max_features fraction must be in (0, 1], got {}",
                    f
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TrainingConfig::default();
        assert_eq!(config.test_size, 0.2);
        assert_eq!(config.random_seed, 42);
        assert_eq!(config.n_estimators, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(TrainingConfig::new().with_test_size(0.0).validate().is_err());
        assert!(TrainingConfig::new().with_test_size(1.0).validate().is_err());
        assert!(TrainingConfig::new().with_n_estimators(0).validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let config: TrainingConfig = serde_json::from_str(r#"{"n_estimators": 7}"#).unwrap();
        assert_eq!(config.n_estimators, 7);
        assert_eq!(config.test_size, 0.2);
    }
}
