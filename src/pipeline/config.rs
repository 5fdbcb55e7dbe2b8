//! Analysis configuration

use crate::error::{CarestarError, Result};
use crate::preprocessing::{LeakageRule, MissingPolicy};
use crate::scenario::ScenarioConfig;
use crate::training::TrainingConfig;
use crate::visualization::ProfileConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Star-rating column of the CMS state-level file
pub const DEFAULT_TARGET: &str = "Quality of Patient Care Star Rating";

/// Everything a full analysis run needs.
///
/// Every field has a default, so a JSON file only has to name what it
/// changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub target_column: String,
    /// CSV field separator
    pub separator: char,
    pub leakage: LeakageRule,
    pub missing: MissingPolicy,
    pub training: TrainingConfig,
    /// Features shown in the importance table and chart
    pub top_features: usize,
    pub profile: ProfileConfig,
    pub scenario: ScenarioConfig,
    /// SVG output directory; nothing is written when unset
    pub plot_dir: Option<PathBuf>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            target_column: DEFAULT_TARGET.to_string(),
            separator: ',',
            leakage: LeakageRule::default(),
            missing: MissingPolicy::default(),
            training: TrainingConfig::default(),
            top_features: 10,
            profile: ProfileConfig::default(),
            scenario: ScenarioConfig::default(),
            plot_dir: None,
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a JSON config; missing fields take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        debug!(path = %path.display(), "Loaded analysis config");
        config.validate()?;
        Ok(config)
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = target.into();
        self
    }

    pub fn with_training(mut self, training: TrainingConfig) -> Self {
        self.training = training;
        self
    }

    pub fn with_scenario(mut self, scenario: ScenarioConfig) -> Self {
        self.scenario = scenario;
        self
    }

    pub fn with_leakage(mut self, leakage: LeakageRule) -> Self {
        self.leakage = leakage;
        self
    }

    pub fn with_missing_policy(mut self, policy: MissingPolicy) -> Self {
        self.missing = policy;
        self
    }

    pub fn with_plot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.plot_dir = Some(dir.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_column.trim().is_empty() {
            return Err(CarestarError::ConfigError("target column must be named".to_string()));
        }
        if !self.separator.is_ascii() {
            return Err(CarestarError::ConfigError(format!(
                "separator must be a single ASCII character, got {:?}",
                self.separator
            )));
        }
        if self.top_features == 0 {
            return Err(CarestarError::ConfigError("top_features must be at least 1".to_string()));
        }
        self.training.validate()?;
        self.profile.validate()?;
        self.scenario.validate()?;
        Ok(())
    }

    pub(crate) fn separator_byte(&self) -> u8 {
        self.separator as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.target_column, DEFAULT_TARGET);
        assert_eq!(config.top_features, 10);
        assert!(config.plot_dir.is_none());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let mut config = AnalysisConfig::new();
        config.top_features = 0;
        assert!(matches!(config.validate(), Err(CarestarError::ConfigError(_))));

        let config = AnalysisConfig::new().with_training(TrainingConfig::new().with_test_size(1.5));
        assert!(config.validate().is_err());

        let config = AnalysisConfig::new().with_scenario(ScenarioConfig::new().with_adjustment(10.0, -1.0));
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::new();
        config.separator = 'é';
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"target_column": "rating", "training": {{"n_estimators": 12}}, "scenario": {{"delta": 5.0}}}}"#
        )
        .unwrap();

        let config = AnalysisConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.target_column, "rating");
        assert_eq!(config.training.n_estimators, 12);
        assert_eq!(config.training.random_seed, 42);
        assert_eq!(config.scenario.delta, 5.0);
        assert_eq!(config.scenario.cap, 100.0);
    }

    #[test]
    fn test_from_json_file_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"top_features": 0}}"#).unwrap();
        assert!(matches!(
            AnalysisConfig::from_json_file(file.path()),
            Err(CarestarError::ConfigError(_))
        ));

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        write!(broken, "not json").unwrap();
        assert!(matches!(
            AnalysisConfig::from_json_file(broken.path()),
            Err(CarestarError::SerializationError(_))
        ));
    }
}
