//! Feature importance ranking

use crate::error::{CarestarError, Result};
use crate::training::TrainedModel;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// One feature and its importance score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

/// Features sorted by descending importance.
///
/// The sort is stable: equal scores keep feature-matrix order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureRanking {
    entries: Vec<FeatureImportance>,
}

impl FeatureRanking {
    /// Pair `names` with `scores` and sort
    pub fn from_scores(names: &[String], scores: &Array1<f64>) -> Result<Self> {
        if names.len() != scores.len() {
            return Err(CarestarError::ShapeError {
                expected: format!("{} importance scores", names.len()),
                actual: format!("{} importance scores", scores.len()),
            });
        }
        if let Some(bad) = scores.iter().find(|v| !v.is_finite() || **v < 0.0) {
            return Err(CarestarError::ComputationError(format!(
                "invalid importance score {}",
                bad
            )));
        }

        let mut entries: Vec<FeatureImportance> = names
            .iter()
            .zip(scores.iter())
            .map(|(feature, &importance)| FeatureImportance {
                feature: feature.clone(),
                importance,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.importance
                .partial_cmp(&a.importance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(Self { entries })
    }

    /// Rank the features of a trained model
    pub fn from_model(model: &TrainedModel) -> Result<Self> {
        let scores = model
            .forest()
            .feature_importances()
            .ok_or(CarestarError::ModelNotFitted)?;
        Self::from_scores(model.feature_names(), scores)
    }

    /// The `k` most important features (fewer if the model has fewer)
    pub fn top(&self, k: usize) -> &[FeatureImportance] {
        &self.entries[..k.min(self.entries.len())]
    }

    pub fn entries(&self) -> &[FeatureImportance] {
        &self.entries
    }

    /// Zero-based rank of a feature
    pub fn rank_of(&self, feature: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.feature == feature)
    }

    /// Sum of all scores
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.importance).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(n: &[&str]) -> Vec<String> {
        n.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sorted_descending() {
        let ranking =
            FeatureRanking::from_scores(&names(&["a", "b", "c"]), &array![0.2, 0.5, 0.3]).unwrap();

        let order: Vec<&str> = ranking.entries().iter().map(|e| e.feature.as_str()).collect();
        assert_eq!(order, vec!["b", "c", "a"]);
        assert_eq!(ranking.rank_of("a"), Some(2));
        assert!((ranking.total() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let ranking =
            FeatureRanking::from_scores(&names(&["x", "y", "z"]), &array![0.25, 0.5, 0.25]).unwrap();
        let order: Vec<&str> = ranking.entries().iter().map(|e| e.feature.as_str()).collect();
        assert_eq!(order, vec!["y", "x", "z"]);
    }

    #[test]
    fn test_top_k_clamped() {
        let ranking = FeatureRanking::from_scores(&names(&["a", "b"]), &array![0.4, 0.6]).unwrap();
        assert_eq!(ranking.top(10).len(), 2);
        assert_eq!(ranking.top(1)[0].feature, "b");
    }

    #[test]
    fn test_length_mismatch() {
        let result = FeatureRanking::from_scores(&names(&["a"]), &array![0.5, 0.5]);
        assert!(matches!(result, Err(CarestarError::ShapeError { .. })));
    }

    #[test]
    fn test_negative_score_rejected() {
        let result = FeatureRanking::from_scores(&names(&["a", "b"]), &array![1.2, -0.2]);
        assert!(matches!(result, Err(CarestarError::ComputationError(_))));
    }
}
