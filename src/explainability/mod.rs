//! Model explainability module
//!
//! Ranks features by the forest's impurity-based importance scores.

mod importance;

pub use importance::{FeatureImportance, FeatureRanking};
