//! Model training module
//!
//! Provides the regression model behind the star-rating analysis:
//! - Regression trees with variance-reduction splits
//! - Bootstrapped random forest with impurity importances
//! - Seeded train/test split
//! - Held-out regression metrics

mod config;
mod engine;
mod models;
pub mod decision_tree;
pub mod random_forest;
pub mod split;

pub use config::TrainingConfig;
pub use engine::{columns_to_array2, column_to_array1, TrainEngine, TrainedModel};
pub use models::ModelMetrics;
pub use decision_tree::{DecisionTree, TreeNode};
pub use random_forest::{MaxFeatures, RandomForest};
pub use split::{take_rows, TrainTestSplit};
