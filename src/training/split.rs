//! Seeded train/test row split

use crate::error::{CarestarError, Result};
use polars::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainTestSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

impl TrainTestSplit {
    /// Shuffle `0..n_rows` with `seed` and hold out `ceil(n_rows * test_size)` rows.
    pub fn new(n_rows: usize, test_size: f64, seed: u64) -> Result<Self> {
        let n_test = (n_rows as f64 * test_size).ceil() as usize;
        if n_test == 0 || n_test >= n_rows {
            return Err(CarestarError::ValidationError(format!(
                "cannot split {} rows with test_size {}: need at least one train and one test row",
                n_rows, test_size
            )));
        }

        let mut indices: Vec<usize> = (0..n_rows).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let train = indices.split_off(n_test);
        Ok(Self {
            train,
            test: indices,
        })
    }

    pub fn take_train(&self, df: &DataFrame) -> Result<DataFrame> {
        take_rows(df, &self.train)
    }

    pub fn take_test(&self, df: &DataFrame) -> Result<DataFrame> {
        take_rows(df, &self.test)
    }
}

/// Select rows by position, in the given order
pub fn take_rows(df: &DataFrame, rows: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec("rows".into(), rows.iter().map(|&i| i as IdxSize).collect());
    Ok(df.take(&idx)?)
}
