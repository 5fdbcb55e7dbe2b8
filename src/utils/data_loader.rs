//! Data loading utilities

use crate::error::{CarestarError, Result};
use crate::preprocessing::{is_numeric_dtype, ColumnSummary};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// CSV loader for quality datasets
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Field separator
    separator: u8,
    /// Rows scanned for schema inference (None = whole file)
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            separator: b',',
            infer_schema_length: None,
        }
    }

    /// Set the field separator
    pub fn with_separator(mut self, separator: u8) -> Self {
        self.separator = separator;
        self
    }

    /// Limit schema inference to the first `n` rows
    pub fn with_infer_schema_length(mut self, n: usize) -> Self {
        self.infer_schema_length = Some(n);
        self
    }

    /// Load a delimited file with a header row
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        let start = Instant::now();
        let file = File::open(path).map_err(|e| {
            CarestarError::DataError(format!("cannot open {}: {}", path.display(), e))
        })?;

        let parse_opts = CsvParseOptions::default().with_separator(self.separator);

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(self.infer_schema_length)
            .with_parse_options(parse_opts)
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| CarestarError::DataError(format!("{}: {}", path.display(), e)))?;

        info!(
            path = %path.display(),
            rows = df.height(),
            cols = df.width(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Loaded dataset"
        );
        Ok(df)
    }
}

/// Name, dtype and null count of one column
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnInfo {
    pub name: String,
    pub dtype: String,
    pub null_count: usize,
}

/// Shape, schema and summary statistics of a loaded table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetReport {
    pub n_rows: usize,
    pub n_cols: usize,
    pub columns: Vec<ColumnInfo>,
    /// Summaries for numeric columns, in table order
    pub summaries: Vec<ColumnSummary>,
}

impl DatasetReport {
    /// Describe a data frame
    pub fn from_frame(df: &DataFrame) -> Result<Self> {
        let mut columns = Vec::with_capacity(df.width());
        let mut summaries = Vec::new();

        for column in df.get_columns() {
            let series = column.as_materialized_series();
            columns.push(ColumnInfo {
                name: series.name().to_string(),
                dtype: series.dtype().to_string(),
                null_count: series.null_count(),
            });

            if is_numeric_dtype(series.dtype()) {
                summaries.push(ColumnSummary::from_series(series)?);
            }
        }

        debug!(numeric = summaries.len(), "Computed column summaries");

        Ok(Self {
            n_rows: df.height(),
            n_cols: df.width(),
            columns,
            summaries,
        })
    }

    /// Column names in table order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Total number of missing cells
    pub fn total_missing(&self) -> usize {
        self.columns.iter().map(|c| c.null_count).sum()
    }

    /// Summary for a numeric column
    pub fn summary(&self, name: &str) -> Option<&ColumnSummary> {
        self.summaries.iter().find(|s| s.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv() {
        let tmp = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(tmp.as_file(), "State,Score,Count").unwrap();
        writeln!(tmp.as_file(), "AK,1.5,3").unwrap();
        writeln!(tmp.as_file(), "AL,2.5,4").unwrap();
        tmp.as_file().flush().unwrap();

        let df = DataLoader::new().load_csv(tmp.path()).unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
        assert_eq!(df.column("Score").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_load_missing_file() {
        let result = DataLoader::new().load_csv(Path::new("/nonexistent/HH_State.csv"));
        assert!(matches!(result, Err(CarestarError::DataError(_))));
    }

    #[test]
    fn test_load_with_separator() {
        let tmp = tempfile::NamedTempFile::with_suffix(".tsv").unwrap();
        writeln!(tmp.as_file(), "State\tScore").unwrap();
        writeln!(tmp.as_file(), "AK\t1.5").unwrap();
        tmp.as_file().flush().unwrap();

        let df = DataLoader::new()
            .with_separator(b'\t')
            .load_csv(tmp.path())
            .unwrap();
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_dataset_report() {
        let df = df!(
            "State" => &["AK", "AL", "AR"],
            "Score" => &[Some(1.0), None, Some(3.0)],
            "Visits" => &[10i64, 20, 30]
        )
        .unwrap();

        let report = DatasetReport::from_frame(&df).unwrap();
        assert_eq!(report.n_rows, 3);
        assert_eq!(report.n_cols, 3);
        assert_eq!(report.column_names(), vec!["State", "Score", "Visits"]);
        assert_eq!(report.total_missing(), 1);
        assert_eq!(report.summaries.len(), 2);

        let score = report.summary("Score").unwrap();
        assert_eq!(score.count, 2);
        assert_eq!(score.null_count, 1);
        assert!((score.mean.unwrap() - 2.0).abs() < 1e-12);
        assert!(report.summary("State").is_none());
    }
}
