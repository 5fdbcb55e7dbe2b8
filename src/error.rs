//! Error types for carestar

use thiserror::Error;

/// Result type alias for carestar operations
pub type Result<T> = std::result::Result<T, CarestarError>;

/// Main error type for the analysis pipeline
#[derive(Error, Debug)]
pub enum CarestarError {
    #[error("Data error: {0}")]
    DataError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Column not found: {0}")]
    FeatureNotFound(String),

    #[error("Model not fitted")]
    ModelNotFitted,

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Computation error: {0}")]
    ComputationError(String),

    #[error("Plot error: {0}")]
    PlotError(String),
}

impl From<polars::error::PolarsError> for CarestarError {
    fn from(err: polars::error::PolarsError) -> Self {
        CarestarError::DataError(err.to_string())
    }
}

impl From<serde_json::Error> for CarestarError {
    fn from(err: serde_json::Error) -> Self {
        CarestarError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CarestarError {
    fn from(err: ndarray::ShapeError) -> Self {
        CarestarError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CarestarError::FeatureNotFound("State".to_string());
        assert_eq!(err.to_string(), "Column not found: State");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CarestarError = io_err.into();
        assert!(matches!(err, CarestarError::IoError(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: CarestarError = json_err.into();
        assert!(matches!(err, CarestarError::SerializationError(_)));
    }
}
