//! Error types for the revenue_forecast crate

use forecast_math::MathError;
use polars::prelude::PolarsError;
use thiserror::Error;

use crate::pipeline::CategoryFailure;

/// Custom error types for the revenue_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Required input columns are absent
    #[error("Missing required columns in {table} table: {}", .columns.join(", "))]
    MissingColumns {
        table: &'static str,
        columns: Vec<String>,
    },

    /// A date cell could not be parsed as a calendar date
    #[error("Malformed date in column '{column}' at row {row}: '{value}'")]
    MalformedDate {
        column: String,
        row: usize,
        value: String,
    },

    /// A numeric cell is null or not finite
    #[error("Invalid value in column '{column}' at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        reason: String,
    },

    /// An input table has no rows
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// Too few observations to fit or evaluate a model
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A regressor has no value for a month and no earlier value to carry forward
    #[error("Regressor '{regressor}' has no value at or before {month} for '{category}'")]
    MissingRegressor {
        category: String,
        month: chrono::NaiveDate,
        regressor: String,
    },

    /// Error from invalid parameters or configuration
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from the numeric kernels
    #[error("Math error: {0}")]
    Math(#[from] MathError),

    /// No category produced a forecast
    #[error("No results: every category failed ({} failures)", .failures.len())]
    NoResults { failures: Vec<CategoryFailure> },

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from JSON configuration handling
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl ForecastError {
    /// Whether the error describes bad caller input rather than a model problem
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ForecastError::MissingColumns { .. }
                | ForecastError::MalformedDate { .. }
                | ForecastError::InvalidValue { .. }
                | ForecastError::EmptyInput(_)
        )
    }
}
