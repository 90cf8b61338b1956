//! # Forecast Math
//!
//! Numeric kernels shared by the revenue forecasting pipeline.
//! This crate provides the least squares solver behind the regression
//! model, descriptive statistics used for scaling and error metrics,
//! and Fourier terms for yearly seasonality.

use thiserror::Error;

pub mod fourier;
pub mod linear;
pub mod statistics;

pub use linear::{solve_linear_system, RidgeFit, RidgeRegression};
pub use statistics::{mean, median, sample_std_dev, Standardization};

/// Errors that can occur in forecasting math
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for forecasting math operations
pub type Result<T> = std::result::Result<T, MathError>;
