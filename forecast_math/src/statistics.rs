//! Descriptive statistics
//!
//! Contains the small set of statistics the pipeline needs:
//! - Mean, median and sample standard deviation
//! - Standardization (centering and scaling) of regressor columns

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Scale below which a column is treated as constant
const MIN_SCALE: f64 = 1e-12;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median, `None` for an empty slice
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Sample standard deviation (n - 1 denominator)
pub fn sample_std_dev(values: &[f64]) -> Result<f64> {
    if values.len() < 2 {
        return Err(MathError::InsufficientData(format!(
            "Standard deviation needs at least 2 values, have {}",
            values.len()
        )));
    }

    let m = values.iter().sum::<f64>() / values.len() as f64;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;

    Ok(variance.sqrt())
}

/// Centering and scaling parameters learned from one column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Standardization {
    /// Value subtracted before scaling
    pub center: f64,
    /// Divisor applied after centering
    pub scale: f64,
}

impl Standardization {
    /// Learn mean and sample standard deviation from a column.
    ///
    /// A single value or a constant column gets a scale of 1, so that the
    /// standardized column is identically zero instead of undefined.
    pub fn fit(values: &[f64]) -> Result<Self> {
        let center = mean(values).ok_or_else(|| {
            MathError::InsufficientData("Cannot standardize an empty column".to_string())
        })?;

        if values.iter().any(|v| !v.is_finite()) {
            return Err(MathError::InvalidInput(
                "Column contains non-finite values".to_string(),
            ));
        }

        let scale = match sample_std_dev(values) {
            Ok(sd) if sd > MIN_SCALE => sd,
            _ => 1.0,
        };

        Ok(Self { center, scale })
    }

    /// Identity transform
    pub fn identity() -> Self {
        Self {
            center: 0.0,
            scale: 1.0,
        }
    }

    /// Apply the transform to one value
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.center) / self.scale
    }
}
