//! Accuracy metrics for evaluating forecasts against actuals

use crate::error::{ForecastError, Result};
use forecast_math::{mean, median};
use serde::{Deserialize, Serialize};

/// Forecast accuracy metrics
///
/// Percentage errors are fractions (0.1 is 10%), as in the performance table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Number of compared points
    pub observations: usize,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Absolute Percentage Error, `None` when every actual is zero
    pub mape: Option<f64>,
    /// Median Absolute Percentage Error, `None` when every actual is zero
    pub mdape: Option<f64>,
    /// Symmetric Mean Absolute Percentage Error
    pub smape: f64,
    /// Share of actuals inside their interval
    pub coverage: f64,
}

/// Calculate accuracy metrics for a forecast vs actual values
///
/// `intervals` holds the (lower, upper) bound of each forecast value.
pub fn forecast_accuracy(
    forecast: &[f64],
    actual: &[f64],
    intervals: &[(f64, f64)],
) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.len() != intervals.len() || forecast.is_empty() {
        return Err(ForecastError::InvalidParameter(format!(
            "Forecast ({}), actual ({}) and intervals ({}) must have the same non-zero length",
            forecast.len(),
            actual.len(),
            intervals.len()
        )));
    }

    let n = forecast.len() as f64;

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mse = errors.iter().map(|e| e.powi(2)).sum::<f64>() / n;
    let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

    // Zero actuals have no defined percentage error
    let percentage_errors: Vec<f64> = actual
        .iter()
        .zip(errors.iter())
        .filter(|(&a, _)| a != 0.0)
        .map(|(&a, &e)| e.abs() / a.abs())
        .collect();

    let smape = actual
        .iter()
        .zip(forecast.iter())
        .map(|(&a, &f)| {
            let denom = (a.abs() + f.abs()) / 2.0;
            if denom == 0.0 {
                0.0
            } else {
                (a - f).abs() / denom
            }
        })
        .sum::<f64>()
        / n;

    let covered = actual
        .iter()
        .zip(intervals.iter())
        .filter(|(&a, &(lower, upper))| lower <= a && a <= upper)
        .count();

    Ok(ForecastAccuracy {
        observations: forecast.len(),
        mse,
        rmse: mse.sqrt(),
        mae,
        mape: mean(&percentage_errors),
        mdape: median(&percentage_errors),
        smape,
        coverage: covered as f64 / n,
    })
}

impl std::fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let pct = |v: Option<f64>| match v {
            Some(v) => format!("{:.4}%", v * 100.0),
            None => "n/a".to_string(),
        };

        writeln!(f, "Forecast Accuracy Metrics ({} points):", self.observations)?;
        writeln!(f, "  MSE:      {:.4}", self.mse)?;
        writeln!(f, "  RMSE:     {:.4}", self.rmse)?;
        writeln!(f, "  MAE:      {:.4}", self.mae)?;
        writeln!(f, "  MAPE:     {}", pct(self.mape))?;
        writeln!(f, "  MDAPE:    {}", pct(self.mdape))?;
        writeln!(f, "  SMAPE:    {:.4}%", self.smape * 100.0)?;
        writeln!(f, "  Coverage: {:.2}%", self.coverage * 100.0)?;
        Ok(())
    }
}
