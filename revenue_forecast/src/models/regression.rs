//! Trend regression with yearly seasonality and exogenous regressors
//!
//! The model is additive:
//!
//! ```text
//! y(t) = intercept + slope * t + seasonality(t) + Σ beta_j * x_j(t)
//! ```
//!
//! `t` is elapsed days since the first training month, divided by the
//! training span. The target is scaled by its largest magnitude and each
//! regressor is standardized, so a single ridge penalty means the same thing
//! for every series. Coefficients come from ridge least squares with an
//! unpenalized intercept.

use crate::config::{ModelConfig, SeasonalityMode};
use crate::error::{ForecastError, Result};
use crate::models::{FeatureFrame, ForecastModel, ForecastResult, TrainedForecastModel, TrainingSet};
use crate::utils::{days_since_epoch, months_between};
use chrono::NaiveDate;
use forecast_math::fourier::{fourier_terms, YEARLY_PERIOD_DAYS};
use forecast_math::{RidgeFit, RidgeRegression, Standardization};
use statrs::distribution::{ContinuousCDF, Normal};

/// Span from which automatic yearly seasonality switches on
const AUTO_SEASONALITY_MIN_DAYS: i64 = 730;

/// Untrained trend regression
#[derive(Debug, Clone)]
pub struct TrendRegression {
    /// Name of the model
    name: String,
    config: ModelConfig,
}

/// Trained trend regression
#[derive(Debug, Clone)]
pub struct TrainedTrendRegression {
    name: String,
    /// First training month, origin of the trend clock
    start: NaiveDate,
    /// Last training month, origin of the forecast steps
    last_month: NaiveDate,
    span_days: f64,
    target_scale: f64,
    /// Regressor names with their standardization, in design order
    scalings: Vec<(String, Standardization)>,
    /// Fourier order, zero when seasonality is off
    seasonal_order: usize,
    fit: RidgeFit,
    /// Residual standard deviation in scaled units
    sigma: f64,
    /// Normal quantile for the configured interval width
    z: f64,
}

impl TrendRegression {
    /// Create a model after validating its settings
    pub fn new(config: ModelConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: format!(
                "Trend Regression (ridge={}, interval={})",
                config.ridge, config.interval_width
            ),
            config,
        })
    }

    fn seasonal_order(&self, span_days: i64) -> usize {
        match self.config.yearly_seasonality {
            SeasonalityMode::Enabled => self.config.fourier_order,
            SeasonalityMode::Disabled => 0,
            SeasonalityMode::Auto if span_days >= AUTO_SEASONALITY_MIN_DAYS => {
                self.config.fourier_order
            }
            SeasonalityMode::Auto => 0,
        }
    }
}

impl Default for TrendRegression {
    fn default() -> Self {
        Self {
            name: "Trend Regression".to_string(),
            config: ModelConfig::default(),
        }
    }
}

impl ForecastModel for TrendRegression {
    type Trained = TrainedTrendRegression;

    fn train(&self, data: &TrainingSet) -> Result<Self::Trained> {
        let features = data.features();
        let months = features.months();
        let target = data.target();

        if months.len() < 2 {
            return Err(ForecastError::InsufficientData(format!(
                "Need at least 2 monthly observations, have {}",
                months.len()
            )));
        }
        if months.windows(2).any(|w| w[1] <= w[0]) {
            return Err(ForecastError::InvalidParameter(
                "Training months must be strictly increasing".to_string(),
            ));
        }
        if target.iter().any(|y| !y.is_finite()) {
            return Err(ForecastError::InvalidParameter(
                "Target contains non-finite values".to_string(),
            ));
        }

        let start = months[0];
        let last_month = months[months.len() - 1];
        let span = (last_month - start).num_days();

        let target_scale = match target.iter().fold(0.0_f64, |m, y| m.max(y.abs())) {
            s if s > 0.0 => s,
            _ => 1.0,
        };

        let scalings = features
            .regressors()
            .iter()
            .map(|r| -> Result<(String, Standardization)> {
                Ok((r.name.clone(), Standardization::fit(&r.values)?))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut trained = TrainedTrendRegression {
            name: self.name.clone(),
            start,
            last_month,
            span_days: span as f64,
            target_scale,
            scalings,
            seasonal_order: self.seasonal_order(span),
            fit: RidgeFit {
                coefficients: Vec::new(),
                fitted: Vec::new(),
                ssr: 0.0,
            },
            sigma: 0.0,
            z: interval_quantile(self.config.interval_width)?,
        };

        let design = (0..months.len())
            .map(|i| trained.design_row(features, i))
            .collect::<Vec<_>>();
        let scaled: Vec<f64> = target.iter().map(|y| y / target_scale).collect();

        let mut penalties = vec![self.config.ridge; trained.width()];
        penalties[0] = 0.0;
        let fit = RidgeRegression::new(penalties)?.fit(&design, &scaled)?;

        let dof = months.len().saturating_sub(2).max(1);
        trained.sigma = (fit.ssr / dof as f64).sqrt();
        trained.fit = fit;

        Ok(trained)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl TrainedTrendRegression {
    /// Number of design columns
    fn width(&self) -> usize {
        2 + 2 * self.seasonal_order + self.scalings.len()
    }

    fn design_row(&self, frame: &FeatureFrame, i: usize) -> Vec<f64> {
        let month = frame.months()[i];
        let mut row = Vec::with_capacity(self.width());

        row.push(1.0);
        row.push((month - self.start).num_days() as f64 / self.span_days);
        row.extend(fourier_terms(
            days_since_epoch(month) as f64,
            YEARLY_PERIOD_DAYS,
            self.seasonal_order,
        ));
        for (regressor, (_, scaling)) in frame.regressors().iter().zip(self.scalings.iter()) {
            row.push(scaling.apply(regressor.values[i]));
        }

        row
    }

    fn check_regressors(&self, frame: &FeatureFrame) -> Result<()> {
        let expected: Vec<&str> = self.scalings.iter().map(|(n, _)| n.as_str()).collect();
        let given: Vec<&str> = frame.regressors().iter().map(|r| r.name.as_str()).collect();

        if expected != given {
            return Err(ForecastError::InvalidParameter(format!(
                "Model was trained with regressors {:?} but received {:?}",
                expected, given
            )));
        }
        if let Some(r) = frame
            .regressors()
            .iter()
            .find(|r| r.values.iter().any(|v| !v.is_finite()))
        {
            return Err(ForecastError::InvalidParameter(format!(
                "Regressor '{}' contains non-finite values",
                r.name
            )));
        }
        Ok(())
    }

    /// Fitted coefficients in design order (intercept, trend, seasonality, regressors)
    pub fn coefficients(&self) -> &[f64] {
        &self.fit.coefficients
    }

    /// Residual standard deviation in revenue units
    pub fn residual_std(&self) -> f64 {
        self.sigma * self.target_scale
    }

    /// Whether yearly seasonality terms are part of the design
    pub fn seasonality_enabled(&self) -> bool {
        self.seasonal_order > 0
    }

    /// Last month seen during training
    pub fn last_month(&self) -> NaiveDate {
        self.last_month
    }
}

impl TrainedForecastModel for TrainedTrendRegression {
    fn predict(&self, frame: &FeatureFrame) -> Result<ForecastResult> {
        self.check_regressors(frame)?;

        let mut values = Vec::with_capacity(frame.len());
        let mut intervals = Vec::with_capacity(frame.len());

        for (i, &month) in frame.months().iter().enumerate() {
            let estimate = self.fit.predict_row(&self.design_row(frame, i))? * self.target_scale;

            // Uncertainty widens with each month past the training range
            let steps_ahead = months_between(self.last_month, month).max(0) as f64;
            let margin = self.z * self.sigma * (1.0 + steps_ahead).sqrt() * self.target_scale;

            values.push(estimate);
            intervals.push((estimate - margin, estimate + margin));
        }

        ForecastResult::new_with_intervals(frame.months().to_vec(), values, intervals)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn interval_quantile(width: f64) -> Result<f64> {
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| ForecastError::InvalidParameter(format!("Normal distribution: {}", e)))?;
    Ok(normal.inverse_cdf(0.5 + width / 2.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::add_months;
    use approx::assert_relative_eq;

    fn months(n: u32) -> Vec<NaiveDate> {
        let first = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        (0..n).map(|k| add_months(first, k)).collect()
    }

    #[test]
    fn quantile_matches_eighty_percent_interval() {
        assert_relative_eq!(interval_quantile(0.8).unwrap(), 1.2815515655, epsilon = 1e-6);
    }

    #[test]
    fn auto_seasonality_needs_two_years() {
        let model = TrendRegression::default();
        assert_eq!(model.seasonal_order(365), 0);
        assert_eq!(model.seasonal_order(730), 3);
    }

    #[test]
    fn constant_regressor_does_not_break_the_fit() {
        let m = months(6);
        let frame = FeatureFrame::new(m)
            .with_regressor("Exchange Rate", vec![1.0; 6])
            .unwrap();
        let data = TrainingSet::new(frame, vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0]).unwrap();

        let trained = TrendRegression::default().train(&data).unwrap();
        assert_eq!(trained.coefficients().len(), 3);
        assert_relative_eq!(trained.coefficients()[2], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn trained_model_reports_its_fit() {
        let short = TrainingSet::new(
            FeatureFrame::new(months(6)),
            vec![100.0, 112.0, 104.0, 125.0, 118.0, 131.0],
        )
        .unwrap();
        let trained = TrendRegression::default().train(&short).unwrap();

        assert!(!trained.seasonality_enabled());
        assert_eq!(trained.last_month(), months(6)[5]);
        assert!(trained.residual_std() > 1.0 && trained.residual_std() < 20.0);

        let long_months = months(25);
        let target: Vec<f64> = (0..25).map(|k| 50.0 + k as f64).collect();
        let long = TrainingSet::new(FeatureFrame::new(long_months.clone()), target).unwrap();
        let trained = TrendRegression::default().train(&long).unwrap();

        assert!(trained.seasonality_enabled());
        assert_eq!(trained.last_month(), long_months[24]);
    }
}
