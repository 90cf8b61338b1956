//! Forecasting models for monthly revenue series

use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use std::fmt::Debug;

/// A named exogenous input aligned with the months of a [`FeatureFrame`]
#[derive(Debug, Clone, PartialEq)]
pub struct Regressor {
    pub name: String,
    pub values: Vec<f64>,
}

/// Months plus any regressor columns, the input to training and prediction
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureFrame {
    months: Vec<NaiveDate>,
    regressors: Vec<Regressor>,
}

impl FeatureFrame {
    /// Frame without regressors
    pub fn new(months: Vec<NaiveDate>) -> Self {
        Self {
            months,
            regressors: Vec::new(),
        }
    }

    /// Add a regressor column, which must have one value per month
    pub fn with_regressor(mut self, name: impl Into<String>, values: Vec<f64>) -> Result<Self> {
        let name = name.into();
        if values.len() != self.months.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Regressor '{}' has {} values for {} months",
                name,
                values.len(),
                self.months.len()
            )));
        }
        self.regressors.push(Regressor { name, values });
        Ok(self)
    }

    /// Months in frame order
    pub fn months(&self) -> &[NaiveDate] {
        &self.months
    }

    /// Regressor columns in insertion order
    pub fn regressors(&self) -> &[Regressor] {
        &self.regressors
    }

    pub fn len(&self) -> usize {
        self.months.len()
    }

    pub fn is_empty(&self) -> bool {
        self.months.is_empty()
    }
}

/// Features with the observed target for each month
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    features: FeatureFrame,
    target: Vec<f64>,
}

impl TrainingSet {
    pub fn new(features: FeatureFrame, target: Vec<f64>) -> Result<Self> {
        if features.len() != target.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Target has {} values for {} months",
                target.len(),
                features.len()
            )));
        }
        Ok(Self { features, target })
    }

    pub fn features(&self) -> &FeatureFrame {
        &self.features
    }

    pub fn target(&self) -> &[f64] {
        &self.target
    }
}

/// Forecast result containing predicted values
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastResult {
    /// Month of each prediction
    months: Vec<NaiveDate>,
    /// Point estimates
    values: Vec<f64>,
    /// Lower and upper bounds
    intervals: Vec<(f64, f64)>,
}

impl ForecastResult {
    /// Create a new forecast result with uncertainty intervals
    pub fn new_with_intervals(
        months: Vec<NaiveDate>,
        values: Vec<f64>,
        intervals: Vec<(f64, f64)>,
    ) -> Result<Self> {
        if values.len() != months.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Values length ({}) doesn't match months ({})",
                values.len(),
                months.len()
            )));
        }

        if values.len() != intervals.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Values length ({}) doesn't match intervals length ({})",
                values.len(),
                intervals.len()
            )));
        }

        Ok(Self {
            months,
            values,
            intervals,
        })
    }

    /// Get the months
    pub fn months(&self) -> &[NaiveDate] {
        &self.months
    }

    /// Get the point estimates
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the (lower, upper) bounds
    pub fn intervals(&self) -> &[(f64, f64)] {
        &self.intervals
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug + Send + Sync {
    /// Predict values, with bounds, for every month of `frame`
    fn predict(&self, frame: &FeatureFrame) -> Result<ForecastResult>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a monthly series
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model
    fn train(&self, data: &TrainingSet) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod regression;
