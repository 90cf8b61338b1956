//! Per-category forecast engine
//!
//! Every revenue stream gets its own [`TrendRegression`] with the monthly
//! exchange rate and inflation rate as regressors. Regressor values are
//! carried forward from the most recent earlier macro month, both over the
//! history and over the projected months. A category that cannot be fit is
//! reported and skipped; the other categories are unaffected.

use crate::aggregate::{MonthlyMacro, MonthlySeries};
use crate::config::{ForecastConfig, Horizon, RegressorGapPolicy};
use crate::data::{EXCHANGE_RATE, INFLATION_RATE};
use crate::error::{ForecastError, Result};
use crate::models::regression::TrendRegression;
use crate::models::{FeatureFrame, ForecastModel, TrainedForecastModel, TrainingSet};
use crate::pipeline::{CategoryFailure, Stage};
use crate::utils::future_month_ends;
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Point estimate with bounds for one (month, category)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub month: NaiveDate,
    pub category: String,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Fitted and projected values of one category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryForecast {
    pub category: String,
    /// Last month with observed revenue
    pub last_observed: NaiveDate,
    /// One point per historical month followed by one per future month
    pub points: Vec<ForecastPoint>,
}

impl CategoryForecast {
    /// In-sample fitted points
    pub fn fitted(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(move |p| p.month <= self.last_observed)
    }

    /// Projected points after the last observed month
    pub fn projected(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.points.iter().filter(move |p| p.month > self.last_observed)
    }
}

/// Output of one engine run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastRun {
    /// Successful categories keyed by label
    pub forecasts: BTreeMap<String, CategoryForecast>,
    /// Categories that could not be fit
    pub failures: Vec<CategoryFailure>,
}

impl ForecastRun {
    /// Every forecast point, grouped by category
    pub fn points(&self) -> impl Iterator<Item = &ForecastPoint> {
        self.forecasts.values().flat_map(|f| f.points.iter())
    }

    /// Whether no category produced a forecast
    pub fn is_empty(&self) -> bool {
        self.forecasts.is_empty()
    }
}

/// Carry-forward lookup over monthly macro points
#[derive(Debug, Clone)]
pub struct MacroLookup {
    points: Vec<MonthlyMacro>,
    policy: RegressorGapPolicy,
}

impl MacroLookup {
    pub fn new(points: &[MonthlyMacro], policy: RegressorGapPolicy) -> Self {
        let mut points = points.to_vec();
        points.sort_by_key(|p| p.month);
        Self { points, policy }
    }

    /// Macro point in effect at `month`: that month's, else the latest earlier one.
    ///
    /// Months before the first macro point resolve according to the gap policy.
    pub fn at(&self, month: NaiveDate) -> Option<&MonthlyMacro> {
        let idx = self.points.partition_point(|p| p.month <= month);
        if idx > 0 {
            return self.points.get(idx - 1);
        }
        match self.policy {
            RegressorGapPolicy::Reject => None,
            RegressorGapPolicy::BackwardFill => self.points.first(),
        }
    }

    /// Exchange rate and inflation rate columns for `months`
    pub fn regressors(&self, category: &str, months: &[NaiveDate]) -> Result<FeatureFrame> {
        let mut rates = Vec::with_capacity(months.len());
        let mut inflation = Vec::with_capacity(months.len());

        for &month in months {
            let point = self.at(month).ok_or_else(|| ForecastError::MissingRegressor {
                category: category.to_string(),
                month,
                regressor: EXCHANGE_RATE.to_string(),
            })?;
            rates.push(point.exchange_rate);
            inflation.push(point.inflation_rate);
        }

        FeatureFrame::new(months.to_vec())
            .with_regressor(EXCHANGE_RATE, rates)?
            .with_regressor(INFLATION_RATE, inflation)
    }
}

/// Fits one model per category and projects it forward
#[derive(Debug, Clone)]
pub struct ForecastEngine {
    config: ForecastConfig,
    model: TrendRegression,
}

impl ForecastEngine {
    /// Create an engine after validating its settings
    pub fn new(config: ForecastConfig) -> Result<Self> {
        let model = TrendRegression::new(config.model.clone())?;
        Ok(Self { config, model })
    }

    /// Forecast every category of `series` `horizon` months past its own last month
    pub fn forecast(
        &self,
        series: &MonthlySeries,
        macros: &[MonthlyMacro],
        horizon: Horizon,
    ) -> ForecastRun {
        let lookup = MacroLookup::new(macros, self.config.regressor_gap);
        let categories = series.categories();

        info!(
            categories = categories.len(),
            horizon = horizon.months(),
            "forecasting revenue streams"
        );

        let fit_one = |category: &String| {
            let outcome = self.forecast_category(category, &series.history(category), &lookup, horizon);
            (category.clone(), outcome)
        };

        let outcomes: Vec<(String, Result<CategoryForecast>)> = if self.config.parallel {
            categories.par_iter().map(fit_one).collect()
        } else {
            categories.iter().map(fit_one).collect()
        };

        outcomes
            .into_iter()
            .fold(ForecastRun::default(), |mut run, (category, outcome)| {
                match outcome {
                    Ok(forecast) => {
                        run.forecasts.insert(category, forecast);
                    }
                    Err(e) => {
                        warn!(category = %category, error = %e, "forecast failed, skipping category");
                        run.failures.push(CategoryFailure::new(category, Stage::Forecast, &e));
                    }
                }
                run
            })
    }

    /// Fit and project a single category
    pub fn forecast_category(
        &self,
        category: &str,
        history: &[(NaiveDate, f64)],
        lookup: &MacroLookup,
        horizon: Horizon,
    ) -> Result<CategoryForecast> {
        let last_observed = history
            .last()
            .map(|(month, _)| *month)
            .ok_or_else(|| ForecastError::InsufficientData(format!("'{}' has no history", category)))?;

        debug!(category, months = history.len(), "fitting category model");

        let months: Vec<NaiveDate> = history.iter().map(|(m, _)| *m).collect();
        let target: Vec<f64> = history.iter().map(|(_, y)| *y).collect();
        let training = TrainingSet::new(lookup.regressors(category, &months)?, target)?;
        let trained = self.model.train(&training)?;

        let mut all_months = months;
        all_months.extend(future_month_ends(last_observed, horizon.months()));
        let prediction = trained.predict(&lookup.regressors(category, &all_months)?)?;

        let points = prediction
            .months()
            .iter()
            .zip(prediction.values())
            .zip(prediction.intervals())
            .map(|((&month, &estimate), &(lower, upper))| ForecastPoint {
                month,
                category: category.to_string(),
                estimate,
                lower,
                upper,
            })
            .collect();

        Ok(CategoryForecast {
            category: category.to_string(),
            last_observed,
            points,
        })
    }
}

impl Default for ForecastEngine {
    fn default() -> Self {
        Self {
            config: ForecastConfig::default(),
            model: TrendRegression::default(),
        }
    }
}
