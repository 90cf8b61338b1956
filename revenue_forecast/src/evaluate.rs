//! Rolling-origin cross-validation per category
//!
//! Windows are sized in elapsed days from each category's own history:
//! `total_days` is the number of calendar months between the first and last
//! observation times `days_per_month`, and the initial, horizon and period
//! windows are fixed fractions of it. Cutoffs are placed by date arithmetic,
//! so gaps in a monthly series shift the windows instead of breaking them.
//!
//! Each cutoff refits a [`TrendRegression`] without macro regressors on the
//! months up to the cutoff and predicts the months inside the horizon after
//! it. Errors are summarized per (category, horizon in days).

use crate::aggregate::MonthlySeries;
use crate::config::EvaluationConfig;
use crate::data::REVENUE_STREAM;
use crate::error::{ForecastError, Result};
use crate::metrics::forecast_accuracy;
use crate::models::regression::TrendRegression;
use crate::models::{FeatureFrame, ForecastModel, TrainedForecastModel, TrainingSet};
use crate::pipeline::{CategoryFailure, Stage};
use crate::utils::months_between;
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// One out-of-sample prediction made from a cutoff
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CvPoint {
    pub category: String,
    /// Last month available to the fit
    pub cutoff: NaiveDate,
    /// Predicted month
    pub month: NaiveDate,
    pub actual: f64,
    pub estimate: f64,
    pub lower: f64,
    pub upper: f64,
}

impl CvPoint {
    /// Days between the cutoff and the predicted month
    pub fn horizon_days(&self) -> i64 {
        (self.month - self.cutoff).num_days()
    }
}

/// Error summary of one category at one horizon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    pub category: String,
    pub horizon_days: i64,
    /// Number of predictions summarized
    pub observations: usize,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub mape: Option<f64>,
    pub mdape: Option<f64>,
    pub smape: f64,
    pub coverage: f64,
}

/// Performance rows of every evaluated category, ordered by (category, horizon)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTable {
    records: Vec<PerformanceRecord>,
}

impl PerformanceTable {
    pub fn new(mut records: Vec<PerformanceRecord>) -> Self {
        records.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then(a.horizon_days.cmp(&b.horizon_days))
        });
        Self { records }
    }

    pub fn records(&self) -> &[PerformanceRecord] {
        &self.records
    }

    /// Rows of one category
    pub fn category(&self, category: &str) -> Vec<&PerformanceRecord> {
        self.records.iter().filter(|r| r.category == category).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Render as a DataFrame tagged with the revenue stream column
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let float = |name: &str, f: fn(&PerformanceRecord) -> f64| {
            Series::new(name, self.records.iter().map(f).collect::<Vec<f64>>())
        };
        let optional = |name: &str, f: fn(&PerformanceRecord) -> Option<f64>| {
            Series::new(name, self.records.iter().map(f).collect::<Vec<Option<f64>>>())
        };

        let df = DataFrame::new(vec![
            Series::new(
                REVENUE_STREAM,
                self.records.iter().map(|r| r.category.as_str()).collect::<Vec<&str>>(),
            ),
            Series::new(
                "horizon_days",
                self.records.iter().map(|r| r.horizon_days).collect::<Vec<i64>>(),
            ),
            Series::new(
                "observations",
                self.records.iter().map(|r| r.observations as u32).collect::<Vec<u32>>(),
            ),
            float("mse", |r| r.mse),
            float("rmse", |r| r.rmse),
            float("mae", |r| r.mae),
            optional("mape", |r| r.mape),
            optional("mdape", |r| r.mdape),
            float("smape", |r| r.smape),
            float("coverage", |r| r.coverage),
        ])?;
        Ok(df)
    }
}

/// Output of one evaluator run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRun {
    /// Raw cross-validation predictions per category
    pub cv: BTreeMap<String, Vec<CvPoint>>,
    /// Stacked metrics of every evaluated category
    pub performance: PerformanceTable,
    /// Categories that could not be evaluated
    pub failures: Vec<CategoryFailure>,
}

/// Day-based window sizes of one category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvaluationWindows {
    pub initial: Duration,
    pub horizon: Duration,
    pub period: Duration,
}

impl EvaluationWindows {
    /// Windows for a history running from `first` to `last`
    pub fn for_span(first: NaiveDate, last: NaiveDate, config: &EvaluationConfig) -> Self {
        let total_days = months_between(first, last).max(0) as f64 * config.days_per_month as f64;
        let days = |fraction: f64| Duration::days((fraction * total_days).floor() as i64);

        Self {
            initial: days(config.initial_fraction),
            horizon: days(config.horizon_fraction),
            period: days(config.period_fraction),
        }
    }
}

/// Place evaluation cutoffs over the observed `months`, oldest first.
///
/// Starting one horizon before the last observation, cutoffs step back by one
/// period while they leave at least `initial` of history. A cutoff whose
/// horizon would contain no observation is moved to one horizon before the
/// latest observation at or before it. The oldest generated cutoff is dropped.
pub fn generate_cutoffs(months: &[NaiveDate], windows: &EvaluationWindows) -> Result<Vec<NaiveDate>> {
    let (first, last) = match (months.iter().min(), months.iter().max()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return Err(ForecastError::InsufficientData("No observations to evaluate".to_string())),
    };

    if windows.horizon <= Duration::zero() {
        return Err(ForecastError::InsufficientData(
            "History is too short for a non-zero evaluation horizon".to_string(),
        ));
    }
    if windows.period <= Duration::zero() {
        return Err(ForecastError::InsufficientData(
            "History is too short for a non-zero cutoff period".to_string(),
        ));
    }

    let mut cutoff = last - windows.horizon;
    if cutoff < first {
        return Err(ForecastError::InsufficientData(
            "History is shorter than the evaluation horizon".to_string(),
        ));
    }

    let mut cutoffs = vec![cutoff];
    while cutoff >= first + windows.initial {
        cutoff = cutoff - windows.period;

        let covered = months
            .iter()
            .any(|&m| m > cutoff && m <= cutoff + windows.horizon);
        if !covered && cutoff > first {
            if let Some(&closest) = months.iter().filter(|&&m| m <= cutoff).max() {
                cutoff = closest - windows.horizon;
            }
        }
        cutoffs.push(cutoff);
    }

    cutoffs.pop();
    if cutoffs.is_empty() {
        return Err(ForecastError::InsufficientData(
            "No cutoff leaves the initial training window; history is too short".to_string(),
        ));
    }

    cutoffs.reverse();
    Ok(cutoffs)
}

/// Rolling-origin evaluator
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: EvaluationConfig,
    model: TrendRegression,
}

impl Evaluator {
    /// Create an evaluator after validating its settings
    pub fn new(config: EvaluationConfig) -> Result<Self> {
        config.validate()?;
        let model = TrendRegression::new(config.model.clone())?;
        Ok(Self { config, model })
    }

    /// Cross-validate every category of `series`
    pub fn evaluate(&self, series: &MonthlySeries) -> EvaluationRun {
        let categories = series.categories();
        info!(categories = categories.len(), "evaluating revenue streams");

        let evaluate_one = |category: &String| {
            let outcome = self.evaluate_category(category, &series.history(category));
            (category.clone(), outcome)
        };

        let outcomes: Vec<(String, Result<Vec<CvPoint>>)> = if self.config.parallel {
            categories.par_iter().map(evaluate_one).collect()
        } else {
            categories.iter().map(evaluate_one).collect()
        };

        let mut run = EvaluationRun::default();
        let mut records = Vec::new();
        for (category, outcome) in outcomes {
            match outcome.and_then(|points| Ok((summarize(&category, &points)?, points))) {
                Ok((mut summary, points)) => {
                    records.append(&mut summary);
                    run.cv.insert(category, points);
                }
                Err(e) => {
                    warn!(category = %category, error = %e, "evaluation failed, skipping category");
                    run.failures.push(CategoryFailure::new(category, Stage::Evaluation, &e));
                }
            }
        }
        run.performance = PerformanceTable::new(records);
        run
    }

    /// Cross-validation predictions of one category
    pub fn evaluate_category(&self, category: &str, history: &[(NaiveDate, f64)]) -> Result<Vec<CvPoint>> {
        let months: Vec<NaiveDate> = history.iter().map(|(m, _)| *m).collect();
        let (first, last) = match (months.first(), months.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => {
                return Err(ForecastError::InsufficientData(format!(
                    "'{}' has no history",
                    category
                )))
            }
        };

        let windows = EvaluationWindows::for_span(first, last, &self.config);
        let cutoffs = generate_cutoffs(&months, &windows)?;
        debug!(
            category,
            cutoffs = cutoffs.len(),
            horizon_days = windows.horizon.num_days(),
            "placed evaluation cutoffs"
        );

        let mut points = Vec::new();
        for cutoff in cutoffs {
            let (train, test): (Vec<&(NaiveDate, f64)>, Vec<&(NaiveDate, f64)>) = history
                .iter()
                .filter(|(m, _)| *m <= cutoff + windows.horizon)
                .partition(|(m, _)| *m <= cutoff);

            if train.len() < 2 {
                return Err(ForecastError::InsufficientData(format!(
                    "Fewer than two observations before cutoff {}",
                    cutoff
                )));
            }

            let training = TrainingSet::new(
                FeatureFrame::new(train.iter().map(|(m, _)| *m).collect()),
                train.iter().map(|(_, y)| *y).collect(),
            )?;
            let trained = self.model.train(&training)?;
            let prediction =
                trained.predict(&FeatureFrame::new(test.iter().map(|(m, _)| *m).collect()))?;

            points.extend(
                test.iter()
                    .zip(prediction.values())
                    .zip(prediction.intervals())
                    .map(|((&&(month, actual), &estimate), &(lower, upper))| CvPoint {
                        category: category.to_string(),
                        cutoff,
                        month,
                        actual,
                        estimate,
                        lower,
                        upper,
                    }),
            );
        }

        Ok(points)
    }
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            config: EvaluationConfig::default(),
            model: TrendRegression::default(),
        }
    }
}

/// Metrics of one category grouped by horizon in days
fn summarize(category: &str, points: &[CvPoint]) -> Result<Vec<PerformanceRecord>> {
    let mut by_horizon: BTreeMap<i64, Vec<&CvPoint>> = BTreeMap::new();
    for point in points {
        by_horizon.entry(point.horizon_days()).or_default().push(point);
    }

    by_horizon
        .into_iter()
        .map(|(horizon_days, group)| {
            let estimates: Vec<f64> = group.iter().map(|p| p.estimate).collect();
            let actuals: Vec<f64> = group.iter().map(|p| p.actual).collect();
            let intervals: Vec<(f64, f64)> = group.iter().map(|p| (p.lower, p.upper)).collect();
            let accuracy = forecast_accuracy(&estimates, &actuals, &intervals)?;

            Ok(PerformanceRecord {
                category: category.to_string(),
                horizon_days,
                observations: accuracy.observations,
                mse: accuracy.mse,
                rmse: accuracy.rmse,
                mae: accuracy.mae,
                mape: accuracy.mape,
                mdape: accuracy.mdape,
                smape: accuracy.smape,
                coverage: accuracy.coverage,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::add_months;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn year_of_months() -> Vec<NaiveDate> {
        (0..12).map(|k| add_months(d(2023, 1, 31), k)).collect()
    }

    #[test]
    fn windows_scale_with_month_span() {
        let months = year_of_months();
        let windows = EvaluationWindows::for_span(months[0], months[11], &EvaluationConfig::default());

        assert_eq!(windows.initial, Duration::days(198));
        assert_eq!(windows.horizon, Duration::days(66));
        assert_eq!(windows.period, Duration::days(66));
    }

    #[test]
    fn cutoffs_for_a_year_of_history() {
        let months = year_of_months();
        let windows = EvaluationWindows::for_span(months[0], months[11], &EvaluationConfig::default());
        let cutoffs = generate_cutoffs(&months, &windows).unwrap();

        assert_eq!(cutoffs, vec![d(2023, 8, 21), d(2023, 10, 26)]);
    }

    #[test]
    fn empty_horizon_window_jumps_to_latest_observation() {
        // Gap between March and October
        let months = vec![
            d(2023, 1, 31),
            d(2023, 2, 28),
            d(2023, 3, 31),
            d(2023, 10, 31),
            d(2023, 11, 30),
            d(2023, 12, 31),
        ];
        let windows = EvaluationWindows {
            initial: Duration::days(10),
            horizon: Duration::days(40),
            period: Duration::days(40),
        };
        let cutoffs = generate_cutoffs(&months, &windows).unwrap();

        // Sep 2 has nothing in its window and moves to Mar 31 minus 40 days.
        // The final Jan 10 cutoff is dropped.
        assert_eq!(cutoffs, vec![d(2023, 2, 19), d(2023, 10, 12), d(2023, 11, 21)]);
    }

    #[test]
    fn two_months_cannot_be_evaluated() {
        let evaluator = Evaluator::default();
        let history = vec![(d(2023, 1, 31), 10.0), (d(2023, 2, 28), 12.0)];
        assert!(matches!(
            evaluator.evaluate_category("Tiny", &history),
            Err(ForecastError::InsufficientData(_))
        ));
    }

    #[test]
    fn single_month_has_zero_horizon() {
        let months = vec![d(2023, 1, 31)];
        let windows = EvaluationWindows::for_span(months[0], months[0], &EvaluationConfig::default());
        assert!(generate_cutoffs(&months, &windows).is_err());
    }
}
