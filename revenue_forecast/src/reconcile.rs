//! Reconciliation of history and forecasts into one timeline
//!
//! The timeline is a full outer join on (month, category): a month that only
//! has history keeps empty forecast fields, a projected month keeps an empty
//! actual. No numbers are computed here.

use crate::aggregate::MonthlySeries;
use crate::data::{date_series, REVENUE_STREAM};
use crate::error::Result;
use crate::forecast::ForecastRun;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Month column of the combined table
pub const DATE: &str = "Date";
pub const ACTUAL_REVENUE: &str = "Actual Revenue";
pub const FORECASTED_REVENUE: &str = "Forecasted Revenue";
pub const LOWER_ESTIMATE: &str = "Lower Estimate";
pub const UPPER_ESTIMATE: &str = "Upper Estimate";

/// One (month, category) row of the combined timeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedRow {
    pub month: NaiveDate,
    pub category: String,
    pub actual: Option<f64>,
    pub forecast: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl CombinedRow {
    fn empty(month: NaiveDate, category: String) -> Self {
        Self {
            month,
            category,
            actual: None,
            forecast: None,
            lower: None,
            upper: None,
        }
    }

    /// Field-wise union, keeping `self`'s value where both sides have one
    fn absorb(&mut self, other: CombinedRow) {
        self.actual = self.actual.or(other.actual);
        self.forecast = self.forecast.or(other.forecast);
        self.lower = self.lower.or(other.lower);
        self.upper = self.upper.or(other.upper);
    }

    /// Actual revenue when known, else the forecast
    pub fn revenue(&self) -> Option<f64> {
        self.actual.or(self.forecast)
    }
}

/// Rows ordered by (month, category), one per key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedTimeline {
    rows: Vec<CombinedRow>,
}

impl CombinedTimeline {
    /// Build a timeline from rows, joining rows that share a key
    pub fn from_rows(rows: impl IntoIterator<Item = CombinedRow>) -> Self {
        let mut keyed: BTreeMap<(NaiveDate, String), CombinedRow> = BTreeMap::new();
        for row in rows {
            let key = (row.month, row.category.clone());
            match keyed.get_mut(&key) {
                Some(existing) => existing.absorb(row),
                None => {
                    keyed.insert(key, row);
                }
            }
        }

        Self {
            rows: keyed.into_values().collect(),
        }
    }

    /// History only
    pub fn from_actuals(series: &MonthlySeries) -> Self {
        Self::from_rows(series.points().iter().map(|p| CombinedRow {
            actual: Some(p.revenue),
            ..CombinedRow::empty(p.month, p.category.clone())
        }))
    }

    /// Forecasts only
    pub fn from_forecasts(run: &ForecastRun) -> Self {
        Self::from_rows(run.points().map(|p| CombinedRow {
            forecast: Some(p.estimate),
            lower: Some(p.lower),
            upper: Some(p.upper),
            ..CombinedRow::empty(p.month, p.category.clone())
        }))
    }

    /// Full outer join of two timelines on (month, category)
    pub fn merge(self, other: CombinedTimeline) -> Self {
        Self::from_rows(self.rows.into_iter().chain(other.rows))
    }

    pub fn rows(&self) -> &[CombinedRow] {
        &self.rows
    }

    /// Rows of one category in month order
    pub fn category(&self, category: &str) -> Vec<&CombinedRow> {
        self.rows.iter().filter(|r| r.category == category).collect()
    }

    /// Distinct categories in sorted order
    pub fn categories(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Render with the reporting column names
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let option_column = |name: &str, f: fn(&CombinedRow) -> Option<f64>| {
            Series::new(name, self.rows.iter().map(f).collect::<Vec<Option<f64>>>())
        };

        let df = DataFrame::new(vec![
            date_series(DATE, self.rows.iter().map(|r| r.month))?,
            Series::new(
                REVENUE_STREAM,
                self.rows.iter().map(|r| r.category.as_str()).collect::<Vec<&str>>(),
            ),
            option_column(ACTUAL_REVENUE, |r| r.actual),
            option_column(FORECASTED_REVENUE, |r| r.forecast),
            option_column(LOWER_ESTIMATE, |r| r.lower),
            option_column(UPPER_ESTIMATE, |r| r.upper),
        ])?;
        Ok(df)
    }
}

/// Join the monthly history with every category's forecast
pub fn reconcile(series: &MonthlySeries, run: &ForecastRun) -> CombinedTimeline {
    CombinedTimeline::from_actuals(series).merge(CombinedTimeline::from_forecasts(run))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::MonthlyRevenue;
    use crate::forecast::{CategoryForecast, ForecastPoint};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn run_with(points: &[(NaiveDate, &str, f64)], last_observed: NaiveDate) -> ForecastRun {
        let mut run = ForecastRun::default();
        for &(month, category, estimate) in points {
            run.forecasts
                .entry(category.to_string())
                .or_insert_with(|| CategoryForecast {
                    category: category.to_string(),
                    last_observed,
                    points: Vec::new(),
                })
                .points
                .push(ForecastPoint {
                    month,
                    category: category.to_string(),
                    estimate,
                    lower: estimate - 1.0,
                    upper: estimate + 1.0,
                });
        }
        run
    }

    #[test]
    fn outer_join_keeps_one_sided_rows() {
        let series = MonthlySeries::from_points(vec![MonthlyRevenue {
            month: d(2023, 1, 31),
            category: "Online".to_string(),
            revenue: 10.0,
        }]);
        let run = run_with(
            &[(d(2023, 1, 31), "Online", 9.5), (d(2023, 2, 28), "Online", 11.0)],
            d(2023, 1, 31),
        );

        let timeline = reconcile(&series, &run);
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline.rows()[0].actual, Some(10.0));
        assert_eq!(timeline.rows()[0].forecast, Some(9.5));
        assert_eq!(timeline.rows()[1].actual, None);
        assert_eq!(timeline.rows()[1].upper, Some(12.0));
    }

    #[test]
    fn dataframe_uses_reporting_names() {
        let run = run_with(&[(d(2023, 2, 28), "Retail", 3.0)], d(2023, 1, 31));
        let df = CombinedTimeline::from_forecasts(&run).to_dataframe().unwrap();

        assert_eq!(
            df.get_column_names(),
            vec![
                DATE,
                REVENUE_STREAM,
                ACTUAL_REVENUE,
                FORECASTED_REVENUE,
                LOWER_ESTIMATE,
                UPPER_ESTIMATE
            ]
        );
        assert_eq!(df.column(ACTUAL_REVENUE).unwrap().null_count(), 1);
        assert_eq!(df.column(DATE).unwrap().dtype(), &DataType::Date);
    }
}
