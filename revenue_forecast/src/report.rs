//! Dashboard computations over the combined timeline
//!
//! Filtering, headline metrics, chart series and the forward forecast table
//! shown next to the chart. Every function works on rows borrowed from a
//! [`CombinedTimeline`] and performs no model fitting.

use crate::config::Horizon;
use crate::error::{ForecastError, Result};
use crate::reconcile::{CombinedRow, CombinedTimeline};
use crate::utils::add_months;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Calendar month names, January first
pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Values offered by the dashboard filters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Month names present, in calendar order
    pub months: Vec<String>,
    pub years: Vec<i32>,
    pub categories: Vec<String>,
}

impl FilterOptions {
    pub fn from_timeline(timeline: &CombinedTimeline) -> Self {
        let months: BTreeSet<u32> = timeline.rows().iter().map(|r| r.month.month()).collect();
        let years: BTreeSet<i32> = timeline.rows().iter().map(|r| r.month.year()).collect();

        Self {
            months: months
                .into_iter()
                .map(|m| MONTH_NAMES[(m - 1) as usize].to_string())
                .collect(),
            years: years.into_iter().collect(),
            categories: timeline.categories(),
        }
    }
}

/// Row filter; `None` in a field means "All"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimelineFilter {
    /// Calendar month, 1 to 12
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub category: Option<String>,
}

impl TimelineFilter {
    /// Restrict to a month given by its English name
    pub fn with_month_name(mut self, name: &str) -> Result<Self> {
        let index = MONTH_NAMES
            .iter()
            .position(|m| m.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| ForecastError::InvalidParameter(format!("Unknown month name '{}'", name)))?;
        self.month = Some(index as u32 + 1);
        Ok(self)
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn matches(&self, row: &CombinedRow) -> bool {
        self.month.map_or(true, |m| row.month.month() == m)
            && self.year.map_or(true, |y| row.month.year() == y)
            && self.category.as_deref().map_or(true, |c| row.category == c)
    }

    /// Matching rows in timeline order
    pub fn apply<'a>(&self, timeline: &'a CombinedTimeline) -> Vec<&'a CombinedRow> {
        timeline.rows().iter().filter(|r| self.matches(r)).collect()
    }
}

/// Direction of the growth rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Up,
    Down,
    Flat,
}

impl Trend {
    pub fn from_growth(growth_rate: f64) -> Self {
        if growth_rate > 0.0 {
            Trend::Up
        } else if growth_rate < 0.0 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }

    /// Arrow shown next to the growth rate
    pub fn symbol(&self) -> char {
        match self {
            Trend::Up => '↑',
            Trend::Down => '↓',
            Trend::Flat => '→',
        }
    }
}

/// Headline numbers for a set of rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryMetrics {
    /// Actual revenue where known, else the forecast, summed
    pub total_revenue: f64,
    /// 100 minus the mean absolute percentage error of the in-sample fit
    pub forecast_accuracy: f64,
    /// Percent change from the earliest to the latest revenue value
    pub growth_rate: f64,
    pub trend: Trend,
}

impl SummaryMetrics {
    pub fn compute(rows: &[&CombinedRow]) -> Self {
        let total_revenue: f64 = rows.iter().filter_map(|r| r.revenue()).sum();

        let ape: Vec<f64> = rows
            .iter()
            .filter_map(|r| match (r.actual, r.forecast) {
                (Some(a), Some(f)) if a != 0.0 => Some((f - a).abs() / a.abs() * 100.0),
                _ => None,
            })
            .collect();
        let forecast_accuracy = if ape.is_empty() {
            0.0
        } else {
            100.0 - ape.iter().sum::<f64>() / ape.len() as f64
        };

        let mut dated: Vec<(NaiveDate, f64)> = rows
            .iter()
            .filter_map(|r| r.revenue().map(|v| (r.month, v)))
            .collect();
        dated.sort_by_key(|(month, _)| *month);

        let growth_rate = match (dated.first(), dated.last()) {
            (Some(&(_, first)), Some(&(_, last))) if dated.len() >= 2 && first != 0.0 => {
                (last - first) / first * 100.0
            }
            _ => 0.0,
        };

        Self {
            total_revenue,
            forecast_accuracy,
            growth_rate,
            trend: Trend::from_growth(growth_rate),
        }
    }
}

/// One point of the revenue chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub month: NaiveDate,
    pub category: String,
    pub revenue: Option<f64>,
    /// Set only for months without actual revenue
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Revenue series in month order, with bounds only where nothing was observed
pub fn chart_points(rows: &[&CombinedRow]) -> Vec<ChartPoint> {
    let mut points: Vec<ChartPoint> = rows
        .iter()
        .map(|r| {
            let projected = r.actual.is_none();
            ChartPoint {
                month: r.month,
                category: r.category.clone(),
                revenue: r.revenue(),
                lower: r.lower.filter(|_| projected),
                upper: r.upper.filter(|_| projected),
            }
        })
        .collect();
    points.sort_by_key(|p| p.month);
    points
}

/// Rows of the forward forecast table.
///
/// With actuals present these are the `horizon` months following the latest
/// actual month; without any, every row carrying a forecast.
pub fn forecast_window<'a>(rows: &[&'a CombinedRow], horizon: Horizon) -> Vec<&'a CombinedRow> {
    let latest_actual = rows
        .iter()
        .filter(|r| r.actual.is_some())
        .map(|r| r.month)
        .max();

    let mut window: Vec<&CombinedRow> = match latest_actual {
        Some(latest) => {
            let start = add_months(latest, 1);
            let end = add_months(latest, horizon.months() as u32);
            rows.iter()
                .copied()
                .filter(|r| r.month >= start && r.month <= end)
                .collect()
        }
        None => rows.iter().copied().filter(|r| r.forecast.is_some()).collect(),
    };
    window.sort_by_key(|r| r.month);
    window
}
