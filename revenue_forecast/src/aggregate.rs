//! Temporal aggregation of raw records into monthly series
//!
//! Revenue is summed per (month, category); macro indicators are averaged per
//! month. Months are stamped with their last calendar day. Months without
//! transactions for a category produce no point.

use crate::data::{MacroRecord, Transaction};
use crate::utils::month_end;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Summed revenue of one category in one month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyRevenue {
    /// Last day of the month
    pub month: NaiveDate,
    pub category: String,
    pub revenue: f64,
}

/// Averaged macro indicators of one month
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyMacro {
    /// Last day of the month
    pub month: NaiveDate,
    pub exchange_rate: f64,
    pub inflation_rate: f64,
}

/// Monthly revenue points ordered by (month, category)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    points: Vec<MonthlyRevenue>,
}

impl MonthlySeries {
    /// Build a series from points, sorting and merging duplicate keys by summation
    pub fn from_points(points: impl IntoIterator<Item = MonthlyRevenue>) -> Self {
        let mut sums: BTreeMap<(NaiveDate, String), f64> = BTreeMap::new();
        for point in points {
            *sums.entry((month_end(point.month), point.category)).or_insert(0.0) += point.revenue;
        }

        Self {
            points: sums
                .into_iter()
                .map(|((month, category), revenue)| MonthlyRevenue {
                    month,
                    category,
                    revenue,
                })
                .collect(),
        }
    }

    /// All points ordered by (month, category)
    pub fn points(&self) -> &[MonthlyRevenue] {
        &self.points
    }

    /// Distinct category labels in sorted order
    pub fn categories(&self) -> Vec<String> {
        self.points
            .iter()
            .map(|p| p.category.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// (month, revenue) pairs of one category in month order
    pub fn history(&self, category: &str) -> Vec<(NaiveDate, f64)> {
        self.points
            .iter()
            .filter(|p| p.category == category)
            .map(|p| (p.month, p.revenue))
            .collect()
    }

    /// Sum of revenue over every point
    pub fn total_revenue(&self) -> f64 {
        self.points.iter().map(|p| p.revenue).sum()
    }

    /// Number of points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Check if the series has no points
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Sum transaction revenue per (month, category)
pub fn aggregate_revenue(transactions: &[Transaction]) -> MonthlySeries {
    MonthlySeries::from_points(transactions.iter().map(|t| MonthlyRevenue {
        month: month_end(t.date),
        category: t.category.clone(),
        revenue: t.revenue(),
    }))
}

/// Average macro indicators per month, ordered by month
pub fn aggregate_macro(records: &[MacroRecord]) -> Vec<MonthlyMacro> {
    let mut buckets: BTreeMap<NaiveDate, (f64, f64, usize)> = BTreeMap::new();
    for record in records {
        let entry = buckets.entry(month_end(record.date)).or_insert((0.0, 0.0, 0));
        entry.0 += record.exchange_rate;
        entry.1 += record.inflation_rate;
        entry.2 += 1;
    }

    buckets
        .into_iter()
        .map(|(month, (rate_sum, inflation_sum, count))| MonthlyMacro {
            month,
            exchange_rate: rate_sum / count as f64,
            inflation_rate: inflation_sum / count as f64,
        })
        .collect()
}
