//! Calendar utilities for monthly series

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y"];
// `%.f` also matches whole seconds
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Parse a calendar date from the textual forms found in exported sales sheets.
///
/// Time-of-day components are accepted and dropped.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

/// Last day of the month containing `date`
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .unwrap_or(date)
}

/// Whether `date` is the terminal day of its calendar month
pub fn is_month_end(date: NaiveDate) -> bool {
    month_end(date) == date
}

/// Month end `months` calendar months after the month of `date`
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let index = month_index(date) + months as i32;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;

    NaiveDate::from_ymd_opt(year, month, 1)
        .map(month_end)
        .unwrap_or(date)
}

/// Signed number of calendar months from `from` to `to`
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i32 {
    month_index(to) - month_index(from)
}

/// The `count` month ends following the month of `last`
pub fn future_month_ends(last: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (1..=count as u32).map(|k| add_months(last, k)).collect()
}

/// Days since 1970-01-01, used as the seasonality clock
pub fn days_since_epoch(date: NaiveDate) -> i64 {
    (date - NaiveDate::default()).num_days()
}

fn month_index(date: NaiveDate) -> i32 {
    date.year() * 12 + date.month0() as i32
}
