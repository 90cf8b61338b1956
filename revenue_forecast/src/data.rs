//! Tabular inputs for the forecasting pipeline
//!
//! Revenue and macro tables arrive as polars `DataFrame`s (or CSV files read
//! through polars). Column presence is checked when a table is created; cell
//! contents are checked when the table is converted to typed records.

use crate::error::{ForecastError, Result};
use crate::utils::parse_date;
use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

/// Transaction or observation date column
pub const ORDER_DATE: &str = "Order Date";
/// Price per unit column
pub const UNIT_PRICE: &str = "Unit Price";
/// Units sold column
pub const QUANTITY: &str = "Quantity";
/// Revenue stream label column
pub const REVENUE_STREAM: &str = "Revenue Stream";
/// Exchange rate column
pub const EXCHANGE_RATE: &str = "Exchange Rate";
/// Inflation rate column
pub const INFLATION_RATE: &str = "Inflation Rate";

/// One sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub date: NaiveDate,
    pub unit_price: f64,
    pub quantity: f64,
    /// Revenue stream label
    pub category: String,
}

impl Transaction {
    pub fn new(date: NaiveDate, unit_price: f64, quantity: f64, category: impl Into<String>) -> Self {
        Self {
            date,
            unit_price,
            quantity,
            category: category.into(),
        }
    }

    /// Unit price times quantity
    pub fn revenue(&self) -> f64 {
        self.unit_price * self.quantity
    }
}

/// One macroeconomic observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MacroRecord {
    pub date: NaiveDate,
    pub exchange_rate: f64,
    pub inflation_rate: f64,
}

impl MacroRecord {
    pub fn new(date: NaiveDate, exchange_rate: f64, inflation_rate: f64) -> Self {
        Self {
            date,
            exchange_rate,
            inflation_rate,
        }
    }
}

/// Revenue table with validated columns
#[derive(Debug, Clone)]
pub struct RevenueTable {
    df: DataFrame,
}

impl RevenueTable {
    /// Columns every revenue table must carry
    pub const REQUIRED_COLUMNS: [&'static str; 4] = [ORDER_DATE, UNIT_PRICE, QUANTITY, REVENUE_STREAM];

    /// Wrap a DataFrame after checking its columns
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        require_columns("revenue", &df, &Self::REQUIRED_COLUMNS)?;
        Ok(Self { df })
    }

    /// Load a revenue table from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_dataframe(read_csv(path)?)
    }

    /// Build a table from typed records
    pub fn from_transactions(transactions: &[Transaction]) -> Result<Self> {
        let dates = date_series(ORDER_DATE, transactions.iter().map(|t| t.date))?;
        let prices = Series::new(
            UNIT_PRICE,
            transactions.iter().map(|t| t.unit_price).collect::<Vec<f64>>(),
        );
        let quantities = Series::new(
            QUANTITY,
            transactions.iter().map(|t| t.quantity).collect::<Vec<f64>>(),
        );
        let streams = Series::new(
            REVENUE_STREAM,
            transactions
                .iter()
                .map(|t| t.category.as_str())
                .collect::<Vec<&str>>(),
        );

        Self::from_dataframe(DataFrame::new(vec![dates, prices, quantities, streams])?)
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Convert every row to a [`Transaction`]
    pub fn transactions(&self) -> Result<Vec<Transaction>> {
        let dates = date_column(&self.df, ORDER_DATE)?;
        let prices = f64_column(&self.df, UNIT_PRICE)?;
        let quantities = f64_column(&self.df, QUANTITY)?;
        let categories = text_column(&self.df, REVENUE_STREAM)?;

        Ok(dates
            .into_iter()
            .zip(prices)
            .zip(quantities)
            .zip(categories)
            .map(|(((date, unit_price), quantity), category)| Transaction {
                date,
                unit_price,
                quantity,
                category,
            })
            .collect())
    }
}

/// Macro indicator table with validated columns
#[derive(Debug, Clone)]
pub struct MacroTable {
    df: DataFrame,
}

impl MacroTable {
    /// Columns every macro table must carry
    pub const REQUIRED_COLUMNS: [&'static str; 3] = [ORDER_DATE, EXCHANGE_RATE, INFLATION_RATE];

    /// Wrap a DataFrame after checking its columns
    pub fn from_dataframe(df: DataFrame) -> Result<Self> {
        require_columns("macro", &df, &Self::REQUIRED_COLUMNS)?;
        Ok(Self { df })
    }

    /// Load a macro table from a CSV file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_dataframe(read_csv(path)?)
    }

    /// Build a table from typed records
    pub fn from_records(records: &[MacroRecord]) -> Result<Self> {
        let dates = date_series(ORDER_DATE, records.iter().map(|r| r.date))?;
        let rates = Series::new(
            EXCHANGE_RATE,
            records.iter().map(|r| r.exchange_rate).collect::<Vec<f64>>(),
        );
        let inflation = Series::new(
            INFLATION_RATE,
            records.iter().map(|r| r.inflation_rate).collect::<Vec<f64>>(),
        );

        Self::from_dataframe(DataFrame::new(vec![dates, rates, inflation])?)
    }

    /// Get the DataFrame
    pub fn dataframe(&self) -> &DataFrame {
        &self.df
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.df.height()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.df.height() == 0
    }

    /// Convert every row to a [`MacroRecord`]
    pub fn records(&self) -> Result<Vec<MacroRecord>> {
        let dates = date_column(&self.df, ORDER_DATE)?;
        let rates = f64_column(&self.df, EXCHANGE_RATE)?;
        let inflation = f64_column(&self.df, INFLATION_RATE)?;

        Ok(dates
            .into_iter()
            .zip(rates)
            .zip(inflation)
            .map(|((date, exchange_rate), inflation_rate)| MacroRecord {
                date,
                exchange_rate,
                inflation_rate,
            })
            .collect())
    }
}

fn read_csv<P: AsRef<Path>>(path: P) -> Result<DataFrame> {
    let file = File::open(path)?;
    let df = CsvReader::new(file)
        .infer_schema(None)
        .has_header(true)
        .finish()?;
    Ok(df)
}

fn require_columns(table: &'static str, df: &DataFrame, required: &[&str]) -> Result<()> {
    let present: HashSet<&str> = df.get_column_names().into_iter().collect();
    let mut missing: Vec<String> = required
        .iter()
        .filter(|name| !present.contains(**name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        return Ok(());
    }

    missing.sort();
    Err(ForecastError::MissingColumns {
        table,
        columns: missing,
    })
}

pub(crate) fn date_series(name: &str, dates: impl Iterator<Item = NaiveDate>) -> Result<Series> {
    let epoch = NaiveDate::default();
    let days: Vec<i32> = dates.map(|d| (d - epoch).num_days() as i32).collect();
    Ok(Series::new(name, days).cast(&DataType::Date)?)
}

/// Read a date column stored either as a temporal type or as text.
///
/// Row numbers in errors are 1-based data rows (header excluded).
fn date_column(df: &DataFrame, name: &str) -> Result<Vec<NaiveDate>> {
    let col = df.column(name)?;
    let epoch = NaiveDate::default();

    match col.dtype() {
        DataType::Date | DataType::Datetime(_, _) => {
            let days = col.cast(&DataType::Date)?.cast(&DataType::Int32)?;
            let chunked = days.i32()?;
            chunked
                .into_iter()
                .enumerate()
                .map(|(idx, value)| {
                    value
                        .and_then(|d| epoch.checked_add_signed(Duration::days(d as i64)))
                        .ok_or_else(|| malformed_date(name, idx, "null"))
                })
                .collect()
        }
        DataType::Utf8 => col
            .utf8()?
            .into_iter()
            .enumerate()
            .map(|(idx, value)| {
                let raw = value.unwrap_or("");
                parse_date(raw).ok_or_else(|| malformed_date(name, idx, raw))
            })
            .collect(),
        other => Err(ForecastError::InvalidValue {
            column: name.to_string(),
            row: 1,
            reason: format!("unsupported date column type {}", other),
        }),
    }
}

fn f64_column(df: &DataFrame, name: &str) -> Result<Vec<f64>> {
    let values = df.column(name)?.cast(&DataType::Float64)?;
    let chunked = values.f64()?;

    chunked
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Some(v) if v.is_finite() => Ok(v),
            Some(v) => Err(ForecastError::InvalidValue {
                column: name.to_string(),
                row: idx + 1,
                reason: format!("non-finite number {}", v),
            }),
            None => Err(ForecastError::InvalidValue {
                column: name.to_string(),
                row: idx + 1,
                reason: "missing or non-numeric value".to_string(),
            }),
        })
        .collect()
}

fn text_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let values = df.column(name)?.cast(&DataType::Utf8)?;
    let chunked = values.utf8()?;

    chunked
        .into_iter()
        .enumerate()
        .map(|(idx, value)| match value {
            Some(label) if !label.trim().is_empty() => Ok(label.to_string()),
            _ => Err(ForecastError::InvalidValue {
                column: name.to_string(),
                row: idx + 1,
                reason: "missing label".to_string(),
            }),
        })
        .collect()
}

fn malformed_date(column: &str, idx: usize, value: &str) -> ForecastError {
    ForecastError::MalformedDate {
        column: column.to_string(),
        row: idx + 1,
        value: value.to_string(),
    }
}
