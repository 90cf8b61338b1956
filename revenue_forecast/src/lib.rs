//! # Revenue Forecast
//!
//! Monthly revenue forecasting per revenue stream, with macroeconomic
//! indicators as exogenous regressors and rolling-origin cross-validation.
//!
//! ## Features
//!
//! - Revenue and macro tables from polars DataFrames, CSV files or typed records
//! - Temporal aggregation to month-end series per revenue stream
//! - One trend regression per stream with exchange rate and inflation regressors
//! - Forecasts with uncertainty bounds, joined with history into one timeline
//! - Rolling-origin evaluation with day-based windows per stream
//! - Dashboard summaries (filters, headline metrics, forecast window)
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::NaiveDate;
//! use revenue_forecast::config::{Horizon, PipelineConfig};
//! use revenue_forecast::data::{MacroRecord, Transaction};
//! use revenue_forecast::pipeline::ForecastPipeline;
//!
//! # fn main() -> revenue_forecast::error::Result<()> {
//! let day = |m| NaiveDate::from_ymd_opt(2023, m, 15).unwrap();
//!
//! let transactions: Vec<Transaction> = (1..=6)
//!     .map(|m| Transaction::new(day(m), 100.0 + 10.0 * (m - 1) as f64, 1.0, "Online"))
//!     .collect();
//! let macros: Vec<MacroRecord> = (1..=6).map(|m| MacroRecord::new(day(m), 1.0, 2.0)).collect();
//!
//! let pipeline = ForecastPipeline::new(PipelineConfig::default().with_horizon(Horizon::new(1)?))?;
//! let output = pipeline.run_records(&transactions, &macros)?;
//!
//! // Six months of history plus one projected month
//! assert_eq!(output.timeline.category("Online").len(), 7);
//! # Ok(())
//! # }
//! ```

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod utils;

// Re-export commonly used types
pub use crate::aggregate::{aggregate_macro, aggregate_revenue, MonthlyMacro, MonthlyRevenue, MonthlySeries};
pub use crate::config::{Horizon, PipelineConfig, RegressorGapPolicy};
pub use crate::data::{MacroRecord, MacroTable, RevenueTable, Transaction};
pub use crate::error::{ForecastError, Result};
pub use crate::evaluate::{Evaluator, PerformanceRecord, PerformanceTable};
pub use crate::forecast::{ForecastEngine, ForecastPoint, ForecastRun};
pub use crate::models::{ForecastModel, ForecastResult, TrainedForecastModel};
pub use crate::pipeline::{run_forecasting_pipeline, ForecastPipeline, PipelineOutput, PipelineStatus};
pub use crate::reconcile::{reconcile, CombinedRow, CombinedTimeline};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
