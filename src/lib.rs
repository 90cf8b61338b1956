//! # Revenue Insight
//!
//! `revenue_insight` bundles the revenue forecasting pipeline and its numeric
//! kernels behind one dependency.
//!
//! ## Example
//!
//! ```
//! use revenue_insight::prelude::*;
//!
//! let horizon = Horizon::new(3).unwrap();
//! let config = PipelineConfig::default().with_horizon(horizon);
//! assert!(ForecastPipeline::new(config).is_ok());
//! ```

pub use forecast_math;
pub use revenue_forecast;

/// The types most callers need
pub mod prelude {
    pub use revenue_forecast::config::{Horizon, PipelineConfig, RegressorGapPolicy};
    pub use revenue_forecast::data::{MacroRecord, MacroTable, RevenueTable, Transaction};
    pub use revenue_forecast::pipeline::{
        run_forecasting_pipeline, CategoryFailure, ForecastPipeline, PipelineOutput, PipelineStatus,
    };
    pub use revenue_forecast::reconcile::{CombinedRow, CombinedTimeline};
    pub use revenue_forecast::report::{forecast_window, FilterOptions, SummaryMetrics, TimelineFilter};
    pub use revenue_forecast::{ForecastError, Result};
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn records() -> (Vec<Transaction>, Vec<MacroRecord>) {
        let day = |m: u32, d: u32| NaiveDate::from_ymd_opt(2023, m, d).unwrap();
        let revenue = [210.0, 225.0, 219.0, 240.0, 251.0, 262.0, 258.0, 275.0, 281.0];

        let transactions = revenue
            .iter()
            .enumerate()
            .flat_map(|(k, &total)| {
                let m = k as u32 + 1;
                vec![
                    Transaction::new(day(m, 4), total, 1.0, "Online"),
                    Transaction::new(day(m, 9), total / 10.0, 3.0, "Retail"),
                ]
            })
            .collect();
        let macros = (1..=9)
            .map(|m| MacroRecord::new(day(m, 1), 1.05 + m as f64 * 0.003, 2.4 - m as f64 * 0.05))
            .collect();

        (transactions, macros)
    }

    #[test]
    fn end_to_end_from_tables() {
        let (transactions, macros) = records();
        let revenue = RevenueTable::from_transactions(&transactions).unwrap();
        let macros = MacroTable::from_records(&macros).unwrap();

        let output = run_forecasting_pipeline(&revenue, &macros, Horizon::PIPELINE_DEFAULT).unwrap();

        assert_eq!(output.status(), PipelineStatus::Complete);
        assert_eq!(output.timeline.len(), 2 * (9 + 6));
        assert_relative_eq!(
            output.history.total_revenue(),
            transactions.iter().map(|t| t.revenue()).sum::<f64>(),
            max_relative = 1e-12
        );

        let df = output.performance.to_dataframe().unwrap();
        assert_eq!(df.height(), output.performance.len());
    }

    #[test]
    fn dashboard_filters_cover_every_stream() {
        let (transactions, macros) = records();
        let output = ForecastPipeline::new(PipelineConfig::default())
            .unwrap()
            .run_records(&transactions, &macros)
            .unwrap();

        let options = FilterOptions::from_timeline(&output.timeline);
        assert_eq!(options.categories, vec!["Online", "Retail"]);
        assert_eq!(options.years, vec![2023, 2024]);

        let retail = TimelineFilter::default().with_category("Retail").apply(&output.timeline);
        assert_eq!(forecast_window(&retail, output.horizon).len(), 6);
    }
}
