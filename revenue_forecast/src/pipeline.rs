//! End-to-end forecasting pipeline
//!
//! One invocation validates the input tables, aggregates them to monthly
//! series, forecasts every category, joins forecasts with history and
//! cross-validates every category. Input problems abort the run; problems
//! with a single category are collected as [`CategoryFailure`]s.

use crate::aggregate::{aggregate_macro, aggregate_revenue, MonthlySeries};
use crate::config::{Horizon, PipelineConfig};
use crate::data::{MacroRecord, MacroTable, RevenueTable, Transaction};
use crate::error::{ForecastError, Result};
use crate::evaluate::{CvPoint, Evaluator, PerformanceTable};
use crate::forecast::{CategoryForecast, ForecastEngine};
use crate::reconcile::{reconcile, CombinedTimeline};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, info_span, warn};

/// Pipeline stage in which a category failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    Forecast,
    Evaluation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Forecast => write!(f, "forecast"),
            Stage::Evaluation => write!(f, "evaluation"),
        }
    }
}

/// A category skipped by one stage, with the reason
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFailure {
    pub category: String,
    pub stage: Stage,
    pub reason: String,
}

impl CategoryFailure {
    pub fn new(category: impl Into<String>, stage: Stage, error: &ForecastError) -> Self {
        Self {
            category: category.into(),
            stage,
            reason: error.to_string(),
        }
    }
}

impl fmt::Display for CategoryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed for '{}': {}", self.stage, self.category, self.reason)
    }
}

/// Whether every category made it through every stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStatus {
    Complete,
    /// Some categories were skipped; see the diagnostics
    Partial,
    /// Forecasts exist but no category could be cross-validated
    NoPerformance,
}

/// Everything one pipeline run produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    /// Horizon the forecasts were made with
    pub horizon: Horizon,
    /// Aggregated monthly history
    pub history: MonthlySeries,
    /// Fitted and projected points per category
    pub forecasts: BTreeMap<String, CategoryForecast>,
    /// History joined with forecasts
    pub timeline: CombinedTimeline,
    /// Cross-validation metrics of every evaluated category
    pub performance: PerformanceTable,
    /// Raw cross-validation predictions per category
    pub cv: BTreeMap<String, Vec<CvPoint>>,
    /// Categories skipped by the forecast or evaluation stage
    pub diagnostics: Vec<CategoryFailure>,
}

impl PipelineOutput {
    /// False when every category failed evaluation and `performance` is empty
    pub fn performance_available(&self) -> bool {
        !self.performance.is_empty()
    }

    pub fn status(&self) -> PipelineStatus {
        if !self.performance_available() {
            PipelineStatus::NoPerformance
        } else if self.diagnostics.is_empty() {
            PipelineStatus::Complete
        } else {
            PipelineStatus::Partial
        }
    }
}

/// Forecasting pipeline with fixed settings
#[derive(Debug, Clone)]
pub struct ForecastPipeline {
    config: PipelineConfig,
    engine: ForecastEngine,
    evaluator: Evaluator,
}

impl ForecastPipeline {
    /// Build a pipeline after validating `config`
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            engine: ForecastEngine::new(config.forecast.clone())?,
            evaluator: Evaluator::new(config.evaluation.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run on validated input tables
    pub fn run(&self, revenue: &RevenueTable, macros: &MacroTable) -> Result<PipelineOutput> {
        self.run_records(&revenue.transactions()?, &macros.records()?)
    }

    /// Run on typed records
    pub fn run_records(
        &self,
        transactions: &[Transaction],
        macros: &[MacroRecord],
    ) -> Result<PipelineOutput> {
        let horizon = self.config.horizon;
        let span = info_span!("forecast_pipeline", horizon = horizon.months());
        let _guard = span.enter();

        if transactions.is_empty() {
            return Err(ForecastError::EmptyInput("no revenue transactions".to_string()));
        }
        if macros.is_empty() {
            return Err(ForecastError::EmptyInput("no macro records".to_string()));
        }

        let history = aggregate_revenue(transactions);
        let monthly_macro = aggregate_macro(macros);
        info!(
            transactions = transactions.len(),
            points = history.len(),
            macro_months = monthly_macro.len(),
            "aggregated input"
        );

        let run = self.engine.forecast(&history, &monthly_macro, horizon);
        if run.is_empty() {
            warn!(failures = run.failures.len(), "no category produced a forecast");
            return Err(ForecastError::NoResults {
                failures: run.failures,
            });
        }

        let timeline = reconcile(&history, &run);
        let evaluation = self.evaluator.evaluate(&history);

        let mut diagnostics = run.failures;
        diagnostics.extend(evaluation.failures);
        if evaluation.performance.is_empty() {
            warn!(failures = diagnostics.len(), "no category could be evaluated");
        }

        info!(
            forecasts = run.forecasts.len(),
            timeline_rows = timeline.len(),
            performance_rows = evaluation.performance.len(),
            diagnostics = diagnostics.len(),
            "pipeline finished"
        );

        Ok(PipelineOutput {
            horizon,
            history,
            forecasts: run.forecasts,
            timeline,
            performance: evaluation.performance,
            cv: evaluation.cv,
            diagnostics,
        })
    }
}

/// Run the pipeline with default settings and the given horizon
pub fn run_forecasting_pipeline(
    revenue: &RevenueTable,
    macros: &MacroTable,
    horizon: Horizon,
) -> Result<PipelineOutput> {
    ForecastPipeline::new(PipelineConfig::default().with_horizon(horizon))?.run(revenue, macros)
}
