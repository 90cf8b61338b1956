//! Pipeline configuration
//!
//! Every section deserializes with defaults for missing fields, so a config
//! file only needs to name what it changes:
//!
//! ```rust
//! use revenue_forecast::config::PipelineConfig;
//!
//! let config = PipelineConfig::from_json_str(r#"{ "horizon": 3 }"#).unwrap();
//! assert_eq!(config.horizon.months(), 3);
//! assert_eq!(config.forecast.model.interval_width, 0.8);
//! ```

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Number of future months to forecast, always within `1..=12`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "usize", into = "usize")]
pub struct Horizon(usize);

impl Horizon {
    /// Shortest allowed horizon
    pub const MIN: usize = 1;
    /// Longest allowed horizon
    pub const MAX: usize = 12;
    /// Horizon used by the dashboard pipeline when the caller picks none
    pub const PIPELINE_DEFAULT: Horizon = Horizon(6);

    /// Create a validated horizon
    pub fn new(months: usize) -> Result<Self> {
        if !(Self::MIN..=Self::MAX).contains(&months) {
            return Err(ForecastError::InvalidParameter(format!(
                "Horizon must be between {} and {} months, got {}",
                Self::MIN,
                Self::MAX,
                months
            )));
        }
        Ok(Self(months))
    }

    /// Number of months
    pub fn months(&self) -> usize {
        self.0
    }
}

impl Default for Horizon {
    /// The engine projects a full year unless told otherwise
    fn default() -> Self {
        Horizon(Self::MAX)
    }
}

impl TryFrom<usize> for Horizon {
    type Error = ForecastError;

    fn try_from(months: usize) -> Result<Self> {
        Horizon::new(months)
    }
}

impl From<Horizon> for usize {
    fn from(h: Horizon) -> usize {
        h.0
    }
}

/// What to do when a month precedes every available macro observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegressorGapPolicy {
    /// Fail the category with a missing-regressor diagnostic
    #[default]
    Reject,
    /// Use the first available macro value
    BackwardFill,
}

/// Whether the model includes yearly Fourier seasonality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeasonalityMode {
    /// Enabled when the training span covers at least two years
    #[default]
    Auto,
    Enabled,
    Disabled,
}

/// Regression model settings shared by forecasting and evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Ridge penalty on all coefficients except the intercept
    pub ridge: f64,
    /// Yearly seasonality switch
    pub yearly_seasonality: SeasonalityMode,
    /// Number of Fourier harmonics for the yearly cycle
    pub fourier_order: usize,
    /// Width of the uncertainty interval, e.g. 0.8 for an 80% interval
    pub interval_width: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            ridge: 1e-3,
            yearly_seasonality: SeasonalityMode::Auto,
            fourier_order: 3,
            interval_width: 0.8,
        }
    }
}

impl ModelConfig {
    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        if !self.ridge.is_finite() || self.ridge < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Ridge penalty must be finite and non-negative".to_string(),
            ));
        }
        if !(1..=6).contains(&self.fourier_order) {
            return Err(ForecastError::InvalidParameter(format!(
                "Fourier order must be between 1 and 6, got {}",
                self.fourier_order
            )));
        }
        validate_fraction("interval_width", self.interval_width)
    }
}

/// Forecast engine settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Model settings
    pub model: ModelConfig,
    /// Handling of months before the first macro observation
    pub regressor_gap: RegressorGapPolicy,
    /// Fit categories on the rayon pool
    pub parallel: bool,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            regressor_gap: RegressorGapPolicy::Reject,
            parallel: true,
        }
    }
}

impl ForecastConfig {
    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        self.model.validate()
    }
}

/// Rolling-origin evaluation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Share of the day span used as the first training window
    pub initial_fraction: f64,
    /// Share of the day span forecast after each cutoff
    pub horizon_fraction: f64,
    /// Share of the day span between successive cutoffs
    pub period_fraction: f64,
    /// Days counted per calendar month when sizing windows
    pub days_per_month: i64,
    /// Model settings for the evaluation fits (no regressors)
    pub model: ModelConfig,
    /// Evaluate categories on the rayon pool
    pub parallel: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            initial_fraction: 0.6,
            horizon_fraction: 0.2,
            period_fraction: 0.2,
            days_per_month: 30,
            model: ModelConfig::default(),
            parallel: true,
        }
    }
}

impl EvaluationConfig {
    /// Check ranges
    pub fn validate(&self) -> Result<()> {
        validate_fraction("initial_fraction", self.initial_fraction)?;
        validate_fraction("horizon_fraction", self.horizon_fraction)?;
        validate_fraction("period_fraction", self.period_fraction)?;
        if self.days_per_month <= 0 {
            return Err(ForecastError::InvalidParameter(
                "days_per_month must be positive".to_string(),
            ));
        }
        self.model.validate()
    }
}

/// Settings for one pipeline invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Future months to forecast per category
    pub horizon: Horizon,
    /// Forecast engine settings
    pub forecast: ForecastConfig,
    /// Evaluator settings
    pub evaluation: EvaluationConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            horizon: Horizon::PIPELINE_DEFAULT,
            forecast: ForecastConfig::default(),
            evaluation: EvaluationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Same settings with a different horizon
    pub fn with_horizon(mut self, horizon: Horizon) -> Self {
        self.horizon = horizon;
        self
    }

    /// Run every category sequentially
    pub fn sequential(mut self) -> Self {
        self.forecast.parallel = false;
        self.evaluation.parallel = false;
        self
    }

    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.forecast.validate()?;
        self.evaluation.validate()
    }
}

fn validate_fraction(name: &str, value: f64) -> Result<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "{} must be strictly between 0 and 1, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_bounds() {
        assert!(Horizon::new(0).is_err());
        assert!(Horizon::new(13).is_err());
        assert_eq!(Horizon::new(1).unwrap().months(), 1);
        assert_eq!(Horizon::default().months(), 12);
        assert_eq!(PipelineConfig::default().horizon.months(), 6);
    }

    #[test]
    fn horizon_out_of_range_fails_deserialization() {
        assert!(PipelineConfig::from_json_str(r#"{ "horizon": 24 }"#).is_err());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json_str(
            r#"{ "forecast": { "regressor_gap": "backward_fill" } }"#,
        )
        .unwrap();
        assert_eq!(config.forecast.regressor_gap, RegressorGapPolicy::BackwardFill);
        assert_eq!(config.evaluation.initial_fraction, 0.6);
    }

    #[test]
    fn invalid_fraction_is_rejected() {
        let result = PipelineConfig::from_json_str(r#"{ "evaluation": { "horizon_fraction": 1.5 } }"#);
        assert!(matches!(result, Err(ForecastError::InvalidParameter(_))));
    }

    #[test]
    fn config_loads_from_json_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "horizon": 9, "forecast": {{ "parallel": false }} }}"#).unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.horizon.months(), 9);
        assert!(!config.forecast.parallel);

        let missing = PipelineConfig::from_json_file(file.path().with_extension("absent"));
        assert!(matches!(missing, Err(ForecastError::IoError(_))));
    }
}

