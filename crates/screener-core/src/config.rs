//! Strategy file model and loader.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::{AxisDefinition, MetricDefinition, ScreeningError};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSource {
    pub provider: String,
    #[serde(default)]
    pub plan: String,
    #[serde(default)]
    pub constraints: BTreeMap<String, serde_yaml::Value>,
}

impl DataSource {
    /// String-valued constraint, ignoring blanks
    pub fn constraint_str(&self, key: &str) -> Option<&str> {
        self.constraints
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniverseConfig {
    pub market: String,
    #[serde(default)]
    pub min_avg_trading_value_20d_jpy: f64,
    #[serde(default)]
    pub min_market_cap_jpy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuantitativeConfig {
    #[serde(default = "default_normalization")]
    pub normalization: String,
    #[serde(default = "default_composite_method")]
    pub composite_method: String,
    pub top_n_candidates: usize,
    #[serde(default)]
    pub metrics: Vec<MetricDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualitativeConfig {
    #[serde(default = "default_scale_min")]
    pub scale_min: f64,
    #[serde(default = "default_scale_max")]
    pub scale_max: f64,
    #[serde(default = "default_composite_method")]
    pub composite_method: String,
    #[serde(default)]
    pub axes: Vec<AxisDefinition>,
}

impl QualitativeConfig {
    /// The scale must contain the 1-5 axis range so a weighted total stays under its maximum.
    pub fn validate(&self) -> Result<(), ScreeningError> {
        if !self.scale_min.is_finite() || !self.scale_max.is_finite() {
            return Err(ScreeningError::Config("qualitative scale bounds must be finite".to_string()));
        }
        if self.scale_min > AXIS_SCORE_MIN || self.scale_max < AXIS_SCORE_MAX {
            return Err(ScreeningError::Config(format!(
                "qualitative scale [{}, {}] must contain [{}, {}]",
                self.scale_min, self.scale_max, AXIS_SCORE_MIN, AXIS_SCORE_MAX
            )));
        }
        Ok(())
    }
}

/// Pass/fail gate on a single metric
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub metric: String,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    /// Exclude when the metric is unknown
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepDiveConfig {
    pub top_k: usize,
    #[serde(default = "default_news_lookback_days")]
    pub news_lookback_days: u32,
    #[serde(default)]
    pub require_refutation_check: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub required_env: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub version: u32,
    pub name: String,
    #[serde(default = "default_mode")]
    pub mode: String,
    pub data_sources: BTreeMap<String, DataSource>,
    pub universe: UniverseConfig,
    pub quantitative: QuantitativeConfig,
    pub qualitative: QualitativeConfig,
    #[serde(default)]
    pub exclusion_rules: Vec<ExclusionRule>,
    pub deep_dive: DeepDiveConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub output: BTreeMap<String, serde_yaml::Value>,
}

pub const PRICES_AND_FUNDAMENTALS: &str = "prices_and_fundamentals";

/// Range every qualitative axis rule scores within
pub const AXIS_SCORE_MIN: f64 = 1.0;
pub const AXIS_SCORE_MAX: f64 = 5.0;

fn default_normalization() -> String {
    "percentile_rank".to_string()
}

fn default_composite_method() -> String {
    "weighted_sum".to_string()
}

fn default_scale_min() -> f64 {
    1.0
}

fn default_scale_max() -> f64 {
    5.0
}

fn default_news_lookback_days() -> u32 {
    30
}

fn default_mode() -> String {
    "free_first".to_string()
}

impl StrategyConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ScreeningError> {
        let config: Self = serde_yaml::from_str(text)
            .map_err(|e| ScreeningError::Config(format!("Invalid strategy config: {}", e)))?;
        config.qualitative.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScreeningError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        tracing::debug!("Loaded strategy '{}' from {}", config.name, path.display());
        Ok(config)
    }

    /// The data source that feeds prices and fundamentals
    pub fn prices_source(&self) -> Result<&DataSource, ScreeningError> {
        self.data_sources.get(PRICES_AND_FUNDAMENTALS).ok_or_else(|| {
            ScreeningError::Config(format!("data_sources.{} is missing", PRICES_AND_FUNDAMENTALS))
        })
    }

    /// Fail fast when an env var listed under `runtime.required_env` is unset or blank.
    pub fn check_required_env(&self) -> Result<(), ScreeningError> {
        for name in &self.runtime.required_env {
            let present = std::env::var(name)
                .map(|v| !v.trim().is_empty())
                .unwrap_or(false);
            if !present {
                return Err(ScreeningError::MissingCredential(name.clone()));
            }
        }
        Ok(())
    }
}
