use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric id -> value. A missing key means "unknown", never zero.
pub type MetricMap = BTreeMap<String, f64>;

/// One listed instrument in the screening universe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniverseRow {
    pub ticker: String,
    pub company_name: String,
    pub sector: String,
}

/// Latest close and trailing average turnover for a ticker as of a date
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub latest_close: Option<f64>,
    pub avg_turnover: Option<f64>,
    /// Number of trading observations that went into `avg_turnover`
    pub observations: u32,
}

/// Which direction of a metric is favourable
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Better {
    #[default]
    Higher,
    Lower,
}

impl Better {
    pub fn higher_is_better(&self) -> bool {
        matches!(self, Better::Higher)
    }
}

/// Quantitative metric definition from the strategy file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDefinition {
    pub id: String,
    #[serde(default)]
    pub better: Better,
}

impl MetricDefinition {
    pub fn new(id: &str, better: Better) -> Self {
        Self {
            id: id.to_string(),
            better,
        }
    }
}

/// Qualitative axis and its weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisDefinition {
    pub id: String,
    #[serde(default = "default_axis_weight")]
    pub weight: f64,
}

fn default_axis_weight() -> f64 {
    1.0
}

impl AxisDefinition {
    pub fn new(id: &str, weight: f64) -> Self {
        Self {
            id: id.to_string(),
            weight,
        }
    }

    /// Axes with a zero, negative or non-finite weight take no part in scoring.
    pub fn is_active(&self) -> bool {
        self.weight.is_finite() && self.weight > 0.0
    }
}

/// A universe member flowing through the scoring stages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub ticker: String,
    pub company_name: String,
    pub sector: String,
    pub metrics: MetricMap,
    pub quantitative_score: f64,
    pub quantitative_score_price_now: f64,
    pub quantitative_score_fundamentals_base: f64,
    /// Axis id -> 1..5 score
    pub qualitative_scores: BTreeMap<String, f64>,
    pub qualitative_score_total: f64,
    pub qualitative_score_max: f64,
    pub qualitative_score_normalized: f64,
    pub composite_score: f64,
    pub excluded: bool,
    pub exclusion_reasons: Vec<String>,
}

impl Candidate {
    pub fn new(ticker: &str, company_name: &str, sector: &str) -> Self {
        Self {
            ticker: ticker.to_string(),
            company_name: company_name.to_string(),
            sector: sector.to_string(),
            metrics: MetricMap::new(),
            quantitative_score: 0.0,
            quantitative_score_price_now: 0.0,
            quantitative_score_fundamentals_base: 0.0,
            qualitative_scores: BTreeMap::new(),
            qualitative_score_total: 0.0,
            qualitative_score_max: 25.0,
            qualitative_score_normalized: 0.0,
            composite_score: 0.0,
            excluded: false,
            exclusion_reasons: Vec::new(),
        }
    }

    /// Builder-style helper used heavily by scoring tests
    pub fn with_metric(mut self, id: &str, value: f64) -> Self {
        if value.is_finite() {
            self.metrics.insert(id.to_string(), value);
        }
        self
    }

    /// Numeric value for a metric, if known
    pub fn metric(&self, id: &str) -> Option<f64> {
        self.metrics.get(id).copied().filter(|v| v.is_finite())
    }
}

impl From<&UniverseRow> for Candidate {
    fn from(row: &UniverseRow) -> Self {
        Candidate::new(&row.ticker, &row.company_name, &row.sector)
    }
}

/// Deep-dive output for one shortlisted candidate
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Recommendation {
    pub ticker: String,
    pub decision: String,
    pub reasons: Vec<String>,
    pub risks: Vec<String>,
    pub assumptions: Vec<String>,
    pub peer_strengths: Vec<String>,
    pub peer_weaknesses: Vec<String>,
    pub reevaluation_triggers: Vec<String>,
}

/// Output of one screening run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineResult {
    pub candidates: Vec<Candidate>,
    pub top_recommendations: Vec<Recommendation>,
}
