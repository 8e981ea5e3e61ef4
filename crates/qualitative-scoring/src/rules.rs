use screener_core::metrics;
use screener_core::Candidate;

use crate::NEUTRAL_SCORE;

pub const TEMPORARY_LAG_FACTOR: &str = "temporary_lag_factor";
pub const GROWTH_DRIVER_CONFIDENCE: &str = "growth_driver_confidence";
pub const MANAGEMENT_AND_CAPITAL_POLICY: &str = "management_and_capital_policy";
pub const COMPETITIVE_ADVANTAGE: &str = "competitive_advantage";
pub const RISK_RESILIENCE: &str = "risk_resilience";

const PER_BANDS: [f64; 4] = [10.0, 15.0, 20.0, 30.0];
const PBR_BANDS: [f64; 4] = [0.8, 1.0, 1.5, 2.5];
const ROE_BANDS: [f64; 4] = [5.0, 8.0, 12.0, 15.0];
const REVENUE_CAGR_BANDS: [f64; 4] = [0.0, 3.0, 7.0, 12.0];
const OP_INCOME_CAGR_BANDS: [f64; 4] = [0.0, 5.0, 10.0, 20.0];
const DIVIDEND_YIELD_BANDS: [f64; 4] = [1.0, 2.0, 3.0, 4.0];
const EQUITY_RATIO_BANDS: [f64; 4] = [30.0, 40.0, 50.0, 60.0];
const NET_DE_BANDS: [f64; 4] = [0.0, 30.0, 60.0, 100.0];
const TURNOVER_BANDS: [f64; 4] = [1.0e8, 5.0e8, 2.0e9, 1.0e10];

/// One metric-threshold lookup. Thresholds ascend.
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    /// value >= t1..t4 scores 2..5, below t1 scores 1
    Higher { metric: &'static str, thresholds: [f64; 4] },
    /// value <= t1..t4 scores 5..2, above t4 scores 1
    Lower { metric: &'static str, thresholds: [f64; 4] },
}

impl Lookup {
    pub fn metric(&self) -> &'static str {
        match self {
            Lookup::Higher { metric, .. } | Lookup::Lower { metric, .. } => *metric,
        }
    }

    pub fn points(&self, value: Option<f64>) -> f64 {
        let Some(v) = value else {
            return NEUTRAL_SCORE;
        };
        match self {
            Lookup::Higher { thresholds, .. } => {
                let passed = thresholds.iter().filter(|t| v >= **t).count();
                1.0 + passed as f64
            }
            Lookup::Lower { thresholds, .. } => match thresholds.iter().position(|t| v <= *t) {
                Some(i) => 5.0 - i as f64,
                None => 1.0,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct AxisRule {
    pub axis: &'static str,
    pub lookups: Vec<Lookup>,
}

impl AxisRule {
    fn new(axis: &'static str, lookups: &[Lookup]) -> Self {
        Self {
            axis,
            lookups: lookups.to_vec(),
        }
    }

    /// Mean of the lookup points
    pub fn score(&self, candidate: &Candidate) -> f64 {
        if self.lookups.is_empty() {
            return NEUTRAL_SCORE;
        }
        let sum: f64 = self
            .lookups
            .iter()
            .map(|l| l.points(candidate.metric(l.metric())))
            .sum();
        sum / self.lookups.len() as f64
    }
}

fn higher(metric: &'static str, thresholds: [f64; 4]) -> Lookup {
    Lookup::Higher { metric, thresholds }
}

fn lower(metric: &'static str, thresholds: [f64; 4]) -> Lookup {
    Lookup::Lower { metric, thresholds }
}

pub fn axis_rule(axis_id: &str) -> Option<AxisRule> {
    let rule = match axis_id {
        TEMPORARY_LAG_FACTOR => AxisRule::new(
            TEMPORARY_LAG_FACTOR,
            &[
                lower(metrics::PER, PER_BANDS),
                lower(metrics::PBR, PBR_BANDS),
                higher(metrics::ROE, ROE_BANDS),
            ],
        ),
        GROWTH_DRIVER_CONFIDENCE => AxisRule::new(
            GROWTH_DRIVER_CONFIDENCE,
            &[
                higher(metrics::REVENUE_CAGR_3Y, REVENUE_CAGR_BANDS),
                higher(metrics::OP_INCOME_CAGR_3Y, OP_INCOME_CAGR_BANDS),
                higher(metrics::ROE, ROE_BANDS),
            ],
        ),
        MANAGEMENT_AND_CAPITAL_POLICY => AxisRule::new(
            MANAGEMENT_AND_CAPITAL_POLICY,
            &[
                higher(metrics::ROE, ROE_BANDS),
                higher(metrics::DIVIDEND_YIELD, DIVIDEND_YIELD_BANDS),
                higher(metrics::EQUITY_RATIO, EQUITY_RATIO_BANDS),
            ],
        ),
        COMPETITIVE_ADVANTAGE => AxisRule::new(
            COMPETITIVE_ADVANTAGE,
            &[
                higher(metrics::ROE, ROE_BANDS),
                higher(metrics::OP_INCOME_CAGR_3Y, OP_INCOME_CAGR_BANDS),
                higher(metrics::PBR, PBR_BANDS),
            ],
        ),
        RISK_RESILIENCE => AxisRule::new(
            RISK_RESILIENCE,
            &[
                higher(metrics::EQUITY_RATIO, EQUITY_RATIO_BANDS),
                lower(metrics::NET_DE_RATIO, NET_DE_BANDS),
                higher(metrics::AVG_TURNOVER_20D, TURNOVER_BANDS),
            ],
        ),
        _ => return None,
    };
    Some(rule)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_higher_lookup_boundaries() {
        let l = higher("roe", ROE_BANDS);
        assert_eq!(l.points(Some(4.9)), 1.0);
        assert_eq!(l.points(Some(5.0)), 2.0);
        assert_eq!(l.points(Some(8.0)), 3.0);
        assert_eq!(l.points(Some(12.0)), 4.0);
        assert_eq!(l.points(Some(15.0)), 5.0);
        assert_eq!(l.points(Some(99.0)), 5.0);
        assert_eq!(l.points(None), NEUTRAL_SCORE);
    }

    #[test]
    fn test_lower_lookup_boundaries() {
        let l = lower("per", PER_BANDS);
        assert_eq!(l.points(Some(3.0)), 5.0);
        assert_eq!(l.points(Some(10.0)), 5.0);
        assert_eq!(l.points(Some(12.0)), 4.0);
        assert_eq!(l.points(Some(20.0)), 3.0);
        assert_eq!(l.points(Some(30.0)), 2.0);
        assert_eq!(l.points(Some(30.1)), 1.0);
        assert_eq!(l.points(None), NEUTRAL_SCORE);
    }

    #[test]
    fn test_every_named_axis_has_three_lookups() {
        for axis in crate::PREFERRED_AXIS_ORDER {
            let rule = axis_rule(axis).unwrap();
            assert_eq!(rule.axis, axis);
            assert_eq!(rule.lookups.len(), 3);
        }
        assert!(axis_rule("news_sentiment").is_none());
    }

    #[test]
    fn test_risk_resilience_partial_data() {
        let c = Candidate::new("1", "n", "s")
            .with_metric("equity_ratio", 45.0)
            .with_metric("net_de_ratio", 20.0);
        // 3 + 4 + 2.5
        let score = axis_rule(RISK_RESILIENCE).unwrap().score(&c);
        assert!((score - 9.5 / 3.0).abs() < 1e-12);
    }
}
