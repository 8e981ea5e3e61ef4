//! Qualitative axis scoring from quantitative proxies.
//!
//! Every axis is scored on a 1-5 scale by averaging a few threshold lookups
//! over candidate metrics. Unknown metrics and unknown axes score the
//! midpoint instead of failing the run.

use screener_core::{AxisDefinition, Candidate, AXIS_SCORE_MAX};

pub mod rules;

pub use rules::{axis_rule, AxisRule, Lookup};

/// Score for a missing metric or an axis without a rule
pub const NEUTRAL_SCORE: f64 = 2.5;

pub const DEFAULT_SCALE_MAX: f64 = AXIS_SCORE_MAX;

pub struct QualitativeScoringEngine {
    scale_max: f64,
}

impl QualitativeScoringEngine {
    /// A scale below the axis ceiling is raised to it so totals never exceed the maximum.
    pub fn new(scale_max: f64) -> Self {
        if scale_max.is_nan() || scale_max < AXIS_SCORE_MAX {
            tracing::warn!("Qualitative scale_max {} is below {}, raising it", scale_max, AXIS_SCORE_MAX);
            return Self { scale_max: AXIS_SCORE_MAX };
        }
        Self { scale_max }
    }

    pub fn scale_max(&self) -> f64 {
        self.scale_max
    }

    /// 1-5 score for one axis; 2.5 when the axis has no rule
    pub fn axis_score(&self, candidate: &Candidate, axis_id: &str) -> f64 {
        match axis_rule(axis_id) {
            Some(rule) => rule.score(candidate),
            None => NEUTRAL_SCORE,
        }
    }

    /// Fill axis scores, weighted total, maximum and normalized score.
    ///
    /// Axes with a non-positive or non-finite weight are ignored.
    pub fn score_candidates(&self, candidates: &mut [Candidate], axes: &[AxisDefinition]) {
        let active: Vec<&AxisDefinition> = axes.iter().filter(|a| a.is_active()).collect();
        if active.len() < axes.len() {
            tracing::debug!("Dropped {} axes with non-positive weight", axes.len() - active.len());
        }
        for axis in &active {
            if axis_rule(&axis.id).is_none() {
                tracing::warn!("No scoring rule for axis '{}', using neutral score", axis.id);
            }
        }

        let max_total: f64 = active.iter().map(|a| a.weight * self.scale_max).sum();

        for candidate in candidates.iter_mut() {
            candidate.qualitative_scores.clear();
            let mut total = 0.0;
            for axis in &active {
                let score = self.axis_score(candidate, &axis.id);
                candidate.qualitative_scores.insert(axis.id.clone(), score);
                total += axis.weight * score;
            }

            candidate.qualitative_score_total = total;
            candidate.qualitative_score_max = max_total;
            candidate.qualitative_score_normalized = normalize(total, max_total);
        }
    }
}

impl Default for QualitativeScoringEngine {
    fn default() -> Self {
        Self::new(DEFAULT_SCALE_MAX)
    }
}

/// `100 * total / max` clamped to [0, 100]; 0 when there is no maximum.
pub fn normalize(total: f64, max_total: f64) -> f64 {
    if max_total <= 0.0 || !max_total.is_finite() {
        return 0.0;
    }
    (100.0 * total / max_total).clamp(0.0, 100.0)
}

/// Axis ids in report order
pub const PREFERRED_AXIS_ORDER: [&str; 5] = [
    rules::TEMPORARY_LAG_FACTOR,
    rules::GROWTH_DRIVER_CONFIDENCE,
    rules::MANAGEMENT_AND_CAPITAL_POLICY,
    rules::COMPETITIVE_ADVANTAGE,
    rules::RISK_RESILIENCE,
];

/// Metrics any named rule reads; used to report data gaps
pub fn proxy_metrics(axis_id: &str) -> Vec<&'static str> {
    axis_rule(axis_id)
        .map(|rule| rule.lookups.iter().map(|l| l.metric()).collect())
        .unwrap_or_default()
}

/// Metrics the rules consume, deduplicated, in first-use order
pub fn all_proxy_metrics() -> Vec<&'static str> {
    let mut out: Vec<&'static str> = Vec::new();
    for axis in PREFERRED_AXIS_ORDER {
        for metric in proxy_metrics(axis) {
            if !out.contains(&metric) {
                out.push(metric);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn strong() -> Candidate {
        Candidate::new("7203", "Toyota", "輸送用機器")
            .with_metric("per", 8.0)
            .with_metric("pbr", 0.7)
            .with_metric("roe", 16.0)
            .with_metric("revenue_cagr_3y", 15.0)
            .with_metric("op_income_cagr_3y", 25.0)
            .with_metric("dividend_yield", 4.5)
            .with_metric("equity_ratio", 65.0)
            .with_metric("net_de_ratio", -10.0)
            .with_metric("avg_turnover_20d", 2.0e10)
    }

    fn default_axes() -> Vec<AxisDefinition> {
        PREFERRED_AXIS_ORDER.iter().map(|id| AxisDefinition::new(id, 1.0)).collect()
    }

    #[test]
    fn test_missing_metrics_score_midpoint() {
        let mut cands = vec![Candidate::new("1301", "Empty", "水産")];
        QualitativeScoringEngine::default().score_candidates(&mut cands, &default_axes());

        for score in cands[0].qualitative_scores.values() {
            assert_relative_eq!(*score, NEUTRAL_SCORE);
        }
        assert_relative_eq!(cands[0].qualitative_score_total, 12.5);
        assert_relative_eq!(cands[0].qualitative_score_max, 25.0);
        assert_relative_eq!(cands[0].qualitative_score_normalized, 50.0);
    }

    #[test]
    fn test_unknown_axis_is_neutral() {
        let engine = QualitativeScoringEngine::default();
        assert_relative_eq!(engine.axis_score(&strong(), "moat_from_vibes"), NEUTRAL_SCORE);
    }

    #[test]
    fn test_temporary_lag_factor_mixes_directions() {
        let engine = QualitativeScoringEngine::default();
        // per 8 -> 5, pbr 0.7 -> 5, roe 16 -> 5
        assert_relative_eq!(engine.axis_score(&strong(), "temporary_lag_factor"), 5.0);

        let c = Candidate::new("9999", "n", "s")
            .with_metric("per", 18.0)
            .with_metric("pbr", 3.0)
            .with_metric("roe", 9.0);
        // per 18 -> 3, pbr 3.0 -> 1, roe 9 -> 3
        assert_relative_eq!(engine.axis_score(&c, "temporary_lag_factor"), 7.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_weighted_total_and_normalized() {
        let mut cands = vec![strong()];
        QualitativeScoringEngine::default().score_candidates(&mut cands, &default_axes());

        // A cheap pbr counts against competitive advantage: 5 + 5 + 1
        assert_relative_eq!(cands[0].qualitative_scores["competitive_advantage"], 11.0 / 3.0, epsilon = 1e-12);
        let expected = 20.0 + 11.0 / 3.0;
        assert_relative_eq!(cands[0].qualitative_score_total, expected, epsilon = 1e-12);
        assert_relative_eq!(cands[0].qualitative_score_normalized, expected * 4.0, epsilon = 1e-9);
    }

    #[test]
    fn test_weights_and_dropped_axes() {
        let axes = vec![
            AxisDefinition::new("temporary_lag_factor", 2.0),
            AxisDefinition::new("risk_resilience", 0.0),
            AxisDefinition::new("competitive_advantage", -1.0),
        ];
        let mut cands = vec![strong()];
        QualitativeScoringEngine::default().score_candidates(&mut cands, &axes);

        assert_eq!(cands[0].qualitative_scores.len(), 1);
        assert_relative_eq!(cands[0].qualitative_score_total, 10.0);
        assert_relative_eq!(cands[0].qualitative_score_max, 10.0);
    }

    #[test]
    fn test_normalized_within_bounds() {
        let candidates = vec![
            strong(),
            Candidate::new("1", "n", "s"),
            Candidate::new("2", "n", "s")
                .with_metric("per", 100.0)
                .with_metric("pbr", 9.0)
                .with_metric("roe", -5.0)
                .with_metric("equity_ratio", 5.0),
        ];
        for scale_max in [1.0, 3.0, 5.0, 10.0] {
            let mut cands = candidates.clone();
            QualitativeScoringEngine::new(scale_max).score_candidates(&mut cands, &default_axes());
            for c in &cands {
                assert!((0.0..=100.0).contains(&c.qualitative_score_normalized));
                for score in c.qualitative_scores.values() {
                    assert!((1.0..=5.0).contains(score));
                }
                assert!(c.qualitative_score_total <= c.qualitative_score_max);
            }
        }
    }

    #[test]
    fn test_no_axes_normalizes_to_zero() {
        let mut cands = vec![strong()];
        QualitativeScoringEngine::default().score_candidates(&mut cands, &[]);
        assert_eq!(cands[0].qualitative_score_max, 0.0);
        assert_eq!(cands[0].qualitative_score_normalized, 0.0);
        assert_eq!(normalize(5.0, 0.0), 0.0);
        assert_eq!(normalize(50.0, 10.0), 100.0);
    }

    #[test]
    fn test_proxy_metrics_listing() {
        assert_eq!(proxy_metrics("temporary_lag_factor"), vec!["per", "pbr", "roe"]);
        assert!(proxy_metrics("unknown").is_empty());
        let all = all_proxy_metrics();
        assert!(all.contains(&"avg_turnover_20d"));
        assert_eq!(all.iter().filter(|m| **m == "roe").count(), 1);
    }

    #[test]
    fn test_narrow_scale_keeps_total_under_max() {
        let engine = QualitativeScoringEngine::new(3.0);
        assert_relative_eq!(engine.scale_max(), AXIS_SCORE_MAX);

        let mut cands = vec![Candidate::new("7203", "n", "s")
            .with_metric("per", 5.0)
            .with_metric("pbr", 0.5)
            .with_metric("roe", 20.0)];
        engine.score_candidates(&mut cands, &[AxisDefinition::new("temporary_lag_factor", 1.0)]);

        assert_relative_eq!(cands[0].qualitative_score_total, 5.0);
        assert_relative_eq!(cands[0].qualitative_score_max, 5.0);
        assert!(cands[0].qualitative_score_total <= cands[0].qualitative_score_max);
        assert_relative_eq!(cands[0].qualitative_score_normalized, 100.0);
    }

    #[test]
    fn test_wide_scale_is_kept() {
        let mut cands = vec![strong()];
        let engine = QualitativeScoringEngine::new(10.0);
        engine.score_candidates(&mut cands, &[AxisDefinition::new("temporary_lag_factor", 1.0)]);
        assert_relative_eq!(cands[0].qualitative_score_max, 10.0);
        assert_relative_eq!(cands[0].qualitative_score_normalized, 50.0);
    }
}
