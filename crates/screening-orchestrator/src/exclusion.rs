use screener_core::metrics;
use screener_core::{Candidate, ExclusionRule, UniverseConfig};

/// Liquidity floors from the universe plus the configured metric rules.
pub struct ExclusionGate<'a> {
    universe: &'a UniverseConfig,
    rules: &'a [ExclusionRule],
}

impl<'a> ExclusionGate<'a> {
    pub fn new(universe: &'a UniverseConfig, rules: &'a [ExclusionRule]) -> Self {
        Self { universe, rules }
    }

    /// Reasons this candidate fails the gate; empty when it passes.
    pub fn reasons(&self, candidate: &Candidate) -> Vec<String> {
        let mut reasons = Vec::new();

        let min_turnover = self.universe.min_avg_trading_value_20d_jpy;
        if min_turnover > 0.0 {
            match candidate.metric(metrics::AVG_TURNOVER_20D) {
                Some(v) if v < min_turnover => reasons.push(format!(
                    "Average trading value {} below minimum {}",
                    format_jpy(v),
                    format_jpy(min_turnover)
                )),
                Some(_) => {}
                None => reasons.push("Average trading value unavailable".to_string()),
            }
        }

        let min_cap = self.universe.min_market_cap_jpy;
        if let Some(cap) = candidate.metric(metrics::MARKET_CAP_JPY) {
            if min_cap > 0.0 && cap < min_cap {
                reasons.push(format!(
                    "Market cap {} below minimum {}",
                    format_jpy(cap),
                    format_jpy(min_cap)
                ));
            }
        }

        for rule in self.rules {
            if let Some(reason) = rule_violation(rule, candidate) {
                reasons.push(reason);
            }
        }
        reasons
    }

    /// Flag failing candidates in place. Nobody is removed.
    pub fn apply(&self, candidates: &mut [Candidate]) -> usize {
        let mut excluded = 0;
        for candidate in candidates.iter_mut() {
            candidate.exclusion_reasons = self.reasons(candidate);
            candidate.excluded = !candidate.exclusion_reasons.is_empty();
            if candidate.excluded {
                excluded += 1;
                tracing::debug!("{} excluded: {}", candidate.ticker, candidate.exclusion_reasons.join("; "));
            }
        }
        excluded
    }
}

fn rule_violation(rule: &ExclusionRule, candidate: &Candidate) -> Option<String> {
    let custom = rule.reason.as_deref().filter(|r| !r.trim().is_empty());

    let Some(value) = candidate.metric(&rule.metric) else {
        return rule
            .required
            .then(|| custom.map(str::to_string).unwrap_or_else(|| format!("{} is missing", rule.metric)));
    };

    if let Some(min) = rule.min.filter(|m| value < *m) {
        return Some(custom.map(str::to_string).unwrap_or_else(|| format!("{} {:.2} below {:.2}", rule.metric, value, min)));
    }
    if let Some(max) = rule.max.filter(|m| value > *m) {
        return Some(custom.map(str::to_string).unwrap_or_else(|| format!("{} {:.2} above {:.2}", rule.metric, value, max)));
    }
    None
}

/// Yen in units of 億 (1e8)
fn format_jpy(v: f64) -> String {
    format!("{:.1}億円", v / 1.0e8)
}
