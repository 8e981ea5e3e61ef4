//! Cross-sectional percentile scoring of quantitative metrics.
//!
//! Metrics split into two independent tracks: "price-now" (multiples that
//! move with the share price) and "fundamentals-base" (everything else).
//! Each track is averaged on its own; the overall score averages the tracks
//! that produced a positive score.

use screener_core::metrics::is_price_now_metric;
use screener_core::{Candidate, MetricDefinition};
use std::cmp::Ordering;
use std::collections::HashMap;

pub mod peers;

pub use peers::{metric_peer_rank, PeerRank, MIN_PEERS};

/// Percentile score per candidate index for one metric
pub type MetricScores = HashMap<usize, f64>;

pub struct QuantScoringEngine;

impl QuantScoringEngine {
    pub fn new() -> Self {
        Self
    }

    /// Fill the three quantitative score fields on every candidate.
    pub fn score_candidates(&self, candidates: &mut [Candidate], metrics: &[MetricDefinition]) {
        if candidates.is_empty() || metrics.is_empty() {
            return;
        }

        let (price_defs, fundamental_defs): (Vec<&MetricDefinition>, Vec<&MetricDefinition>) =
            metrics.iter().partition(|m| is_price_now_metric(&m.id));

        let price_scores = score_by_metrics(candidates, &price_defs);
        let fundamental_scores = score_by_metrics(candidates, &fundamental_defs);

        for (idx, candidate) in candidates.iter_mut().enumerate() {
            let price_now = average(price_scores.iter().filter_map(|m| m.get(&idx).copied()));
            let fundamentals = average(fundamental_scores.iter().filter_map(|m| m.get(&idx).copied()));

            candidate.quantitative_score_price_now = price_now;
            candidate.quantitative_score_fundamentals_base = fundamentals;
            // A zero track means "nothing scorable", not a real zero
            candidate.quantitative_score = average([price_now, fundamentals].into_iter().filter(|s| *s > 0.0));
        }

        tracing::debug!(
            "Scored {} candidates on {} price-now and {} fundamentals metrics",
            candidates.len(),
            price_defs.len(),
            fundamental_defs.len()
        );
    }
}

impl Default for QuantScoringEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// One score map per metric that at least one candidate has a value for.
fn score_by_metrics(candidates: &[Candidate], defs: &[&MetricDefinition]) -> Vec<MetricScores> {
    defs.iter()
        .filter(|def| !def.id.is_empty())
        .filter_map(|def| {
            let values: Vec<(usize, f64)> = candidates
                .iter()
                .enumerate()
                .filter_map(|(idx, c)| c.metric(&def.id).map(|v| (idx, v)))
                .collect();
            if values.is_empty() {
                None
            } else {
                Some(rank_scores(&values, def.better.higher_is_better()))
            }
        })
        .collect()
}

/// `100 * (1 - rank / (n - 1))` with rank 0 the best value; a lone value scores 100.
///
/// The sort is stable, so equal values keep their input order.
pub fn rank_scores(values: &[(usize, f64)], higher_is_better: bool) -> MetricScores {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        if higher_is_better {
            ord.reverse()
        } else {
            ord
        }
    });

    let n = sorted.len();
    if n == 1 {
        return HashMap::from([(sorted[0].0, 100.0)]);
    }

    sorted
        .iter()
        .enumerate()
        .map(|(rank, (idx, _))| {
            let percentile = 1.0 - rank as f64 / (n - 1) as f64;
            (*idx, percentile * 100.0)
        })
        .collect()
}

fn average(values: impl IntoIterator<Item = f64>) -> f64 {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}
