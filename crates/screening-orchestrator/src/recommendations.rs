use qualitative_scoring::{all_proxy_metrics, PREFERRED_AXIS_ORDER};
use quant_scoring::metric_peer_rank;
use screener_core::metrics;
use screener_core::{Better, Candidate, Recommendation};

pub const DECISION_WATCH: &str = "Watch";

/// Metrics compared against sector peers, with their favourable direction
pub const PEER_METRICS: &[(&str, Better)] = &[
    (metrics::PER, Better::Lower),
    (metrics::PBR, Better::Lower),
    (metrics::ROE, Better::Higher),
    (metrics::DIVIDEND_YIELD, Better::Higher),
    (metrics::EQUITY_RATIO, Better::Higher),
    (metrics::REVENUE_CAGR_3Y, Better::Higher),
    (metrics::OP_INCOME_CAGR_3Y, Better::Higher),
];

const STRONG_AXIS: f64 = 3.5;
const WEAK_AXIS: f64 = 2.0;
const MAX_AXIS_REASONS: usize = 2;

/// Human name for an axis id
pub fn axis_name(axis_id: &str) -> String {
    axis_id.replace('_', " ")
}

/// Axis scores in report order, unknown axes last in id order
fn ordered_axes(candidate: &Candidate) -> Vec<(&str, f64)> {
    let mut axes: Vec<(&str, f64)> = PREFERRED_AXIS_ORDER
        .iter()
        .filter_map(|id| candidate.qualitative_scores.get(*id).map(|s| (*id, *s)))
        .collect();
    axes.extend(
        candidate
            .qualitative_scores
            .iter()
            .filter(|(id, _)| !PREFERRED_AXIS_ORDER.contains(&id.as_str()))
            .map(|(id, s)| (id.as_str(), *s)),
    );
    axes
}

fn reasons(candidate: &Candidate) -> Vec<String> {
    let mut out = vec![format!(
        "Composite {:.1} (quant {:.1}, qual {:.1}/100)",
        candidate.composite_score, candidate.quantitative_score, candidate.qualitative_score_normalized
    )];

    let mut strong: Vec<(&str, f64)> = ordered_axes(candidate)
        .into_iter()
        .filter(|(_, s)| *s >= STRONG_AXIS)
        .collect();
    strong.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    out.extend(
        strong
            .iter()
            .take(MAX_AXIS_REASONS)
            .map(|(id, s)| format!("Strong {} ({:.1}/5)", axis_name(id), s)),
    );

    if candidate.quantitative_score_price_now >= 50.0 {
        out.push(format!(
            "Cheap against the universe on price multiples ({:.0} pct)",
            candidate.quantitative_score_price_now
        ));
    }
    out
}

fn risks(candidate: &Candidate) -> Vec<String> {
    let mut out: Vec<String> = ordered_axes(candidate)
        .into_iter()
        .filter(|(_, s)| *s <= WEAK_AXIS)
        .map(|(id, s)| format!("Weak {} ({:.1}/5)", axis_name(id), s))
        .collect();

    let missing: Vec<&str> = all_proxy_metrics()
        .into_iter()
        .filter(|m| candidate.metric(m).is_none())
        .collect();
    if !missing.is_empty() {
        out.push(format!("Missing data, scored neutral: {}", missing.join(", ")));
    }
    out
}

fn assumptions(candidate: &Candidate) -> Vec<String> {
    let mut out = vec![
        "Qualitative axes are proxied from reported metrics, not from news or filings".to_string(),
        "Statement metrics reflect the latest full-year filing".to_string(),
    ];
    if candidate.metric(metrics::LATEST_CLOSE).is_none() {
        out.push("No recent close; price multiples may be stale".to_string());
    }
    out
}

fn reevaluation_triggers(candidate: &Candidate) -> Vec<String> {
    let mut out = vec![format!("Next earnings release for {}", candidate.ticker)];
    if let Some(per) = candidate.metric(metrics::PER) {
        out.push(format!("PER re-rates well away from {:.1}", per));
    }
    if let Some(pbr) = candidate.metric(metrics::PBR) {
        if pbr < 1.0 {
            out.push("PBR recovers above 1.0".to_string());
        }
    }
    out.push("Composite drops out of the shortlist".to_string());
    out
}

/// Peer strengths and weaknesses over [`PEER_METRICS`]
pub fn peer_comparison(candidate: &Candidate, pool: &[Candidate]) -> (Vec<String>, Vec<String>) {
    let mut strengths = Vec::new();
    let mut weaknesses = Vec::new();

    for (metric, better) in PEER_METRICS {
        let Some(rank) = metric_peer_rank(candidate, pool, metric, better.higher_is_better()) else {
            continue;
        };
        let line = format!("{} rank {}/{}", metric, rank.rank, rank.peer_count);
        if rank.is_strength() {
            strengths.push(line.clone());
        }
        if rank.is_weakness() {
            weaknesses.push(line);
        }
    }
    (strengths, weaknesses)
}

/// `Watch` recommendations for the first `top_k` non-excluded candidates of
/// the ranked `shortlist`; peers are drawn from `pool`.
pub fn build_recommendations(shortlist: &[Candidate], pool: &[Candidate], top_k: usize) -> Vec<Recommendation> {
    shortlist
        .iter()
        .filter(|c| !c.excluded)
        .take(top_k)
        .map(|candidate| {
            let (peer_strengths, peer_weaknesses) = peer_comparison(candidate, pool);
            Recommendation {
                ticker: candidate.ticker.clone(),
                decision: DECISION_WATCH.to_string(),
                reasons: reasons(candidate),
                risks: risks(candidate),
                assumptions: assumptions(candidate),
                peer_strengths,
                peer_weaknesses,
                reevaluation_triggers: reevaluation_triggers(candidate),
            }
        })
        .collect()
}
