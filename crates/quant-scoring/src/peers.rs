use screener_core::Candidate;
use std::cmp::Ordering;

/// Fewest peers (and fewest valued peers) for a meaningful rank
pub const MIN_PEERS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeerRank {
    /// 1-based, best first
    pub rank: usize,
    pub peer_count: usize,
    pub bucket: usize,
}

impl PeerRank {
    pub fn is_strength(&self) -> bool {
        self.rank <= self.bucket
    }

    pub fn is_weakness(&self) -> bool {
        self.rank > self.peer_count.saturating_sub(self.bucket)
    }
}

/// Rank `candidate` on `metric` against its sector, or the whole pool when
/// the sector has fewer than [`MIN_PEERS`] members.
///
/// `pool` is expected to contain the candidate itself, matched by ticker.
pub fn metric_peer_rank(
    candidate: &Candidate,
    pool: &[Candidate],
    metric: &str,
    higher_is_better: bool,
) -> Option<PeerRank> {
    let own = candidate.metric(metric)?;

    let sector_peers: Vec<&Candidate> = pool.iter().filter(|c| c.sector == candidate.sector).collect();
    let peers: Vec<&Candidate> = if sector_peers.len() >= MIN_PEERS {
        sector_peers
    } else {
        pool.iter().collect()
    };

    let mut valued: Vec<(&str, f64)> = peers
        .iter()
        .filter_map(|c| c.metric(metric).map(|v| (c.ticker.as_str(), v)))
        .collect();
    if valued.len() < MIN_PEERS {
        return None;
    }

    valued.sort_by(|a, b| {
        let ord = a.1.partial_cmp(&b.1).unwrap_or(Ordering::Equal);
        if higher_is_better {
            ord.reverse()
        } else {
            ord
        }
    });

    let position = valued
        .iter()
        .position(|(ticker, _)| *ticker == candidate.ticker)
        // Candidate outside the pool: slot it after any equal values
        .unwrap_or_else(|| {
            valued
                .iter()
                .take_while(|(_, v)| if higher_is_better { *v >= own } else { *v <= own })
                .count()
        });

    let peer_count = valued.len();
    Some(PeerRank {
        rank: position + 1,
        peer_count,
        bucket: peer_count.div_ceil(3).max(1),
    })
}
