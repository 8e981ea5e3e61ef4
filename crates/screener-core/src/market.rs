//! Listing-tier filter shared by every market-data source.

/// Tokyo Stock Exchange listing tier named by `universe.market`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketSegment {
    Prime,
    Standard,
    Growth,
    /// Unrecognised identifiers do not filter anything
    Any,
}

impl MarketSegment {
    pub fn parse(id: &str) -> Self {
        match id.trim().to_ascii_uppercase().as_str() {
            "TSE_PRIME" | "PRIME" => MarketSegment::Prime,
            "TSE_STANDARD" | "STANDARD" => MarketSegment::Standard,
            "TSE_GROWTH" | "GROWTH" => MarketSegment::Growth,
            _ => MarketSegment::Any,
        }
    }

    /// Provider market code (`0111` prime, `0112` standard, `0113` growth)
    fn code(&self) -> Option<&'static str> {
        match self {
            MarketSegment::Prime => Some("0111"),
            MarketSegment::Standard => Some("0112"),
            MarketSegment::Growth => Some("0113"),
            MarketSegment::Any => None,
        }
    }

    fn labels(&self) -> &'static [&'static str] {
        match self {
            MarketSegment::Prime => &["東証P", "東P", "プライム", "Prime"],
            MarketSegment::Standard => &["東証S", "東S", "スタンダード", "Standard"],
            MarketSegment::Growth => &["東証G", "東G", "グロース", "Growth"],
            MarketSegment::Any => &[],
        }
    }

    /// True when either the market code or the free-text label identifies this tier.
    pub fn matches(&self, market_code: Option<&str>, market_label: Option<&str>) -> bool {
        if *self == MarketSegment::Any {
            return true;
        }
        if let (Some(expected), Some(code)) = (self.code(), market_code) {
            if code.trim() == expected {
                return true;
            }
        }
        market_label
            .map(|label| self.labels().iter().any(|l| label.contains(l)))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prime_matches_code_or_label() {
        let prime = MarketSegment::parse("TSE_PRIME");
        assert_eq!(prime, MarketSegment::Prime);
        assert!(prime.matches(Some("0111"), None));
        assert!(prime.matches(None, Some("東証P")));
        assert!(prime.matches(Some("0112"), Some("プライム")));
        assert!(!prime.matches(Some("0112"), Some("スタンダード")));
        assert!(!prime.matches(None, None));
    }

    #[test]
    fn test_unknown_segment_passes_everything() {
        let any = MarketSegment::parse("ALL");
        assert!(any.matches(None, None));
        assert!(any.matches(Some("0113"), Some("グロース")));
    }
}
