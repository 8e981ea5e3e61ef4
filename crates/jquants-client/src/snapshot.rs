//! Latest-close / trailing-turnover snapshots built by walking back from an as-of date.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use screener_core::metrics::normalize_code;
use screener_core::{PriceSnapshot, ScreeningError};
use std::collections::HashMap;

use crate::{DailyQuote, JQuantsClient};

/// Trading days averaged into `avg_turnover_20d`
pub const DEFAULT_TARGET_DAYS: u32 = 20;
const MIN_LOOKBACK_DAYS: u32 = 15;

/// Anything that can return the full set of daily quotes for one date
#[async_trait]
pub trait DailyQuoteSource: Send + Sync {
    async fn quotes_on(&self, date: NaiveDate) -> Result<Vec<DailyQuote>, ScreeningError>;
}

#[async_trait]
impl DailyQuoteSource for JQuantsClient {
    async fn quotes_on(&self, date: NaiveDate) -> Result<Vec<DailyQuote>, ScreeningError> {
        self.get_daily_quotes(date).await
    }
}

/// Calendar days the builder may walk back for a given target
pub fn lookback_days(target_days: u32) -> u32 {
    MIN_LOOKBACK_DAYS.max(target_days.saturating_mul(4))
}

/// Snapshots keyed by as-of date, then ticker.
///
/// Storing a date drops every other date. A lookup only hits when the cached
/// ticker set covers the whole request; there are no partial top-ups.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    entries: HashMap<NaiveDate, HashMap<String, PriceSnapshot>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn covers(&self, as_of: NaiveDate, tickers: &[String]) -> bool {
        self.entries
            .get(&as_of)
            .map(|cached| tickers.iter().all(|t| cached.contains_key(t)))
            .unwrap_or(false)
    }

    /// Cached snapshots for exactly the requested tickers, if all are present
    pub fn get(&self, as_of: NaiveDate, tickers: &[String]) -> Option<HashMap<String, PriceSnapshot>> {
        if !self.covers(as_of, tickers) {
            return None;
        }
        let cached = self.entries.get(&as_of)?;
        Some(
            tickers
                .iter()
                .filter_map(|t| cached.get(t).map(|s| (t.clone(), s.clone())))
                .collect(),
        )
    }

    pub fn store(&mut self, as_of: NaiveDate, snapshots: HashMap<String, PriceSnapshot>) {
        self.entries.retain(|date, _| *date == as_of);
        self.entries.insert(as_of, snapshots);
    }

    pub fn cached_dates(&self) -> Vec<NaiveDate> {
        self.entries.keys().copied().collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[derive(Debug, Default)]
struct Accumulator {
    turnover_sum: f64,
    observations: u32,
    latest_close: Option<f64>,
}

pub struct SnapshotBuilder<S> {
    source: S,
    cache: SnapshotCache,
    target_days: u32,
}

impl<S: DailyQuoteSource> SnapshotBuilder<S> {
    pub fn new(source: S) -> Self {
        Self::with_target_days(source, DEFAULT_TARGET_DAYS)
    }

    pub fn with_target_days(source: S, target_days: u32) -> Self {
        Self {
            source,
            cache: SnapshotCache::new(),
            target_days: target_days.max(1),
        }
    }

    pub fn target_days(&self) -> u32 {
        self.target_days
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// One snapshot per requested ticker, served from cache when it covers the request.
    pub async fn build(
        &mut self,
        as_of: NaiveDate,
        tickers: &[String],
    ) -> Result<HashMap<String, PriceSnapshot>, ScreeningError> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }
        if let Some(hit) = self.cache.get(as_of, tickers) {
            tracing::debug!("Snapshot cache hit for {} ({} tickers)", as_of, tickers.len());
            return Ok(hit);
        }

        let snapshots = self.scan(as_of, tickers).await?;
        self.cache.store(as_of, snapshots.clone());
        Ok(snapshots)
    }

    async fn scan(
        &self,
        as_of: NaiveDate,
        tickers: &[String],
    ) -> Result<HashMap<String, PriceSnapshot>, ScreeningError> {
        let mut acc: HashMap<String, Accumulator> = tickers
            .iter()
            .map(|t| (normalize_code(t), Accumulator::default()))
            .collect();
        if acc.is_empty() {
            return Ok(HashMap::new());
        }

        let budget = lookback_days(self.target_days);
        let mut days_scanned = 0u32;

        for offset in 0..budget {
            let day = as_of - Duration::days(i64::from(offset));
            let quotes = self.source.quotes_on(day).await?;
            days_scanned += 1;

            for quote in quotes {
                let Some(entry) = acc.get_mut(&quote.code) else {
                    continue;
                };
                if entry.latest_close.is_none() {
                    entry.latest_close = quote.close;
                }
                if entry.observations < self.target_days {
                    if let Some(turnover) = quote.turnover {
                        entry.turnover_sum += turnover;
                        entry.observations += 1;
                    }
                }
            }

            if acc.values().all(|a| a.observations >= self.target_days) {
                break;
            }
        }

        let short = acc.values().filter(|a| a.observations < self.target_days).count();
        tracing::info!(
            "Built {} price snapshots as of {} from {} calendar days ({} short of {} trading days)",
            acc.len(),
            as_of,
            days_scanned,
            short,
            self.target_days
        );

        Ok(tickers
            .iter()
            .filter_map(|t| {
                acc.get(&normalize_code(t)).map(|a| {
                    let avg_turnover = (a.observations > 0).then(|| a.turnover_sum / f64::from(a.observations));
                    (
                        t.clone(),
                        PriceSnapshot {
                            latest_close: a.latest_close,
                            avg_turnover,
                            observations: a.observations,
                        },
                    )
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeQuotes {
        by_date: HashMap<NaiveDate, Vec<DailyQuote>>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DailyQuoteSource for FakeQuotes {
        async fn quotes_on(&self, date: NaiveDate) -> Result<Vec<DailyQuote>, ScreeningError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.by_date.get(&date).cloned().unwrap_or_default())
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn quote(code: &str, close: f64, turnover: f64) -> DailyQuote {
        DailyQuote {
            code: code.to_string(),
            date: None,
            close: Some(close),
            turnover: Some(turnover),
        }
    }

    fn tickers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn fake(by_date: HashMap<NaiveDate, Vec<DailyQuote>>) -> (FakeQuotes, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (FakeQuotes { by_date, calls: calls.clone() }, calls)
    }

    #[test]
    fn test_lookback_budget() {
        assert_eq!(lookback_days(1), 15);
        assert_eq!(lookback_days(3), 15);
        assert_eq!(lookback_days(5), 20);
        assert_eq!(lookback_days(20), 80);
    }

    #[tokio::test]
    async fn test_stops_once_every_ticker_reaches_target() {
        let by_date = (1..=31)
            .map(|day| (d(day), vec![quote("7203", 3000.0 + day as f64, 100.0)]))
            .collect();
        let (source, calls) = fake(by_date);
        let mut builder = SnapshotBuilder::with_target_days(source, 5);

        let snaps = builder.build(d(31), &tickers(&["7203"])).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 5);
        let snap = &snaps["7203"];
        assert_eq!(snap.observations, 5);
        assert_eq!(snap.latest_close, Some(3031.0));
        assert_relative_eq!(snap.avg_turnover.unwrap(), 100.0);
    }

    #[tokio::test]
    async fn test_sparse_quotes_average_over_observations_found() {
        // 3 quotes in a 20-day window against a 5-day target
        let mut by_date = HashMap::new();
        by_date.insert(d(28), vec![quote("6758", 13000.0, 300.0)]);
        by_date.insert(d(20), vec![quote("6758", 12800.0, 600.0)]);
        by_date.insert(d(12), vec![quote("6758", 12500.0, 900.0)]);
        let (source, calls) = fake(by_date);
        let mut builder = SnapshotBuilder::with_target_days(source, 5);

        let snaps = builder.build(d(31), &tickers(&["6758"])).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 20);
        let snap = &snaps["6758"];
        assert_eq!(snap.observations, 3);
        assert_eq!(snap.latest_close, Some(13000.0));
        assert_relative_eq!(snap.avg_turnover.unwrap(), 600.0);
    }

    #[tokio::test]
    async fn test_ticker_without_quotes_has_no_values() {
        let by_date = (1..=31).map(|day| (d(day), vec![quote("7203", 3000.0, 100.0)])).collect();
        let (source, _) = fake(by_date);
        let mut builder = SnapshotBuilder::with_target_days(source, 2);

        let snaps = builder.build(d(31), &tickers(&["7203", "9999"])).await.unwrap();

        let missing = &snaps["9999"];
        assert_eq!(missing.latest_close, None);
        assert_eq!(missing.avg_turnover, None);
        assert_eq!(missing.observations, 0);
    }

    #[tokio::test]
    async fn test_only_most_recent_observations_count() {
        let mut by_date = HashMap::new();
        by_date.insert(d(31), vec![quote("7203", 10.0, 100.0)]);
        by_date.insert(d(30), vec![quote("7203", 11.0, 200.0)]);
        by_date.insert(d(29), vec![quote("7203", 12.0, 9000.0), quote("6758", 50.0, 1.0)]);
        by_date.insert(d(28), vec![quote("6758", 51.0, 3.0)]);
        let (source, calls) = fake(by_date);
        let mut builder = SnapshotBuilder::with_target_days(source, 2);

        let snaps = builder.build(d(31), &tickers(&["7203", "6758"])).await.unwrap();

        // 7203 is full after day 30; its day-29 turnover must not leak in
        assert_relative_eq!(snaps["7203"].avg_turnover.unwrap(), 150.0);
        assert_relative_eq!(snaps["6758"].avg_turnover.unwrap(), 2.0);
        assert_eq!(snaps["6758"].latest_close, Some(50.0));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_quote_without_turnover_is_not_an_observation() {
        let mut by_date = HashMap::new();
        by_date.insert(
            d(31),
            vec![DailyQuote { code: "7203".to_string(), date: None, close: None, turnover: None }],
        );
        by_date.insert(d(30), vec![quote("7203", 3000.0, 400.0)]);
        let (source, _) = fake(by_date);
        let mut builder = SnapshotBuilder::with_target_days(source, 1);

        let snaps = builder.build(d(31), &tickers(&["7203"])).await.unwrap();

        assert_eq!(snaps["7203"].observations, 1);
        assert_eq!(snaps["7203"].latest_close, Some(3000.0));
    }

    #[tokio::test]
    async fn test_five_digit_provider_codes_match_tickers() {
        let by_date = HashMap::from([(d(31), vec![quote("72030", 3000.0, 100.0)])]);
        let (source, _) = fake(by_date);
        let mut builder = SnapshotBuilder::with_target_days(source, 1);

        let snaps = builder.build(d(31), &tickers(&["7203"])).await.unwrap();
        assert_eq!(snaps["7203"].latest_close, Some(3000.0));
    }

    #[tokio::test]
    async fn test_cache_reuse_requires_full_coverage() {
        let by_date = (1..=31)
            .map(|day| (d(day), vec![quote("7203", 1.0, 1.0), quote("6758", 2.0, 2.0)]))
            .collect();
        let (source, calls) = fake(by_date);
        let mut builder = SnapshotBuilder::with_target_days(source, 1);

        builder.build(d(31), &tickers(&["7203", "6758"])).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Subset of the cached set: no fetch
        let subset = builder.build(d(31), &tickers(&["7203"])).await.unwrap();
        assert_eq!(subset.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // New ticker: full rebuild
        builder.build(d(31), &tickers(&["7203", "8306"])).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1 + lookback_days(1) as usize);
        assert!(!builder.cache().covers(d(31), &tickers(&["6758"])));
    }

    #[tokio::test]
    async fn test_new_as_of_invalidates_cache() {
        let by_date = (1..=31).map(|day| (d(day), vec![quote("7203", 1.0, 1.0)])).collect();
        let (source, calls) = fake(by_date);
        let mut builder = SnapshotBuilder::with_target_days(source, 1);

        builder.build(d(31), &tickers(&["7203"])).await.unwrap();
        builder.build(d(30), &tickers(&["7203"])).await.unwrap();
        assert_eq!(builder.cache().cached_dates(), vec![d(30)]);

        builder.build(d(31), &tickers(&["7203"])).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_empty_request_fetches_nothing() {
        let (source, calls) = fake(HashMap::new());
        let mut builder = SnapshotBuilder::new(source);
        let snaps = builder.build(d(31), &[]).await.unwrap();
        assert!(snaps.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_request_keeps_cached_date() {
        let by_date = (1..=31).map(|day| (d(day), vec![quote("7203", 1.0, 1.0)])).collect();
        let (source, calls) = fake(by_date);
        let mut builder = SnapshotBuilder::with_target_days(source, 1);

        builder.build(d(31), &tickers(&["7203"])).await.unwrap();
        builder.build(d(30), &[]).await.unwrap();
        assert_eq!(builder.cache().cached_dates(), vec![d(31)]);

        builder.build(d(31), &tickers(&["7203"])).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
