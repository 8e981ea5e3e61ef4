use async_trait::async_trait;
use chrono::NaiveDate;
use screener_core::{metrics, MarketDataSource, MarketSegment, MetricMap, ScreeningError, UniverseRow};
use std::collections::{HashMap, HashSet};

use crate::snapshot::SnapshotBuilder;
use crate::{JQuantsClient, ListedInstrument};

/// Universe and metrics collected from the J-Quants API
pub struct JQuantsMarketData {
    client: JQuantsClient,
    snapshots: SnapshotBuilder<JQuantsClient>,
    segment: MarketSegment,
}

impl JQuantsMarketData {
    pub fn new(client: JQuantsClient, market: &str) -> Self {
        Self {
            snapshots: SnapshotBuilder::new(client.clone()),
            client,
            segment: MarketSegment::parse(market),
        }
    }

    pub fn with_target_days(client: JQuantsClient, market: &str, target_days: u32) -> Self {
        Self {
            snapshots: SnapshotBuilder::with_target_days(client.clone(), target_days),
            client,
            segment: MarketSegment::parse(market),
        }
    }
}

/// Rows in the configured segment, first occurrence of each ticker kept
pub fn universe_rows(listed: &[ListedInstrument], segment: MarketSegment) -> Vec<UniverseRow> {
    let mut seen = HashSet::new();
    listed
        .iter()
        .filter(|l| segment.matches(l.market_code.as_deref(), l.market_name.as_deref()))
        .filter(|l| seen.insert(l.code.clone()))
        .map(|l| UniverseRow {
            ticker: l.code.clone(),
            company_name: l.company_name.clone(),
            sector: l.sector.clone(),
        })
        .collect()
}

#[async_trait]
impl MarketDataSource for JQuantsMarketData {
    async fn fetch_universe(&mut self, as_of: NaiveDate) -> Result<Vec<UniverseRow>, ScreeningError> {
        let listed = self.client.get_listed_info(Some(as_of)).await?;
        let rows = universe_rows(&listed, self.segment);
        tracing::info!("Universe as of {}: {} of {} listed instruments", as_of, rows.len(), listed.len());
        Ok(rows)
    }

    async fn fetch_quant_metrics(
        &mut self,
        as_of: NaiveDate,
        tickers: &[String],
    ) -> Result<HashMap<String, MetricMap>, ScreeningError> {
        let snapshots = self.snapshots.build(as_of, tickers).await?;
        let mut out = HashMap::with_capacity(tickers.len());

        for ticker in tickers {
            let snapshot = snapshots.get(ticker).cloned().unwrap_or_default();
            let summaries = self.client.get_fin_summary(ticker).await?;
            let mut map = crate::derive_statement_metrics(&summaries, snapshot.latest_close);

            if let Some(close) = snapshot.latest_close {
                map.insert(metrics::LATEST_CLOSE.to_string(), close);
            }
            if let Some(turnover) = snapshot.avg_turnover {
                map.insert(metrics::AVG_TURNOVER_20D.to_string(), turnover);
            }
            if map.is_empty() {
                tracing::warn!("No metrics available for {}", ticker);
            }
            out.insert(ticker.clone(), map);
        }

        Ok(out)
    }
}
