use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::{MetricMap, ScreeningError, UniverseRow};

/// Source of the screening universe and per-ticker metrics.
///
/// Sources may keep per-run caches, hence `&mut self`.
#[async_trait]
pub trait MarketDataSource: Send {
    /// Listed instruments that pass the configured market filter as of `as_of`
    async fn fetch_universe(&mut self, as_of: NaiveDate) -> Result<Vec<UniverseRow>, ScreeningError>;

    /// Price-snapshot and statement-derived metrics for each requested ticker.
    /// Tickers with no data at all may be missing from the result.
    async fn fetch_quant_metrics(
        &mut self,
        as_of: NaiveDate,
        tickers: &[String],
    ) -> Result<HashMap<String, MetricMap>, ScreeningError>;
}
