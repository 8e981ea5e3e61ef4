use anyhow::{bail, Context, Result};
use jquants_client::{JQuantsClient, JQuantsMarketData, JquantsConfig};
use screener_core::{MarketDataSource, StrategyConfig};

use crate::sbi_csv::SbiCsvMarketData;

pub const PROVIDER_JQUANTS: &str = "jquants";
pub const PROVIDER_SBI_CSV: &str = "sbi_csv";

/// Market-data backend named by `data_sources.prices_and_fundamentals.provider`.
pub fn market_data_source(config: &StrategyConfig) -> Result<Box<dyn MarketDataSource>> {
    let source = config.prices_source()?;
    match source.provider.trim().to_ascii_lowercase().as_str() {
        PROVIDER_SBI_CSV => {
            tracing::info!("Using screening CSV market data");
            Ok(Box::new(SbiCsvMarketData::new(source.clone(), config.universe.clone())))
        }
        PROVIDER_JQUANTS | "j-quants" | "j_quants" => {
            let client = JQuantsClient::new(JquantsConfig::from_env())
                .context("J-Quants client needs an API key")?;
            tracing::info!("Using J-Quants market data (plan: {})", source.plan);
            Ok(Box::new(JQuantsMarketData::new(client, &config.universe.market)))
        }
        other => bail!("Unknown market data provider '{}'", other),
    }
}
