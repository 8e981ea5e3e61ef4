use anyhow::{Context, Result};
use chrono::NaiveDate;
use qualitative_scoring::QualitativeScoringEngine;
use quant_scoring::QuantScoringEngine;
use screener_core::{Candidate, MarketDataSource, PipelineResult, StrategyConfig};
use std::cmp::Ordering;

use crate::exclusion::ExclusionGate;
use crate::recommendations::build_recommendations;

/// Runtime overrides for shortlist sizes; `None` or zero falls back to config.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub top_n: Option<usize>,
    pub top_k: Option<usize>,
}

impl RunOptions {
    pub fn top_n(&self, config: &StrategyConfig) -> usize {
        self.top_n
            .filter(|n| *n > 0)
            .unwrap_or(config.quantitative.top_n_candidates)
    }

    pub fn top_k(&self, config: &StrategyConfig) -> usize {
        self.top_k.filter(|k| *k > 0).unwrap_or(config.deep_dive.top_k)
    }
}

/// Composite = quant + normalized qual, then a stable descending sort.
pub fn rank_candidates(candidates: &mut Vec<Candidate>) {
    for c in candidates.iter_mut() {
        c.composite_score = c.quantitative_score + c.qualitative_score_normalized;
    }
    candidates.sort_by(|a, b| {
        b.composite_score
            .partial_cmp(&a.composite_score)
            .unwrap_or(Ordering::Equal)
    });
}

/// Scoring, exclusion and ranking for a fixed candidate set.
pub fn score_and_rank(config: &StrategyConfig, candidates: &mut Vec<Candidate>) {
    QuantScoringEngine::new().score_candidates(candidates, &config.quantitative.metrics);
    QualitativeScoringEngine::new(config.qualitative.scale_max)
        .score_candidates(candidates, &config.qualitative.axes);

    let excluded = ExclusionGate::new(&config.universe, &config.exclusion_rules).apply(candidates);
    if excluded > 0 {
        tracing::info!("🚫 {} of {} candidates excluded", excluded, candidates.len());
    }

    rank_candidates(candidates);
}

pub struct ScreeningPipeline {
    config: StrategyConfig,
    source: Box<dyn MarketDataSource>,
}

impl ScreeningPipeline {
    pub fn new(config: StrategyConfig, source: Box<dyn MarketDataSource>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub async fn run(&mut self, as_of: NaiveDate, options: RunOptions) -> Result<PipelineResult> {
        tracing::info!("📊 Screening '{}' as of {}", self.config.name, as_of);

        let universe = self
            .source
            .fetch_universe(as_of)
            .await
            .context("Failed to fetch universe")?;
        let mut candidates: Vec<Candidate> = universe.iter().map(Candidate::from).collect();

        let tickers: Vec<String> = candidates.iter().map(|c| c.ticker.clone()).collect();
        let mut metrics = self
            .source
            .fetch_quant_metrics(as_of, &tickers)
            .await
            .context("Failed to fetch quantitative metrics")?;
        for candidate in candidates.iter_mut() {
            if let Some(map) = metrics.remove(&candidate.ticker) {
                candidate.metrics = map.into_iter().filter(|(_, v)| v.is_finite()).collect();
            }
        }

        score_and_rank(&self.config, &mut candidates);

        let top_n = options.top_n(&self.config);
        let top_k = options.top_k(&self.config);
        let shortlist: Vec<Candidate> = candidates.iter().take(top_n).cloned().collect();
        let top_recommendations = build_recommendations(&shortlist, &candidates, top_k);

        tracing::info!(
            "✅ Ranked {} candidates, shortlisted {}, {} recommendations",
            candidates.len(),
            shortlist.len(),
            top_recommendations.len()
        );

        Ok(PipelineResult {
            candidates: shortlist,
            top_recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use screener_core::{MetricMap, ScreeningError, UniverseRow};
    use std::collections::HashMap;

    const STRATEGY: &str = r#"
version: 1
name: test strategy
data_sources:
  prices_and_fundamentals:
    provider: sbi_csv
universe:
  market: TSE_PRIME
  min_avg_trading_value_20d_jpy: 100000000
quantitative:
  top_n_candidates: 3
  metrics:
    - { id: per, better: lower }
    - { id: pbr, better: lower }
    - { id: roe, better: higher }
qualitative:
  scale_max: 5
  axes:
    - { id: temporary_lag_factor, weight: 1.0 }
    - { id: risk_resilience, weight: 1.0 }
deep_dive:
  top_k: 2
"#;

    struct FixedSource {
        rows: Vec<UniverseRow>,
        metrics: HashMap<String, MetricMap>,
    }

    #[async_trait]
    impl MarketDataSource for FixedSource {
        async fn fetch_universe(&mut self, _as_of: NaiveDate) -> Result<Vec<UniverseRow>, ScreeningError> {
            Ok(self.rows.clone())
        }

        async fn fetch_quant_metrics(
            &mut self,
            _as_of: NaiveDate,
            tickers: &[String],
        ) -> Result<HashMap<String, MetricMap>, ScreeningError> {
            Ok(tickers
                .iter()
                .filter_map(|t| self.metrics.get(t).map(|m| (t.clone(), m.clone())))
                .collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl MarketDataSource for FailingSource {
        async fn fetch_universe(&mut self, _as_of: NaiveDate) -> Result<Vec<UniverseRow>, ScreeningError> {
            Err(ScreeningError::provider("GET", "/equities/master", Some(500), "boom"))
        }

        async fn fetch_quant_metrics(
            &mut self,
            _as_of: NaiveDate,
            _tickers: &[String],
        ) -> Result<HashMap<String, MetricMap>, ScreeningError> {
            Ok(HashMap::new())
        }
    }

    fn row(ticker: &str) -> UniverseRow {
        UniverseRow {
            ticker: ticker.to_string(),
            company_name: format!("Company {}", ticker),
            sector: "Banks".to_string(),
        }
    }

    fn metric_map(pairs: &[(&str, f64)]) -> MetricMap {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn source() -> FixedSource {
        let turnover = ("avg_turnover_20d", 5.0e8);
        FixedSource {
            rows: vec![row("A"), row("B"), row("C"), row("D")],
            metrics: HashMap::from([
                ("A".to_string(), metric_map(&[("per", 10.0), ("pbr", 0.9), ("roe", 12.0), turnover])),
                ("B".to_string(), metric_map(&[("per", 20.0), ("pbr", 1.5), ("roe", 9.0), turnover])),
                ("C".to_string(), metric_map(&[("per", 30.0), ("pbr", 2.0), ("roe", 6.0), turnover])),
                // Cheapest on paper but below the liquidity floor
                ("D".to_string(), metric_map(&[("per", 5.0), ("pbr", 0.5), ("roe", 20.0), ("avg_turnover_20d", 1.0e6)])),
            ]),
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 31).unwrap()
    }

    #[tokio::test]
    async fn test_run_scores_ranks_and_recommends() {
        let config = StrategyConfig::from_yaml_str(STRATEGY).unwrap();
        let mut pipeline = ScreeningPipeline::new(config, Box::new(source()));

        let result = pipeline.run(as_of(), RunOptions::default()).await.unwrap();

        let order: Vec<&str> = result.candidates.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(order, vec!["D", "A", "B"]);
        assert!(result.candidates[0].excluded);
        assert!(!result.candidates[1].excluded);

        for c in &result.candidates {
            let expected = c.quantitative_score + c.qualitative_score_normalized;
            assert!((c.composite_score - expected).abs() < 1e-9);
        }

        // Excluded D is skipped; the next two get recommendations
        let recs: Vec<&str> = result.top_recommendations.iter().map(|r| r.ticker.as_str()).collect();
        assert_eq!(recs, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_cli_overrides_take_precedence() {
        let config = StrategyConfig::from_yaml_str(STRATEGY).unwrap();
        let mut pipeline = ScreeningPipeline::new(config, Box::new(source()));

        let options = RunOptions {
            top_n: Some(4),
            top_k: Some(1),
        };
        let result = pipeline.run(as_of(), options).await.unwrap();
        assert_eq!(result.candidates.len(), 4);
        assert_eq!(result.top_recommendations.len(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_aborts_run() {
        let config = StrategyConfig::from_yaml_str(STRATEGY).unwrap();
        let mut pipeline = ScreeningPipeline::new(config, Box::new(FailingSource));

        let err = pipeline.run(as_of(), RunOptions::default()).await.unwrap_err();
        let provider = err.downcast_ref::<ScreeningError>().unwrap();
        assert_eq!(provider.status(), Some(500));
    }

    #[test]
    fn test_rank_is_stable_on_ties() {
        let mut cands = vec![
            Candidate::new("X", "x", "s"),
            Candidate::new("Y", "y", "s"),
            Candidate::new("Z", "z", "s"),
        ];
        cands[2].quantitative_score = 10.0;
        rank_candidates(&mut cands);
        let order: Vec<&str> = cands.iter().map(|c| c.ticker.as_str()).collect();
        assert_eq!(order, vec!["Z", "X", "Y"]);
    }

    #[test]
    fn test_zero_override_falls_back_to_config() {
        let config = StrategyConfig::from_yaml_str(STRATEGY).unwrap();
        let options = RunOptions {
            top_n: Some(0),
            top_k: None,
        };
        assert_eq!(options.top_n(&config), 3);
        assert_eq!(options.top_k(&config), 2);
    }
}
