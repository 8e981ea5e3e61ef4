use chrono::NaiveDate;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use screener_core::metrics::normalize_code;
use screener_core::ScreeningError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

pub mod collector;
pub mod fields;
pub mod snapshot;
pub mod statements;

pub use collector::JQuantsMarketData;
pub use snapshot::{DailyQuoteSource, SnapshotBuilder, SnapshotCache};
pub use statements::derive_statement_metrics;

const DEFAULT_BASE_URL: &str = "https://api.jquants.com/v2";
const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_ENV: &str = "JQUANTS_API_KEY";

const DEFAULT_MAX_RETRIES: u32 = 5;
const DEFAULT_TIMEOUT_SECS: u64 = 30;
/// Upper bound on pages per listing, guards against a server that never stops paginating
const DEFAULT_MAX_PAGES: usize = 100;
const BACKOFF_BASE: Duration = Duration::from_secs(1);
const BACKOFF_CAP: Duration = Duration::from_secs(8);

/// Connection settings, usually read from the environment
#[derive(Debug, Clone)]
pub struct JquantsConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for JquantsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl JquantsConfig {
    /// `JQUANTS_API_KEY`, `JQUANTS_BASE_URL`, `JQUANTS_MAX_RETRIES`, `JQUANTS_TIMEOUT_SECS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: std::env::var(API_KEY_ENV).ok(),
            base_url: std::env::var("JQUANTS_BASE_URL").unwrap_or(defaults.base_url),
            max_retries: std::env::var("JQUANTS_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_retries),
            timeout_secs: std::env::var("JQUANTS_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.timeout_secs),
        }
    }

    pub fn with_api_key(mut self, api_key: &str) -> Self {
        self.api_key = Some(api_key.to_string());
        self
    }
}

/// Wait before retry `attempt` (0-based) after a 429.
///
/// A numeric `Retry-After` (seconds) wins; otherwise exponential from one
/// second, capped at eight.
pub fn backoff_delay(attempt: u32, retry_after: Option<&str>) -> Duration {
    if let Some(secs) = retry_after
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|s| s.is_finite() && *s >= 0.0)
    {
        return Duration::from_secs_f64(secs);
    }
    let factor = 2u32.saturating_pow(attempt.min(16));
    BACKOFF_BASE.saturating_mul(factor).min(BACKOFF_CAP)
}

#[derive(Clone)]
pub struct JQuantsClient {
    api_key: String,
    base_url: String,
    client: Client,
    max_retries: u32,
    max_pages: usize,
}

impl std::fmt::Debug for JQuantsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JQuantsClient")
            .field("base_url", &self.base_url)
            .field("max_retries", &self.max_retries)
            .field("max_pages", &self.max_pages)
            .finish_non_exhaustive()
    }
}

impl JQuantsClient {
    /// Fails with `MissingCredential` before any request when no API key is configured.
    pub fn new(config: JquantsConfig) -> Result<Self, ScreeningError> {
        let api_key = config
            .api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ScreeningError::MissingCredential(API_KEY_ENV.to_string()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| Client::new());

        Ok(Self {
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            max_retries: config.max_retries,
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    pub fn from_env() -> Result<Self, ScreeningError> {
        Self::new(JquantsConfig::from_env())
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// Send a GET, retrying on 429 up to `max_retries` times.
    ///
    /// Once retries run out the last response is returned as-is so the
    /// caller's status check reports it.
    async fn send_request(&self, path: &str, query: &[(String, String)]) -> Result<reqwest::Response, ScreeningError> {
        let url = format!("{}{}", self.base_url, path);
        let mut attempt = 0u32;

        loop {
            let response = self
                .client
                .get(&url)
                .header(API_KEY_HEADER, &self.api_key)
                .query(query)
                .send()
                .await
                .map_err(|e| ScreeningError::provider("GET", path, e.status().map(|s| s.as_u16()), e.to_string()))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS || attempt >= self.max_retries {
                return Ok(response);
            }

            let hint = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok());
            let wait = backoff_delay(attempt, hint);
            tracing::warn!(
                "J-Quants 429 on {}, waiting {:.1}s before retry {}/{}",
                path,
                wait.as_secs_f64(),
                attempt + 1,
                self.max_retries
            );
            tokio::time::sleep(wait).await;
            attempt += 1;
        }
    }

    async fn get_json(&self, path: &str, query: &[(String, String)]) -> Result<Value, ScreeningError> {
        let response = self.send_request(path, query).await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ScreeningError::provider("GET", path, Some(status.as_u16()), body));
        }

        response
            .json()
            .await
            .map_err(|e| ScreeningError::provider("GET", path, Some(status.as_u16()), format!("invalid JSON: {}", e)))
    }

    /// Fetch every page of a listing endpoint and merge the row arrays.
    ///
    /// Stops when the response carries no `pagination_key` or after
    /// `max_pages` pages.
    pub async fn fetch_paginated(
        &self,
        path: &str,
        params: &[(String, String)],
    ) -> Result<Vec<Map<String, Value>>, ScreeningError> {
        let mut rows = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 0..self.max_pages {
            let mut query = params.to_vec();
            if let Some(ref c) = cursor {
                query.push((fields::PAGINATION_KEY.to_string(), c.clone()));
            }

            let body = self.get_json(path, &query).await?;
            let page_rows = fields::DATA_KEYS
                .iter()
                .find_map(|key| body.get(*key).and_then(|v| v.as_array()))
                .map(|items| items.iter().filter_map(|v| v.as_object().cloned()).collect::<Vec<_>>())
                .unwrap_or_default();
            tracing::debug!("{} page {}: {} rows", path, page + 1, page_rows.len());
            rows.extend(page_rows);

            cursor = body
                .get(fields::PAGINATION_KEY)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string);
            if cursor.is_none() {
                return Ok(rows);
            }
        }

        tracing::warn!("{}: stopped after {} pages with a cursor still pending", path, self.max_pages);
        Ok(rows)
    }

    /// Listed instruments, optionally as of a date
    pub async fn get_listed_info(&self, date: Option<NaiveDate>) -> Result<Vec<ListedInstrument>, ScreeningError> {
        let mut params = Vec::new();
        if let Some(d) = date {
            params.push(("date".to_string(), d.format("%Y-%m-%d").to_string()));
        }
        let rows = self.fetch_paginated("/equities/master", &params).await?;
        Ok(rows.iter().filter_map(ListedInstrument::from_record).collect())
    }

    /// All daily bars for one trading date. Non-trading days come back empty.
    pub async fn get_daily_quotes(&self, date: NaiveDate) -> Result<Vec<DailyQuote>, ScreeningError> {
        let params = vec![("date".to_string(), date.format("%Y-%m-%d").to_string())];
        let rows = self.fetch_paginated("/equities/bars/daily", &params).await?;
        Ok(rows.iter().filter_map(DailyQuote::from_record).collect())
    }

    /// Daily bars for one code over an inclusive date range
    pub async fn get_daily_quotes_for_code(
        &self,
        code: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyQuote>, ScreeningError> {
        let params = vec![
            ("code".to_string(), code.to_string()),
            ("from".to_string(), from.format("%Y-%m-%d").to_string()),
            ("to".to_string(), to.format("%Y-%m-%d").to_string()),
        ];
        let rows = self.fetch_paginated("/equities/bars/daily", &params).await?;
        Ok(rows.iter().filter_map(DailyQuote::from_record).collect())
    }

    /// Financial summary filings for a code, in provider order
    pub async fn get_fin_summary(&self, code: &str) -> Result<Vec<FinancialSummary>, ScreeningError> {
        let params = vec![("code".to_string(), code.to_string())];
        let rows = self.fetch_paginated("/fins/summary", &params).await?;
        Ok(rows.iter().filter_map(FinancialSummary::from_record).collect())
    }
}

/// Accepts `YYYY-MM-DD` and `YYYYMMDD`
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y%m%d"))
        .ok()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListedInstrument {
    /// Four-digit ticker
    pub code: String,
    pub company_name: String,
    pub sector: String,
    pub market_code: Option<String>,
    pub market_name: Option<String>,
}

impl ListedInstrument {
    pub fn from_record(record: &Map<String, Value>) -> Option<Self> {
        let code = normalize_code(&fields::CODE.text(record)?);
        Some(Self {
            company_name: fields::COMPANY_NAME.text(record).unwrap_or_else(|| code.clone()),
            sector: fields::SECTOR.text(record).unwrap_or_else(|| "UNKNOWN".to_string()),
            market_code: fields::MARKET_CODE.text(record),
            market_name: fields::MARKET_NAME.text(record),
            code,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyQuote {
    pub code: String,
    pub date: Option<NaiveDate>,
    pub close: Option<f64>,
    /// Traded value in JPY
    pub turnover: Option<f64>,
}

impl DailyQuote {
    pub fn from_record(record: &Map<String, Value>) -> Option<Self> {
        Some(Self {
            code: normalize_code(&fields::CODE.text(record)?),
            date: fields::DATE.text(record).as_deref().and_then(parse_date),
            close: fields::CLOSE.number(record),
            turnover: fields::TURNOVER.number(record),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub code: String,
    pub disclosed_date: Option<NaiveDate>,
    /// `FY`, `1Q`, `2Q`, `3Q`, ...
    pub period_type: Option<String>,
    pub fiscal_year_end: Option<NaiveDate>,
    pub net_sales: Option<f64>,
    pub operating_profit: Option<f64>,
    pub profit: Option<f64>,
    pub eps: Option<f64>,
    pub bps: Option<f64>,
    pub equity: Option<f64>,
    pub total_assets: Option<f64>,
    pub equity_ratio: Option<f64>,
    pub dividend_annual: Option<f64>,
    pub forecast_dividend_annual: Option<f64>,
    pub shares_outstanding: Option<f64>,
    pub treasury_shares: Option<f64>,
}

impl FinancialSummary {
    pub fn from_record(record: &Map<String, Value>) -> Option<Self> {
        Some(Self {
            code: normalize_code(&fields::CODE.text(record)?),
            disclosed_date: fields::DISCLOSED_DATE.text(record).as_deref().and_then(parse_date),
            period_type: fields::PERIOD_TYPE.text(record),
            fiscal_year_end: fields::FISCAL_YEAR_END.text(record).as_deref().and_then(parse_date),
            net_sales: fields::NET_SALES.number(record),
            operating_profit: fields::OPERATING_PROFIT.number(record),
            profit: fields::PROFIT.number(record),
            eps: fields::EPS.number(record),
            bps: fields::BPS.number(record),
            equity: fields::EQUITY.number(record),
            total_assets: fields::TOTAL_ASSETS.number(record),
            equity_ratio: fields::EQUITY_RATIO.number(record),
            dividend_annual: fields::DIVIDEND_ANNUAL.number(record),
            forecast_dividend_annual: fields::FORECAST_DIVIDEND_ANNUAL.number(record),
            shares_outstanding: fields::SHARES_OUTSTANDING.number(record),
            treasury_shares: fields::TREASURY_SHARES.number(record),
        })
    }

    pub fn is_full_year(&self) -> bool {
        self.period_type.as_deref() == Some("FY")
    }
}
