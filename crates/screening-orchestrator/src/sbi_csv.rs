//! Universe and metrics from a broker screening CSV export.

use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};
use globset::Glob;
use screener_core::metrics::{self, parse_number};
use screener_core::{
    DataSource, MarketDataSource, MarketSegment, MetricMap, ScreeningError, UniverseConfig, UniverseRow,
};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const DEFAULT_CSV_DIR: &str = "data/raw/sbi_screening";
pub const DEFAULT_CSV_GLOB: &str = "*.csv";

const CODE_COLUMN: &str = "コード";
const NAME_COLUMN: &str = "銘柄名";
const MARKET_COLUMN: &str = "市場";
const UNKNOWN_MARKET: &str = "UNKNOWN";

/// Header -> (metric, multiplier to JPY or percent units)
const METRIC_COLUMNS: &[(&str, &str, f64)] = &[
    ("現在値", metrics::LATEST_CLOSE, 1.0),
    ("PER(株価収益率)(倍)", metrics::PER, 1.0),
    ("PBR(株価純資産倍率)(倍)", metrics::PBR, 1.0),
    ("配当利回り(%)", metrics::DIVIDEND_YIELD, 1.0),
    ("ROE(自己資本利益率)(%)", metrics::ROE, 1.0),
    ("自己資本比率(%)", metrics::EQUITY_RATIO, 1.0),
    ("有利子負債自己資本比率(%)", metrics::NET_DE_RATIO, 1.0),
    ("売上高変化率(%)", metrics::REVENUE_CAGR_3Y, 1.0),
    ("経常利益変化率(%)", metrics::OP_INCOME_CAGR_3Y, 1.0),
    ("時価総額(百万円)", metrics::MARKET_CAP_JPY, 1_000_000.0),
    ("平均売買代金(千円)", metrics::AVG_TURNOVER_20D, 1_000.0),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningRecord {
    pub ticker: String,
    pub company_name: String,
    pub market: String,
    pub metrics: MetricMap,
}

/// Parse the CSV text. A leading BOM is ignored; rows without a code are skipped.
pub fn parse_screening_csv(text: &str) -> Result<Vec<ScreeningRecord>, ScreeningError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| ScreeningError::InvalidData(format!("Unreadable CSV header: {}", e)))?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let code_idx = column(CODE_COLUMN)
        .ok_or_else(|| ScreeningError::InvalidData(format!("CSV has no '{}' column", CODE_COLUMN)))?;
    let name_idx = column(NAME_COLUMN);
    let market_idx = column(MARKET_COLUMN);
    let metric_idx: Vec<(usize, &str, f64)> = METRIC_COLUMNS
        .iter()
        .filter_map(|(header, metric, scale)| column(*header).map(|i| (i, *metric, *scale)))
        .collect();

    let mut records = Vec::new();
    for result in reader.records() {
        let row = result.map_err(|e| ScreeningError::InvalidData(format!("Bad CSV row: {}", e)))?;
        let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(str::trim).unwrap_or("");

        let ticker = cell(Some(code_idx)).to_string();
        if ticker.is_empty() {
            continue;
        }
        let company_name = match cell(name_idx) {
            "" => ticker.clone(),
            name => name.to_string(),
        };
        let market = match cell(market_idx) {
            "" => UNKNOWN_MARKET.to_string(),
            m => m.to_string(),
        };

        let mut values = MetricMap::new();
        for (idx, metric, scale) in &metric_idx {
            if let Some(v) = row.get(*idx).and_then(parse_number) {
                values.insert(metric.to_string(), v * scale);
            }
        }

        records.push(ScreeningRecord {
            ticker,
            company_name,
            market,
            metrics: values,
        });
    }
    Ok(records)
}

/// `csv_path` when it exists, else the lexicographically last match of
/// `csv_glob` inside `csv_dir`.
pub fn resolve_csv_path(source: &DataSource) -> Result<PathBuf, ScreeningError> {
    if let Some(explicit) = source.constraint_str("csv_path") {
        let path = PathBuf::from(explicit);
        if path.is_file() {
            return Ok(path);
        }
        tracing::warn!("csv_path {} does not exist, falling back to csv_dir", path.display());
    }

    let dir = PathBuf::from(source.constraint_str("csv_dir").unwrap_or(DEFAULT_CSV_DIR));
    let pattern = source.constraint_str("csv_glob").unwrap_or(DEFAULT_CSV_GLOB);
    let matcher = Glob::new(pattern)
        .map_err(|e| ScreeningError::Config(format!("Invalid csv_glob '{}': {}", pattern, e)))?
        .compile_matcher();

    let mut files: Vec<PathBuf> = std::fs::read_dir(&dir)
        .map_err(|e| ScreeningError::Config(format!("Cannot read csv_dir {}: {}", dir.display(), e)))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file())
        .filter(|p| p.file_name().map(|n| matcher.is_match(n)).unwrap_or(false))
        .collect();
    files.sort();

    files
        .pop()
        .ok_or_else(|| ScreeningError::Config(format!("No screening CSV found: {}/{}", dir.display(), pattern)))
}

fn digits(bytes: &[u8]) -> bool {
    bytes.iter().all(u8::is_ascii_digit)
}

fn to_date(y: &[u8], m: &[u8], d: &[u8]) -> Option<NaiveDate> {
    let num = |b: &[u8]| std::str::from_utf8(b).ok()?.parse::<u32>().ok();
    NaiveDate::from_ymd_opt(num(y)? as i32, num(m)?, num(d)?)
}

/// First `20YYMMDD` in a file name, else the first `20YY-MM-DD`.
///
/// An impossible date in the first matching form yields `None`.
pub fn date_from_filename(name: &str) -> Option<NaiveDate> {
    let b = name.as_bytes();

    let compact = (0..b.len().saturating_sub(7)).find(|&i| b[i..i + 2] == *b"20" && digits(&b[i..i + 8]));
    if let Some(i) = compact {
        return to_date(&b[i..i + 4], &b[i + 4..i + 6], &b[i + 6..i + 8]);
    }

    let dashed = (0..b.len().saturating_sub(9)).find(|&i| {
        b[i..i + 2] == *b"20"
            && digits(&b[i..i + 4])
            && b[i + 4] == b'-'
            && digits(&b[i + 5..i + 7])
            && b[i + 7] == b'-'
            && digits(&b[i + 8..i + 10])
    });
    dashed.and_then(|i| to_date(&b[i..i + 4], &b[i + 5..i + 7], &b[i + 8..i + 10]))
}

/// As-of date and file from the newest CSV under `data_dir`.
///
/// Dated file names win over modification times; among dated files the
/// latest date wins, then the latest mtime, then the path.
pub fn resolve_as_of(data_dir: &Path) -> Result<(NaiveDate, PathBuf), ScreeningError> {
    let mut dated: Vec<(NaiveDate, std::time::SystemTime, PathBuf)> = Vec::new();
    let mut undated: Vec<(std::time::SystemTime, PathBuf)> = Vec::new();

    for entry in WalkDir::new(data_dir).into_iter().filter_map(Result::ok) {
        let path = entry.path();
        let is_csv = path.extension().map(|e| e == "csv").unwrap_or(false);
        if !entry.file_type().is_file() || !is_csv {
            continue;
        }
        let modified = entry
            .metadata()
            .ok()
            .and_then(|m| m.modified().ok())
            .unwrap_or(std::time::UNIX_EPOCH);
        let name = entry.file_name().to_string_lossy();
        match date_from_filename(&name) {
            Some(date) => dated.push((date, modified, path.to_path_buf())),
            None => undated.push((modified, path.to_path_buf())),
        }
    }

    if let Some((date, _, path)) = dated.into_iter().max() {
        return Ok((date, path));
    }
    match undated.into_iter().max() {
        Some((modified, path)) => {
            let date = DateTime::<Local>::from(modified).date_naive();
            Ok((date, path))
        }
        None => Err(ScreeningError::Config(format!("No CSV files found under {}", data_dir.display()))),
    }
}

/// Market data backed by a screening CSV. The file is read once per instance.
pub struct SbiCsvMarketData {
    source: DataSource,
    universe: UniverseConfig,
    segment: MarketSegment,
    records: Option<Vec<ScreeningRecord>>,
}

impl SbiCsvMarketData {
    pub fn new(source: DataSource, universe: UniverseConfig) -> Self {
        let segment = MarketSegment::parse(&universe.market);
        Self {
            source,
            universe,
            segment,
            records: None,
        }
    }

    fn records(&mut self) -> Result<&[ScreeningRecord], ScreeningError> {
        if self.records.is_none() {
            let path = resolve_csv_path(&self.source)?;
            let text = std::fs::read_to_string(&path)?;
            let records = parse_screening_csv(&text)?;
            tracing::info!("Loaded {} rows from {}", records.len(), path.display());
            self.records = Some(records);
        }
        Ok(self.records.as_deref().unwrap_or_default())
    }

    fn passes_market(&self, record: &ScreeningRecord) -> bool {
        self.segment.matches(None, Some(&record.market))
    }

    /// Turnover must be known and above the floor; market cap only when known.
    fn passes_liquidity(&self, record: &ScreeningRecord) -> bool {
        let Some(turnover) = record.metrics.get(metrics::AVG_TURNOVER_20D) else {
            return false;
        };
        if *turnover < self.universe.min_avg_trading_value_20d_jpy {
            return false;
        }
        match record.metrics.get(metrics::MARKET_CAP_JPY) {
            Some(cap) => *cap >= self.universe.min_market_cap_jpy,
            None => true,
        }
    }
}

#[async_trait]
impl MarketDataSource for SbiCsvMarketData {
    async fn fetch_universe(&mut self, as_of: NaiveDate) -> Result<Vec<UniverseRow>, ScreeningError> {
        let total = self.records()?.len();
        let records = self.records.as_deref().unwrap_or_default();

        let mut seen = HashSet::new();
        let rows: Vec<UniverseRow> = records
            .iter()
            .filter(|r| self.passes_market(r) && self.passes_liquidity(r))
            .filter(|r| seen.insert(r.ticker.clone()))
            .map(|r| UniverseRow {
                ticker: r.ticker.clone(),
                company_name: r.company_name.clone(),
                // The export has no sector column; the market label groups peers
                sector: r.market.clone(),
            })
            .collect();

        tracing::info!("Universe as of {}: {} of {} CSV rows", as_of, rows.len(), total);
        Ok(rows)
    }

    async fn fetch_quant_metrics(
        &mut self,
        _as_of: NaiveDate,
        tickers: &[String],
    ) -> Result<HashMap<String, MetricMap>, ScreeningError> {
        let wanted: HashSet<&str> = tickers.iter().map(String::as_str).collect();
        let out = self
            .records()?
            .iter()
            .filter(|r| wanted.contains(r.ticker.as_str()))
            .map(|r| (r.ticker.clone(), r.metrics.clone()))
            .collect();
        Ok(out)
    }
}
