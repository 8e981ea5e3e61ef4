//! Canonical metric ids and the field-name resolver.
//!
//! Providers spell the same quantity in several ways (API versions, CSV
//! exports). Each canonical field is described by an ordered list of
//! candidate keys; the resolver returns the first one holding a usable value.

use serde_json::{Map, Value};

pub const LATEST_CLOSE: &str = "latest_close";
pub const AVG_TURNOVER_20D: &str = "avg_turnover_20d";
pub const MARKET_CAP_JPY: &str = "market_cap_jpy";
pub const PER: &str = "per";
pub const PBR: &str = "pbr";
pub const DIVIDEND_YIELD: &str = "dividend_yield";
pub const ROE: &str = "roe";
pub const EQUITY_RATIO: &str = "equity_ratio";
pub const NET_DE_RATIO: &str = "net_de_ratio";
pub const REVENUE_CAGR_3Y: &str = "revenue_cagr_3y";
pub const OP_INCOME_CAGR_3Y: &str = "op_income_cagr_3y";

/// Metrics that move with the share price and form the "price-now" track.
pub const PRICE_NOW_METRICS: &[&str] = &[PBR, PER, DIVIDEND_YIELD];

pub fn is_price_now_metric(id: &str) -> bool {
    PRICE_NOW_METRICS.contains(&id)
}

/// A canonical field and the keys it may appear under, in priority order.
#[derive(Debug, Clone, Copy)]
pub struct FieldVariants {
    pub canonical: &'static str,
    pub keys: &'static [&'static str],
}

impl FieldVariants {
    pub const fn new(canonical: &'static str, keys: &'static [&'static str]) -> Self {
        Self { canonical, keys }
    }

    pub fn number(&self, record: &Map<String, Value>) -> Option<f64> {
        resolve_number(record, self.keys)
    }

    pub fn text(&self, record: &Map<String, Value>) -> Option<String> {
        resolve_text(record, self.keys)
    }
}

/// First key whose value is numeric (JSON number or numeric string).
pub fn resolve_number(record: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|key| record.get(*key))
        .find_map(value_as_f64)
}

/// First key holding a non-blank string (numbers are rendered as text).
pub fn resolve_text(record: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|key| record.get(*key)).find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Lenient numeric parse: thousands separators and `%` are stripped, dash-like
/// placeholders and `N/A` count as missing.
pub fn parse_number(raw: &str) -> Option<f64> {
    let text = raw.trim();
    if text.is_empty() || matches!(text, "-" | "--" | "---" | "N/A" | "n/a") {
        return None;
    }
    let cleaned: String = text.chars().filter(|c| *c != ',' && *c != '%').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Provider codes are five digits with a trailing check digit `0`
/// (`72030`); the screener keys tickers by the four-digit form.
pub fn normalize_code(code: &str) -> String {
    let code = code.trim();
    if code.len() == 5 && code.ends_with('0') && code.is_ascii() {
        code[..4].to_string()
    } else {
        code.to_string()
    }
}
