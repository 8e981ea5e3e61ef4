//! Valuation and quality metrics derived from financial summary filings.

use chrono::Datelike;
use screener_core::metrics;
use screener_core::MetricMap;
use std::collections::BTreeMap;

use crate::FinancialSummary;

/// Furthest fiscal-year gap used for the growth CAGRs
const CAGR_MAX_YEARS: i32 = 3;

fn fiscal_year(summary: &FinancialSummary) -> Option<i32> {
    summary
        .fiscal_year_end
        .or(summary.disclosed_date)
        .map(|d| d.year())
}

/// Latest full-year filing per fiscal year; later disclosures (restatements) win.
fn full_year_by_fiscal_year(summaries: &[FinancialSummary]) -> BTreeMap<i32, &FinancialSummary> {
    let mut ordered: Vec<&FinancialSummary> = summaries.iter().filter(|s| s.is_full_year()).collect();
    ordered.sort_by_key(|s| s.disclosed_date);

    let mut by_year = BTreeMap::new();
    for summary in ordered {
        if let Some(year) = fiscal_year(summary) {
            by_year.insert(year, summary);
        }
    }
    by_year
}

fn cagr(latest: f64, older: f64, years: i32) -> Option<f64> {
    if latest <= 0.0 || older <= 0.0 || years <= 0 {
        return None;
    }
    let growth = ((latest / older).powf(1.0 / f64::from(years)) - 1.0) * 100.0;
    growth.is_finite().then_some(growth)
}

fn insert_finite(map: &mut MetricMap, key: &str, value: Option<f64>) {
    if let Some(v) = value.filter(|v| v.is_finite()) {
        map.insert(key.to_string(), v);
    }
}

/// Statement-derived metrics for one ticker. `close` feeds the price multiples;
/// without it only price-independent metrics are produced.
pub fn derive_statement_metrics(summaries: &[FinancialSummary], close: Option<f64>) -> MetricMap {
    let mut out = MetricMap::new();
    let by_year = full_year_by_fiscal_year(summaries);

    let latest = match by_year.values().next_back() {
        Some(s) => *s,
        None => match summaries.iter().max_by_key(|s| s.disclosed_date) {
            Some(s) => s,
            None => return out,
        },
    };
    let close = close.filter(|c| *c > 0.0);

    if let Some(price) = close {
        insert_finite(&mut out, metrics::PER, latest.eps.filter(|e| *e > 0.0).map(|eps| price / eps));
        insert_finite(&mut out, metrics::PBR, latest.bps.filter(|b| *b > 0.0).map(|bps| price / bps));

        // Forecast dividends live on the newest filing, which may be a quarter
        let newest = summaries.iter().max_by_key(|s| s.disclosed_date).unwrap_or(latest);
        let dps = newest
            .forecast_dividend_annual
            .or(latest.dividend_annual)
            .filter(|d| *d >= 0.0);
        insert_finite(&mut out, metrics::DIVIDEND_YIELD, dps.map(|d| d / price * 100.0));

        let shares = latest
            .shares_outstanding
            .map(|s| s - latest.treasury_shares.unwrap_or(0.0))
            .filter(|s| *s > 0.0);
        insert_finite(&mut out, metrics::MARKET_CAP_JPY, shares.map(|s| s * price));
    }

    if let (Some(profit), Some(equity)) = (latest.profit, latest.equity.filter(|e| *e > 0.0)) {
        insert_finite(&mut out, metrics::ROE, Some(profit / equity * 100.0));
    }

    // Ratio is reported as a fraction by the API; older exports use percent
    let equity_ratio = latest
        .equity_ratio
        .map(|r| if r.abs() <= 1.0 { r * 100.0 } else { r })
        .or_else(|| match (latest.equity, latest.total_assets) {
            (Some(eq), Some(ta)) if ta > 0.0 => Some(eq / ta * 100.0),
            _ => None,
        });
    insert_finite(&mut out, metrics::EQUITY_RATIO, equity_ratio);

    if let Some(latest_year) = fiscal_year(latest) {
        let base = by_year
            .range((latest_year - CAGR_MAX_YEARS)..latest_year)
            .next()
            .map(|(year, s)| (latest_year - *year, *s));
        if let Some((years, older)) = base {
            if let (Some(now), Some(then)) = (latest.net_sales, older.net_sales) {
                insert_finite(&mut out, metrics::REVENUE_CAGR_3Y, cagr(now, then, years));
            }
            if let (Some(now), Some(then)) = (latest.operating_profit, older.operating_profit) {
                insert_finite(&mut out, metrics::OP_INCOME_CAGR_3Y, cagr(now, then, years));
            }
        }
    }

    out
}
