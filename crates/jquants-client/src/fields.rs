//! Provider field-name variants, newest API spelling first.

use screener_core::metrics::FieldVariants;

pub const CODE: FieldVariants = FieldVariants::new("code", &["Code", "LocalCode", "code"]);
pub const DATE: FieldVariants = FieldVariants::new("date", &["Date", "date"]);

// Listed instruments
pub const COMPANY_NAME: FieldVariants =
    FieldVariants::new("company_name", &["CoName", "CompanyName", "CoNameEn", "CompanyNameEnglish"]);
pub const SECTOR: FieldVariants =
    FieldVariants::new("sector", &["S33Nm", "Sector33CodeName", "S17Nm", "Sector17CodeName"]);
pub const MARKET_CODE: FieldVariants = FieldVariants::new("market_code", &["Mkt", "MarketCode"]);
pub const MARKET_NAME: FieldVariants = FieldVariants::new("market_name", &["MktNm", "MarketCodeName"]);

// Daily bars. Unadjusted close first: it is compared against per-share figures.
pub const CLOSE: FieldVariants = FieldVariants::new("close", &["C", "Close", "AdjC", "AdjustmentClose"]);
pub const TURNOVER: FieldVariants = FieldVariants::new("turnover", &["Va", "TurnoverValue"]);

// Financial summaries
pub const DISCLOSED_DATE: FieldVariants = FieldVariants::new("disclosed_date", &["DiscDate", "DisclosedDate"]);
pub const PERIOD_TYPE: FieldVariants = FieldVariants::new("period_type", &["CurPerType", "TypeOfCurrentPeriod"]);
pub const FISCAL_YEAR_END: FieldVariants =
    FieldVariants::new("fiscal_year_end", &["CurFYEn", "CurrentFiscalYearEndDate"]);
pub const NET_SALES: FieldVariants = FieldVariants::new("net_sales", &["Sales", "NetSales"]);
pub const OPERATING_PROFIT: FieldVariants = FieldVariants::new("operating_profit", &["OP", "OperatingProfit"]);
pub const PROFIT: FieldVariants = FieldVariants::new("profit", &["NP", "Profit"]);
pub const EPS: FieldVariants = FieldVariants::new("eps", &["EPS", "EarningsPerShare"]);
pub const BPS: FieldVariants = FieldVariants::new("bps", &["BPS", "BookValuePerShare"]);
pub const EQUITY: FieldVariants = FieldVariants::new("equity", &["Eq", "Equity"]);
pub const TOTAL_ASSETS: FieldVariants = FieldVariants::new("total_assets", &["TA", "TotalAssets"]);
pub const EQUITY_RATIO: FieldVariants = FieldVariants::new("equity_ratio", &["EqAR", "EquityToAssetRatio"]);
pub const DIVIDEND_ANNUAL: FieldVariants =
    FieldVariants::new("dividend_annual", &["DivAnn", "ResultDividendPerShareAnnual"]);
pub const FORECAST_DIVIDEND_ANNUAL: FieldVariants =
    FieldVariants::new("forecast_dividend_annual", &["FDivAnn", "ForecastDividendPerShareAnnual"]);
pub const SHARES_OUTSTANDING: FieldVariants = FieldVariants::new(
    "shares_outstanding",
    &["ShOutFY", "NumberOfIssuedAndOutstandingSharesAtTheEndOfFiscalYearIncludingTreasuryStock"],
);
pub const TREASURY_SHARES: FieldVariants =
    FieldVariants::new("treasury_shares", &["TrShFY", "NumberOfTreasuryStockAtTheEndOfFiscalYear"]);

/// Keys that may hold the row array of a paginated response
pub const DATA_KEYS: &[&str] = &["data", "info", "daily_quotes", "statements"];
pub const PAGINATION_KEY: &str = "pagination_key";
