use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// ── Query dimensions ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    /// KOSPI (primary board)
    Kospi,
    /// KOSDAQ (growth board)
    Kosdaq,
}

impl Market {
    /// `sosok` query parameter on the rank page.
    pub fn code(self) -> &'static str {
        match self {
            Market::Kospi => "01",
            Market::Kosdaq => "02",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Market::Kospi => "KOSPI",
            Market::Kosdaq => "KOSDAQ",
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InvestorCategory {
    Foreign,
    Institution,
}

impl InvestorCategory {
    /// `investor_gubun` query parameter on the rank page.
    pub fn code(self) -> &'static str {
        match self {
            InvestorCategory::Foreign => "9000",
            InvestorCategory::Institution => "1000",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InvestorCategory::Foreign => "foreign",
            InvestorCategory::Institution => "institution",
        }
    }
}

impl fmt::Display for InvestorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Ticker & rank lists ───────────────────────────────────────────────────────

/// Identity is `code`; `name` is display only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ticker {
    pub code: String,
    pub name: String,
}

impl Ticker {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self { code: code.into(), name: name.into() }
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.code)
    }
}

/// One session's top net-buy list, in rank order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RankedList {
    pub market: Market,
    pub investor: InvestorCategory,
    pub day_index: usize,
    pub tickers: Vec<Ticker>,
}

impl RankedList {
    pub fn codes(&self) -> BTreeSet<&str> {
        self.tickers.iter().map(|t| t.code.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }
}

/// Tickers present on every list of the window, named and ordered as on day 0.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    pub window: usize,
    pub tickers: Vec<Ticker>,
}

impl CandidateSet {
    pub fn codes(&self) -> BTreeSet<&str> {
        self.tickers.iter().map(|t| t.code.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    pub fn truncate(&mut self, limit: usize) {
        self.tickers.truncate(limit);
    }
}

// ── Price data ────────────────────────────────────────────────────────────────

/// One trading session from the time-series provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<i64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PriceSnapshot {
    pub current_close: f64,
    /// Fraction, `0.0123` = +1.23%.
    pub latest_change_fraction: f64,
    /// Max over whatever trailing window the provider returned.
    pub high_52_week: f64,
    pub trade_date: NaiveDate,
}

impl PriceSnapshot {
    pub fn change_pct(&self) -> f64 {
        self.latest_change_fraction * 100.0
    }
}

// ── Fundamentals ──────────────────────────────────────────────────────────────

/// Each figure is independently optional; absence is not an error.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct FundamentalMetrics {
    pub per: Option<f64>,
    pub pbr: Option<f64>,
    pub roe: Option<f64>,
    pub debt_ratio: Option<f64>,
    pub dividend_yield_pct: Option<f64>,
    pub foreign_hold_ratio_pct: Option<f64>,
}

// ── Scoring output ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterRule {
    Pbr,
    Per,
    Roe,
    DebtRatio,
    DividendYield,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PassedFilter {
    pub rule: FilterRule,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredResult {
    pub ticker: Ticker,
    pub price: PriceSnapshot,
    pub fundamentals: FundamentalMetrics,
    pub score: u8,
    pub passed_filters: Vec<PassedFilter>,
}

impl ScoredResult {
    /// Close relative to the 52-week high; the enrichment step guarantees a positive high.
    pub fn price_ratio(&self) -> f64 {
        self.price.current_close / self.price.high_52_week
    }
}

// ── Run output ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunMeta {
    pub market: Market,
    pub investor: InvestorCategory,
    pub window: usize,
    pub generated_at: NaiveDateTime,
    pub candidate_count: usize,
    /// Set when cancellation or the run deadline cut enrichment short.
    pub partial: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SkippedTicker {
    pub ticker: Ticker,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScreeningRun {
    pub meta: RunMeta,
    pub results: Vec<ScoredResult>,
    pub skipped: Vec<SkippedTicker>,
}

/// Latest session of a market index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexQuote {
    pub name: String,
    pub symbol: String,
    pub close: f64,
    pub change_fraction: f64,
    pub trade_date: NaiveDate,
}

// ── Raw scraped rows ──────────────────────────────────────────────────────────

/// One `<tr>` of a rank box before cleaning.
#[derive(Debug, Clone, Default)]
pub struct RawRankRow {
    pub name: Option<String>,
    pub href: Option<String>,
}

/// One data row of the `siseJson` price series before cleaning.
#[derive(Debug, Clone, Default)]
pub struct RawPriceRow {
    pub date: Option<String>,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub volume: Option<String>,
}

/// Label-matched text cells from a company page.
#[derive(Debug, Clone, Default)]
pub struct RawFundamentals {
    pub per: Option<String>,
    pub pbr: Option<String>,
    pub roe: Option<String>,
    pub debt_ratio: Option<String>,
    pub dividend_yield: Option<String>,
    pub foreign_ratio: Option<String>,
}
