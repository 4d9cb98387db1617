pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::ScraperConfig;
use crate::error::SourceError;
use crate::models::{FundamentalMetrics, InvestorCategory, Market, PriceBar, RankedList};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, info, warn};
use url::Url;

use self::cleaner::{clean_fundamentals, clean_price_rows, clean_rank_rows};
use self::http_client::HttpClient;
use self::parsers::{parse_fundamentals_page, parse_price_series, parse_rank_page};

// ── Source traits ─────────────────────────────────────────────────────────────

/// Top net-buy list for one session.
#[async_trait]
pub trait RankSource: Send + Sync {
    async fn fetch_rank_list(
        &self,
        market: Market,
        investor: InvestorCategory,
        day_index: usize,
    ) -> Result<RankedList, SourceError>;
}

/// Chronological daily series for a ticker code or index symbol.
#[async_trait]
pub trait TimeSeriesSource: Send + Sync {
    async fn fetch_daily_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, SourceError>;
}

/// Point-in-time valuation/quality figures for a ticker.
#[async_trait]
pub trait FundamentalsSource: Send + Sync {
    async fn fetch_fundamentals(&self, code: &str) -> Result<FundamentalMetrics, SourceError>;
}

// ── Naver Finance scraper ─────────────────────────────────────────────────────

pub struct NaverScraper {
    client: HttpClient,
    base_url: Url,
    chart_url: String,
}

impl NaverScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let base_url = Url::parse(config.base_url.trim_end_matches('/'))
            .with_context(|| format!("Invalid base_url {:?}", config.base_url))?;

        Ok(Self {
            client: HttpClient::new(config)?,
            base_url,
            chart_url: config.chart_url.trim_end_matches('/').to_string(),
        })
    }

    /// Deal-rank iframe; every session box for the query lives on this one page.
    fn rank_url(&self, market: Market, investor: InvestorCategory) -> String {
        format!(
            "{}/sise/sise_deal_rank_iframe.naver?sosok={}&investor_gubun={}&type=buy",
            self.base_url.as_str().trim_end_matches('/'),
            market.code(),
            investor.code()
        )
    }

    fn company_url(&self, code: &str) -> String {
        format!("{}/item/main.naver?code={}", self.base_url.as_str().trim_end_matches('/'), code)
    }

    fn series_url(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/siseJson.naver?symbol={}&requestType=1&startTime={}&endTime={}&timeframe=day",
            self.chart_url,
            symbol,
            start.format("%Y%m%d"),
            end.format("%Y%m%d")
        )
    }
}

#[async_trait]
impl RankSource for NaverScraper {
    async fn fetch_rank_list(
        &self,
        market: Market,
        investor: InvestorCategory,
        day_index: usize,
    ) -> Result<RankedList, SourceError> {
        let url = self.rank_url(market, investor);
        debug!("Fetching {} {} rank list, day {}", market, investor, day_index);

        let rows = self
            .client
            .fetch_with(&url, |html| parse_rank_page(html, day_index))
            .await?;

        let tickers = clean_rank_rows(rows, &self.base_url);
        info!("{} {} day {}: {} ranked tickers", market, investor, day_index, tickers.len());

        Ok(RankedList { market, investor, day_index, tickers })
    }
}

#[async_trait]
impl TimeSeriesSource for NaverScraper {
    async fn fetch_daily_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceBar>, SourceError> {
        let url = self.series_url(symbol, start, end);
        let rows = self
            .client
            .fetch_with(&url, |body| Ok(parse_price_series(body)))
            .await?;

        let bars = clean_price_rows(rows);
        if bars.is_empty() {
            warn!("{}: no price rows between {} and {}", symbol, start, end);
        }
        debug!("{}: {} bars", symbol, bars.len());
        Ok(bars)
    }
}

#[async_trait]
impl FundamentalsSource for NaverScraper {
    async fn fetch_fundamentals(&self, code: &str) -> Result<FundamentalMetrics, SourceError> {
        let url = self.company_url(code);
        let raw = self.client.fetch_with(&url, parse_fundamentals_page).await?;

        let metrics = clean_fundamentals(&raw);
        debug!("{}: {:?}", code, metrics);
        Ok(metrics)
    }
}
