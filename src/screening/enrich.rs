use crate::error::EnrichError;
use crate::models::{FundamentalMetrics, PriceBar, PriceSnapshot, Ticker};
use crate::scraper::{FundamentalsSource, TimeSeriesSource};
use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use tracing::debug;

/// Derive the latest close, its change against the prior session and the
/// trailing high from a chronological series.
///
/// The "52-week" high is the max over whatever the provider returned for the
/// lookback window, not an exact trading-calendar year.
pub fn snapshot_from_bars(bars: &[PriceBar]) -> Result<PriceSnapshot, EnrichError> {
    let [.., prev, last] = bars else {
        return Err(EnrichError::InsufficientHistory { observations: bars.len() });
    };

    if prev.close <= 0.0 {
        return Err(EnrichError::DegeneratePreviousClose { close: prev.close });
    }

    let high_52_week = bars
        .iter()
        .map(|b| b.high.map_or(b.close, |h| h.max(b.close)))
        .fold(f64::NEG_INFINITY, f64::max);

    if !high_52_week.is_finite() || high_52_week <= 0.0 {
        return Err(EnrichError::DegenerateHigh { high: high_52_week });
    }

    Ok(PriceSnapshot {
        current_close: last.close,
        latest_change_fraction: (last.close - prev.close) / prev.close,
        high_52_week,
        trade_date: last.date,
    })
}

/// Price history, then company figures, for one candidate.
pub struct FundamentalsFetcher {
    series: Arc<dyn TimeSeriesSource>,
    fundamentals: Arc<dyn FundamentalsSource>,
    lookback_days: i64,
}

impl FundamentalsFetcher {
    pub fn new(
        series: Arc<dyn TimeSeriesSource>,
        fundamentals: Arc<dyn FundamentalsSource>,
        lookback_days: i64,
    ) -> Self {
        Self { series, fundamentals, lookback_days }
    }

    pub async fn enrich(
        &self,
        ticker: &Ticker,
        today: NaiveDate,
    ) -> Result<(PriceSnapshot, FundamentalMetrics), EnrichError> {
        let start = today - Duration::days(self.lookback_days);

        // Sequential, so one worker permit is one upstream request.
        let bars = self.series.fetch_daily_series(&ticker.code, start, today).await?;
        let snapshot = snapshot_from_bars(&bars)?;
        debug!(
            "{}: close {} ({:+.2}%), high {} over {} sessions",
            ticker,
            snapshot.current_close,
            snapshot.change_pct(),
            snapshot.high_52_week,
            bars.len()
        );

        let metrics = self.fundamentals.fetch_fundamentals(&ticker.code).await?;
        Ok((snapshot, metrics))
    }

    /// Latest session only; used for index quotes.
    pub async fn latest_snapshot(
        &self,
        symbol: &str,
        today: NaiveDate,
        lookback_days: i64,
    ) -> Result<PriceSnapshot, EnrichError> {
        let bars = self
            .series
            .fetch_daily_series(symbol, today - Duration::days(lookback_days), today)
            .await?;
        snapshot_from_bars(&bars)
    }
}
