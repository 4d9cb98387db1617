//! Pipeline orchestrator: ties rank pages → consecutive filter → enrichment →
//! scoring → ranking together.
//!
//! ## Run phases
//!
//! `run()`:
//!   1. Fetch the rank list for every day index of the window concurrently,
//!      then reassemble by day index (order matters for the intersection).
//!   2. Intersect into the candidate set (day-0 names and order).
//!   3. Enrich every candidate through a bounded worker pool; a ticker that
//!      fails is logged and skipped, never fatal.
//!   4. Score, then rank by score (stable).
//!
//! Cancellation (Ctrl-C or the run deadline) aborts outstanding tasks and
//! returns whatever was fully scored, flagged `partial`.

pub mod cancel;

use crate::config::{AppConfig, PipelineConfig};
use crate::error::{EnrichError, ScreenError, SourceError};
use crate::models::{
    CandidateSet, FundamentalMetrics, IndexQuote, InvestorCategory, Market, PriceSnapshot,
    RankedList, RunMeta, ScoredResult, ScreeningRun, SkippedTicker, Ticker,
};
use crate::scraper::{FundamentalsSource, NaverScraper, RankSource, TimeSeriesSource};
use crate::screening::{self, FundamentalsFetcher};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, warn};

pub use self::cancel::CancelSignal;

/// Composite indices shown by the market snapshot.
const INDICES: [(&str, &str); 2] = [("KOSPI", "KOSPI Composite"), ("KOSDAQ", "KOSDAQ Composite")];
const INDEX_LOOKBACK_DAYS: i64 = 14;

#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub market: Market,
    pub investor: InvestorCategory,
    /// Consecutive sessions a ticker must be ranked on.
    pub window: usize,
    pub candidate_limit: Option<usize>,
}

type EnrichOutcome = Result<(PriceSnapshot, FundamentalMetrics), EnrichError>;

pub struct Pipeline {
    config: PipelineConfig,
    ranks: Arc<dyn RankSource>,
    fetcher: Arc<FundamentalsFetcher>,
}

impl Pipeline {
    /// Production wiring: one Naver scraper (one HTTP client) behind all three sources.
    pub fn new(config: &AppConfig) -> Result<Self> {
        let scraper = Arc::new(
            NaverScraper::new(&config.scraper).context("Failed to build scraper")?,
        );

        Ok(Self::with_sources(
            config.pipeline.clone(),
            scraper.clone(),
            scraper.clone(),
            scraper,
        ))
    }

    pub fn with_sources(
        config: PipelineConfig,
        ranks: Arc<dyn RankSource>,
        series: Arc<dyn TimeSeriesSource>,
        fundamentals: Arc<dyn FundamentalsSource>,
    ) -> Self {
        let fetcher = Arc::new(FundamentalsFetcher::new(series, fundamentals, config.lookback_days));
        Self { config, ranks, fetcher }
    }

    pub async fn run(
        &self,
        request: &ScanRequest,
        mut cancel: CancelSignal,
    ) -> Result<ScreeningRun, ScreenError> {
        if request.window == 0 {
            return Err(ScreenError::EmptyWindow);
        }

        let today = Local::now().date_naive();
        let mut run = ScreeningRun {
            meta: RunMeta {
                market: request.market,
                investor: request.investor,
                window: request.window,
                generated_at: Local::now().naive_local(),
                candidate_count: 0,
                partial: false,
            },
            results: Vec::new(),
            skipped: Vec::new(),
        };

        // ── 1. Rank lists for day 0..window ───────────────────────────────────
        info!(
            "=== Step 1: {} {} rank lists for {} session(s) ===",
            request.market, request.investor, request.window
        );
        let Some(lists) = self.fetch_rank_lists(request, &mut cancel).await? else {
            warn!("Run cancelled while fetching rank lists");
            run.meta.partial = true;
            return Ok(run);
        };

        // ── 2. Consecutive filter ─────────────────────────────────────────────
        let mut candidates = screening::intersect(&lists, request.window)?;
        info!(
            "=== Step 2: {} ticker(s) ranked on all {} session(s) ===",
            candidates.len(),
            candidates.window
        );
        if candidates.is_empty() {
            info!("No consecutive net-buy candidates; nothing to enrich");
            return Ok(run);
        }
        if let Some(limit) = request.candidate_limit.or(self.config.candidate_limit) {
            if candidates.len() > limit {
                info!("Limiting candidates to the top {} by latest rank", limit);
                candidates.truncate(limit);
            }
        }
        run.meta.candidate_count = candidates.len();
        debug!("Candidates: {:?}", candidates.codes());

        if cancel.is_cancelled() {
            warn!("Run cancelled before enrichment");
            run.meta.partial = true;
            return Ok(run);
        }

        // ── 3+4. Enrich, score ────────────────────────────────────────────────
        info!("=== Step 3: Enriching {} candidate(s) ===", candidates.len());
        let (results, skipped, partial) = self.enrich_candidates(&candidates, today, &mut cancel).await;

        // ── 5. Rank ───────────────────────────────────────────────────────────
        run.results = screening::rank(results);
        run.skipped = skipped;
        run.meta.partial = partial;

        info!(
            "=== Done: {} scored | {} skipped{} ===",
            run.results.len(),
            run.skipped.len(),
            if partial { " | PARTIAL (cancelled)" } else { "" }
        );
        Ok(run)
    }

    /// `Ok(None)` when cancelled. A failed day 0 is fatal; a failure on a
    /// later day stops collection there and leaves a short window for the
    /// filter to reject.
    async fn fetch_rank_lists(
        &self,
        request: &ScanRequest,
        cancel: &mut CancelSignal,
    ) -> Result<Option<Vec<RankedList>>, ScreenError> {
        let sem = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let mut handles = Vec::with_capacity(request.window);

        for day_index in 0..request.window {
            let ranks = Arc::clone(&self.ranks);
            let sem = Arc::clone(&sem);
            let (market, investor) = (request.market, request.investor);

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await.ok();
                ranks.fetch_rank_list(market, investor, day_index).await
            });
            handles.push((day_index, handle));
        }

        let mut lists = Vec::with_capacity(request.window);
        let mut pending = handles.into_iter();

        while let Some((day_index, mut handle)) = pending.next() {
            let joined = tokio::select! {
                joined = &mut handle => joined,
                _ = cancel.cancelled() => {
                    handle.abort();
                    abort_remaining(&mut pending);
                    return Ok(None);
                }
            };

            let outcome = joined.unwrap_or_else(|e| {
                error!("Task panic for day {}: {}", day_index, e);
                Err(SourceError::Unavailable(format!("rank task failed: {}", e)))
            });

            match outcome {
                Ok(list) => lists.push(list),
                Err(e) if day_index == 0 => {
                    abort_remaining(&mut pending);
                    return Err(ScreenError::NoSeedData(e));
                }
                Err(e) => {
                    warn!("Day {}: {}; history ends after {} session(s)", day_index, e, day_index);
                    abort_remaining(&mut pending);
                    break;
                }
            }
        }

        Ok(Some(lists))
    }

    /// Bounded fan-out over candidates. Results come back in candidate order;
    /// the flag is set when cancellation cut the phase short.
    async fn enrich_candidates(
        &self,
        candidates: &CandidateSet,
        today: NaiveDate,
        cancel: &mut CancelSignal,
    ) -> (Vec<ScoredResult>, Vec<SkippedTicker>, bool) {
        let sem = Arc::new(Semaphore::new(self.config.effective_concurrency()));
        let total = candidates.len();
        let mut handles: Vec<(Ticker, JoinHandle<EnrichOutcome>)> = Vec::with_capacity(total);

        for ticker in &candidates.tickers {
            let fetcher = Arc::clone(&self.fetcher);
            let sem = Arc::clone(&sem);
            let task_ticker = ticker.clone();

            let handle = tokio::spawn(async move {
                let _permit = sem.acquire().await.ok();
                fetcher.enrich(&task_ticker, today).await
            });
            handles.push((ticker.clone(), handle));
        }

        let mut results = Vec::with_capacity(total);
        let mut skipped = Vec::new();
        let mut cancelled = false;

        for (i, (ticker, mut handle)) in handles.into_iter().enumerate() {
            if !cancelled {
                tokio::select! {
                    joined = &mut handle => {
                        debug!("({}/{}) {} settled", i + 1, total, ticker);
                        settle(ticker, joined, &mut results, &mut skipped);
                        continue;
                    }
                    _ = cancel.cancelled() => {
                        warn!("Cancelled after {}/{} candidate(s); keeping finished work", i, total);
                        cancelled = true;
                    }
                }
            }

            // Cancelled: keep what already finished, stop the rest.
            if handle.is_finished() {
                settle(ticker, handle.await, &mut results, &mut skipped);
            } else {
                handle.abort();
                debug!("{}: aborted", ticker);
            }
        }

        (results, skipped, cancelled)
    }

    /// One session box of the rank page, as-is.
    pub async fn rank_list(
        &self,
        market: Market,
        investor: InvestorCategory,
        day_index: usize,
    ) -> Result<RankedList, SourceError> {
        self.ranks.fetch_rank_list(market, investor, day_index).await
    }

    /// Latest close/change of the composite indices; failures are skipped.
    pub async fn market_snapshot(&self) -> Vec<IndexQuote> {
        let today = Local::now().date_naive();
        let mut quotes = Vec::with_capacity(INDICES.len());

        for (symbol, name) in INDICES {
            match self.fetcher.latest_snapshot(symbol, today, INDEX_LOOKBACK_DAYS).await {
                Ok(snap) => quotes.push(IndexQuote {
                    name: name.to_string(),
                    symbol: symbol.to_string(),
                    close: snap.current_close,
                    change_fraction: snap.latest_change_fraction,
                    trade_date: snap.trade_date,
                }),
                Err(e) => warn!("{}: snapshot unavailable: {}", symbol, e),
            }
        }
        quotes
    }
}

fn settle(
    ticker: Ticker,
    joined: Result<EnrichOutcome, JoinError>,
    results: &mut Vec<ScoredResult>,
    skipped: &mut Vec<SkippedTicker>,
) {
    match joined {
        Ok(Ok((price, fundamentals))) => {
            let card = screening::score(&fundamentals);
            info!("{}: score {}/5", ticker, card.score);
            results.push(ScoredResult {
                ticker,
                price,
                fundamentals,
                score: card.score,
                passed_filters: card.passed,
            });
        }
        Ok(Err(e)) => {
            warn!("{}: skipped: {}", ticker, e);
            skipped.push(SkippedTicker { ticker, reason: e.to_string() });
        }
        Err(e) => {
            error!("Task panic for {}: {}", ticker, e);
            skipped.push(SkippedTicker { ticker, reason: format!("task failed: {}", e) });
        }
    }
}

fn abort_remaining<T>(pending: &mut impl Iterator<Item = (usize, JoinHandle<T>)>) {
    for (_, handle) in pending {
        handle.abort();
    }
}
