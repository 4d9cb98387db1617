//! Typed failure taxonomy for the screening run.
//!
//! Three layers, each wrapping the one below:
//!   * [`SourceError`]: one upstream fetch (rank page, price series, company page)
//!   * [`EnrichError`]: one ticker; never aborts the run
//!   * [`ScreenError`]: the whole run

use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SourceError {
    /// Site unreachable or refusing us, after retries where applicable.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    /// The requested session box does not exist on the page.
    #[error("day index {requested} not available (page exposes {available} sessions)")]
    NotAvailable { requested: usize, available: usize },

    #[error("transient network error: {0}")]
    Transient(String),

    /// Page fetched but lacks the structure we parse.
    #[error("malformed page: {0}")]
    Malformed(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Malformed(_))
    }

    /// Terminal form once the retry budget is spent.
    pub fn escalate(self, attempts: u32) -> Self {
        match self {
            Self::Transient(msg) => {
                Self::Unavailable(format!("{} (after {} attempts)", msg, attempts))
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnrichError {
    #[error("insufficient price history: {observations} observation(s), need at least 2")]
    InsufficientHistory { observations: usize },

    #[error("degenerate 52-week high ({high})")]
    DegenerateHigh { high: f64 },

    #[error("degenerate previous close ({close})")]
    DegeneratePreviousClose { close: f64 },

    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Error)]
pub enum ScreenError {
    /// Day-index 0 could not be obtained at all.
    #[error("no seed data: rank list for the latest session is unavailable: {0}")]
    NoSeedData(#[source] SourceError),

    #[error("insufficient history: {required} consecutive sessions requested, {available} available")]
    InsufficientHistory { required: usize, available: usize },

    #[error("window must be at least 1 session")]
    EmptyWindow,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transient_and_malformed_retry() {
        assert!(SourceError::Transient("reset".into()).is_retryable());
        assert!(SourceError::Malformed("no boxes".into()).is_retryable());
        assert!(!SourceError::Unavailable("404".into()).is_retryable());
        assert!(!SourceError::NotAvailable { requested: 5, available: 3 }.is_retryable());
    }

    #[test]
    fn escalate_turns_transient_into_unavailable() {
        let e = SourceError::Transient("HTTP 503".into()).escalate(4);
        assert_eq!(e, SourceError::Unavailable("HTTP 503 (after 4 attempts)".into()));

        let e = SourceError::NotAvailable { requested: 2, available: 1 }.escalate(1);
        assert!(matches!(e, SourceError::NotAvailable { .. }));
    }
}
