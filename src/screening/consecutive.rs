use crate::error::ScreenError;
use crate::models::{CandidateSet, RankedList};
use std::collections::BTreeSet;

/// Codes ranked on every session of `lists[0..window]`.
///
/// `lists` must be ordered by day index. Fewer than `window` lists fails with
/// `InsufficientHistory` instead of intersecting a shorter window; one empty
/// session empties the whole result. Names and order come from `lists[0]`.
pub fn intersect(lists: &[RankedList], window: usize) -> Result<CandidateSet, ScreenError> {
    if window == 0 {
        return Err(ScreenError::EmptyWindow);
    }
    if lists.len() < window {
        return Err(ScreenError::InsufficientHistory { required: window, available: lists.len() });
    }

    let mut surviving: BTreeSet<&str> = lists[0].codes();
    for list in &lists[1..window] {
        let codes = list.codes();
        surviving.retain(|code| codes.contains(code));
        if surviving.is_empty() {
            break;
        }
    }

    let tickers = lists[0]
        .tickers
        .iter()
        .filter(|t| surviving.contains(t.code.as_str()))
        .cloned()
        .collect();

    Ok(CandidateSet { window, tickers })
}
