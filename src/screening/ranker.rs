use crate::models::ScoredResult;

/// Descending by score. `sort_by` is stable, so equal scores keep their
/// input (candidate) order; no secondary key is applied.
pub fn rank(mut results: Vec<ScoredResult>) -> Vec<ScoredResult> {
    results.sort_by(|a, b| b.score.cmp(&a.score));
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FundamentalMetrics, PriceSnapshot, Ticker};
    use chrono::NaiveDate;

    fn result(code: &str, score: u8) -> ScoredResult {
        ScoredResult {
            ticker: Ticker::new(code, code),
            price: PriceSnapshot {
                current_close: 100.0,
                latest_change_fraction: 0.0,
                high_52_week: 120.0,
                trade_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            },
            fundamentals: FundamentalMetrics::default(),
            score,
            passed_filters: vec![],
        }
    }

    #[test]
    fn sorted_non_increasing_and_stable() {
        let ranked = rank(vec![
            result("a", 1),
            result("b", 3),
            result("c", 1),
            result("d", 5),
            result("e", 3),
            result("f", 0),
        ]);
        let codes: Vec<&str> = ranked.iter().map(|r| r.ticker.code.as_str()).collect();
        assert_eq!(codes, vec!["d", "b", "e", "a", "c", "f"]);
        assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn empty_input() {
        assert!(rank(vec![]).is_empty());
    }
}
