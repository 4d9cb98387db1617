use crate::models::{IndexQuote, RankedList, ScoredResult, ScreeningRun};
use crate::utils::{fmt_opt, fmt_pct, fmt_price};

const WIDTH: usize = 80;
const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const RESET: &str = "\x1b[0m";

#[derive(Clone, Copy)]
struct Palette {
    enabled: bool,
}

impl Palette {
    fn paint(self, text: &str, code: &str) -> String {
        if self.enabled {
            format!("{}{}{}", code, text, RESET)
        } else {
            text.to_string()
        }
    }

    /// Green up, red down, plain when flat.
    fn change(self, pct: f64) -> String {
        let text = fmt_pct(pct);
        match pct.partial_cmp(&0.0) {
            Some(std::cmp::Ordering::Greater) => self.paint(&text, GREEN),
            Some(std::cmp::Ordering::Less) => self.paint(&text, RED),
            _ => text,
        }
    }
}

pub fn render_console(run: &ScreeningRun, color: bool) -> String {
    let palette = Palette { enabled: color };
    let meta = &run.meta;

    let mut out = format!(
        "{}\n🎯 {}-day consecutive {} net-buy screen ({})\n   generated {} | {} candidate(s) | {} scored | {} skipped\n",
        "=".repeat(WIDTH),
        meta.window,
        meta.investor,
        meta.market,
        meta.generated_at.format("%Y-%m-%d %H:%M"),
        meta.candidate_count,
        run.results.len(),
        run.skipped.len()
    );
    if meta.partial {
        out.push_str(&format!(
            "   {}\n",
            palette.paint("⚠ partial: the run was cancelled before every candidate finished", YELLOW)
        ));
    }
    out.push_str(&format!("{}\n", "-".repeat(WIDTH)));

    if run.results.is_empty() {
        out.push_str("No consecutive net-buy candidates.\n");
    }
    for (i, result) in run.results.iter().enumerate() {
        out.push_str(&result_block(i + 1, result, palette));
    }

    if !run.skipped.is_empty() {
        out.push_str("Skipped:\n");
        for s in &run.skipped {
            out.push_str(&format!("  - {}: {}\n", s.ticker, s.reason));
        }
    }
    out.push_str(&format!("{}\n", "=".repeat(WIDTH)));
    out
}

fn result_block(rank: usize, r: &ScoredResult, palette: Palette) -> String {
    let m = &r.fundamentals;
    let pct = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |v| format!("{:.2}%", v));

    let mut out = format!(
        "[{:02}] {} - score: {}/5\n    Close: {} ({}) | 52w high: {} ({:.1}%)\n",
        rank,
        r.ticker,
        r.score,
        fmt_price(r.price.current_close),
        palette.change(r.price.change_pct()),
        fmt_price(r.price.high_52_week),
        r.price_ratio() * 100.0
    );
    out.push_str(&format!(
        "    PER: {} | PBR: {} | ROE: {} | Debt ratio: {} | Dividend: {} | Foreign: {}\n",
        fmt_opt(m.per),
        fmt_opt(m.pbr),
        pct(m.roe),
        pct(m.debt_ratio),
        pct(m.dividend_yield_pct),
        pct(m.foreign_hold_ratio_pct)
    ));
    if !r.passed_filters.is_empty() {
        let labels: Vec<String> = r.passed_filters.iter().map(|p| p.to_string()).collect();
        out.push_str(&format!("    ✓ Filters: {}\n", labels.join(", ")));
    }
    out.push('\n');
    out
}

/// Numbered `name (code)` listing of one session's rank box.
pub fn render_rank_list(list: &RankedList, limit: usize) -> String {
    let mut out = format!(
        "📈 Top {} net-buy ({}), session {}\n{}\n",
        list.investor,
        list.market,
        list.day_index,
        "-".repeat(WIDTH)
    );
    if list.is_empty() {
        out.push_str("No entries.\n");
    }
    for (i, t) in list.tickers.iter().take(limit).enumerate() {
        out.push_str(&format!("[{:02}] {}\n", i + 1, t));
    }
    out
}

pub fn render_indices(quotes: &[IndexQuote], color: bool) -> String {
    let palette = Palette { enabled: color };
    let mut out = format!("📊 Market indices\n{}\n", "-".repeat(WIDTH));
    if quotes.is_empty() {
        out.push_str("No index data available.\n");
    }
    for q in quotes {
        out.push_str(&format!(
            "▶ {} ({})  {}  {}  as of {}\n",
            q.name,
            q.symbol,
            fmt_price(q.close),
            palette.change(q.change_fraction * 100.0),
            q.trade_date
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{InvestorCategory, Market, SkippedTicker, Ticker};
    use crate::render::fixtures::{result, run};
    use chrono::NaiveDate;

    #[test]
    fn plain_block_lists_price_metrics_and_filters() {
        let text = render_console(&run(vec![result("005930", "삼성전자", 0.0123)]), false);
        assert!(text.contains("[01] 삼성전자 (005930) - score: 3/5"));
        assert!(text.contains("Close: 71,500 (+1.23%) | 52w high: 79,800 (89.6%)"));
        assert!(text.contains("Debt ratio: N/A"));
        assert!(text.contains("Foreign: 52.10%"));
        assert!(text.contains("✓ Filters: PBR: 0.80, PER: 12.00, ROE: 18.00%"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn colour_follows_direction() {
        let up = render_console(&run(vec![result("000001", "A", 0.02)]), true);
        assert!(up.contains("\x1b[32m+2.00%\x1b[0m"));

        let down = render_console(&run(vec![result("000001", "A", -0.02)]), true);
        assert!(down.contains("\x1b[31m-2.00%\x1b[0m"));
    }

    #[test]
    fn empty_and_partial_runs_say_so() {
        let mut r = run(vec![]);
        r.meta.partial = true;
        r.skipped.push(SkippedTicker {
            ticker: Ticker::new("000660", "SK하이닉스"),
            reason: "source unavailable: HTTP 404".into(),
        });
        let text = render_console(&r, false);
        assert!(text.contains("No consecutive net-buy candidates."));
        assert!(text.contains("partial"));
        assert!(text.contains("SK하이닉스 (000660): source unavailable: HTTP 404"));
    }

    #[test]
    fn rank_list_respects_limit() {
        let list = RankedList {
            market: Market::Kosdaq,
            investor: InvestorCategory::Institution,
            day_index: 0,
            tickers: vec![Ticker::new("247540", "에코프로비엠"), Ticker::new("086520", "에코프로")],
        };
        let text = render_rank_list(&list, 1);
        assert!(text.contains("[01] 에코프로비엠 (247540)"));
        assert!(!text.contains("086520"));
    }

    #[test]
    fn indices_block() {
        let quotes = vec![IndexQuote {
            name: "KOSPI Composite".into(),
            symbol: "KOSPI".into(),
            close: 2_650.37,
            change_fraction: -0.0041,
            trade_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        }];
        let text = render_indices(&quotes, false);
        assert!(text.contains("▶ KOSPI Composite (KOSPI)  2,650.37  -0.41%  as of 2024-01-03"));
    }
}
