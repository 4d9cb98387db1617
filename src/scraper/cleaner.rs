use crate::models::{FundamentalMetrics, PriceBar, RawFundamentals, RawPriceRow, RawRankRow, Ticker};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, warn};
use url::Url;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Placeholder cells the site uses for "no figure".
fn is_placeholder(s: &str) -> bool {
    s.is_empty() || s.eq_ignore_ascii_case("N/A") || s == "-" || s == "—"
}

/// Parse a scraped numeric cell: "1,234.56" → 1234.56 | "12.3%" → 12.3 | "N/A" → None.
/// Anything non-finite is treated as absent, never as zero.
pub fn parse_number(s: &str) -> Option<f64> {
    let cleaned: String = s
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '%')
        .collect();
    if is_placeholder(&cleaned) {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_volume(s: &str) -> Option<i64> {
    let cleaned: String = s.trim().chars().filter(|c| c.is_ascii_digit()).collect();
    cleaned.parse().ok()
}

/// Parse dates: "20240102" (chart feed) or ISO / dotted.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    for fmt in ["%Y%m%d", "%Y-%m-%d", "%Y.%m.%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Exchange codes are all digits; leading zeros are significant.
pub fn normalise_code(s: &str) -> Option<String> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(s.to_string())
}

/// Pull `code=` out of a ticker link such as `/item/main.naver?code=005930`.
pub fn extract_code(href: &str, base: &Url) -> Option<String> {
    let url = base.join(href.trim()).ok()?;
    let code = url
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())?;
    normalise_code(&code)
}

// ── Rank rows → Ticker ────────────────────────────────────────────────────────

/// Drop rows without a name or a resolvable code; keep the first of duplicate codes.
pub fn clean_rank_rows(rows: Vec<RawRankRow>, base: &Url) -> Vec<Ticker> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(name) = row.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) else {
            continue;
        };
        let Some(code) = row.href.as_deref().and_then(|h| extract_code(h, base)) else {
            debug!("Dropping rank row '{}' without a ticker code", name);
            continue;
        };
        if seen.insert(code.clone()) {
            out.push(Ticker::new(code, name));
        }
    }
    out
}

// ── Price rows → PriceBar ─────────────────────────────────────────────────────

pub fn price_row_to_bar(row: &RawPriceRow) -> Option<PriceBar> {
    let date = parse_date(row.date.as_deref()?)?;
    let close = parse_number(row.close.as_deref()?)?;

    if close <= 0.0 {
        warn!("Invalid close {} on {}", close, date);
        return None;
    }

    Some(PriceBar {
        date,
        open: row.open.as_deref().and_then(parse_number),
        high: row.high.as_deref().and_then(parse_number),
        low: row.low.as_deref().and_then(parse_number),
        close,
        volume: row.volume.as_deref().and_then(parse_volume),
    })
}

/// Chronological, one bar per date (last occurrence wins).
pub fn clean_price_rows(rows: Vec<RawPriceRow>) -> Vec<PriceBar> {
    let mut bars: Vec<PriceBar> = rows.iter().filter_map(price_row_to_bar).collect();
    bars.sort_by_key(|b| b.date);
    let mut deduped: Vec<PriceBar> = Vec::with_capacity(bars.len());
    for bar in bars {
        match deduped.last_mut() {
            Some(last) if last.date == bar.date => *last = bar,
            _ => deduped.push(bar),
        }
    }
    deduped
}

// ── Company page cells → FundamentalMetrics ───────────────────────────────────

/// Each field is parsed on its own; one bad cell never blanks the others.
pub fn clean_fundamentals(raw: &RawFundamentals) -> FundamentalMetrics {
    let field = |cell: &Option<String>| cell.as_deref().and_then(parse_number);

    FundamentalMetrics {
        per: field(&raw.per),
        pbr: field(&raw.pbr),
        roe: field(&raw.roe),
        debt_ratio: field(&raw.debt_ratio),
        dividend_yield_pct: field(&raw.dividend_yield),
        foreign_hold_ratio_pct: field(&raw.foreign_ratio),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://finance.naver.com").unwrap()
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1,234.56"), Some(1234.56));
        assert_eq!(parse_number(" 12.30% "), Some(12.3));
        assert_eq!(parse_number("-3.5"), Some(-3.5));
        assert_eq!(parse_number("N/A"), None);
        assert_eq!(parse_number(""), None);
        assert_eq!(parse_number("-"), None);
        assert_eq!(parse_number("적자"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("20240102"), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(parse_date("2024-01-02"), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(parse_date("2024.01.02"), NaiveDate::from_ymd_opt(2024, 1, 2));
        assert_eq!(parse_date("날짜"), None);
    }

    #[test]
    fn test_extract_code_keeps_leading_zeros() {
        assert_eq!(extract_code("/item/main.naver?code=005930", &base()), Some("005930".into()));
        assert_eq!(
            extract_code("https://finance.naver.com/item/main.naver?code=000660&x=1", &base()),
            Some("000660".into())
        );
        assert_eq!(extract_code("/item/main.naver", &base()), None);
        assert_eq!(extract_code("/item/main.naver?code=ABC", &base()), None);
    }

    #[test]
    fn test_clean_rank_rows_drops_bad_rows_and_duplicates() {
        let rows = vec![
            RawRankRow { name: Some("삼성전자".into()), href: Some("/item/main.naver?code=005930".into()) },
            RawRankRow { name: Some("NoCode".into()), href: Some("/item/main.naver".into()) },
            RawRankRow { name: Some("  ".into()), href: Some("/item/main.naver?code=000001".into()) },
            RawRankRow { name: None, href: Some("/item/main.naver?code=000002".into()) },
            RawRankRow { name: Some("삼성전자 dup".into()), href: Some("/item/main.naver?code=005930".into()) },
            RawRankRow { name: Some("SK하이닉스".into()), href: Some("/item/main.naver?code=000660".into()) },
        ];

        let tickers = clean_rank_rows(rows, &base());
        assert_eq!(
            tickers,
            vec![Ticker::new("005930", "삼성전자"), Ticker::new("000660", "SK하이닉스")]
        );
    }

    #[test]
    fn test_clean_price_rows_sorts_and_dedupes() {
        let row = |d: &str, c: &str| RawPriceRow {
            date: Some(d.into()),
            close: Some(c.into()),
            high: Some(c.into()),
            ..Default::default()
        };
        let bars = clean_price_rows(vec![
            row("20240103", "110"),
            row("20240102", "100"),
            row("20240103", "111"),
            row("bogus", "1"),
            row("20240104", "0"),
        ]);

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 100.0);
        assert_eq!(bars[1].close, 111.0);
    }

    #[test]
    fn test_clean_fundamentals_fields_are_independent() {
        let raw = RawFundamentals {
            per: Some("N/A".into()),
            pbr: Some("0.85".into()),
            roe: Some("".into()),
            debt_ratio: Some("42.10".into()),
            dividend_yield: Some("2.31%".into()),
            foreign_ratio: None,
        };
        let m = clean_fundamentals(&raw);
        assert_eq!(m.per, None);
        assert_eq!(m.pbr, Some(0.85));
        assert_eq!(m.roe, None);
        assert_eq!(m.debt_ratio, Some(42.1));
        assert_eq!(m.dividend_yield_pct, Some(2.31));
        assert_eq!(m.foreign_hold_ratio_pct, None);
    }
}
