use crate::models::{ScoredResult, ScreeningRun};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;

const HEADERS: [&str; 15] = [
    "rank",
    "code",
    "name",
    "score",
    "close",
    "change_pct",
    "high_52w",
    "price_ratio",
    "per",
    "pbr",
    "roe",
    "debt_ratio",
    "dividend_yield",
    "foreign_ratio",
    "filters",
];

/// One spreadsheet row. Absent metrics serialise as empty cells.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    rank: usize,
    code: &'a str,
    name: &'a str,
    score: u8,
    close: f64,
    change_pct: f64,
    high_52w: f64,
    price_ratio: f64,
    per: Option<f64>,
    pbr: Option<f64>,
    roe: Option<f64>,
    debt_ratio: Option<f64>,
    dividend_yield: Option<f64>,
    foreign_ratio: Option<f64>,
    filters: String,
}

impl<'a> CsvRow<'a> {
    fn new(rank: usize, r: &'a ScoredResult) -> Self {
        let m = &r.fundamentals;
        Self {
            rank,
            code: &r.ticker.code,
            name: &r.ticker.name,
            score: r.score,
            close: r.price.current_close,
            change_pct: round2(r.price.change_pct()),
            high_52w: r.price.high_52_week,
            price_ratio: (r.price_ratio() * 10_000.0).round() / 10_000.0,
            per: m.per,
            pbr: m.pbr,
            roe: m.roe,
            debt_ratio: m.debt_ratio,
            dividend_yield: m.dividend_yield_pct,
            foreign_ratio: m.foreign_hold_ratio_pct,
            filters: r
                .passed_filters
                .iter()
                .map(|p| p.to_string())
                .collect::<Vec<_>>()
                .join("; "),
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Header row plus one row per ranked result, without BOM.
pub fn render_csv(run: &ScreeningRun) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(HEADERS).context("Failed to write CSV header")?;
    for (i, result) in run.results.iter().enumerate() {
        writer
            .serialize(CsvRow::new(i + 1, result))
            .with_context(|| format!("Failed to write CSV row for {}", result.ticker))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow!("Failed to flush CSV: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fixtures::{result, run};

    #[test]
    fn header_and_rows() {
        let csv = render_csv(&run(vec![
            result("005930", "삼성전자", 0.0123),
            result("000660", "SK하이닉스, 우", -0.005),
        ]))
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], HEADERS.join(","));
        assert!(lines[1].starts_with("1,005930,삼성전자,3,71500.0,1.23,79800.0,0.8"));
        assert!(lines[1].contains(",12.0,0.8,18.0,,1.0,52.1,"));
        assert!(lines[1].ends_with("PBR: 0.80; PER: 12.00; ROE: 18.00%"));
        // embedded comma is quoted
        assert!(lines[2].starts_with("2,000660,\"SK하이닉스, 우\",3,71500.0,-0.5,"));
    }

    #[test]
    fn empty_run_is_header_only() {
        let csv = render_csv(&run(vec![])).unwrap();
        assert_eq!(csv.trim_end(), HEADERS.join(","));
    }
}
