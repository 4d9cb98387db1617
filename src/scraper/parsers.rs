use crate::error::SourceError;
use crate::models::{RawFundamentals, RawPriceRow, RawRankRow};
use scraper::{ElementRef, Html, Selector};

fn selector(css: &str) -> Result<Selector, SourceError> {
    Selector::parse(css).map_err(|e| SourceError::Malformed(format!("selector {}: {:?}", css, e)))
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ── Rank page ─────────────────────────────────────────────────────────────────

/// Rows of session box `day_index` on the deal-rank page.
///
/// One `div.box_type_ms` per recent session, newest first. A box without a
/// table is an empty session, not an error.
pub fn parse_rank_page(html: &str, day_index: usize) -> Result<Vec<RawRankRow>, SourceError> {
    let doc = Html::parse_document(html);

    let box_sel = selector("div.box_type_ms")?;
    let table_sel = selector("table")?;
    let tr_sel = selector("tr")?;
    let th_sel = selector("th")?;
    let link_sel = selector("td:nth-of-type(1) p a")?;

    let boxes: Vec<ElementRef<'_>> = doc.select(&box_sel).collect();
    if boxes.is_empty() {
        return Err(SourceError::Malformed("no rank boxes on page".into()));
    }
    let Some(day_box) = boxes.get(day_index) else {
        return Err(SourceError::NotAvailable { requested: day_index, available: boxes.len() });
    };
    let Some(table) = day_box.select(&table_sel).next() else {
        return Ok(vec![]);
    };

    let mut rows = Vec::new();
    for tr in table.select(&tr_sel) {
        if tr.select(&th_sel).next().is_some() {
            continue;
        }
        let Some(link) = tr.select(&link_sel).next() else { continue };

        rows.push(RawRankRow {
            name: Some(cell_text(link)),
            href: link.value().attr("href").map(|h| h.to_string()),
        });
    }

    Ok(rows)
}

// ── Company page ──────────────────────────────────────────────────────────────

/// Label-matched cells from `item/main.naver`. Every lookup is independent:
/// a missing label leaves only its own field empty.
pub fn parse_fundamentals_page(html: &str) -> Result<RawFundamentals, SourceError> {
    let doc = Html::parse_document(html);

    let per_sel = selector("#_per")?;
    let pbr_sel = selector("#_pbr")?;
    let th_sel = selector("th")?;
    let analysis_sel = selector("div.cop_analysis table")?;
    let tr_sel = selector("tr")?;
    let td_sel = selector("td")?;

    let mut raw = RawFundamentals {
        per: doc.select(&per_sel).next().map(cell_text),
        pbr: doc.select(&pbr_sel).next().map(cell_text),
        dividend_yield: row_value_after_label(&doc, &th_sel, "배당수익률"),
        foreign_ratio: row_value_after_label(&doc, &th_sel, "외국인소진율"),
        ..Default::default()
    };

    if let Some(table) = doc.select(&analysis_sel).next() {
        for tr in table.select(&tr_sel) {
            let Some(th) = tr.select(&th_sel).next() else { continue };
            let label: String = th.text().flat_map(|t| t.chars()).filter(|c| !c.is_whitespace()).collect();
            let last_td = || tr.select(&td_sel).last().map(cell_text);

            if label.contains("ROE(지배주주)") && raw.roe.is_none() {
                raw.roe = last_td();
            } else if label.contains("부채비율") && raw.debt_ratio.is_none() {
                raw.debt_ratio = last_td();
            }
        }
    }

    Ok(raw)
}

/// Text of the `td` following the first `th` whose text contains `label`.
fn row_value_after_label(doc: &Html, th_sel: &Selector, label: &str) -> Option<String> {
    let th = doc
        .select(th_sel)
        .find(|th| th.text().collect::<String>().contains(label))?;

    th.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "td")
        .map(cell_text)
}

// ── Price series ──────────────────────────────────────────────────────────────

/// Rows of the `siseJson.naver` body, a JS array literal:
///
/// ```text
/// [['날짜', '시가', '고가', '저가', '종가', '거래량', '외국인소진율'],
/// ["20240102", 78200, 79800, 78200, 79600, 17142847, 53.38],
/// ]
/// ```
///
/// Only lines opening with a quoted date are data; the header row uses
/// single quotes and is skipped along with anything else unrecognised.
pub fn parse_price_series(body: &str) -> Vec<RawPriceRow> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim().trim_start_matches('[').trim_end_matches(',').trim_end_matches(']');
            if !line.starts_with('"') {
                return None;
            }
            let cells: Vec<String> = line
                .split(',')
                .map(|c| c.trim().trim_matches('"').to_string())
                .collect();
            let cell = |i: usize| cells.get(i).cloned();

            Some(RawPriceRow {
                date: cell(0),
                open: cell(1),
                high: cell(2),
                low: cell(3),
                close: cell(4),
                volume: cell(5),
            })
        })
        .collect()
}
